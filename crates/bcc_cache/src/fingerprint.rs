//! Source fingerprinting.
//!
//! A [`SourceFingerprint`] is built fresh for every lookup and compared
//! field-by-field against the copy embedded in a cache entry. Only a match
//! on all four fields allows reuse.

use std::fmt;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use bcc_common::{crc32, ContentDigest, ToolchainSignature};

use crate::error::FingerprintError;

/// Where the source bytes came from, for the modification time field.
#[derive(Debug, Clone, Copy)]
pub enum SourceOrigin<'a> {
    /// Bytes with no backing file; the modification time is 0.
    InMemory,
    /// Bytes read from this file; its mtime is read from the filesystem.
    File(&'a Path),
    /// Modification time already known to the caller, in seconds since the
    /// Unix epoch.
    ModTime(i64),
}

/// Identity of a source unit at a point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFingerprint {
    /// SHA-1 of the raw source bytes.
    pub content_digest: ContentDigest,
    /// Modification time in seconds since the Unix epoch, 0 when unknown.
    pub mod_time: i64,
    /// CRC-32 of the raw source bytes.
    pub crc32: u32,
    /// Compiler/linker configuration the artifact is built with.
    pub toolchain: ToolchainSignature,
}

/// The fingerprint field that made a cache entry stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaleField {
    /// The toolchain signature differs.
    ToolchainSignature,
    /// The source checksum differs.
    Crc32,
    /// The source digest differs.
    ContentDigest,
    /// The source file was touched.
    ModTime,
}

impl fmt::Display for StaleField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StaleField::ToolchainSignature => "toolchain signature",
            StaleField::Crc32 => "source checksum",
            StaleField::ContentDigest => "source content",
            StaleField::ModTime => "modification time",
        })
    }
}

impl SourceFingerprint {
    /// Fingerprints `source` under `toolchain`.
    ///
    /// Digest and checksum depend only on the bytes. Fails only when a
    /// backing file is named and its metadata cannot be read.
    pub fn build(
        source: &[u8],
        origin: SourceOrigin<'_>,
        toolchain: &ToolchainSignature,
    ) -> Result<Self, FingerprintError> {
        let mod_time = match origin {
            SourceOrigin::InMemory => 0,
            SourceOrigin::ModTime(t) => t,
            SourceOrigin::File(path) => file_mod_time(path)?,
        };
        Ok(Self {
            content_digest: ContentDigest::from_bytes(source),
            mod_time,
            crc32: crc32(source),
            toolchain: toolchain.clone(),
        })
    }

    /// Returns the first field where `stored` differs from `self`.
    ///
    /// Fields are checked cheapest and most explanatory first: toolchain,
    /// checksum, digest, then modification time.
    pub fn first_mismatch(&self, stored: &SourceFingerprint) -> Option<StaleField> {
        if self.toolchain != stored.toolchain {
            Some(StaleField::ToolchainSignature)
        } else if self.crc32 != stored.crc32 {
            Some(StaleField::Crc32)
        } else if self.content_digest != stored.content_digest {
            Some(StaleField::ContentDigest)
        } else if self.mod_time != stored.mod_time {
            Some(StaleField::ModTime)
        } else {
            None
        }
    }
}

/// Reads a file's mtime as signed seconds relative to the Unix epoch.
fn file_mod_time(path: &Path) -> Result<i64, FingerprintError> {
    let modified = std::fs::metadata(path)
        .and_then(|m| m.modified())
        .map_err(|e| FingerprintError {
            path: path.to_path_buf(),
            source: e,
        })?;
    Ok(epoch_seconds(modified))
}

fn epoch_seconds(t: SystemTime) -> i64 {
    match t.duration_since(UNIX_EPOCH) {
        Ok(d) => i64::try_from(d.as_secs()).unwrap_or(i64::MAX),
        Err(e) => i64::try_from(e.duration().as_secs()).map_or(i64::MIN, |s| -s),
    }
}
