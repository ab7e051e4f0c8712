//! Cache entry validation and loading.
//!
//! The reader is stateless. Each [`CacheReader::try_load`] call opens the
//! file, reads and validates the header, compares fingerprints, and only
//! then reads the payload. A changed source therefore costs one header read.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use crate::artifact::CompiledArtifact;
use crate::codec::{self, EntryHeader, Section, FIXED_PREFIX_LEN};
use crate::error::DecodeError;
use crate::fingerprint::{SourceFingerprint, StaleField};

/// Why a lookup did not yield a trustworthy artifact.
///
/// Every reason is non-fatal and resolved by recompiling.
#[derive(Debug, thiserror::Error)]
pub enum Miss {
    /// The file is absent or cannot be read.
    #[error("no readable cache entry")]
    NotFound,

    /// The file is not a cache entry.
    #[error("not a cache file")]
    ForeignFile,

    /// The entry was written by a different format version.
    #[error("cache format version {found}, reader supports {expected}")]
    VersionSkew {
        /// Version found in the file.
        found: u32,
        /// Version this reader supports.
        expected: u32,
    },

    /// The entry was built from a different source or toolchain.
    #[error("stale entry: {0} changed")]
    Stale(StaleField),

    /// The entry is damaged.
    #[error("corrupt entry: {0}")]
    Corrupt(DecodeError),
}

impl From<DecodeError> for Miss {
    fn from(err: DecodeError) -> Self {
        match err {
            DecodeError::BadMagic { .. } => Miss::ForeignFile,
            DecodeError::UnsupportedVersion { found, expected } => {
                Miss::VersionSkew { found, expected }
            }
            other => Miss::Corrupt(other),
        }
    }
}

/// A fully validated cache entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// The entry header, including the fingerprint it was built from.
    pub header: EntryHeader,
    /// The decoded artifact.
    pub artifact: CompiledArtifact,
}

impl CacheEntry {
    /// Hands the artifact over to the caller.
    pub fn into_artifact(self) -> CompiledArtifact {
        self.artifact
    }
}

/// Stateless cache file reader.
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheReader;

impl CacheReader {
    /// Creates a reader.
    pub fn new() -> Self {
        Self
    }

    /// Loads the entry at `path` if it matches `expected` exactly.
    ///
    /// Checks run cheapest first: magic, version, fingerprint, then payload
    /// length, checksum and structure. Nothing from a rejected entry is
    /// returned.
    pub fn try_load(
        &self,
        path: &Path,
        expected: &SourceFingerprint,
    ) -> Result<CacheEntry, Miss> {
        let result = load(path, expected);
        if let Err(ref miss) = result {
            tracing::debug!(path = %path.display(), %miss, "cache miss");
        }
        result
    }
}

fn load(path: &Path, expected: &SourceFingerprint) -> Result<CacheEntry, Miss> {
    let mut file = File::open(path).map_err(|_| Miss::NotFound)?;
    let file_len = file.metadata().map_err(|_| Miss::NotFound)?.len();

    let header_bytes = read_header_bytes(&mut file).map_err(|_| Miss::NotFound)?;
    let header = codec::decode_header(&header_bytes)?;

    if let Some(field) = expected.first_mismatch(&header.fingerprint) {
        return Err(Miss::Stale(field));
    }

    let available = file_len.saturating_sub(header_bytes.len() as u64);
    let payload_len = checked_payload_len(&header, available)?;
    let mut payload = vec![0u8; payload_len];
    file.read_exact(&mut payload).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => Miss::Corrupt(DecodeError::Truncated {
            section: Section::Payload,
            needed: header.payload_len,
            available,
        }),
        _ => Miss::NotFound,
    })?;

    codec::verify_payload(&header, &payload)?;
    let artifact = codec::decode_payload(&payload)?;
    Ok(CacheEntry { header, artifact })
}

/// Checks the declared payload length against the file size before any
/// allocation is made for it.
fn checked_payload_len(header: &EntryHeader, available: u64) -> Result<usize, Miss> {
    if header.payload_len > available {
        return Err(Miss::Corrupt(DecodeError::Truncated {
            section: Section::Payload,
            needed: header.payload_len,
            available,
        }));
    }
    if header.payload_len < available {
        return Err(Miss::Corrupt(DecodeError::BadLength {
            section: Section::Payload,
            reason: format!("{} trailing bytes", available - header.payload_len),
        }));
    }
    usize::try_from(header.payload_len).map_err(|_| {
        Miss::Corrupt(DecodeError::BadLength {
            section: Section::Payload,
            reason: format!("{} bytes exceeds address space", header.payload_len),
        })
    })
}

/// Reads up to one header's worth of bytes.
///
/// Short files yield a short buffer; the codec reports what is missing.
fn read_header_bytes(file: &mut File) -> io::Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(FIXED_PREFIX_LEN + 64);
    file.by_ref()
        .take(FIXED_PREFIX_LEN as u64)
        .read_to_end(&mut buf)?;
    if let Some(rest) = codec::header_remainder_len(&buf) {
        file.by_ref().take(rest as u64).read_to_end(&mut buf)?;
    }
    Ok(buf)
}
