//! Atomic cache entry persistence.
//!
//! Entries are written to a temporary sibling, flushed, and renamed over the
//! final path, so readers observe either the previous entry or the new one.
//! Temporaries are named `.<file name>.<random>.tmp`, which never matches a
//! cache file name, and are removed on any failure.

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::artifact::CompiledArtifact;
use crate::codec;
use crate::error::WriteError;
use crate::fingerprint::SourceFingerprint;

/// Suffix of in-flight temporary files.
pub const TEMP_SUFFIX: &str = ".tmp";

/// Stateless cache file writer.
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheWriter;

impl CacheWriter {
    /// Creates a writer.
    pub fn new() -> Self {
        Self
    }

    /// Encodes `artifact` under `fingerprint` and replaces the entry at `path`.
    ///
    /// Creates the parent directory if needed. On error the previous entry,
    /// if any, is left untouched.
    pub fn store(
        &self,
        path: &Path,
        fingerprint: &SourceFingerprint,
        artifact: &CompiledArtifact,
    ) -> Result<(), WriteError> {
        let bytes = codec::encode(artifact, fingerprint)?;
        write_atomic(path, &bytes)?;
        tracing::debug!(path = %path.display(), bytes = bytes.len(), "stored cache entry");
        Ok(())
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), WriteError> {
    write_atomic_with(path, |file| {
        file.write_all(bytes)?;
        file.sync_all()
    })
}

/// Creates the temporary sibling, lets `fill` write and flush it, then
/// renames it over `path`.
fn write_atomic_with<F>(path: &Path, fill: F) -> Result<(), WriteError>
where
    F: FnOnce(&mut File) -> io::Result<()>,
{
    let file_name = path
        .file_name()
        .ok_or_else(|| WriteError::InvalidPath(path.to_path_buf()))?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir).map_err(|e| WriteError::Io {
        path: dir.clone(),
        source: e,
    })?;

    let prefix = format!(".{}.", file_name.to_string_lossy());
    // Dropping `tmp` on any early return deletes the temporary file.
    let mut tmp = tempfile::Builder::new()
        .prefix(&prefix)
        .suffix(TEMP_SUFFIX)
        .tempfile_in(&dir)
        .map_err(|e| WriteError::Io {
            path: dir.clone(),
            source: e,
        })?;
    fill(tmp.as_file_mut()).map_err(|source| WriteError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    tmp.persist(path).map_err(|e| WriteError::Rename {
        from: e.file.path().to_path_buf(),
        to: path.to_path_buf(),
        source: e.error,
    })?;
    sync_dir(&dir);
    Ok(())
}

/// Flushes the directory entry so the rename survives a crash.
#[cfg(unix)]
fn sync_dir(dir: &Path) {
    if let Err(e) = File::open(dir).and_then(|d| d.sync_all()) {
        tracing::debug!(dir = %dir.display(), error = %e, "directory fsync failed");
    }
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) {}
