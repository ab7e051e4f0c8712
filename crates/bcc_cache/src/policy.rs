//! Reuse-or-recompile decision.
//!
//! [`CachePolicy::resolve`] is the single entry point of the script-loading
//! flow: fingerprint the source, try the cache, and on any miss run the
//! compiler collaborator and store its output best-effort.

use std::path::Path;

use bcc_common::ToolchainSignature;

use crate::artifact::CompiledArtifact;
use crate::error::ResolveError;
use crate::fingerprint::{SourceFingerprint, SourceOrigin};
use crate::reader::CacheReader;
use crate::writer::CacheWriter;

/// Caller-supplied cache behavior.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheOptions {
    /// Skip lookups entirely; every resolve compiles, then stores.
    pub bypass: bool,
}

/// Source bytes plus where they came from.
#[derive(Debug, Clone, Copy)]
pub struct SourceUnit<'a> {
    /// Raw bitcode.
    pub bytes: &'a [u8],
    /// Origin used for the modification time.
    pub origin: SourceOrigin<'a>,
}

impl<'a> SourceUnit<'a> {
    /// Bitcode with no backing file.
    pub fn in_memory(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            origin: SourceOrigin::InMemory,
        }
    }

    /// Bitcode read from `path`.
    pub fn from_file(bytes: &'a [u8], path: &'a Path) -> Self {
        Self {
            bytes,
            origin: SourceOrigin::File(path),
        }
    }
}

/// Decides between cache reuse and recompilation.
#[derive(Debug, Clone, Default)]
pub struct CachePolicy {
    options: CacheOptions,
    reader: CacheReader,
    writer: CacheWriter,
}

impl CachePolicy {
    /// Creates a policy with the given options.
    pub fn new(options: CacheOptions) -> Self {
        Self {
            options,
            reader: CacheReader::new(),
            writer: CacheWriter::new(),
        }
    }

    /// Returns the active options.
    pub fn options(&self) -> CacheOptions {
        self.options
    }

    /// Produces a ready artifact for `source`, from cache when possible.
    ///
    /// A hit returns the stored artifact without writing. A miss calls
    /// `compile` and persists its output; a failed store is logged and does
    /// not fail the call. Compiler errors are returned unchanged.
    pub fn resolve<F, E>(
        &self,
        source: SourceUnit<'_>,
        toolchain: &ToolchainSignature,
        path: &Path,
        compile: F,
    ) -> Result<CompiledArtifact, ResolveError<E>>
    where
        F: FnOnce(&[u8]) -> Result<CompiledArtifact, E>,
    {
        let fingerprint = SourceFingerprint::build(source.bytes, source.origin, toolchain)?;

        if self.options.bypass {
            tracing::debug!(path = %path.display(), "cache bypassed");
        } else {
            match self.reader.try_load(path, &fingerprint) {
                Ok(entry) => {
                    tracing::debug!(path = %path.display(), "cache hit");
                    return Ok(entry.into_artifact());
                }
                Err(miss) => {
                    tracing::info!(path = %path.display(), %miss, "recompiling");
                }
            }
        }

        let artifact = compile(source.bytes).map_err(ResolveError::Compile)?;

        if let Err(e) = self.writer.store(path, &fingerprint, &artifact) {
            tracing::warn!(path = %path.display(), error = %e, "failed to store cache entry");
        }
        Ok(artifact)
    }
}
