//! Error types for cache operations.
//!
//! Most cache failures are fail-safe: they surface as a [`Miss`](crate::Miss)
//! and fall through to recompilation. Only fingerprinting and compilation
//! failures terminate a lookup.

use std::path::PathBuf;

use bcc_config::ConfigError;

use crate::codec::Section;

/// Fingerprinting failed because the backing file's metadata is unreadable.
#[derive(Debug, thiserror::Error)]
#[error("cannot read metadata of {path}: {source}")]
pub struct FingerprintError {
    /// The source file whose metadata was requested.
    pub path: PathBuf,
    /// The underlying I/O error.
    pub source: std::io::Error,
}

/// A cache file could not be decoded.
///
/// Every variant means the bytes are untrustworthy; nothing decoded before
/// the failure is ever used.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// The buffer ended before a field or section was complete.
    #[error("truncated {section}: needed {needed} bytes, {available} available")]
    Truncated {
        /// Where the buffer ran out.
        section: Section,
        /// Bytes required to continue.
        needed: u64,
        /// Bytes actually left.
        available: u64,
    },

    /// A length field is inconsistent with the data it describes.
    #[error("bad length in {section}: {reason}")]
    BadLength {
        /// The section whose length is wrong.
        section: Section,
        /// What was inconsistent.
        reason: String,
    },

    /// The file does not start with the cache magic number.
    #[error("bad magic {found:#010x}")]
    BadMagic {
        /// The magic value found.
        found: u32,
    },

    /// The file uses a different format version.
    #[error("unsupported format version {found} (expected {expected})")]
    UnsupportedVersion {
        /// The version found in the file.
        found: u32,
        /// The version this reader supports.
        expected: u32,
    },

    /// The payload checksum does not match the header.
    #[error("payload checksum mismatch: header {expected:#010x}, computed {actual:#010x}")]
    ChecksumMismatch {
        /// Checksum recorded in the header.
        expected: u32,
        /// Checksum computed over the payload read.
        actual: u32,
    },

    /// An embedded offset points outside the region it indexes.
    #[error("offset {offset} out of range in {section} (limit {limit})")]
    BadOffset {
        /// The section holding the offset.
        section: Section,
        /// The offending offset (or end of range).
        offset: u64,
        /// The exclusive or inclusive bound it violated.
        limit: u64,
    },

    /// A record carries an unknown tag value.
    #[error("unknown tag {tag} in {section}")]
    BadTag {
        /// The section holding the record.
        section: Section,
        /// The tag value found.
        tag: u32,
    },

    /// A string pool entry is not valid UTF-8.
    #[error("string at pool offset {offset} is not valid UTF-8")]
    BadString {
        /// Pool offset of the string.
        offset: u32,
    },
}

/// An artifact cannot be represented in the fixed-width cache format.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodeError {
    /// A section or count exceeds its length field.
    #[error("{section} too large to encode: {len}")]
    TooLarge {
        /// The section that overflowed.
        section: Section,
        /// The offending length or count.
        len: u64,
    },

    /// The artifact's tables point outside its code.
    #[error("artifact is inconsistent: {0}")]
    InvalidArtifact(#[source] DecodeError),
}

/// Persisting a cache entry failed. The previous entry, if any, is intact.
#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    /// Creating, writing or flushing the temporary file failed.
    #[error("cache write failed at {path}: {source}")]
    Io {
        /// The path being written.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Moving the temporary file into place failed.
    #[error("cannot rename {from} to {to}: {source}")]
    Rename {
        /// The temporary file.
        from: PathBuf,
        /// The final cache path.
        to: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The artifact could not be encoded.
    #[error(transparent)]
    Encode(#[from] EncodeError),

    /// The cache path has no file name component.
    #[error("invalid cache path {0}")]
    InvalidPath(PathBuf),
}

/// A cache lookup could not produce an artifact.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError<E> {
    /// The source could not be fingerprinted.
    #[error(transparent)]
    Fingerprint(#[from] FingerprintError),

    /// A resource name does not map to a cache path.
    #[error(transparent)]
    CachePath(#[from] ConfigError),

    /// The compiler/linker collaborator failed.
    #[error("compilation failed: {0}")]
    Compile(#[source] E),
}
