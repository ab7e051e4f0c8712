//! Content digests for cache keying.

use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use std::fmt;

/// Width of a [`ContentDigest`] in bytes.
pub const DIGEST_LEN: usize = 20;

/// A 160-bit SHA-1 digest of raw source bytes.
///
/// Two sources with the same `ContentDigest` are assumed to have identical
/// content. Collisions are not guarded against.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentDigest([u8; DIGEST_LEN]);

impl ContentDigest {
    /// Computes the SHA-1 digest of a byte slice.
    pub fn from_bytes(data: &[u8]) -> Self {
        let mut hasher = Sha1::new();
        hasher.update(data);
        Self(hasher.finalize().into())
    }

    /// Wraps an already computed digest, e.g. one read back from disk.
    pub const fn from_raw(raw: [u8; DIGEST_LEN]) -> Self {
        Self(raw)
    }

    /// Returns the raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ContentDigest({:02x}{:02x}{:02x}{:02x}..)",
            self.0[0], self.0[1], self.0[2], self.0[3]
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic() {
        let a = ContentDigest::from_bytes(b"hello world");
        let b = ContentDigest::from_bytes(b"hello world");
        assert_eq!(a, b);
    }

    #[test]
    fn different_inputs_differ() {
        let a = ContentDigest::from_bytes(b"hello");
        let b = ContentDigest::from_bytes(b"world");
        assert_ne!(a, b);
    }

    #[test]
    fn known_sha1_vector() {
        let d = ContentDigest::from_bytes(b"abc");
        assert_eq!(d.to_string(), "a9993e364706816aba3e25717850c26c9cd0d89d");
    }

    #[test]
    fn empty_input_vector() {
        let d = ContentDigest::from_bytes(b"");
        assert_eq!(d.to_string(), "da39a3ee5e6b4b0d3255bfef95601890afd80709");
    }

    #[test]
    fn raw_roundtrip() {
        let d = ContentDigest::from_bytes(b"bitcode");
        assert_eq!(ContentDigest::from_raw(*d.as_bytes()), d);
    }

    #[test]
    fn debug_abbreviated() {
        let d = ContentDigest::from_bytes(b"abc");
        assert_eq!(format!("{d:?}"), "ContentDigest(a9993e36..)");
    }

    #[test]
    fn serde_roundtrip() {
        let d = ContentDigest::from_bytes(b"serde test");
        let json = serde_json::to_string(&d).unwrap();
        let back: ContentDigest = serde_json::from_str(&json).unwrap();
        assert_eq!(d, back);
    }
}
