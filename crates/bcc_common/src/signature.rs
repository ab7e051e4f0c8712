//! Opaque toolchain signatures.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Upper bound on the encoded length of a [`ToolchainSignature`].
pub const MAX_SIGNATURE_LEN: usize = 4096;

/// Returned when a signature exceeds [`MAX_SIGNATURE_LEN`] bytes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("toolchain signature is {len} bytes, limit is {MAX_SIGNATURE_LEN}")]
pub struct SignatureTooLong {
    /// Length of the rejected signature.
    pub len: usize,
}

/// Identifies the compiler/linker version and the flags that affect output.
///
/// The cache treats it as opaque bytes: two entries built under different
/// signatures are never interchangeable, whatever the bytes mean.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ToolchainSignature(Vec<u8>);

impl ToolchainSignature {
    /// Wraps raw signature bytes.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Result<Self, SignatureTooLong> {
        let bytes = bytes.into();
        if bytes.len() > MAX_SIGNATURE_LEN {
            return Err(SignatureTooLong { len: bytes.len() });
        }
        Ok(Self(bytes))
    }

    /// Returns the raw signature bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns the signature length in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` for the empty signature.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ToolchainSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.0))
    }
}

impl fmt::Debug for ToolchainSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ToolchainSignature({:?})", String::from_utf8_lossy(&self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_bounded_signature() {
        let sig = ToolchainSignature::new("clang-3.1/armv7").unwrap();
        assert_eq!(sig.as_bytes(), b"clang-3.1/armv7");
        assert_eq!(sig.len(), 15);
        assert_eq!(sig.to_string(), "clang-3.1/armv7");
    }

    #[test]
    fn rejects_oversized_signature() {
        let err = ToolchainSignature::new(vec![b'x'; MAX_SIGNATURE_LEN + 1]).unwrap_err();
        assert_eq!(err.len, MAX_SIGNATURE_LEN + 1);
        assert!(err.to_string().contains("4096"));
    }

    #[test]
    fn limit_is_inclusive() {
        assert!(ToolchainSignature::new(vec![0u8; MAX_SIGNATURE_LEN]).is_ok());
    }

    #[test]
    fn empty_signature() {
        let sig = ToolchainSignature::new(Vec::new()).unwrap();
        assert!(sig.is_empty());
    }

    #[test]
    fn distinct_bytes_are_unequal() {
        let a = ToolchainSignature::new("t1").unwrap();
        let b = ToolchainSignature::new("t2").unwrap();
        assert_ne!(a, b);
    }
}
