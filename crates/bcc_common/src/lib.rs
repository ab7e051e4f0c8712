//! Shared foundational types used across the bitcode compilation cache.
//!
//! This crate provides the 160-bit content digest, the CRC-32 checksum used
//! for both source pre-checks and payload integrity, and the opaque toolchain
//! signature that keys cache entries to a compiler/linker configuration.

#![warn(missing_docs)]

pub mod crc;
pub mod digest;
pub mod signature;

pub use crc::{crc32, Crc32};
pub use digest::ContentDigest;
pub use signature::{SignatureTooLong, ToolchainSignature, MAX_SIGNATURE_LEN};
