//! On-disk compilation cache for the bitcode execution engine.
//!
//! A source unit is fingerprinted by content digest, modification time,
//! CRC-32 and toolchain signature. The fingerprint gates reuse of a cached
//! compiled artifact: the [`CacheReader`] validates a candidate file and
//! either returns the decoded artifact or a [`Miss`] with its reason, the
//! [`CacheWriter`] persists fresh artifacts atomically, and the
//! [`CachePolicy`] decides between reuse and recompilation.
//!
//! The cache is an optimization only. Bypassing it always yields an
//! equivalent artifact, just more slowly.

#![warn(missing_docs)]

pub mod artifact;
pub mod codec;
pub mod error;
pub mod fingerprint;
pub mod policy;
pub mod reader;
pub mod script;
pub mod writer;

pub use artifact::{CompiledArtifact, ExportedSymbol, FunctionRange, Pragma, Relocation, SymbolKind};
pub use codec::{decode, encode, EntryHeader, Section, FORMAT_VERSION, MAGIC};
pub use error::{DecodeError, EncodeError, FingerprintError, ResolveError, WriteError};
pub use fingerprint::{SourceFingerprint, SourceOrigin, StaleField};
pub use policy::{CacheOptions, CachePolicy, SourceUnit};
pub use reader::{CacheEntry, CacheReader, Miss};
pub use script::ScriptCache;
pub use writer::CacheWriter;
