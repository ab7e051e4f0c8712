//! Parsing and validation of `bcc.toml` cache configuration files.
//!
//! This crate reads the configuration handed to the cache by its caller and
//! produces a strongly-typed [`BccConfig`], the toolchain signature derived
//! from it, and the per-source cache file path.

#![warn(missing_docs)]

pub mod error;
pub mod linker;
pub mod loader;
pub mod resolve;
pub mod signature;
pub mod types;

pub use error::ConfigError;
pub use linker::{RenameMap, ZOption};
pub use loader::{load_config, load_config_from_str, CONFIG_FILE};
pub use resolve::{resolve_cache_path, CACHE_FILE_EXT};
pub use signature::toolchain_signature;
pub use types::*;
