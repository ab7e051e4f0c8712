//! Cache file path resolution.

use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Extension of cache files. Temporaries written beside them never use it.
pub const CACHE_FILE_EXT: &str = "oBCC";

/// Maps a resource name to its cache file inside `cache_dir`.
///
/// Path separators and `:` are replaced by `@` so every resource lands
/// directly in `cache_dir`, one file per source unit.
pub fn resolve_cache_path(cache_dir: &Path, res_name: &str) -> Result<PathBuf, ConfigError> {
    let trimmed = res_name.trim_start_matches(['/', '\\']);
    if trimmed.is_empty() || trimmed == "." || trimmed == ".." {
        return Err(ConfigError::InvalidResourceName(res_name.to_string()));
    }
    let flattened: String = trimmed
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' => '@',
            other => other,
        })
        .collect();
    Ok(cache_dir.join(format!("{flattened}.{CACHE_FILE_EXT}")))
}
