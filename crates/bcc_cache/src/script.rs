//! Configured cache session for script loading.
//!
//! [`ScriptCache`] binds a cache directory, toolchain signature and options
//! from `bcc.toml` so callers load scripts by resource name alone.

use std::path::{Path, PathBuf};

use bcc_common::ToolchainSignature;
use bcc_config::{resolve_cache_path, toolchain_signature, BccConfig, ConfigError};

use crate::artifact::CompiledArtifact;
use crate::error::ResolveError;
use crate::policy::{CacheOptions, CachePolicy, SourceUnit};

/// A cache directory plus the toolchain it serves.
#[derive(Debug, Clone)]
pub struct ScriptCache {
    cache_dir: PathBuf,
    toolchain: ToolchainSignature,
    policy: CachePolicy,
}

impl ScriptCache {
    /// Creates a session from explicit settings.
    pub fn new(cache_dir: &Path, toolchain: ToolchainSignature, options: CacheOptions) -> Self {
        Self {
            cache_dir: cache_dir.to_path_buf(),
            toolchain,
            policy: CachePolicy::new(options),
        }
    }

    /// Creates a session from a loaded configuration.
    pub fn from_config(config: &BccConfig) -> Result<Self, ConfigError> {
        let toolchain = toolchain_signature(config)?;
        let options = CacheOptions {
            bypass: config.cache.bypass,
        };
        Ok(Self::new(&config.cache.dir, toolchain, options))
    }

    /// The toolchain signature entries are keyed to.
    pub fn toolchain(&self) -> &ToolchainSignature {
        &self.toolchain
    }

    /// The cache directory.
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Cache file path for a resource name.
    pub fn cache_path(&self, res_name: &str) -> Result<PathBuf, ConfigError> {
        resolve_cache_path(&self.cache_dir, res_name)
    }

    /// Loads the script named `res_name`, compiling on a cache miss.
    pub fn load<F, E>(
        &self,
        res_name: &str,
        source: SourceUnit<'_>,
        compile: F,
    ) -> Result<CompiledArtifact, ResolveError<E>>
    where
        F: FnOnce(&[u8]) -> Result<CompiledArtifact, E>,
    {
        let path = self.cache_path(res_name)?;
        self.policy.resolve(source, &self.toolchain, &path, compile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::tests::sample_artifact;
    use bcc_config::load_config_from_str;
    use std::cell::Cell;

    #[derive(Debug, thiserror::Error)]
    #[error("backend failure")]
    struct BackendError;

    fn config(dir: &Path, extra: &str) -> BccConfig {
        let toml = format!(
            "[cache]\ndir = {:?}\n{extra}\n[toolchain]\ncompiler_version = \"bcc-3.1\"\ntriple = \"armv7\"\n",
            dir.display().to_string()
        );
        load_config_from_str(&toml).unwrap()
    }

    #[test]
    fn from_config_uses_directory_and_signature() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path(), "");
        let cache = ScriptCache::from_config(&cfg).unwrap();
        assert_eq!(cache.cache_dir(), dir.path());
        assert_eq!(cache.toolchain(), &toolchain_signature(&cfg).unwrap());
        assert_eq!(
            cache.cache_path("app/fountain").unwrap(),
            dir.path().join("app@fountain.oBCC")
        );
    }

    #[test]
    fn load_caches_by_resource_name() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ScriptCache::from_config(&config(dir.path(), "")).unwrap();
        let calls = Cell::new(0);
        let compile = |_: &[u8]| {
            calls.set(calls.get() + 1);
            Ok::<_, BackendError>(sample_artifact())
        };
        let a = cache.load("fountain", SourceUnit::in_memory(b"bc"), compile).unwrap();
        let b = cache.load("fountain", SourceUnit::in_memory(b"bc"), compile).unwrap();
        assert_eq!(a, b);
        assert_eq!(calls.get(), 1);
        assert!(dir.path().join("fountain.oBCC").exists());
    }

    #[test]
    fn bypass_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ScriptCache::from_config(&config(dir.path(), "bypass = true")).unwrap();
        let calls = Cell::new(0);
        let compile = |_: &[u8]| {
            calls.set(calls.get() + 1);
            Ok::<_, BackendError>(sample_artifact())
        };
        cache.load("s", SourceUnit::in_memory(b"bc"), compile).unwrap();
        cache.load("s", SourceUnit::in_memory(b"bc"), compile).unwrap();
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn invalid_resource_name() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ScriptCache::from_config(&config(dir.path(), "")).unwrap();
        let err = cache
            .load("", SourceUnit::in_memory(b"bc"), |_| {
                Ok::<_, BackendError>(sample_artifact())
            })
            .unwrap_err();
        assert!(matches!(err, ResolveError::CachePath(_)));
    }
}
