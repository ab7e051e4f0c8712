//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::BccConfig;
use std::path::Path;

/// Conventional configuration file name.
pub const CONFIG_FILE: &str = "bcc.toml";

/// Loads and validates a `bcc.toml` configuration file.
///
/// `path` may name the file itself or a directory containing `bcc.toml`.
pub fn load_config(path: &Path) -> Result<BccConfig, ConfigError> {
    let config_path = if path.is_dir() {
        path.join(CONFIG_FILE)
    } else {
        path.to_path_buf()
    };
    let content = std::fs::read_to_string(&config_path)?;
    load_config_from_str(&content)
}

/// Parses and validates a `bcc.toml` configuration from a string.
pub fn load_config_from_str(content: &str) -> Result<BccConfig, ConfigError> {
    let config: BccConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Validates that required fields are present and values are in range.
fn validate_config(config: &BccConfig) -> Result<(), ConfigError> {
    if config.toolchain.compiler_version.is_empty() {
        return Err(ConfigError::MissingField(
            "toolchain.compiler_version".to_string(),
        ));
    }
    if config.toolchain.triple.is_empty() {
        return Err(ConfigError::MissingField("toolchain.triple".to_string()));
    }
    if config.toolchain.opt_level > 3 {
        return Err(ConfigError::ValidationError(format!(
            "toolchain.opt_level must be 0..=3, got {}",
            config.toolchain.opt_level
        )));
    }
    if config.cache.dir.as_os_str().is_empty() {
        return Err(ConfigError::MissingField("cache.dir".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn parse_minimal_config() {
        let toml = r#"
[toolchain]
compiler_version = "bcc-3.1"
triple = "armv7-none-linux-gnueabi"
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.toolchain.compiler_version, "bcc-3.1");
        assert_eq!(config.toolchain.opt_level, 2);
        assert_eq!(config.cache.dir, PathBuf::from(".bcc-cache"));
        assert!(!config.cache.bypass);
        assert!(!config.linker.shared);
        assert!(config.linker.z.lazy);
    }

    #[test]
    fn parse_full_config() {
        let toml = r#"
[cache]
dir = "/data/bcc"
bypass = true

[toolchain]
compiler_version = "bcc-3.1"
triple = "armv7-none-linux-gnueabi"
opt_level = 3
flags = ["-mfpu=neon"]

[linker]
shared = true
bsymbolic = true
soname = "librs.so"
dyld = "/system/bin/linker"
sysroot = "/system"
search_dirs = ["/system/lib", "/vendor/lib"]
wrap = ["malloc"]
portable = ["memcpy"]

[linker.z]
defs = true
relro = false
"#;
        let config = load_config_from_str(toml).unwrap();
        assert!(config.cache.bypass);
        assert_eq!(config.cache.dir, PathBuf::from("/data/bcc"));
        assert_eq!(config.toolchain.flags, vec!["-mfpu=neon"]);
        assert!(config.linker.shared);
        assert_eq!(config.linker.soname.as_deref(), Some("librs.so"));
        assert_eq!(config.linker.search_dirs.len(), 2);
        assert!(config.linker.z.defs);
        assert!(!config.linker.z.relro);
        assert!(config.linker.z.comb_reloc);
    }

    #[test]
    fn missing_toolchain_table_is_parse_error() {
        let err = load_config_from_str("[cache]\nbypass = true\n").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn empty_compiler_version_rejected() {
        let toml = r#"
[toolchain]
compiler_version = ""
triple = "armv7"
"#;
        let err = load_config_from_str(toml).unwrap_err();
        assert!(
            matches!(err, ConfigError::MissingField(ref f) if f == "toolchain.compiler_version")
        );
    }

    #[test]
    fn empty_triple_rejected() {
        let toml = r#"
[toolchain]
compiler_version = "bcc-3.1"
triple = ""
"#;
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::MissingField(ref f) if f == "toolchain.triple"));
    }

    #[test]
    fn opt_level_out_of_range() {
        let toml = r#"
[toolchain]
compiler_version = "bcc-3.1"
triple = "armv7"
opt_level = 4
"#;
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn empty_cache_dir_rejected() {
        let toml = r#"
[cache]
dir = ""

[toolchain]
compiler_version = "bcc-3.1"
triple = "armv7"
"#;
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::MissingField(ref f) if f == "cache.dir"));
    }

    #[test]
    fn load_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            "[toolchain]\ncompiler_version = \"bcc-3.1\"\ntriple = \"x86_64\"\n",
        )
        .unwrap();
        let config = load_config(dir.path()).unwrap();
        assert_eq!(config.toolchain.triple, "x86_64");
    }

    #[test]
    fn load_from_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(
            &path,
            "[toolchain]\ncompiler_version = \"bcc-3.1\"\ntriple = \"arm\"\n",
        )
        .unwrap();
        let config = load_config(&path).unwrap();
        assert_eq!(config.toolchain.triple, "arm");
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::IoError(_)));
    }
}
