//! Locating and loading `bcc.toml`, plus the commands that only report what
//! the configuration resolves to.

use std::path::{Path, PathBuf};

use bcc_config::linker::effective_z_options;
use bcc_config::{BccConfig, LinkerConfig, RenameMap, CONFIG_FILE};

use crate::GlobalArgs;

/// A loaded configuration and the directory it was found in.
pub struct Project {
    /// Directory containing `bcc.toml`.
    pub root: PathBuf,
    /// Parsed and validated configuration.
    pub config: BccConfig,
}

impl Project {
    /// Cache directory, with relative paths taken from the project root.
    pub fn cache_dir(&self) -> PathBuf {
        self.root.join(&self.config.cache.dir)
    }
}

/// Walks up from `start` looking for a directory containing `bcc.toml`.
pub fn find_project_root(start: &Path) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let mut current = start.to_path_buf();
    loop {
        if current.join(CONFIG_FILE).exists() {
            return Ok(current);
        }
        if !current.pop() {
            return Err(format!(
                "could not find {CONFIG_FILE} in {} or any parent directory",
                start.display()
            )
            .into());
        }
    }
}

/// Loads the configuration named by `--config`, or the nearest `bcc.toml`
/// above the current directory.
pub fn load_project(global: &GlobalArgs) -> Result<Project, Box<dyn std::error::Error>> {
    let (root, config_path) = match global.config {
        Some(ref config_path) => {
            let p = PathBuf::from(config_path);
            if p.is_dir() {
                (p.clone(), p.join(CONFIG_FILE))
            } else {
                let root = p
                    .parent()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| PathBuf::from("."));
                (root, p)
            }
        }
        None => {
            let root = find_project_root(&std::env::current_dir()?)?;
            let path = root.join(CONFIG_FILE);
            (root, path)
        }
    };

    let config = bcc_config::load_config(&config_path)
        .map_err(|e| format!("{}: {e}", config_path.display()))?;
    tracing::debug!(config = %config_path.display(), "loaded configuration");
    Ok(Project { root, config })
}

/// Runs `bccache signature`.
pub fn print_signature(global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let project = load_project(global)?;
    let signature = bcc_config::toolchain_signature(&project.config)?;
    println!("{signature}");
    Ok(0)
}

/// Runs `bccache path`.
pub fn print_path(res_name: &str, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let project = load_project(global)?;
    let path = bcc_config::resolve_cache_path(&project.cache_dir(), res_name)?;
    println!("{}", path.display());
    Ok(0)
}

/// Runs `bccache linker`.
pub fn print_linker(global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let project = load_project(global)?;
    print!("{}", render_linker(&project.config.linker));
    Ok(0)
}

/// Renders the effective linker options, one per line.
fn render_linker(linker: &LinkerConfig) -> String {
    let mut out = String::new();
    if linker.shared {
        out.push_str("-shared\n");
    }
    if linker.bsymbolic {
        out.push_str("-Bsymbolic\n");
    }
    if let Some(ref soname) = linker.soname {
        out.push_str(&format!("-soname {soname}\n"));
    }
    if let Some(ref dyld) = linker.dyld {
        out.push_str(&format!("-dynamic-linker {dyld}\n"));
    }
    if let Some(ref sysroot) = linker.sysroot {
        out.push_str(&format!("--sysroot={}\n", sysroot.display()));
    }
    for dir in &linker.search_dirs {
        out.push_str(&format!("-L{}\n", dir.display()));
    }
    for opt in effective_z_options(&linker.z) {
        out.push_str(&format!("-z {opt}\n"));
    }
    for (from, to) in RenameMap::from_linker(linker).iter() {
        out.push_str(&format!("--defsym={from}={to}\n"));
    }
    out
}
