//! Configuration types deserialized from `bcc.toml`.

use serde::Deserialize;
use std::path::PathBuf;

/// The top-level configuration parsed from `bcc.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct BccConfig {
    /// Where cache files live and whether lookups are bypassed.
    #[serde(default)]
    pub cache: CacheSettings,
    /// Compiler identity and code generation flags.
    pub toolchain: ToolchainConfig,
    /// Native linker settings.
    #[serde(default)]
    pub linker: LinkerConfig,
}

/// Cache placement and behavior.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheSettings {
    /// Directory holding one cache file per source unit.
    #[serde(default = "default_cache_dir")]
    pub dir: PathBuf,
    /// Treat every lookup as a miss while still storing fresh results.
    #[serde(default)]
    pub bypass: bool,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            dir: default_cache_dir(),
            bypass: false,
        }
    }
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from(".bcc-cache")
}

/// Compiler settings that affect generated code.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolchainConfig {
    /// Compiler version string (e.g. "bcc-3.1").
    pub compiler_version: String,
    /// Target triple (e.g. "armv7-none-linux-gnueabi").
    pub triple: String,
    /// Optimization level, 0 through 3.
    #[serde(default = "default_opt_level")]
    pub opt_level: u8,
    /// Extra code generation flags, order-significant.
    #[serde(default)]
    pub flags: Vec<String>,
}

fn default_opt_level() -> u8 {
    2
}

/// Native linker settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LinkerConfig {
    /// Produce a shared object.
    #[serde(default)]
    pub shared: bool,
    /// Bind global references within the shared object.
    #[serde(default)]
    pub bsymbolic: bool,
    /// `DT_SONAME` of the output.
    #[serde(default)]
    pub soname: Option<String>,
    /// Dynamic linker path.
    #[serde(default)]
    pub dyld: Option<String>,
    /// System root for library lookup.
    #[serde(default)]
    pub sysroot: Option<PathBuf>,
    /// Library search directories, in lookup order.
    #[serde(default)]
    pub search_dirs: Vec<PathBuf>,
    /// Symbols routed through `__wrap_<sym>`.
    #[serde(default)]
    pub wrap: Vec<String>,
    /// Symbols routed through `<sym>_portable`.
    #[serde(default)]
    pub portable: Vec<String>,
    /// `-z` keyword switches.
    #[serde(default)]
    pub z: ZFlags,
}

/// Boolean form of the linker's `-z` keywords.
///
/// Paired switches (`comb_reloc`, `exec_stack`, `relro`, `lazy`) always
/// produce one of their two keywords; see [`crate::linker`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ZFlags {
    /// `combreloc` when set, `nocombreloc` otherwise.
    pub comb_reloc: bool,
    /// `defs`.
    pub defs: bool,
    /// `execstack` when set, `noexecstack` otherwise.
    pub exec_stack: bool,
    /// `initfirst`.
    pub init_first: bool,
    /// `interpose`.
    pub interpose: bool,
    /// `loadfltr`.
    pub load_fltr: bool,
    /// `muldefs`.
    pub mul_defs: bool,
    /// `nocopyreloc`.
    pub no_copy_reloc: bool,
    /// `nodefaultlib`.
    pub no_default_lib: bool,
    /// `nodelete`.
    pub no_delete: bool,
    /// `nodlopen`.
    pub no_dlopen: bool,
    /// `nodump`.
    pub no_dump: bool,
    /// `relro` when set, `norelro` otherwise.
    pub relro: bool,
    /// `lazy` when set, `now` otherwise.
    pub lazy: bool,
    /// `origin`.
    pub origin: bool,
}

impl Default for ZFlags {
    fn default() -> Self {
        Self {
            comb_reloc: true,
            defs: false,
            exec_stack: false,
            init_first: false,
            interpose: false,
            load_fltr: false,
            mul_defs: false,
            no_copy_reloc: false,
            no_default_lib: false,
            no_delete: false,
            no_dlopen: false,
            no_dump: false,
            relro: true,
            lazy: true,
            origin: false,
        }
    }
}
