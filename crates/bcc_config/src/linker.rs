//! Linker option expansion.
//!
//! Turns the declarative [`LinkerConfig`] into the concrete option lists the
//! native linker consumes: the effective `-z` keywords and the symbol rename
//! map produced by `wrap`/`portable` entries. Both feed the toolchain
//! signature, so their ordering is deterministic.

use std::collections::BTreeMap;
use std::fmt;

use crate::types::{LinkerConfig, ZFlags};

/// A single `-z` keyword passed to the linker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZOption {
    /// `combreloc`.
    CombReloc,
    /// `nocombreloc`.
    NoCombReloc,
    /// `defs`.
    Defs,
    /// `execstack`.
    ExecStack,
    /// `noexecstack`.
    NoExecStack,
    /// `initfirst`.
    InitFirst,
    /// `interpose`.
    InterPose,
    /// `loadfltr`.
    LoadFltr,
    /// `muldefs`.
    MulDefs,
    /// `nocopyreloc`.
    NoCopyReloc,
    /// `nodefaultlib`.
    NoDefaultLib,
    /// `nodelete`.
    NoDelete,
    /// `nodlopen`.
    NoDlOpen,
    /// `nodump`.
    NoDump,
    /// `relro`.
    Relro,
    /// `norelro`.
    NoRelro,
    /// `lazy`.
    Lazy,
    /// `now`.
    Now,
    /// `origin`.
    Origin,
}

impl ZOption {
    /// The keyword as written after `-z` on a linker command line.
    pub fn keyword(self) -> &'static str {
        match self {
            ZOption::CombReloc => "combreloc",
            ZOption::NoCombReloc => "nocombreloc",
            ZOption::Defs => "defs",
            ZOption::ExecStack => "execstack",
            ZOption::NoExecStack => "noexecstack",
            ZOption::InitFirst => "initfirst",
            ZOption::InterPose => "interpose",
            ZOption::LoadFltr => "loadfltr",
            ZOption::MulDefs => "muldefs",
            ZOption::NoCopyReloc => "nocopyreloc",
            ZOption::NoDefaultLib => "nodefaultlib",
            ZOption::NoDelete => "nodelete",
            ZOption::NoDlOpen => "nodlopen",
            ZOption::NoDump => "nodump",
            ZOption::Relro => "relro",
            ZOption::NoRelro => "norelro",
            ZOption::Lazy => "lazy",
            ZOption::Now => "now",
            ZOption::Origin => "origin",
        }
    }
}

impl fmt::Display for ZOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// Expands `-z` switches into the keyword list, in linker registration order.
///
/// Paired switches always contribute exactly one keyword of their pair.
pub fn effective_z_options(z: &ZFlags) -> Vec<ZOption> {
    let mut opts = Vec::new();
    opts.push(if z.comb_reloc {
        ZOption::CombReloc
    } else {
        ZOption::NoCombReloc
    });
    if z.defs {
        opts.push(ZOption::Defs);
    }
    opts.push(if z.exec_stack {
        ZOption::ExecStack
    } else {
        ZOption::NoExecStack
    });

    let singles = [
        (z.init_first, ZOption::InitFirst),
        (z.interpose, ZOption::InterPose),
        (z.load_fltr, ZOption::LoadFltr),
        (z.mul_defs, ZOption::MulDefs),
        (z.no_copy_reloc, ZOption::NoCopyReloc),
        (z.no_default_lib, ZOption::NoDefaultLib),
        (z.no_delete, ZOption::NoDelete),
        (z.no_dlopen, ZOption::NoDlOpen),
        (z.no_dump, ZOption::NoDump),
    ];
    opts.extend(singles.iter().filter(|(on, _)| *on).map(|(_, o)| *o));

    opts.push(if z.relro { ZOption::Relro } else { ZOption::NoRelro });
    opts.push(if z.lazy { ZOption::Lazy } else { ZOption::Now });
    if z.origin {
        opts.push(ZOption::Origin);
    }
    opts
}

/// Symbol rename rules applied by the linker, keyed by original name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenameMap {
    rules: BTreeMap<String, String>,
}

impl RenameMap {
    /// Builds the rename map for a linker configuration.
    ///
    /// Wrapped symbols are registered before portable ones. Re-registering a
    /// name logs a warning and the later rule replaces the earlier one.
    pub fn from_linker(config: &LinkerConfig) -> Self {
        let mut map = Self::default();
        for sym in &config.wrap {
            map.insert(sym, format!("__wrap_{sym}"));
            map.insert(&format!("__real_{sym}"), sym.clone());
        }
        for sym in &config.portable {
            map.insert(sym, format!("{sym}_portable"));
            map.insert(&format!("__real_{sym}"), sym.clone());
        }
        map
    }

    fn insert(&mut self, from: &str, to: String) {
        if let Some(previous) = self.rules.insert(from.to_string(), to.clone()) {
            tracing::warn!(symbol = from, %previous, replacement = %to, "symbol rename rule registered twice");
        }
    }

    /// Returns the replacement name for `symbol`, if any.
    pub fn get(&self, symbol: &str) -> Option<&str> {
        self.rules.get(symbol).map(String::as_str)
    }

    /// Iterates over `(from, to)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.rules.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of rename rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns `true` if no rules are registered.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
