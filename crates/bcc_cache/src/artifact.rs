//! In-memory form of a compiled script.
//!
//! A [`CompiledArtifact`] is produced either by the external compiler/linker
//! or by decoding a cache entry; both paths yield the same shape. Offsets in
//! the symbol, relocation and function tables index into `code`.

use serde::Serialize;

use crate::codec::Section;
use crate::error::DecodeError;

/// Whether an exported symbol names code or data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolKind {
    /// An exported function.
    Function,
    /// An exported global variable.
    Variable,
}

impl SymbolKind {
    pub(crate) fn to_tag(self) -> u32 {
        match self {
            SymbolKind::Function => 0,
            SymbolKind::Variable => 1,
        }
    }

    pub(crate) fn from_tag(tag: u32) -> Option<Self> {
        match tag {
            0 => Some(SymbolKind::Function),
            1 => Some(SymbolKind::Variable),
            _ => None,
        }
    }
}

/// A symbol exported by the script, located at `offset` within the code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportedSymbol {
    /// Symbol name.
    pub name: String,
    /// Code or data.
    pub kind: SymbolKind,
    /// Byte offset into the code.
    pub offset: u64,
}

/// A relocation the loader must apply when mapping the code.
///
/// `symbol` names the dependency the site refers to, either another symbol
/// of this artifact or one the runtime must provide.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Relocation {
    /// Byte offset of the patched site in the code.
    pub offset: u64,
    /// Target-specific relocation type.
    pub kind: u32,
    /// Referenced symbol.
    pub symbol: String,
    /// Constant added to the resolved address.
    pub addend: i64,
}

/// Extent of one compiled function within the code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunctionRange {
    /// Function name.
    pub name: String,
    /// Byte offset of the first instruction.
    pub offset: u64,
    /// Length in bytes.
    pub len: u64,
}

/// A `#pragma` key/value pair recorded by the front end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Pragma {
    /// Pragma name.
    pub key: String,
    /// Pragma value, possibly empty.
    pub value: String,
}

/// Machine code plus the metadata needed to map and run it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompiledArtifact {
    /// Relocatable machine code.
    pub code: Vec<u8>,
    /// Exported symbols in declaration order.
    pub symbols: Vec<ExportedSymbol>,
    /// Relocation and dependency descriptors.
    pub relocations: Vec<Relocation>,
    /// Function extents.
    pub functions: Vec<FunctionRange>,
    /// Pragmas in source order.
    pub pragmas: Vec<Pragma>,
}

impl CompiledArtifact {
    /// Looks up an exported symbol's code offset by name.
    pub fn lookup(&self, name: &str) -> Option<u64> {
        self.symbols
            .iter()
            .find(|s| s.name == name)
            .map(|s| s.offset)
    }

    /// Exported variables in declaration order.
    pub fn export_vars(&self) -> impl Iterator<Item = &ExportedSymbol> {
        self.symbols
            .iter()
            .filter(|s| s.kind == SymbolKind::Variable)
    }

    /// Exported functions in declaration order.
    pub fn export_funcs(&self) -> impl Iterator<Item = &ExportedSymbol> {
        self.symbols
            .iter()
            .filter(|s| s.kind == SymbolKind::Function)
    }

    /// Pragmas in source order.
    pub fn pragmas(&self) -> &[Pragma] {
        &self.pragmas
    }

    /// Names of all compiled functions.
    pub fn function_names(&self) -> impl Iterator<Item = &str> {
        self.functions.iter().map(|f| f.name.as_str())
    }

    /// Returns the machine code of the named function.
    pub fn function_binary(&self, name: &str) -> Option<&[u8]> {
        let f = self.functions.iter().find(|f| f.name == name)?;
        let start = usize::try_from(f.offset).ok()?;
        let end = start.checked_add(usize::try_from(f.len).ok()?)?;
        self.code.get(start..end)
    }

    /// Checks that every table entry points inside `code`.
    ///
    /// Symbol offsets may equal the code length (an empty trailing symbol);
    /// relocation sites must lie strictly inside it.
    pub fn validate(&self) -> Result<(), DecodeError> {
        let limit = self.code.len() as u64;
        for sym in &self.symbols {
            if sym.offset > limit {
                return Err(DecodeError::BadOffset {
                    section: Section::Symbols,
                    offset: sym.offset,
                    limit,
                });
            }
        }
        for reloc in &self.relocations {
            if reloc.offset >= limit {
                return Err(DecodeError::BadOffset {
                    section: Section::Relocations,
                    offset: reloc.offset,
                    limit,
                });
            }
        }
        for func in &self.functions {
            let end = func.offset.checked_add(func.len).unwrap_or(u64::MAX);
            if end > limit {
                return Err(DecodeError::BadOffset {
                    section: Section::Functions,
                    offset: end,
                    limit,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// A small artifact exercising every table.
    pub(crate) fn sample_artifact() -> CompiledArtifact {
        CompiledArtifact {
            code: (0u8..64).collect(),
            symbols: vec![
                ExportedSymbol {
                    name: "root".to_string(),
                    kind: SymbolKind::Function,
                    offset: 0,
                },
                ExportedSymbol {
                    name: "gColor".to_string(),
                    kind: SymbolKind::Variable,
                    offset: 48,
                },
                ExportedSymbol {
                    name: "init".to_string(),
                    kind: SymbolKind::Function,
                    offset: 32,
                },
            ],
            relocations: vec![Relocation {
                offset: 12,
                kind: 2,
                symbol: "rsGetAllocation".to_string(),
                addend: -4,
            }],
            functions: vec![
                FunctionRange {
                    name: "root".to_string(),
                    offset: 0,
                    len: 32,
                },
                FunctionRange {
                    name: "init".to_string(),
                    offset: 32,
                    len: 16,
                },
            ],
            pragmas: vec![
                Pragma {
                    key: "version".to_string(),
                    value: "1".to_string(),
                },
                Pragma {
                    key: "stateFragment".to_string(),
                    value: String::new(),
                },
            ],
        }
    }

    #[test]
    fn lookup_by_name() {
        let a = sample_artifact();
        assert_eq!(a.lookup("init"), Some(32));
        assert_eq!(a.lookup("gColor"), Some(48));
        assert_eq!(a.lookup("missing"), None);
    }

    #[test]
    fn exports_split_by_kind() {
        let a = sample_artifact();
        let funcs: Vec<&str> = a.export_funcs().map(|s| s.name.as_str()).collect();
        let vars: Vec<&str> = a.export_vars().map(|s| s.name.as_str()).collect();
        assert_eq!(funcs, vec!["root", "init"]);
        assert_eq!(vars, vec!["gColor"]);
    }

    #[test]
    fn function_binary_slices_code() {
        let a = sample_artifact();
        let init = a.function_binary("init").unwrap();
        assert_eq!(init.len(), 16);
        assert_eq!(init[0], 32);
        assert!(a.function_binary("nope").is_none());
        assert_eq!(a.function_names().collect::<Vec<_>>(), vec!["root", "init"]);
    }

    #[test]
    fn pragmas_in_order() {
        let a = sample_artifact();
        assert_eq!(a.pragmas()[0].key, "version");
        assert_eq!(a.pragmas()[1].value, "");
    }

    #[test]
    fn sample_is_valid() {
        assert!(sample_artifact().validate().is_ok());
        assert!(CompiledArtifact::default().validate().is_ok());
    }

    #[test]
    fn symbol_past_end_rejected() {
        let mut a = sample_artifact();
        a.symbols[0].offset = 65;
        assert!(matches!(
            a.validate(),
            Err(DecodeError::BadOffset {
                section: Section::Symbols,
                ..
            })
        ));
    }

    #[test]
    fn relocation_at_end_rejected() {
        let mut a = sample_artifact();
        a.relocations[0].offset = 64;
        assert!(matches!(
            a.validate(),
            Err(DecodeError::BadOffset {
                section: Section::Relocations,
                ..
            })
        ));
    }

    #[test]
    fn function_overflow_rejected() {
        let mut a = sample_artifact();
        a.functions[1].len = u64::MAX;
        assert!(matches!(
            a.validate(),
            Err(DecodeError::BadOffset {
                section: Section::Functions,
                ..
            })
        ));
    }

    #[test]
    fn symbol_kind_tags() {
        for kind in [SymbolKind::Function, SymbolKind::Variable] {
            assert_eq!(SymbolKind::from_tag(kind.to_tag()), Some(kind));
        }
        assert_eq!(SymbolKind::from_tag(9), None);
    }
}
