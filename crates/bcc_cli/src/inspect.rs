//! `bccache inspect`: decode a cache entry and summarize it.

use bcc_cache::{CompiledArtifact, EntryHeader};

use crate::{GlobalArgs, InspectArgs, ReportFormat};

/// Runs the `bccache inspect` command.
///
/// Returns exit code 0 when the entry decodes. A file that is not a valid
/// entry is reported as an error.
pub fn run(args: &InspectArgs, _global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let bytes = std::fs::read(&args.file).map_err(|e| format!("{}: {e}", args.file))?;
    let (header, artifact) =
        bcc_cache::decode(&bytes).map_err(|e| format!("{}: {e}", args.file))?;

    match args.format {
        ReportFormat::Text => print!("{}", render_text(&header, &artifact)),
        ReportFormat::Json => {
            let json = render_json(&header, &artifact);
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
    }
    Ok(0)
}

fn render_text(header: &EntryHeader, artifact: &CompiledArtifact) -> String {
    let fp = &header.fingerprint;
    let mut out = String::new();
    out.push_str(&format!("format       v{}\n", header.version));
    out.push_str(&format!("toolchain    {}\n", fp.toolchain));
    out.push_str(&format!("digest       {}\n", fp.content_digest));
    out.push_str(&format!("source crc   {:#010x}\n", fp.crc32));
    out.push_str(&format!("mod time     {}\n", fp.mod_time));
    out.push_str(&format!(
        "payload      {} bytes (crc {:#010x})\n",
        header.payload_len, header.payload_checksum
    ));
    out.push_str(&format!("code         {} bytes\n", artifact.code.len()));

    out.push_str(&format!("symbols      {}\n", artifact.symbols.len()));
    for sym in &artifact.symbols {
        let kind = match sym.kind {
            bcc_cache::SymbolKind::Function => "func",
            bcc_cache::SymbolKind::Variable => "var ",
        };
        out.push_str(&format!("  {kind} {:#08x} {}\n", sym.offset, sym.name));
    }
    out.push_str(&format!("relocations  {}\n", artifact.relocations.len()));
    for rel in &artifact.relocations {
        out.push_str(&format!(
            "  {:#08x} type {} {}{:+}\n",
            rel.offset, rel.kind, rel.symbol, rel.addend
        ));
    }
    out.push_str(&format!("functions    {}\n", artifact.functions.len()));
    for func in &artifact.functions {
        out.push_str(&format!(
            "  {:#08x} {:>6} {}\n",
            func.offset, func.len, func.name
        ));
    }
    out.push_str(&format!("pragmas      {}\n", artifact.pragmas.len()));
    for pragma in artifact.pragmas() {
        out.push_str(&format!("  {} = {:?}\n", pragma.key, pragma.value));
    }
    out
}

fn render_json(header: &EntryHeader, artifact: &CompiledArtifact) -> serde_json::Value {
    let fp = &header.fingerprint;
    serde_json::json!({
        "version": header.version,
        "fingerprint": {
            "toolchain": fp.toolchain.to_string(),
            "content_digest": fp.content_digest.to_string(),
            "crc32": fp.crc32,
            "mod_time": fp.mod_time,
        },
        "payload": {
            "len": header.payload_len,
            "checksum": header.payload_checksum,
        },
        "code_len": artifact.code.len(),
        "symbols": artifact.symbols,
        "relocations": artifact.relocations,
        "functions": artifact.functions,
        "pragmas": artifact.pragmas,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bcc_cache::{
        ExportedSymbol, FunctionRange, Pragma, Relocation, SourceFingerprint, SourceOrigin,
        SymbolKind,
    };
    use bcc_common::ToolchainSignature;

    fn entry() -> (Vec<u8>, SourceFingerprint) {
        let artifact = CompiledArtifact {
            code: vec![0u8; 48],
            symbols: vec![
                ExportedSymbol {
                    name: "root".to_string(),
                    kind: SymbolKind::Function,
                    offset: 0,
                },
                ExportedSymbol {
                    name: "gColor".to_string(),
                    kind: SymbolKind::Variable,
                    offset: 40,
                },
            ],
            relocations: vec![Relocation {
                offset: 8,
                kind: 2,
                symbol: "rsDebug".to_string(),
                addend: -4,
            }],
            functions: vec![FunctionRange {
                name: "root".to_string(),
                offset: 0,
                len: 40,
            }],
            pragmas: vec![Pragma {
                key: "version".to_string(),
                value: "1".to_string(),
            }],
        };
        let sig = ToolchainSignature::new("bcc-3.1/armv7/abcd").unwrap();
        let fp = SourceFingerprint::build(b"bitcode", SourceOrigin::ModTime(1700000000), &sig)
            .unwrap();
        (bcc_cache::encode(&artifact, &fp).unwrap(), fp)
    }

    #[test]
    fn text_summary() {
        let (bytes, fp) = entry();
        let (header, artifact) = bcc_cache::decode(&bytes).unwrap();
        let text = render_text(&header, &artifact);
        assert!(text.starts_with("format       v1\n"));
        assert!(text.contains("toolchain    bcc-3.1/armv7/abcd\n"));
        assert!(text.contains(&format!("digest       {}\n", fp.content_digest)));
        assert!(text.contains("mod time     1700000000\n"));
        assert!(text.contains("code         48 bytes\n"));
        assert!(text.contains("symbols      2\n"));
        assert!(text.contains("func 0x000000 root\n"));
        assert!(text.contains("var  0x000028 gColor\n"));
        assert!(text.contains("type 2 rsDebug-4\n"));
        assert!(text.contains("version = \"1\"\n"));
    }

    #[test]
    fn json_summary() {
        let (bytes, fp) = entry();
        let (header, artifact) = bcc_cache::decode(&bytes).unwrap();
        let json = render_json(&header, &artifact);
        assert_eq!(json["version"], 1);
        assert_eq!(json["fingerprint"]["toolchain"], "bcc-3.1/armv7/abcd");
        assert_eq!(json["fingerprint"]["crc32"], fp.crc32);
        assert_eq!(json["code_len"], 48);
        assert_eq!(json["symbols"][1]["name"], "gColor");
        assert_eq!(json["symbols"][1]["kind"], "variable");
        assert_eq!(json["relocations"][0]["addend"], -4);
        assert_eq!(json["functions"][0]["len"], 40);
        assert_eq!(json["payload"]["len"], header.payload_len);
    }

    #[test]
    fn run_rejects_foreign_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "plain text, not a cache entry at all........").unwrap();
        let args = InspectArgs {
            file: path.to_str().unwrap().to_string(),
            format: ReportFormat::Text,
        };
        let global = GlobalArgs {
            quiet: true,
            verbose: false,
            config: None,
        };
        let err = run(&args, &global).unwrap_err();
        assert!(err.to_string().contains("notes.txt"));
    }

    #[test]
    fn run_accepts_valid_entry() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fx.oBCC");
        std::fs::write(&path, entry().0).unwrap();
        let args = InspectArgs {
            file: path.to_str().unwrap().to_string(),
            format: ReportFormat::Json,
        };
        let global = GlobalArgs {
            quiet: true,
            verbose: false,
            config: None,
        };
        assert_eq!(run(&args, &global).unwrap(), 0);
    }
}
