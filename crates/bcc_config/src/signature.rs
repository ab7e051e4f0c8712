//! Toolchain signature derivation.
//!
//! Every setting that can change the compiled artifact is rendered into a
//! canonical text form and hashed. Cache placement settings never enter the
//! signature, so moving the cache directory does not invalidate entries.

use bcc_common::{ContentDigest, ToolchainSignature};

use crate::error::ConfigError;
use crate::linker::{effective_z_options, RenameMap};
use crate::types::BccConfig;

/// Derives the toolchain signature for a configuration.
///
/// The result reads `<compiler_version>/<triple>/<sha1 of canonical settings>`.
pub fn toolchain_signature(config: &BccConfig) -> Result<ToolchainSignature, ConfigError> {
    let canonical = canonical_settings(config);
    let digest = ContentDigest::from_bytes(canonical.as_bytes());
    let text = format!(
        "{}/{}/{}",
        config.toolchain.compiler_version, config.toolchain.triple, digest
    );
    ToolchainSignature::new(text).map_err(|e| ConfigError::ValidationError(e.to_string()))
}

/// Renders the signature-relevant settings, one `key=value` per line.
///
/// Every value is written as `<byte len>:<bytes>` and optional values are
/// tagged `none` or `some:`, so distinct settings never render alike.
fn canonical_settings(config: &BccConfig) -> String {
    let tc = &config.toolchain;
    let ld = &config.linker;
    let mut out = String::new();

    push_field(&mut out, "compiler", &tc.compiler_version);
    push_field(&mut out, "triple", &tc.triple);
    push_field(&mut out, "opt", &tc.opt_level.to_string());
    for flag in &tc.flags {
        push_field(&mut out, "flag", flag);
    }
    push_field(&mut out, "shared", &ld.shared.to_string());
    push_field(&mut out, "bsymbolic", &ld.bsymbolic.to_string());
    push_opt_field(&mut out, "soname", ld.soname.as_deref());
    push_opt_field(&mut out, "dyld", ld.dyld.as_deref());
    let sysroot = ld.sysroot.as_ref().map(|p| p.to_string_lossy());
    push_opt_field(&mut out, "sysroot", sysroot.as_deref());
    for dir in &ld.search_dirs {
        push_field(&mut out, "search", &dir.to_string_lossy());
    }
    for z in effective_z_options(&ld.z) {
        push_field(&mut out, "z", z.keyword());
    }
    for (from, to) in RenameMap::from_linker(ld).iter() {
        push_field(&mut out, "rename-from", from);
        push_field(&mut out, "rename-to", to);
    }
    out
}

fn push_field(out: &mut String, key: &str, value: &str) {
    out.push_str(&format!("{key}={}:{value}\n", value.len()));
}

fn push_opt_field(out: &mut String, key: &str, value: Option<&str>) {
    match value {
        Some(v) => out.push_str(&format!("{key}=some:{}:{v}\n", v.len())),
        None => out.push_str(&format!("{key}=none\n")),
    }
}
