//! `bccache verify`: check an entry against a source file and the current
//! toolchain configuration.

use std::path::Path;

use bcc_cache::{CacheEntry, CacheReader, Miss, SourceFingerprint, SourceOrigin};
use bcc_common::ToolchainSignature;

use crate::project::load_project;
use crate::{GlobalArgs, VerifyArgs};

/// Runs the `bccache verify` command.
///
/// Returns exit code 0 on a hit and 1 on a miss. Only an unreadable source
/// or configuration is an error.
pub fn run(args: &VerifyArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let project = load_project(global)?;
    let toolchain = bcc_config::toolchain_signature(&project.config)?;

    match check(Path::new(&args.file), Path::new(&args.source), &toolchain)? {
        Ok(entry) => {
            if !global.quiet {
                println!(
                    "hit: {} ({} bytes of code)",
                    args.file,
                    entry.artifact.code.len()
                );
                if global.verbose {
                    println!("  toolchain {}", entry.header.fingerprint.toolchain);
                }
            }
            Ok(0)
        }
        Err(miss) => {
            if !global.quiet {
                println!("miss: {miss}");
            }
            Ok(1)
        }
    }
}

/// Fingerprints `source` and tries to load `entry` with it.
fn check(
    entry: &Path,
    source: &Path,
    toolchain: &ToolchainSignature,
) -> Result<Result<CacheEntry, Miss>, Box<dyn std::error::Error>> {
    let bytes = std::fs::read(source).map_err(|e| format!("{}: {e}", source.display()))?;
    let fingerprint = SourceFingerprint::build(&bytes, SourceOrigin::File(source), toolchain)?;
    Ok(CacheReader::new().try_load(entry, &fingerprint))
}
