//! `bccache`: inspect and check on-disk bitcode compilation cache entries.
//!
//! Provides `bccache inspect` for dumping an entry, `bccache verify` for
//! checking an entry against a source file, and `bccache signature`,
//! `bccache path` and `bccache linker` for showing what a `bcc.toml`
//! resolves to.

#![warn(missing_docs)]

mod inspect;
mod project;
mod verify;

use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

/// Bitcode compilation cache tool.
#[derive(Parser, Debug)]
#[command(name = "bccache", version, about = "Bitcode compilation cache tool")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose (debug-level) output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to a `bcc.toml` file or the directory containing it.
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Decode a cache entry and summarize its contents.
    Inspect(InspectArgs),
    /// Check whether a cache entry is a hit for a source file.
    Verify(VerifyArgs),
    /// Print the toolchain signature derived from the configuration.
    Signature,
    /// Print the cache file path for a resource name.
    Path {
        /// Resource name of the script (e.g. `fountain`).
        res_name: String,
    },
    /// Print the effective linker options from the configuration.
    Linker,
}

/// Arguments for the `bccache inspect` subcommand.
#[derive(Parser, Debug)]
pub struct InspectArgs {
    /// Cache entry to decode.
    pub file: String,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,
}

/// Arguments for the `bccache verify` subcommand.
#[derive(Parser, Debug)]
pub struct VerifyArgs {
    /// Cache entry to check.
    pub file: String,

    /// Bitcode file the entry should have been built from.
    #[arg(short, long)]
    pub source: String,
}

/// Report output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Human-readable terminal output.
    Text,
    /// Machine-readable JSON output.
    Json,
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// Whether to print verbose/debug information.
    pub verbose: bool,
    /// Optional path to a custom config file.
    pub config: Option<String>,
}

fn main() {
    let cli = Cli::parse();

    init_logging(cli.quiet, cli.verbose);

    let global = GlobalArgs {
        quiet: cli.quiet,
        verbose: cli.verbose,
        config: cli.config,
    };

    let result = match cli.command {
        Command::Inspect(ref args) => inspect::run(args, &global),
        Command::Verify(ref args) => verify::run(args, &global),
        Command::Signature => project::print_signature(&global),
        Command::Path { ref res_name } => project::print_path(res_name, &global),
        Command::Linker => project::print_linker(&global),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}

/// Installs the stderr log subscriber. `RUST_LOG` overrides the flags.
fn init_logging(quiet: bool, verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_log_level(quiet, verbose)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn default_log_level(quiet: bool, verbose: bool) -> &'static str {
    if verbose {
        "debug"
    } else if quiet {
        "error"
    } else {
        "warn"
    }
}
