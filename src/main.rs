//! gitscope - typed queries over a git repository
//!
//! gitscope provides:
//! - Commit lookup, ancestry walks and message search
//! - Code search across the whole history with paging
//! - Per-commit file status and `.gitmodules` parsing
//! - Per-author commit histograms and line-change totals
//! - Unified output format (jsonl/json/md/raw)

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod core;
mod git;

fn init_logging(cli: &cli::Cli) {
    let default_level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "warn"
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    // Check for unsupported platforms
    #[cfg(windows)]
    {
        eprintln!("Error: Windows is not supported. Please use WSL (not guaranteed to work).");
        std::process::exit(1);
    }

    let cli = cli::Cli::parse();
    init_logging(&cli);
    cli::run(cli)
}
