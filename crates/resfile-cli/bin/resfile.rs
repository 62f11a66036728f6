//! `resfile` binary entry point.
//!
//! Parses arguments, initializes logging and runs one subcommand. Logging
//! defaults to warnings only; set `RUST_LOG` for more.

use anyhow::Result;
use clap::Parser;
use resfile_cli::{Cli, run};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    run(&cli, &mut out)
}
