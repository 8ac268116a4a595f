//! Differential test harness CLI entry point

use clap::Parser;
use difftest::cli::Cli;

fn main() {
    let cli = Cli::parse();

    // Structured logging to stderr (stdout carries the report), env-based filter
    let default_level = if cli.verbose { "debug" } else { "warn" };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .try_init();

    difftest::cli::run(cli);
}
