//! CLI module for the differential test harness
//!
//! ## Usage
//!
//! ```text
//! difftest [OPTIONS] <FIXTURES_DIR>
//! ```
//!
//! Builds the candidate, runs baseline and candidate over every fixture in `FIXTURES_DIR`, and prints a
//! pass/fail line per fixture followed by a summary.
//!
//! ## Design
//!
//! The CLI uses clap for argument parsing with derive macros.
//! Command functions return `CliResult<T>` instead of calling `process::exit`.
//! Only the top-level `run()` function handles errors and exits.

// Enforce explicit error handling - no panicking in production code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod commands;

use std::fmt;
use std::path::PathBuf;
use std::process;
use std::time::Duration;

use clap::Parser;

use crate::config::{ColorMode, HarnessConfig};
use crate::harness::{HarnessError, Program};
use crate::version::DIFFTEST_VERSION;

// ============================================================================
// CLI Error handling
// ============================================================================

/// Exit code for CLI operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(pub i32);

impl ExitCode {
    pub const SUCCESS: ExitCode = ExitCode(0);
    pub const FAILURE: ExitCode = ExitCode(1);
}

/// Error type for CLI operations.
///
/// Contains a user-facing message and an exit code. The CLI entry point
/// catches these errors, prints the message, and exits with the code.
#[derive(Debug)]
pub struct CliError {
    /// User-facing error message (already formatted for display)
    pub message: String,
    /// Exit code to return to the shell
    pub exit_code: ExitCode,
}

impl CliError {
    pub fn new(message: impl Into<String>, exit_code: ExitCode) -> Self {
        Self {
            message: message.into(),
            exit_code,
        }
    }

    /// Create a failure error (exit code 1).
    pub fn failure(message: impl Into<String>) -> Self {
        Self::new(message, ExitCode::FAILURE)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

impl From<HarnessError> for CliError {
    fn from(err: HarnessError) -> Self {
        // Debug formatting of a miette report renders the full diagnostic (code, cause chain, help).
        CliError::failure(format!("{:?}", miette::Report::new(err)))
    }
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

// ============================================================================
// Clap CLI definition
// ============================================================================

/// Differential test harness: build a candidate, run it next to a trusted baseline, compare outputs
#[derive(Parser, Debug)]
#[command(name = "difftest")]
#[command(version = DIFFTEST_VERSION)]
#[command(about, long_about = None)]
pub struct Cli {
    /// Directory with one input file per test case
    #[arg(value_name = "FIXTURES_DIR")]
    pub fixtures_dir: PathBuf,

    /// Directory the build command runs in
    #[arg(long, value_name = "DIR", env = "DIFFTEST_SOURCE_DIR")]
    pub source_dir: Option<PathBuf>,

    /// Build command (split on spaces, e.g. "cargo build --release")
    #[arg(long = "build-cmd", value_name = "CMD", env = "DIFFTEST_BUILD_CMD", value_delimiter = ' ')]
    pub build_cmd: Vec<String>,

    /// Build artifact, relative to the source dir
    #[arg(long, value_name = "PATH", env = "DIFFTEST_ARTIFACT")]
    pub artifact: Option<PathBuf>,

    /// Program under test (the artifact is moved here)
    #[arg(long, value_name = "PATH", env = "DIFFTEST_CANDIDATE")]
    pub candidate: Option<PathBuf>,

    /// Trusted reference program
    #[arg(long, value_name = "PATH", env = "DIFFTEST_BASELINE")]
    pub baseline: Option<PathBuf>,

    /// Directory receiving the per-fixture captures
    #[arg(long, value_name = "DIR", env = "DIFFTEST_OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// Per-invocation timeout in seconds
    #[arg(
        long,
        value_name = "SECS",
        env = "DIFFTEST_TIMEOUT",
        default_value_t = 10,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub timeout: u64,

    /// Build timeout in seconds
    #[arg(
        long,
        value_name = "SECS",
        default_value_t = 600,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub build_timeout: u64,

    /// Number of fixtures evaluated concurrently
    #[arg(
        short,
        long,
        value_name = "N",
        env = "DIFFTEST_JOBS",
        default_value_t = 1,
        value_parser = clap::value_parser!(u16).range(1..)
    )]
    pub jobs: u16,

    /// Only run fixtures whose name contains this keyword
    #[arg(short = 'k', value_name = "KEYWORD")]
    pub filter: Option<String>,

    /// Use the existing candidate instead of building it
    #[arg(long)]
    pub skip_build: bool,

    /// Keep each program's stderr next to its capture
    #[arg(long)]
    pub keep_stderr: bool,

    /// Also write the report as JSON
    #[arg(long, value_name = "PATH")]
    pub json: Option<PathBuf>,

    /// When to color the output
    #[arg(long, value_enum, value_name = "WHEN", default_value_t = ColorMode::Auto)]
    pub color: ColorMode,

    /// Verbose output (failure details, debug logging)
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Resolve the parsed arguments against the defaults.
    pub fn into_config(self) -> HarnessConfig {
        let mut config = HarnessConfig::new(self.fixtures_dir)
            .with_timeout(Some(Duration::from_secs(self.timeout)))
            .with_build_timeout(Some(Duration::from_secs(self.build_timeout)))
            .with_jobs(usize::from(self.jobs))
            .with_filter(self.filter)
            .with_skip_build(self.skip_build)
            .with_keep_stderr(self.keep_stderr)
            .with_json_report(self.json)
            .with_color(self.color)
            .with_verbose(self.verbose);

        if let Some(dir) = self.source_dir {
            config = config.with_source_dir(dir);
        }
        let build_cmd: Vec<String> = self.build_cmd.into_iter().filter(|part| !part.is_empty()).collect();
        if !build_cmd.is_empty() {
            config = config.with_build_command(build_cmd);
        }
        if let Some(artifact) = self.artifact {
            config = config.with_artifact(artifact);
        }
        if let Some(candidate) = self.candidate {
            config = config.with_candidate(Program::new(candidate));
        }
        if let Some(baseline) = self.baseline {
            config = config.with_baseline(Program::new(baseline));
        }
        if let Some(dir) = self.output_dir {
            config = config.with_output_dir(dir);
        }
        config
    }
}

// ============================================================================
// CLI entry point
// ============================================================================

/// Main CLI entry point.
///
/// This is the only place where `process::exit` is called. All command
/// implementations return `CliResult` and errors are handled here.
pub fn run(cli: Cli) {
    match commands::run_harness(cli.into_config()) {
        Ok(exit_code) => {
            if exit_code.0 != 0 {
                process::exit(exit_code.0);
            }
        }
        Err(e) => {
            if !e.message.is_empty() {
                eprintln!("{}", e.message);
            }
            process::exit(e.exit_code.0);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
