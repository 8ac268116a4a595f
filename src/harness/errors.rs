//! Fatal errors of a harness run.
//!
//! Everything in here aborts the run before (or instead of) evaluating fixtures. Per-fixture failures are
//! never errors: they end up as verdicts.

use std::io;
use std::path::PathBuf;

use difftest_core::Variant;
use miette::Diagnostic;
use thiserror::Error;

/// Errors of the build step. All of them are fatal: a broken candidate invalidates every comparison.
#[derive(Debug, Error, Diagnostic)]
pub enum BuildError {
    #[error("build command is empty")]
    #[diagnostic(
        code(difftest::build::empty_command),
        help("pass the build command with --build-cmd, e.g. `--build-cmd make`")
    )]
    EmptyCommand,

    #[error("build failed: `{command}` in {} ({status})", source_dir.display())]
    #[diagnostic(code(difftest::build::failed))]
    BuildFailed {
        command: String,
        source_dir: PathBuf,
        status: String,
        /// Last lines of the build's stderr.
        #[help]
        stderr_tail: Option<String>,
    },

    #[error("build succeeded but produced no artifact at {}", artifact.display())]
    #[diagnostic(
        code(difftest::build::artifact_missing),
        help("check that the build command writes the artifact named by --artifact")
    )]
    ArtifactMissing { artifact: PathBuf },

    #[error("build artifact {} is not executable", artifact.display())]
    #[diagnostic(
        code(difftest::build::artifact_not_executable),
        help("make the build mark the artifact executable (e.g. `chmod +x`)")
    )]
    ArtifactNotExecutable { artifact: PathBuf },

    #[error("could not move {} to {}", from.display(), to.display())]
    #[diagnostic(code(difftest::build::relocate))]
    Relocate {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Errors that abort a harness run.
#[derive(Debug, Error, Diagnostic)]
pub enum HarnessError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Build(#[from] BuildError),

    #[error("{role} executable not found: {}", path.display())]
    #[diagnostic(
        code(difftest::missing_executable),
        help("build the candidate first (drop --skip-build) or point --baseline/--candidate at an existing program")
    )]
    MissingExecutable { role: Variant, path: PathBuf },

    #[error("{role} is not executable: {}", path.display())]
    #[diagnostic(
        code(difftest::not_executable),
        help("set the executable bit (`chmod +x`) or run it through an interpreter")
    )]
    NotExecutable { role: Variant, path: PathBuf },

    #[error("cannot read fixtures directory {}", path.display())]
    #[diagnostic(code(difftest::fixtures_dir))]
    FixturesDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot create output directory {}", path.display())]
    #[diagnostic(code(difftest::output_dir))]
    OutputDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot write report to {}", path.display())]
    #[diagnostic(code(difftest::report))]
    Report {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("async runtime failure: {0}")]
    #[diagnostic(code(difftest::runtime))]
    Runtime(String),
}
