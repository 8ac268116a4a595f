//! Command implementations for the CLI

use std::io::IsTerminal;
use std::path::Path;
use std::sync::Arc;

use tracing::Instrument;

use super::{CliError, CliResult, ExitCode};
use crate::config::HarnessConfig;
use crate::harness::{
    BuildOrchestrator, CancelSignal, ConsolePresenter, CorpusRunner, HarnessError, JsonPresenter, ProcessRunner, Tee,
    discover_fixtures, is_executable,
};
use difftest_core::{RunReport, Variant};

/// Run the whole harness: build, evaluate every fixture, report.
///
/// ## Returns
/// - `ExitCode::SUCCESS` when every fixture matched
/// - `ExitCode::FAILURE` when a fixture failed or the run was cancelled
/// - `Err` for fatal errors (build failure, unreadable fixtures dir, missing executable, ...)
pub fn run_harness(config: HarnessConfig) -> CliResult<ExitCode> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| CliError::failure(format!("Error starting async runtime: {e}")))?;

    let report = runtime.block_on(execute(&config))?;

    if report.all_passed() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

async fn execute(config: &HarnessConfig) -> Result<RunReport, HarnessError> {
    let cancel = CancelSignal::new();
    cancel.cancel_on_ctrl_c();

    let runner = Arc::new(ProcessRunner::new());

    if config.skip_build {
        tracing::info!("build skipped");
    } else {
        BuildOrchestrator::new(Arc::clone(&runner))
            .build(&config.build_request(), &cancel)
            .instrument(tracing::info_span!("build"))
            .await?;
    }

    ensure_executable(Variant::Candidate, &config.candidate)?;
    ensure_executable(Variant::Baseline, &config.baseline)?;

    let fixtures = discover_fixtures(&config.fixtures_dir, config.filter.as_deref())?;
    tracing::debug!(count = fixtures.len(), dir = %config.fixtures_dir.display(), "fixtures enumerated");

    let console = ConsolePresenter::stdout()
        .with_color(config.color.enabled(std::io::stdout().is_terminal()))
        .with_verbose(config.verbose);

    let corpus = CorpusRunner::new(runner, config.corpus_options());
    let baseline = config.baseline_program();
    let candidate = config.candidate_program();

    match &config.json_report {
        Some(path) => {
            let mut presenter = Tee::new(console, JsonPresenter::new(path));
            let report = corpus
                .run_fixtures(fixtures, &baseline, &candidate, &mut presenter, &cancel)
                .await?;
            let (_, json) = presenter.into_inner();
            json.finish()?;
            Ok(report)
        }
        None => {
            let mut console = console;
            corpus
                .run_fixtures(fixtures, &baseline, &candidate, &mut console, &cancel)
                .await
        }
    }
}

/// Fail fast when a program given as a path does not exist or cannot be executed.
///
/// Bare names (`rpal`) are resolved through `PATH` at spawn time and are not checked here.
fn ensure_executable(role: Variant, path: &Path) -> Result<(), HarnessError> {
    let is_path = path.is_absolute() || path.components().count() > 1;
    if !is_path {
        return Ok(());
    }
    if !path.is_file() {
        return Err(HarnessError::MissingExecutable {
            role,
            path: path.to_path_buf(),
        });
    }
    if !is_executable(path) {
        return Err(HarnessError::NotExecutable {
            role,
            path: path.to_path_buf(),
        });
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    #[test]
    fn test_ensure_executable_missing_path() {
        let dir = tempfile::tempdir().unwrap();
        let err = ensure_executable(Variant::Candidate, &dir.path().join("rpal20")).unwrap_err();
        assert!(matches!(
            err,
            HarnessError::MissingExecutable {
                role: Variant::Candidate,
                ..
            }
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_ensure_executable_existing_file() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rpal");
        fs::write(&path, b"").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        assert!(ensure_executable(Variant::Baseline, &path).is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn test_ensure_executable_without_exec_bit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rpal20");
        fs::write(&path, b"#!/bin/sh\n").unwrap();
        let err = ensure_executable(Variant::Candidate, &path).unwrap_err();
        assert!(matches!(
            err,
            HarnessError::NotExecutable {
                role: Variant::Candidate,
                ..
            }
        ));
    }

    #[test]
    fn test_ensure_executable_bare_name_is_left_to_path_lookup() {
        assert!(ensure_executable(Variant::Baseline, &PathBuf::from("rpal")).is_ok());
    }

    #[test]
    fn test_missing_candidate_with_skip_build_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let fixtures = dir.path().join("tests");
        fs::create_dir(&fixtures).unwrap();
        fs::write(fixtures.join("t1"), b"x").unwrap();

        let config = HarnessConfig::new(&fixtures)
            .with_skip_build(true)
            .with_output_dir(dir.path().join("output"))
            .with_candidate(crate::harness::Program::new(dir.path().join("missing")));

        let err = run_harness(config).unwrap_err();
        assert_eq!(err.exit_code, ExitCode::FAILURE);
        assert!(err.message.contains("not found"), "{}", err.message);
        assert!(!dir.path().join("output").exists(), "no fixture may run");
    }
}
