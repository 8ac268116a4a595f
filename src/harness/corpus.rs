//! Fixture discovery and corpus evaluation.
//!
//! ## Ordering
//!
//! Fixtures are enumerated sorted by name. With `jobs > 1` several fixtures are in flight at once, but
//! completions are parked in per-fixture slots and handed to the presenter (and the report) strictly in
//! enumeration order, so the output of a parallel run is identical to a sequential one.
//!
//! ## Cancellation
//!
//! Once the cancel signal fires no new fixture is launched. In-flight invocations are killed by the
//! runner, and a fixture with a cancelled invocation produces no verdict at all.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use difftest_core::{
    ComparisonVerdict, ExecutionError, ExecutionResult, Fixture, ReportBuilder, RunReport, Side, Variant, compare_sides,
};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::Instrument;

use super::cancel::CancelSignal;
use super::command::{CommandRequest, CommandRunner, Sink};
use super::errors::HarnessError;
use super::report::ReportPresenter;

/// A program to run against each fixture: `<executable> [args...] <fixture path>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    pub executable: PathBuf,
    /// Leading arguments, placed before the fixture path.
    pub args: Vec<OsString>,
}

impl Program {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

/// Knobs of a corpus run.
#[derive(Debug, Clone)]
pub struct CorpusOptions {
    /// Directory receiving `<fixture>_baseline` / `<fixture>_candidate`.
    pub output_dir: PathBuf,
    /// Per-invocation time budget.
    pub timeout: Option<Duration>,
    /// Maximum number of fixtures in flight.
    pub jobs: usize,
    /// Persist each program's stderr next to its capture (never compared).
    pub keep_stderr: bool,
}

impl CorpusOptions {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            timeout: Some(Duration::from_secs(10)),
            jobs: 1,
            keep_stderr: false,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    pub fn with_keep_stderr(mut self, keep: bool) -> Self {
        self.keep_stderr = keep;
        self
    }
}

/// Enumerate the fixtures of `dir`, sorted by name.
///
/// Only regular files count; hidden entries (leading `.`) are skipped. When `filter` is given, only
/// fixtures whose name contains it are kept.
pub fn discover_fixtures(dir: &Path, filter: Option<&str>) -> Result<Vec<Fixture>, HarnessError> {
    let dir_error = |source: io::Error| HarnessError::FixturesDir {
        path: dir.to_path_buf(),
        source,
    };

    let mut fixtures = Vec::new();
    for entry in fs::read_dir(dir).map_err(dir_error)? {
        let path = entry.map_err(dir_error)?.path();
        if !path.is_file() {
            continue;
        }
        let Some(fixture) = Fixture::from_path(&path) else {
            continue;
        };
        if fixture.id.starts_with('.') {
            continue;
        }
        if filter.is_some_and(|keyword| !fixture.id.contains(keyword)) {
            continue;
        }
        fixtures.push(fixture);
    }

    fixtures.sort();
    Ok(fixtures)
}

/// Runs baseline and candidate over a fixture corpus and assembles the report.
pub struct CorpusRunner<R> {
    runner: Arc<R>,
    options: Arc<CorpusOptions>,
}

/// Per-fixture slot; filled in completion order, drained in enumeration order.
enum Slot {
    Pending,
    Done(ComparisonVerdict),
    Cancelled,
}

impl<R: CommandRunner> CorpusRunner<R> {
    pub fn new(runner: Arc<R>, options: CorpusOptions) -> Self {
        Self {
            runner,
            options: Arc::new(options),
        }
    }

    pub fn options(&self) -> &CorpusOptions {
        &self.options
    }

    /// Discover the fixtures of `fixtures_dir` and evaluate all of them.
    pub async fn run_all(
        &self,
        fixtures_dir: &Path,
        baseline: &Program,
        candidate: &Program,
        presenter: &mut dyn ReportPresenter,
        cancel: &CancelSignal,
    ) -> Result<RunReport, HarnessError> {
        let fixtures = discover_fixtures(fixtures_dir, None)?;
        self.run_fixtures(fixtures, baseline, candidate, presenter, cancel).await
    }

    /// Evaluate `fixtures` (already in enumeration order).
    ///
    /// Every fixture yields exactly one verdict unless the run is cancelled, in which case the fixtures
    /// that were not evaluated are counted as such in the report.
    pub async fn run_fixtures(
        &self,
        fixtures: Vec<Fixture>,
        baseline: &Program,
        candidate: &Program,
        presenter: &mut dyn ReportPresenter,
        cancel: &CancelSignal,
    ) -> Result<RunReport, HarnessError> {
        let started = Instant::now();
        let output_dir = &self.options.output_dir;
        fs::create_dir_all(output_dir).map_err(|source| HarnessError::OutputDir {
            path: output_dir.clone(),
            source,
        })?;

        presenter.on_run_start(fixtures.len());

        let baseline = Arc::new(baseline.clone());
        let candidate = Arc::new(candidate.clone());
        let semaphore = Arc::new(Semaphore::new(self.options.jobs.max(1)));

        let mut builder = ReportBuilder::new(fixtures.len());
        let mut slots: Vec<Slot> = fixtures.iter().map(|_| Slot::Pending).collect();
        let mut next_launch = 0;
        let mut next_flush = 0;
        let mut stop_launching = false;
        let mut tasks = JoinSet::new();

        while (!stop_launching && next_launch < fixtures.len()) || !tasks.is_empty() {
            let can_launch = !stop_launching && next_launch < fixtures.len();
            tokio::select! {
                biased;

                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    let (index, verdict): (usize, Option<ComparisonVerdict>) = match joined {
                        Ok(done) => done,
                        Err(err) => match err.try_into_panic() {
                            Ok(payload) => std::panic::resume_unwind(payload),
                            Err(err) => return Err(HarnessError::Runtime(err.to_string())),
                        },
                    };
                    slots[index] = match verdict {
                        Some(verdict) => Slot::Done(verdict),
                        None => Slot::Cancelled,
                    };
                    next_flush = flush(&slots, next_flush, &mut builder, presenter);
                }

                _ = cancel.cancelled(), if !stop_launching => {
                    tracing::warn!(launched = next_launch, total = fixtures.len(), "run cancelled");
                    stop_launching = true;
                }

                permit = semaphore.clone().acquire_owned(), if can_launch => {
                    let Ok(permit) = permit else {
                        stop_launching = true;
                        continue;
                    };
                    let index = next_launch;
                    next_launch += 1;

                    let fixture = fixtures[index].clone();
                    let span = tracing::debug_span!("fixture", id = %fixture.id);
                    let job = evaluate_fixture(
                        Arc::clone(&self.runner),
                        Arc::clone(&self.options),
                        fixture,
                        Arc::clone(&baseline),
                        Arc::clone(&candidate),
                        cancel.clone(),
                    );
                    tasks.spawn(
                        async move {
                            let verdict = job.await;
                            drop(permit);
                            (index, verdict)
                        }
                        .instrument(span),
                    );
                }

                else => break,
            }
        }

        if cancel.is_cancelled() || slots.iter().any(|slot| !matches!(slot, Slot::Done(_))) {
            builder.mark_cancelled();
        }

        let report = builder.finish(started.elapsed());
        presenter.on_run_complete(&report);
        Ok(report)
    }
}

/// Hand every leading finished slot to the report, in enumeration order. Returns the new flush cursor.
fn flush(
    slots: &[Slot],
    mut cursor: usize,
    builder: &mut ReportBuilder,
    presenter: &mut dyn ReportPresenter,
) -> usize {
    while cursor < slots.len() {
        match &slots[cursor] {
            Slot::Pending => break,
            Slot::Done(verdict) => {
                presenter.on_verdict(verdict);
                builder.push(verdict.clone());
            }
            Slot::Cancelled => {}
        }
        cursor += 1;
    }
    cursor
}

/// Run both programs on one fixture and judge the persisted captures.
///
/// Returns `None` when either invocation was cancelled.
async fn evaluate_fixture<R: CommandRunner>(
    runner: Arc<R>,
    options: Arc<CorpusOptions>,
    fixture: Fixture,
    baseline: Arc<Program>,
    candidate: Arc<Program>,
    cancel: CancelSignal,
) -> Option<ComparisonVerdict> {
    if cancel.is_cancelled() {
        return None;
    }

    // The two invocations write to disjoint files and have no data dependency.
    let (baseline_result, candidate_result) = tokio::join!(
        run_variant(runner.as_ref(), &options, &fixture, Variant::Baseline, &baseline, &cancel),
        run_variant(runner.as_ref(), &options, &fixture, Variant::Candidate, &candidate, &cancel),
    );

    // A child killed by the same interrupt exits by signal without reporting Cancelled.
    if cancel.is_cancelled() || baseline_result.was_cancelled() || candidate_result.was_cancelled() {
        tracing::debug!("fixture cancelled, no verdict");
        return None;
    }

    let verdict = compare_sides(
        &fixture.id,
        Side::new(baseline_result.output(), baseline_result.error.as_ref()),
        Side::new(candidate_result.output(), candidate_result.error.as_ref()),
    );
    tracing::debug!(outcome = %verdict.outcome, "fixture evaluated");
    Some(verdict)
}

async fn run_variant<R: CommandRunner>(
    runner: &R,
    options: &CorpusOptions,
    fixture: &Fixture,
    variant: Variant,
    program: &Program,
    cancel: &CancelSignal,
) -> ExecutionResult {
    let capture = options.output_dir.join(fixture.capture_name(variant));
    let stderr = if options.keep_stderr {
        Sink::File(options.output_dir.join(format!("{}.stderr", fixture.capture_name(variant))))
    } else {
        Sink::Null
    };

    let request = CommandRequest::new(&program.executable)
        .args(&program.args)
        .arg(&fixture.path)
        .stdout(Sink::File(capture.clone()))
        .stderr(stderr)
        .timeout(options.timeout);

    let outcome = runner.run(&request, cancel).await;
    if let Some(code) = outcome.exit_code.filter(|code| *code != 0) {
        tracing::debug!(%variant, code, "non-zero exit (advisory)");
    }

    let (output, error) = match read_capture(&capture) {
        Ok(output) => (output, outcome.error),
        Err(e) => {
            tracing::warn!(path = %capture.display(), error = %e, "capture exists but cannot be read");
            let unreadable = ExecutionError::WaitFailed {
                reason: format!("cannot read capture {}: {e}", capture.display()),
            };
            (None, outcome.error.or(Some(unreadable)))
        }
    };

    ExecutionResult {
        fixture: fixture.id.clone(),
        variant,
        output,
        exit_code: outcome.exit_code,
        error,
    }
}

/// Read a persisted capture back; `Ok(None)` when no capture exists.
fn read_capture(path: &Path) -> io::Result<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_discover_sorts_and_skips_hidden_and_dirs() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["t10", "t2", "t1", ".DS_Store"] {
            fs::write(dir.path().join(name), name).unwrap();
        }
        fs::create_dir(dir.path().join("subdir")).unwrap();

        let fixtures = discover_fixtures(dir.path(), None).unwrap();
        let ids: Vec<_> = fixtures.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, ["t1", "t10", "t2"]);
    }

    #[test]
    fn test_discover_filter() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["add", "add_neg", "tuple"] {
            fs::write(dir.path().join(name), "").unwrap();
        }

        let fixtures = discover_fixtures(dir.path(), Some("add")).unwrap();
        let ids: Vec<_> = fixtures.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, ["add", "add_neg"]);
    }

    #[test]
    fn test_discover_missing_dir_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let err = discover_fixtures(&dir.path().join("nope"), None).unwrap_err();
        assert!(matches!(err, HarnessError::FixturesDir { .. }));
    }

    #[test]
    fn test_program_args_precede_fixture() {
        let program = Program::new("/bin/sh").with_args(["script.sh"]);
        assert_eq!(program.args, vec![OsString::from("script.sh")]);
    }

    #[test]
    fn test_options_jobs_floor() {
        let options = CorpusOptions::new("out").with_jobs(0);
        assert_eq!(options.jobs, 1);
    }

    #[test]
    fn test_read_capture_missing_vs_empty() {
        let dir = tempfile::tempdir().unwrap();
        let empty = dir.path().join("empty");
        fs::write(&empty, b"").unwrap();
        assert_eq!(read_capture(&empty).unwrap(), Some(Vec::new()));
        assert_eq!(read_capture(&dir.path().join("absent")).unwrap(), None);
    }

    #[test]
    fn test_read_capture_unreadable_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let occupied = dir.path().join("t1_candidate");
        fs::create_dir(&occupied).unwrap();
        assert!(read_capture(&occupied).is_err());
    }
}
