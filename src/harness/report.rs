//! Report presentation.
//!
//! The corpus runner drives a [`ReportPresenter`] as verdicts become available (always in fixture
//! order), then hands it the finished [`RunReport`]. Presenters never influence the run.

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use difftest_core::{ComparisonVerdict, RunReport, Summary};
use serde::Serialize;

use super::errors::HarnessError;

/// Renders the progress and the final report of a run.
///
/// Implement this trait for other output formats (JSON, TAP, ...).
pub trait ReportPresenter: Send {
    /// Called once the fixtures are enumerated, before any verdict.
    fn on_run_start(&mut self, _fixture_count: usize) {}

    /// Called for each verdict, in fixture-enumeration order.
    fn on_verdict(&mut self, verdict: &ComparisonVerdict);

    /// Called with the finished report.
    fn on_run_complete(&mut self, report: &RunReport);

    /// Present an already finished report in one go.
    fn present(&mut self, report: &RunReport) {
        self.on_run_start(report.enumerated());
        for verdict in report.verdicts() {
            self.on_verdict(verdict);
        }
        self.on_run_complete(report);
    }
}

// ============================================================================
// Console
// ============================================================================

/// Line-per-fixture console output followed by a summary block.
pub struct ConsolePresenter<W: Write> {
    out: W,
    color: bool,
    verbose: bool,
}

impl ConsolePresenter<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> ConsolePresenter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            color: false,
            verbose: false,
        }
    }

    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    /// Append the outcome, first difference, or error cause to failed lines.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn status(&self, passed: bool) -> &'static str {
        match (passed, self.color) {
            (true, true) => "\x1b[32mtest passed\x1b[0m",
            (true, false) => "test passed",
            (false, true) => "\x1b[31mtest failed\x1b[0m",
            (false, false) => "test failed",
        }
    }
}

impl<W: Write + Send> ReportPresenter for ConsolePresenter<W> {
    fn on_verdict(&mut self, verdict: &ComparisonVerdict) {
        let mut line = format!("{}: {}", verdict.fixture, self.status(verdict.passed()));
        if self.verbose && !verdict.passed() {
            line.push_str(&format!(" ({})", failure_detail(verdict)));
        }
        let _ = writeln!(self.out, "{line}");
    }

    fn on_run_complete(&mut self, report: &RunReport) {
        let _ = write!(self.out, "{}", render_summary(report));
        let _ = self.out.flush();
    }
}

fn failure_detail(verdict: &ComparisonVerdict) -> String {
    match (&verdict.first_difference, &verdict.cause) {
        (Some(diff), _) => format!("{} at {diff}", verdict.outcome),
        (None, Some(cause)) => format!("{}: {cause}", verdict.outcome),
        (None, None) => verdict.outcome.to_string(),
    }
}

/// Render the summary block printed after the per-fixture lines.
pub fn render_summary(report: &RunReport) -> String {
    let summary = report.summary();
    let mut text = String::new();
    text.push_str("\nSummary:\n");
    text.push_str(&format!("Total test cases: {}\n", summary.total));
    text.push_str(&format!("Passed test cases: {}\n", summary.passed));
    text.push_str(&format!("Failed test cases: {}\n", summary.failed));
    if report.cancelled() {
        text.push_str(&format!("Not evaluated (cancelled): {}\n", summary.not_evaluated));
    }
    if !summary.failed_fixtures.is_empty() {
        text.push_str("\nList of failed test cases:\n");
        for fixture in &summary.failed_fixtures {
            text.push_str(fixture);
            text.push('\n');
        }
    }
    text
}

// ============================================================================
// JSON
// ============================================================================

#[derive(Serialize)]
struct JsonDocument<'a> {
    summary: Summary,
    report: &'a RunReport,
}

/// Writes the finished report as pretty-printed JSON.
pub struct JsonPresenter {
    path: PathBuf,
    error: Option<io::Error>,
}

impl JsonPresenter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            error: None,
        }
    }

    /// Surface a failure to write the report.
    pub fn finish(self) -> Result<(), HarnessError> {
        match self.error {
            Some(source) => Err(HarnessError::Report { path: self.path, source }),
            None => Ok(()),
        }
    }

    fn write(&self, report: &RunReport) -> io::Result<()> {
        let document = JsonDocument {
            summary: report.summary(),
            report,
        };
        let json = serde_json::to_string_pretty(&document).map_err(io::Error::other)?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, json + "\n")
    }
}

impl ReportPresenter for JsonPresenter {
    fn on_verdict(&mut self, _verdict: &ComparisonVerdict) {}

    fn on_run_complete(&mut self, report: &RunReport) {
        if let Err(e) = self.write(report) {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to write JSON report");
            self.error = Some(e);
        }
    }
}

// ============================================================================
// Composition
// ============================================================================

/// Forwards every event to two presenters.
pub struct Tee<A, B> {
    first: A,
    second: B,
}

impl<A, B> Tee<A, B> {
    pub fn new(first: A, second: B) -> Self {
        Self { first, second }
    }

    pub fn into_inner(self) -> (A, B) {
        (self.first, self.second)
    }
}

impl<A: ReportPresenter, B: ReportPresenter> ReportPresenter for Tee<A, B> {
    fn on_run_start(&mut self, fixture_count: usize) {
        self.first.on_run_start(fixture_count);
        self.second.on_run_start(fixture_count);
    }

    fn on_verdict(&mut self, verdict: &ComparisonVerdict) {
        self.first.on_verdict(verdict);
        self.second.on_verdict(verdict);
    }

    fn on_run_complete(&mut self, report: &RunReport) {
        self.first.on_run_complete(report);
        self.second.on_run_complete(report);
    }
}
