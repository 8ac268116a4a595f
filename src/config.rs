//! Harness configuration.
//!
//! Defaults reproduce the classic layout: build `rpal20` with `make` inside `source_files/`, move it next
//! to the reference `rpal`, and write captures to `output/`.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::harness::{BuildRequest, CorpusOptions, Program};

/// When to emit ANSI colors on the console.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ColorMode {
    /// Color when stdout is a terminal
    #[default]
    Auto,
    Always,
    Never,
}

impl ColorMode {
    pub fn enabled(self, is_terminal: bool) -> bool {
        match self {
            ColorMode::Auto => is_terminal,
            ColorMode::Always => true,
            ColorMode::Never => false,
        }
    }
}

/// Platform file name of an executable (`rpal20` / `rpal20.exe`).
pub fn exe_name(stem: &str) -> String {
    format!("{stem}{}", std::env::consts::EXE_SUFFIX)
}

/// Everything a harness run needs.
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Directory holding one fixture file per test case
    pub fixtures_dir: PathBuf,
    /// Directory the build command runs in
    pub source_dir: PathBuf,
    /// Build command as an argument vector
    pub build_command: Vec<String>,
    /// Build artifact, relative to `source_dir`
    pub artifact: PathBuf,
    /// Program under test; the build artifact is moved here
    pub candidate: PathBuf,
    /// Leading arguments for the candidate, before the fixture path
    pub candidate_args: Vec<OsString>,
    /// Trusted reference program
    pub baseline: PathBuf,
    /// Leading arguments for the baseline, before the fixture path
    pub baseline_args: Vec<OsString>,
    pub output_dir: PathBuf,
    /// Per-invocation time budget (`None` = unbounded)
    pub timeout: Option<Duration>,
    pub build_timeout: Option<Duration>,
    /// Fixtures evaluated concurrently
    pub jobs: usize,
    /// Only evaluate fixtures whose name contains this
    pub filter: Option<String>,
    pub skip_build: bool,
    pub keep_stderr: bool,
    /// Also write the report as JSON to this path
    pub json_report: Option<PathBuf>,
    pub color: ColorMode,
    pub verbose: bool,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            fixtures_dir: PathBuf::from("tests"),
            source_dir: PathBuf::from("source_files"),
            build_command: vec!["make".to_string()],
            artifact: PathBuf::from(exe_name("rpal20")),
            candidate: Path::new(".").join(exe_name("rpal20")),
            candidate_args: Vec::new(),
            baseline: Path::new(".").join(exe_name("rpal")),
            baseline_args: Vec::new(),
            output_dir: PathBuf::from("output"),
            timeout: Some(Duration::from_secs(10)),
            build_timeout: Some(Duration::from_secs(600)),
            jobs: 1,
            filter: None,
            skip_build: false,
            keep_stderr: false,
            json_report: None,
            color: ColorMode::Auto,
            verbose: false,
        }
    }
}

impl HarnessConfig {
    /// Default config reading fixtures from `fixtures_dir`
    pub fn new(fixtures_dir: impl Into<PathBuf>) -> Self {
        Self {
            fixtures_dir: fixtures_dir.into(),
            ..Self::default()
        }
    }

    pub fn with_source_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.source_dir = dir.into();
        self
    }

    pub fn with_build_command<I, S>(mut self, command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.build_command = command.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_artifact(mut self, artifact: impl Into<PathBuf>) -> Self {
        self.artifact = artifact.into();
        self
    }

    pub fn with_candidate(mut self, program: Program) -> Self {
        self.candidate = program.executable;
        self.candidate_args = program.args;
        self
    }

    pub fn with_baseline(mut self, program: Program) -> Self {
        self.baseline = program.executable;
        self.baseline_args = program.args;
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_build_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.build_timeout = timeout;
        self
    }

    /// Set the number of concurrent fixtures (at least 1)
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    pub fn with_filter(mut self, filter: Option<String>) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_skip_build(mut self, skip: bool) -> Self {
        self.skip_build = skip;
        self
    }

    pub fn with_keep_stderr(mut self, keep: bool) -> Self {
        self.keep_stderr = keep;
        self
    }

    pub fn with_json_report(mut self, path: Option<PathBuf>) -> Self {
        self.json_report = path;
        self
    }

    pub fn with_color(mut self, color: ColorMode) -> Self {
        self.color = color;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    // ---- derived views ----

    pub fn build_request(&self) -> BuildRequest {
        BuildRequest {
            source_dir: self.source_dir.clone(),
            command: self.build_command.clone(),
            artifact: self.artifact.clone(),
            destination: self.candidate.clone(),
            timeout: self.build_timeout,
        }
    }

    pub fn corpus_options(&self) -> CorpusOptions {
        CorpusOptions::new(&self.output_dir)
            .with_timeout(self.timeout)
            .with_jobs(self.jobs)
            .with_keep_stderr(self.keep_stderr)
    }

    pub fn baseline_program(&self) -> Program {
        Program::new(&self.baseline).with_args(self.baseline_args.iter().cloned())
    }

    pub fn candidate_program(&self) -> Program {
        Program::new(&self.candidate).with_args(self.candidate_args.iter().cloned())
    }
}
