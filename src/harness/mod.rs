//! Differential harness: build the candidate, run both programs over the fixture corpus, report.
//!
//! ## Modules
//!
//! - `command` - `CommandRunner` trait and the tokio-backed `ProcessRunner`
//! - `build` - build orchestration and artifact relocation
//! - `corpus` - fixture discovery and the per-fixture evaluation loop
//! - `report` - `ReportPresenter` trait and renderers (console, JSON)
//! - `cancel` - run-wide cancellation signal
//! - `errors` - fatal error taxonomy
//!
//! ## I/O Boundaries
//!
//! Process execution sits behind `CommandRunner` and reporting behind `ReportPresenter`, so the corpus
//! loop can be driven by fakes in tests. Verdict logic itself is pure and lives in `difftest_core`.

// Enforce explicit error handling - no panicking in production code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod build;
pub mod cancel;
pub mod command;
pub mod corpus;
pub mod errors;
pub mod report;

pub use build::{BuildOrchestrator, BuildRequest};
pub use cancel::CancelSignal;
pub use command::{CommandOutcome, CommandRequest, CommandRunner, ProcessRunner, Sink, is_executable};
pub use corpus::{CorpusOptions, CorpusRunner, Program, discover_fixtures};
pub use errors::{BuildError, HarnessError};
pub use report::{ConsolePresenter, JsonPresenter, ReportPresenter, Tee};
