#![forbid(unsafe_code)]
//! Differential test harness
//!
//! Builds a candidate program, runs it next to a trusted baseline over a directory of fixtures, and
//! compares the two outputs byte-for-byte. The pure vocabulary (verdicts, reports, the comparator)
//! lives in `difftest_core`; this crate adds process execution, the build step, the corpus runner,
//! presentation and the CLI.
//!
//! ## Panic Policy
//!
//! This codebase follows explicit error handling:
//!
//! - **Production code**: Use `Result` or `Option` with `?` / `ok_or` / `map_err`. The `cli` and `harness` modules
//!   enforce `#![deny(clippy::unwrap_used)]`.
//!
//! - **Test code**: `.unwrap()` and `.expect()` are acceptable in tests.
//!
//! - **Per-fixture failures** are data, not errors: a crashing, hanging or missing program ends up in a verdict
//!   and never aborts the run.

pub mod cli;
pub mod config;
pub mod harness;
pub mod version;

pub use config::{ColorMode, HarnessConfig};
pub use harness::{CorpusRunner, HarnessError, ProcessRunner};
