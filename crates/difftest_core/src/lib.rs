//! Provide the pure vocabulary of a differential test run: fixtures, execution results, verdicts and reports.
//!
//! This crate is intentionally small and dependency-light. It is shared by the harness (which spawns
//! processes and touches the filesystem) and by anything that consumes a finished report (renderers,
//! fuzz targets, tests).
//!
//! ## Notes
//!
//! - This is a "semantic core" crate: **no IO**, no global state, no async runtime.
//! - Comparison is byte-exact. Nothing in here trims, decodes, or normalizes captured output.
//! - Everything a renderer needs is `serde::Serialize`.

pub mod compare;
pub mod execution;
pub mod fixture;
pub mod report;
pub mod verdict;

pub use compare::{Side, compare, compare_sides, first_difference};
pub use execution::{ExecutionError, ExecutionResult};
pub use fixture::{Fixture, Variant};
pub use report::{ReportBuilder, RunReport, Summary};
pub use verdict::{ComparisonVerdict, FirstDifference, Outcome};
