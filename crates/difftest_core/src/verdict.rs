//! Per-fixture comparison outcomes.

use std::fmt;

use serde::Serialize;

use crate::execution::ExecutionError;

/// Outcome of comparing the baseline and candidate captures of one fixture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Match,
    Mismatch,
    /// The baseline left no capture at all (it never launched).
    BaselineMissing,
    /// The candidate left no capture at all (it never launched).
    CandidateMissing,
    /// The baseline ran but did not finish normally (timeout, lost exit status).
    BaselineErrored,
    /// The candidate ran but did not finish normally (timeout, lost exit status).
    CandidateErrored,
}

impl Outcome {
    pub fn is_pass(self) -> bool {
        matches!(self, Outcome::Match)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Match => "match",
            Outcome::Mismatch => "mismatch",
            Outcome::BaselineMissing => "baseline missing",
            Outcome::CandidateMissing => "candidate missing",
            Outcome::BaselineErrored => "baseline errored",
            Outcome::CandidateErrored => "candidate errored",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Location of the first byte at which two captures diverge.
///
/// `line` and `column` are 1-based and counted in the *baseline* capture. When one capture is a strict
/// prefix of the other, `byte_offset` is the length of the shorter one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FirstDifference {
    pub byte_offset: usize,
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for FirstDifference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "line {}, column {} (byte {})",
            self.line, self.column, self.byte_offset
        )
    }
}

/// The single verdict produced for an evaluated fixture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComparisonVerdict {
    pub fixture: String,
    pub outcome: Outcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_difference: Option<FirstDifference>,
    /// The execution error behind a `*Missing` / `*Errored` outcome.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<ExecutionError>,
}

impl ComparisonVerdict {
    pub fn new(fixture: impl Into<String>, outcome: Outcome) -> Self {
        Self {
            fixture: fixture.into(),
            outcome,
            first_difference: None,
            cause: None,
        }
    }

    pub fn with_first_difference(mut self, diff: FirstDifference) -> Self {
        self.first_difference = Some(diff);
        self
    }

    pub fn with_cause(mut self, cause: Option<ExecutionError>) -> Self {
        self.cause = cause;
        self
    }

    pub fn passed(&self) -> bool {
        self.outcome.is_pass()
    }
}
