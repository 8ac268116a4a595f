//! Results of running one program on one fixture.

use std::fmt;
use std::time::Duration;

use serde::Serialize;

use crate::fixture::Variant;

/// Why an invocation did not run to a normal exit.
///
/// A non-zero exit code is *not* an execution error: exit codes are advisory and live on
/// [`ExecutionResult::exit_code`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExecutionError {
    /// The executable could not be started (not found, not executable, sink not writable).
    LaunchFailed { reason: String },
    /// The process outlived its time budget and was killed.
    TimedOut { after: Duration },
    /// The run was cancelled while the process was in flight.
    Cancelled,
    /// The process started but its exit status could not be collected.
    WaitFailed { reason: String },
}

impl ExecutionError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ExecutionError::Cancelled)
    }
}

impl fmt::Display for ExecutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionError::LaunchFailed { reason } => write!(f, "launch failed: {reason}"),
            ExecutionError::TimedOut { after } => write!(f, "timed out after {:.1}s", after.as_secs_f64()),
            ExecutionError::Cancelled => f.write_str("cancelled"),
            ExecutionError::WaitFailed { reason } => write!(f, "wait failed: {reason}"),
        }
    }
}

/// One invocation of one program on one fixture.
///
/// `output` is the persisted capture read back from disk; `None` means no capture exists at all, which is
/// distinct from an empty capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    pub fixture: String,
    pub variant: Variant,
    pub output: Option<Vec<u8>>,
    pub exit_code: Option<i32>,
    pub error: Option<ExecutionError>,
}

impl ExecutionResult {
    pub fn output(&self) -> Option<&[u8]> {
        self.output.as_deref()
    }

    pub fn was_cancelled(&self) -> bool {
        self.error.as_ref().is_some_and(ExecutionError::is_cancelled)
    }
}
