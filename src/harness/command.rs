//! External command execution.
//!
//! ## Contract
//!
//! `CommandRunner::run` never fails across its boundary: launch failures, timeouts and cancellation are
//! reported in [`CommandOutcome::error`], and callers must check it explicitly.
//!
//! Commands are spawned from an argument vector (no shell), with the working directory applied to the
//! child only. The harness process never changes its own working directory.

use std::ffi::{OsStr, OsString};
use std::fs::{self, File};
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use difftest_core::ExecutionError;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::task::JoinHandle;

use super::cancel::CancelSignal;

/// How long to keep draining an in-memory pipe after its process was killed, and the least time granted
/// after a normal exit.
///
/// Grandchildren that inherited the pipe can keep it open indefinitely.
const PIPE_DRAIN_GRACE: Duration = Duration::from_millis(500);

/// Where a stream of the child process goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sink {
    /// Discard.
    Null,
    /// Write to a file (created or truncated before the spawn, removed again if the spawn fails).
    File(PathBuf),
    /// Collect in memory and return it in the outcome.
    Capture,
}

/// One command to execute.
#[derive(Debug, Clone)]
pub struct CommandRequest {
    pub program: PathBuf,
    pub args: Vec<OsString>,
    pub current_dir: Option<PathBuf>,
    pub stdout: Sink,
    pub stderr: Sink,
    pub timeout: Option<Duration>,
}

impl CommandRequest {
    /// A request with no arguments, stdout and stderr discarded, and no timeout.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
            stdout: Sink::Null,
            stderr: Sink::Null,
            timeout: None,
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args.extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    pub fn stdout(mut self, sink: Sink) -> Self {
        self.stdout = sink;
        self
    }

    pub fn stderr(mut self, sink: Sink) -> Self {
        self.stderr = sink;
        self
    }

    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Human-readable command line (for diagnostics only; never passed to a shell).
    pub fn display(&self) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(self.args.iter().map(|a| a.to_string_lossy().into_owned()));
        parts.join(" ")
    }
}

/// How an executed command ended.
#[derive(Debug, Clone, Default)]
pub struct CommandOutcome {
    /// Exit code, when the process exited normally.
    pub exit_code: Option<i32>,
    /// stdout bytes for [`Sink::Capture`], empty otherwise.
    pub stdout: Vec<u8>,
    /// stderr bytes for [`Sink::Capture`], empty otherwise.
    pub stderr: Vec<u8>,
    pub error: Option<ExecutionError>,
    pub elapsed: Duration,
}

impl CommandOutcome {
    fn failed(error: ExecutionError, started: Instant) -> Self {
        Self {
            error: Some(error),
            elapsed: started.elapsed(),
            ..Self::default()
        }
    }

    /// Exited normally with code 0.
    pub fn success(&self) -> bool {
        self.error.is_none() && self.exit_code == Some(0)
    }

    /// Short description of how the command ended, for diagnostics.
    pub fn status(&self) -> String {
        match (&self.error, self.exit_code) {
            (Some(err), _) => err.to_string(),
            (None, Some(code)) => format!("exit code {code}"),
            (None, None) => "terminated by signal".to_string(),
        }
    }
}

/// Executes external commands.
///
/// Implement this trait to substitute process execution (fakes in tests, remote runners, ...).
pub trait CommandRunner: Send + Sync + 'static {
    /// Run `request` to completion, its timeout, or cancellation.
    fn run(&self, request: &CommandRequest, cancel: &CancelSignal) -> impl Future<Output = CommandOutcome> + Send;
}

/// Runs commands as local child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

enum Waited {
    Exited(io::Result<std::process::ExitStatus>),
    TimedOut(Duration),
    Cancelled,
}

impl CommandRunner for ProcessRunner {
    async fn run(&self, request: &CommandRequest, cancel: &CancelSignal) -> CommandOutcome {
        let started = Instant::now();

        if cancel.is_cancelled() {
            return CommandOutcome::failed(ExecutionError::Cancelled, started);
        }

        let stdout = match open_sink(&request.stdout) {
            Ok(stdio) => stdio,
            Err(e) => {
                return CommandOutcome::failed(
                    ExecutionError::LaunchFailed {
                        reason: format!("cannot open stdout sink: {e}"),
                    },
                    started,
                );
            }
        };
        let stderr = match open_sink(&request.stderr) {
            Ok(stdio) => stdio,
            Err(e) => {
                discard_sink(&request.stdout);
                return CommandOutcome::failed(
                    ExecutionError::LaunchFailed {
                        reason: format!("cannot open stderr sink: {e}"),
                    },
                    started,
                );
            }
        };

        let mut command = Command::new(&request.program);
        command
            .args(&request.args)
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(stderr)
            .kill_on_drop(true);
        if let Some(dir) = &request.current_dir {
            command.current_dir(dir);
        }

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                discard_sink(&request.stdout);
                discard_sink(&request.stderr);
                let reason = describe_spawn_error(&request.program, &e);
                tracing::debug!(program = %request.program.display(), %reason, "launch failed");
                return CommandOutcome::failed(ExecutionError::LaunchFailed { reason }, started);
            }
        };

        let stdout_reader = child.stdout.take().map(spawn_drain);
        let stderr_reader = child.stderr.take().map(spawn_drain);

        let waited = tokio::select! {
            status = child.wait() => Waited::Exited(status),
            after = deadline(request.timeout) => Waited::TimedOut(after),
            _ = cancel.cancelled() => Waited::Cancelled,
        };

        let (exit_code, error) = match waited {
            // The terminal's interrupt reaches the child too; it can win the race against our own kill.
            Waited::Exited(Ok(status)) if status.code().is_none() && cancel.is_cancelled() => {
                (None, Some(ExecutionError::Cancelled))
            }
            Waited::Exited(Ok(status)) => (status.code(), None),
            Waited::Exited(Err(e)) => (None, Some(ExecutionError::WaitFailed { reason: e.to_string() })),
            Waited::TimedOut(after) => {
                tracing::debug!(command = %request.display(), ?after, "timed out, killing");
                let _ = child.kill().await;
                (None, Some(ExecutionError::TimedOut { after }))
            }
            Waited::Cancelled => {
                tracing::debug!(command = %request.display(), "cancelled, killing");
                let _ = child.kill().await;
                (None, Some(ExecutionError::Cancelled))
            }
        };

        let drain_until =
            tokio::time::Instant::now() + drain_budget(request.timeout, started.elapsed(), error.is_some());
        let stdout = collect_drain(stdout_reader, drain_until).await;
        let stderr = collect_drain(stderr_reader, drain_until).await;
        let elapsed = started.elapsed();

        tracing::debug!(
            command = %request.display(),
            exit_code = ?exit_code,
            elapsed_ms = elapsed.as_millis() as u64,
            "command finished"
        );

        CommandOutcome {
            exit_code,
            stdout,
            stderr,
            error,
            elapsed,
        }
    }
}

fn open_sink(sink: &Sink) -> io::Result<Stdio> {
    match sink {
        Sink::Null => Ok(Stdio::null()),
        Sink::File(path) => Ok(Stdio::from(File::create(path)?)),
        Sink::Capture => Ok(Stdio::piped()),
    }
}

/// Remove a file sink that never received a process, so "never launched" leaves no capture behind.
fn discard_sink(sink: &Sink) {
    if let Sink::File(path) = sink {
        if let Err(e) = fs::remove_file(path) {
            if e.kind() != io::ErrorKind::NotFound {
                tracing::warn!(path = %path.display(), error = %e, "could not remove stale capture");
            }
        }
    }
}

/// Whether `path` is a regular file the current platform would let us execute.
///
/// On unix this means at least one executable permission bit is set.
pub fn is_executable(path: &Path) -> bool {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::metadata(path).is_ok_and(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
    }
    #[cfg(not(unix))]
    {
        path.is_file()
    }
}

fn describe_spawn_error(program: &Path, error: &io::Error) -> String {
    match error.kind() {
        io::ErrorKind::NotFound => format!("executable not found: {}", program.display()),
        io::ErrorKind::PermissionDenied => format!("not executable: {}", program.display()),
        _ => format!("cannot start {}: {error}", program.display()),
    }
}

async fn deadline(timeout: Option<Duration>) -> Duration {
    match timeout {
        Some(after) => {
            tokio::time::sleep(after).await;
            after
        }
        None => std::future::pending().await,
    }
}

fn spawn_drain<R>(mut pipe: R) -> JoinHandle<Vec<u8>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf).await;
        buf
    })
}

/// Time left for draining captured pipes once the process is gone.
///
/// A killed process gets [`PIPE_DRAIN_GRACE`]. After a normal exit the drain may use what is left of the
/// invocation timeout, but never less than the grace.
fn drain_budget(timeout: Option<Duration>, elapsed: Duration, killed: bool) -> Duration {
    if killed {
        return PIPE_DRAIN_GRACE;
    }
    timeout
        .and_then(|budget| budget.checked_sub(elapsed))
        .map_or(PIPE_DRAIN_GRACE, |left| left.max(PIPE_DRAIN_GRACE))
}

async fn collect_drain(reader: Option<JoinHandle<Vec<u8>>>, until: tokio::time::Instant) -> Vec<u8> {
    let Some(mut handle) = reader else {
        return Vec::new();
    };
    match tokio::time::timeout_at(until, &mut handle).await {
        Ok(joined) => joined.unwrap_or_default(),
        Err(_) => {
            tracing::warn!("pipe still held open, captured output dropped");
            handle.abort();
            Vec::new()
        }
    }
}
