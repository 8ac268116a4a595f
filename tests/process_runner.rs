//! `ProcessRunner` against real child processes.

#![cfg(unix)]
#![allow(clippy::unwrap_used)]

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use difftest::harness::{CancelSignal, CommandRequest, CommandRunner, ProcessRunner, Sink};
use difftest_core::ExecutionError;

/// `/bin/sh <script>` request for a script written into `dir`.
fn sh(dir: &Path, name: &str, body: &str) -> CommandRequest {
    let script = dir.join(name);
    fs::write(&script, body).unwrap();
    CommandRequest::new("/bin/sh").arg(script)
}

fn capture(dir: &Path) -> PathBuf {
    dir.join("capture")
}

#[tokio::test]
async fn stdout_goes_to_file_sink() {
    let dir = tempfile::tempdir().unwrap();
    let request = sh(dir.path(), "hello.sh", "printf 'hello\\n'\n").stdout(Sink::File(capture(dir.path())));

    let outcome = ProcessRunner::new().run(&request, &CancelSignal::new()).await;

    assert!(outcome.success(), "{}", outcome.status());
    assert_eq!(fs::read(capture(dir.path())).unwrap(), b"hello\n");
}

#[tokio::test]
async fn file_sink_is_truncated() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(capture(dir.path()), b"stale output from a previous run").unwrap();
    let request = sh(dir.path(), "short.sh", "printf 'x'\n").stdout(Sink::File(capture(dir.path())));

    ProcessRunner::new().run(&request, &CancelSignal::new()).await;

    assert_eq!(fs::read(capture(dir.path())).unwrap(), b"x");
}

#[tokio::test]
async fn nonzero_exit_is_recorded_not_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let request = sh(dir.path(), "fail.sh", "printf 'partial'\nexit 3\n").stdout(Sink::File(capture(dir.path())));

    let outcome = ProcessRunner::new().run(&request, &CancelSignal::new()).await;

    assert_eq!(outcome.exit_code, Some(3));
    assert!(outcome.error.is_none());
    assert_eq!(fs::read(capture(dir.path())).unwrap(), b"partial");
}

#[tokio::test]
async fn working_directory_applies_to_child_only() {
    let dir = tempfile::tempdir().unwrap();
    let work = dir.path().join("work");
    fs::create_dir(&work).unwrap();
    let before = std::env::current_dir().unwrap();

    let request = sh(dir.path(), "pwd.sh", "pwd\n").current_dir(&work).stdout(Sink::Capture);
    let outcome = ProcessRunner::new().run(&request, &CancelSignal::new()).await;

    let printed = String::from_utf8(outcome.stdout).unwrap();
    assert_eq!(
        fs::canonicalize(printed.trim()).unwrap(),
        fs::canonicalize(&work).unwrap()
    );
    assert_eq!(std::env::current_dir().unwrap(), before);
}

#[tokio::test]
async fn capture_sinks_collect_both_streams() {
    let dir = tempfile::tempdir().unwrap();
    let request = sh(dir.path(), "both.sh", "printf out\nprintf err >&2\n")
        .stdout(Sink::Capture)
        .stderr(Sink::Capture);

    let outcome = ProcessRunner::new().run(&request, &CancelSignal::new()).await;

    assert_eq!(outcome.stdout, b"out");
    assert_eq!(outcome.stderr, b"err");
}

#[tokio::test]
async fn stderr_is_discarded_by_default() {
    let dir = tempfile::tempdir().unwrap();
    let request = sh(dir.path(), "noise.sh", "printf out\nprintf noise >&2\n").stdout(Sink::File(capture(dir.path())));

    let outcome = ProcessRunner::new().run(&request, &CancelSignal::new()).await;

    assert!(outcome.stderr.is_empty());
    assert_eq!(fs::read(capture(dir.path())).unwrap(), b"out");
}

#[tokio::test]
async fn timeout_kills_and_keeps_partial_output() {
    let dir = tempfile::tempdir().unwrap();
    let request = sh(dir.path(), "hang.sh", "printf 'partial'\nexec sleep 30\n")
        .stdout(Sink::File(capture(dir.path())))
        .timeout(Some(Duration::from_millis(300)));

    let started = Instant::now();
    let outcome = ProcessRunner::new().run(&request, &CancelSignal::new()).await;

    assert_eq!(
        outcome.error,
        Some(ExecutionError::TimedOut {
            after: Duration::from_millis(300)
        })
    );
    assert!(started.elapsed() < Duration::from_secs(10));
    assert_eq!(fs::read(capture(dir.path())).unwrap(), b"partial");
}

#[tokio::test]
async fn cancellation_kills_in_flight_process() {
    let dir = tempfile::tempdir().unwrap();
    let request = sh(dir.path(), "hang.sh", "exec sleep 30\n");
    let cancel = CancelSignal::new();

    let canceller = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            cancel.cancel();
        })
    };

    let started = Instant::now();
    let outcome = ProcessRunner::new().run(&request, &cancel).await;
    canceller.await.unwrap();

    assert_eq!(outcome.error, Some(ExecutionError::Cancelled));
    assert!(started.elapsed() < Duration::from_secs(10));
}

#[tokio::test]
async fn missing_executable_leaves_no_capture() {
    let dir = tempfile::tempdir().unwrap();
    let request = CommandRequest::new(dir.path().join("rpal20")).stdout(Sink::File(capture(dir.path())));

    let outcome = ProcessRunner::new().run(&request, &CancelSignal::new()).await;

    match outcome.error {
        Some(ExecutionError::LaunchFailed { reason }) => assert!(reason.contains("not found"), "{reason}"),
        other => panic!("expected launch failure, got {other:?}"),
    }
    assert!(!capture(dir.path()).exists());
}

#[tokio::test]
async fn unwritable_sink_is_a_launch_failure() {
    let dir = tempfile::tempdir().unwrap();
    let request =
        sh(dir.path(), "ok.sh", "printf ok\n").stdout(Sink::File(dir.path().join("missing-dir").join("capture")));

    let outcome = ProcessRunner::new().run(&request, &CancelSignal::new()).await;

    assert!(matches!(outcome.error, Some(ExecutionError::LaunchFailed { .. })));
}

#[tokio::test]
async fn background_child_holding_pipes_does_not_outlive_timeout() {
    let dir = tempfile::tempdir().unwrap();
    let request = sh(dir.path(), "daemon.sh", "printf started\nsleep 6 &\nexit 0\n")
        .stdout(Sink::Capture)
        .stderr(Sink::Capture)
        .timeout(Some(Duration::from_secs(1)));

    let started = Instant::now();
    let outcome = ProcessRunner::new().run(&request, &CancelSignal::new()).await;

    assert_eq!(outcome.exit_code, Some(0));
    assert!(outcome.error.is_none());
    assert!(started.elapsed() < Duration::from_secs(4), "drain waited {:?}", started.elapsed());
}
