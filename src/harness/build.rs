//! Build orchestration.
//!
//! Runs the external build command inside the source directory, checks that the artifact exists and is
//! executable, and moves it to its destination. Any failure here is fatal for the whole run.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use super::cancel::CancelSignal;
use super::command::{CommandRequest, CommandRunner, Sink, is_executable};
use super::errors::BuildError;

/// Number of stderr lines kept for a failed build's diagnostic.
const STDERR_TAIL_LINES: usize = 20;

/// Everything needed to produce the candidate executable.
#[derive(Debug, Clone)]
pub struct BuildRequest {
    /// Directory the build command runs in.
    pub source_dir: PathBuf,
    /// Build command as an argument vector (`["make"]`, `["cargo", "build", "--release"]`, ...).
    pub command: Vec<String>,
    /// Artifact path relative to `source_dir`.
    pub artifact: PathBuf,
    /// Where the artifact is moved to.
    pub destination: PathBuf,
    pub timeout: Option<Duration>,
}

pub struct BuildOrchestrator<R> {
    runner: Arc<R>,
}

impl<R: CommandRunner> BuildOrchestrator<R> {
    pub fn new(runner: Arc<R>) -> Self {
        Self { runner }
    }

    /// Build the candidate and move the artifact to `request.destination`.
    ///
    /// ## Errors
    ///
    /// - `EmptyCommand` if the command vector is empty
    /// - `BuildFailed` if the command cannot be launched, times out, or exits non-zero
    /// - `ArtifactMissing` if the command succeeded without producing the artifact
    /// - `ArtifactNotExecutable` if the artifact lacks the executable bit
    /// - `Relocate` if the artifact cannot be moved into place
    pub async fn build(&self, request: &BuildRequest, cancel: &CancelSignal) -> Result<PathBuf, BuildError> {
        let Some((program, args)) = request.command.split_first() else {
            return Err(BuildError::EmptyCommand);
        };

        let command = CommandRequest::new(program)
            .args(args)
            .current_dir(&request.source_dir)
            .stdout(Sink::Null)
            .stderr(Sink::Capture)
            .timeout(request.timeout);

        tracing::info!(
            command = %command.display(),
            source_dir = %request.source_dir.display(),
            "building candidate"
        );

        let outcome = self.runner.run(&command, cancel).await;
        if !outcome.success() {
            return Err(BuildError::BuildFailed {
                command: request.command.join(" "),
                source_dir: request.source_dir.clone(),
                status: outcome.status(),
                stderr_tail: stderr_tail(&outcome.stderr),
            });
        }

        let artifact = request.source_dir.join(&request.artifact);
        if !artifact.is_file() {
            return Err(BuildError::ArtifactMissing { artifact });
        }
        if !is_executable(&artifact) {
            return Err(BuildError::ArtifactNotExecutable { artifact });
        }

        relocate(&artifact, &request.destination).map_err(|source| BuildError::Relocate {
            from: artifact.clone(),
            to: request.destination.clone(),
            source,
        })?;

        tracing::info!(
            artifact = %request.destination.display(),
            elapsed_ms = outcome.elapsed.as_millis() as u64,
            "build finished"
        );
        Ok(request.destination.clone())
    }
}

fn stderr_tail(stderr: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text.lines().collect();
    if lines.is_empty() {
        return None;
    }
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    Some(lines[start..].join("\n"))
}

/// Move `from` to `to`, replacing any existing file at `to`.
///
/// A plain rename is tried first. If that fails (e.g. across filesystems) the file is copied to a staging
/// sibling of `to` and renamed into place, so `to` never holds a partially written artifact.
pub fn relocate(from: &Path, to: &Path) -> io::Result<()> {
    if let Some(parent) = to.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(rename_err) => {
            tracing::debug!(error = %rename_err, "rename failed, falling back to copy");
            let staging = staging_path(to);
            if let Err(e) = fs::copy(from, &staging).and_then(|_| fs::rename(&staging, to)) {
                let _ = fs::remove_file(&staging);
                return Err(e);
            }
            fs::remove_file(from)
        }
    }
}

fn staging_path(to: &Path) -> PathBuf {
    let mut name = to.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".difftest-partial");
    to.with_file_name(name)
}
