use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{ChildStderr, Command};

use crate::config::RunnerConfig;

/// How long to keep reading stderr after the job exits. Background processes
/// that inherited the pipe can hold it open indefinitely.
const STDERR_DRAIN: Duration = Duration::from_millis(100);

/// Longest stderr line kept for the failure description.
const MAX_TAIL_CHARS: usize = 512;

/// Result of running a job's command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub succeeded: bool,
    /// Human-readable reason, set whenever `succeeded` is false.
    pub failure: Option<String>,
    /// Child pid, `None` if the process never launched.
    pub pid: Option<u32>,
}

impl RunOutcome {
    pub fn success(pid: Option<u32>) -> Self {
        Self {
            succeeded: true,
            failure: None,
            pid,
        }
    }

    pub fn failure(reason: impl Into<String>, pid: Option<u32>) -> Self {
        Self {
            succeeded: false,
            failure: Some(reason.into()),
            pid,
        }
    }
}

/// Runs a job to completion. Implementations never time out on their own;
/// a failing or missing program is reported in the outcome, not as an error.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    async fn run(&self, argv: &[String]) -> RunOutcome;
}

/// Spawns `argv[0]` directly with the remaining arguments, no shell.
#[derive(Debug, Clone, Default)]
pub struct CommandRunner {
    config: RunnerConfig,
}

impl CommandRunner {
    pub fn new(config: RunnerConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ProcessRunner for CommandRunner {
    async fn run(&self, argv: &[String]) -> RunOutcome {
        let Some((program, args)) = argv.split_first() else {
            return RunOutcome::failure("empty command", None);
        };

        let mut command = Command::new(program);
        command.args(args).stdin(Stdio::null());
        if self.config.print_output {
            command.stdout(Stdio::inherit()).stderr(Stdio::inherit());
        } else {
            command.stdout(Stdio::null()).stderr(Stdio::piped());
        }

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                tracing::error!(program = %program, error = %e, "Failed to launch job");
                return RunOutcome::failure(format!("failed to launch {}: {}", program, e), None);
            }
        };
        let pid = child.id();
        tracing::debug!(program = %program, pid = ?pid, "Job launched");

        let tail = Arc::new(Mutex::new(None));
        let reader = child
            .stderr
            .take()
            .map(|stderr| tokio::spawn(follow_stderr(stderr, Arc::clone(&tail))));

        let status = child.wait().await;

        if let Some(mut reader) = reader {
            if tokio::time::timeout(STDERR_DRAIN, &mut reader).await.is_err() {
                reader.abort();
                tracing::debug!(program = %program, pid = ?pid, "Stderr still open after exit, not waiting");
            }
        }
        let last = tail.lock().map(|mut tail| tail.take()).unwrap_or_default();

        match status {
            Ok(status) if status.success() => RunOutcome::success(pid),
            Ok(status) => {
                let reason = match last {
                    Some(line) => format!("{}: {}", status, line),
                    None => status.to_string(),
                };
                tracing::info!(program = %program, pid = ?pid, exit_code = ?status.code(), "Job exited unsuccessfully");
                RunOutcome::failure(reason, pid)
            }
            Err(e) => {
                tracing::error!(program = %program, pid = ?pid, error = %e, "Failed waiting for job");
                RunOutcome::failure(format!("failed waiting for {}: {}", program, e), pid)
            }
        }
    }
}

/// Reads stderr line by line, keeping only the last non-empty line.
async fn follow_stderr(stderr: ChildStderr, tail: Arc<Mutex<Option<String>>>) {
    let mut lines = BufReader::new(stderr).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if let Some(line) = tail_line(&line) {
                    if let Ok(mut tail) = tail.lock() {
                        *tail = Some(line);
                    }
                }
            }
            Ok(None) => break,
            Err(e) => {
                tracing::debug!(error = %e, "Stopped reading job stderr");
                break;
            }
        }
    }
}

fn tail_line(line: &str) -> Option<String> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    Some(line.chars().take(MAX_TAIL_CHARS).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tail_line_trims_and_skips_blank_lines() {
        assert_eq!(tail_line("  only  ").as_deref(), Some("only"));
        assert_eq!(tail_line(""), None);
        assert_eq!(tail_line("   "), None);
    }

    #[test]
    fn tail_line_is_bounded() {
        let long = "x".repeat(MAX_TAIL_CHARS * 4);
        assert_eq!(tail_line(&long).unwrap().chars().count(), MAX_TAIL_CHARS);
    }

    #[tokio::test]
    async fn follow_stderr_keeps_last_non_empty_line() {
        let mut child = Command::new("sh")
            .args(["-c", "echo first >&2; echo second >&2; echo >&2"])
            .stderr(Stdio::piped())
            .spawn()
            .unwrap();
        let tail = Arc::new(Mutex::new(None));
        follow_stderr(child.stderr.take().unwrap(), Arc::clone(&tail)).await;
        child.wait().await.unwrap();

        assert_eq!(tail.lock().unwrap().as_deref(), Some("second"));
    }

    #[test]
    fn outcome_constructors() {
        let ok = RunOutcome::success(Some(7));
        assert!(ok.succeeded);
        assert!(ok.failure.is_none());

        let failed = RunOutcome::failure("exit status: 2", None);
        assert!(!failed.succeeded);
        assert_eq!(failed.failure.as_deref(), Some("exit status: 2"));
        assert!(failed.pid.is_none());
    }
}
