use std::time::{Duration, Instant};

use cronlock::config::RunnerConfig;
use cronlock::worker::{CommandRunner, ProcessRunner};

/// Create a test runner that captures stderr
fn test_runner() -> CommandRunner {
    CommandRunner::new(RunnerConfig::default())
}

fn argv(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn test_execute_simple_command() {
    let outcome = test_runner().run(&argv(&["echo", "hello"])).await;

    assert!(outcome.succeeded);
    assert!(outcome.failure.is_none());
    assert!(outcome.pid.is_some());
}

#[tokio::test]
async fn test_execute_command_failure() {
    let outcome = test_runner().run(&argv(&["false"])).await;

    assert!(!outcome.succeeded);
    assert!(outcome.pid.is_some());
    assert_eq!(outcome.failure.as_deref(), Some("exit status: 1"));
}

#[tokio::test]
async fn test_execute_nonzero_exit_code() {
    let outcome = test_runner()
        .run(&argv(&["test", "-f", "/tmp/cronlock-does-not-exist-12345"]))
        .await;

    assert!(!outcome.succeeded);
    assert_eq!(outcome.failure.as_deref(), Some("exit status: 1"));
}

#[tokio::test]
async fn test_execute_failure_includes_last_stderr_line() {
    let outcome = test_runner()
        .run(&argv(&["sh", "-c", "echo first >&2; echo 'error message' >&2; exit 3"]))
        .await;

    assert!(!outcome.succeeded);
    let failure = outcome.failure.unwrap();
    assert!(failure.starts_with("exit status: 3"));
    assert!(failure.ends_with("error message"));
    assert!(!failure.contains("first"));
}

#[tokio::test]
async fn test_execute_invalid_command() {
    let outcome = test_runner()
        .run(&argv(&["nonexistent_command_12345", "not", "an", "executable"]))
        .await;

    assert!(!outcome.succeeded);
    assert!(outcome.pid.is_none());
    let failure = outcome.failure.unwrap();
    assert!(failure.starts_with("failed to launch nonexistent_command_12345"));
}

#[tokio::test]
async fn test_execute_empty_argv() {
    let outcome = test_runner().run(&[]).await;

    assert!(!outcome.succeeded);
    assert_eq!(outcome.failure.as_deref(), Some("empty command"));
}

#[tokio::test]
async fn test_execute_does_not_use_a_shell() {
    // Without a shell the pipe is passed to echo as a literal argument.
    let outcome = test_runner()
        .run(&argv(&["echo", "hello", "|", "false"]))
        .await;

    assert!(outcome.succeeded);
}

#[tokio::test]
async fn test_execute_with_inherited_output() {
    let runner = CommandRunner::new(RunnerConfig { print_output: true });
    let outcome = runner.run(&argv(&["sh", "-c", "echo visible; exit 2"])).await;

    assert!(!outcome.succeeded);
    assert_eq!(outcome.failure.as_deref(), Some("exit status: 2"));
}

#[tokio::test]
async fn test_execute_returns_when_job_exits_despite_background_child() {
    // The backgrounded sleep inherits stderr and keeps the pipe open.
    let start = Instant::now();
    let outcome = test_runner()
        .run(&argv(&["sh", "-c", "sleep 3 & exit 0"]))
        .await;

    assert!(outcome.succeeded);
    assert!(start.elapsed() < Duration::from_secs(1));
}

#[tokio::test]
async fn test_execute_failure_keeps_stderr_with_background_child() {
    let start = Instant::now();
    let outcome = test_runner()
        .run(&argv(&["sh", "-c", "echo 'disk full' >&2; sleep 3 & exit 4"]))
        .await;

    assert!(start.elapsed() < Duration::from_secs(1));
    assert_eq!(outcome.failure.as_deref(), Some("exit status: 4: disk full"));
}

#[tokio::test]
async fn test_execute_long_stderr_line_is_truncated() {
    let outcome = test_runner()
        .run(&argv(&["sh", "-c", "head -c 100000 /dev/zero | tr '\\0' x >&2; exit 1"]))
        .await;

    let failure = outcome.failure.unwrap();
    assert!(failure.starts_with("exit status: 1: xxx"));
    assert!(failure.len() < 1024);
}
