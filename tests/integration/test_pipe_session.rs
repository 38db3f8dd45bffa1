//! Integration Tests for the Pipe Communicator
//!
//! Drives a real child process (`/bin/sh` reading commands from stdin)
//! through the full spawn/write/read/frame cycle. The shell never prints a
//! prompt, so responses end on the idle window unless a test prints a
//! prompt-shaped line itself.

#![cfg(unix)]

use psbridge::config::{FramingConfig, ShellConfig};
use psbridge::{CommandKind, Config, Error, PipeCommunicator, Termination, TranslationLayer};
use std::time::Duration;

fn framing() -> FramingConfig {
    FramingConfig {
        initial_delay_ms: 20,
        idle_timeout_ms: 200,
        command_timeout_ms: 3000,
        ..FramingConfig::default()
    }
}

async fn sh() -> PipeCommunicator {
    let comm = PipeCommunicator::new(ShellConfig::bare("/bin/sh", Vec::new()), framing());
    comm.start().await.unwrap();
    comm
}

#[tokio::test]
async fn test_output_ends_on_idle_window() {
    let comm = sh().await;

    let response = comm
        .send_command("echo one; echo two", CommandKind::Interactive)
        .await
        .unwrap();

    assert_eq!(response.output, "one\ntwo");
    assert_eq!(response.lines, 2);
    assert_eq!(response.termination, Termination::Idle);
    assert!(response.elapsed >= Duration::from_millis(200));

    comm.stop().await.unwrap();
}

#[tokio::test]
async fn test_prompt_line_ends_collection() {
    let comm = sh().await;

    let response = comm
        .send_command("echo result; echo 'PS /tmp>'", CommandKind::Interactive)
        .await
        .unwrap();

    assert_eq!(response.output, "result");
    assert_eq!(response.termination, Termination::Prompt);

    comm.stop().await.unwrap();
}

#[tokio::test]
async fn test_stderr_lines_are_collected() {
    let comm = sh().await;

    let response = comm
        .send_command("echo oops 1>&2", CommandKind::Interactive)
        .await
        .unwrap();

    assert_eq!(response.output, "oops");

    comm.stop().await.unwrap();
}

#[tokio::test]
async fn test_burst_keeps_newest_lines() {
    let comm = sh().await;

    let response = comm
        .send_command(
            "i=1; while [ $i -le 300 ]; do echo line-$i; i=$((i+1)); done",
            CommandKind::Interactive,
        )
        .await
        .unwrap();

    assert!(response.output.ends_with("line-300"));
    assert!(response.lines <= 300);
    assert_eq!(response.lines as u64 + comm.dropped_lines(), 300);

    comm.stop().await.unwrap();
}

#[tokio::test]
async fn test_exit_is_reported_and_later_sends_fail() {
    let comm = sh().await;

    let response = comm
        .send_command("exit", CommandKind::Interactive)
        .await
        .unwrap();
    assert_eq!(response.termination, Termination::Exited);
    assert!(!comm.is_running());

    let err = comm
        .send_command("echo again", CommandKind::Interactive)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ProcessNotRunning));

    comm.stop().await.unwrap();
}

#[tokio::test]
async fn test_restart_after_stop() {
    let comm = sh().await;
    comm.stop().await.unwrap();
    assert!(!comm.is_running());
    assert_eq!(comm.pid(), 0);

    comm.start().await.unwrap();
    let response = comm
        .send_command("echo back", CommandKind::Interactive)
        .await
        .unwrap();
    assert_eq!(response.output, "back");

    comm.stop().await.unwrap();
}

#[tokio::test]
async fn test_layer_start_failure_is_reported() {
    let mut config = Config::default();
    config.shell = ShellConfig::bare("/nonexistent/psbridge-shell", Vec::new());

    match TranslationLayer::new(config).await {
        Err(Error::ProcessSpawnFailed { command, .. }) => {
            assert_eq!(command, "/nonexistent/psbridge-shell");
        }
        Err(other) => panic!("unexpected error: {}", other),
        Ok(_) => panic!("layer started without a shell"),
    }
}
