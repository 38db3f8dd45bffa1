//! Integration Tests against a real PowerShell
//!
//! These tests need `pwsh` on the PATH and return early when it is absent.

use psbridge::{Config, PromptStyle, StreamKind, TranslationLayer};
use std::process::Command;
use std::time::Duration;
use tempfile::TempDir;

fn pwsh_available() -> bool {
    Command::new("pwsh")
        .args(["-NoLogo", "-NoProfile", "-Command", "exit 0"])
        .output()
        .map(|out| out.status.success())
        .unwrap_or(false)
}

async fn start_layer(dir: &TempDir) -> TranslationLayer {
    let mut config = Config::default();
    config.history.path = Some(dir.path().join("history.json"));
    config.framing.command_timeout_ms = 10_000;

    let layer = TranslationLayer::new(config).await.unwrap();
    layer.initialize_session().await;
    layer
}

#[tokio::test]
async fn test_plain_command_scenario() {
    if !pwsh_available() {
        eprintln!("pwsh not found, skipping");
        return;
    }

    let dir = TempDir::new().unwrap();
    let layer = start_layer(&dir).await;

    assert!(!layer.ps_version().is_empty());
    assert!(!layer.current_directory().is_empty());

    let output = layer
        .execute_command("Write-Output 'hello from psbridge'")
        .await
        .unwrap();
    assert!(output.contains("hello from psbridge"));
    assert!(!layer.is_executing());

    let records = layer.parse_output(&output).unwrap();
    assert!(records
        .iter()
        .any(|r| r.stream == StreamKind::Output && r.content.contains("hello from psbridge")));

    let prompt = layer.prompt();
    assert!(prompt.starts_with("PS "));
    assert!(prompt.ends_with("> "));

    layer.shutdown().await.unwrap();
    let history = std::fs::read_to_string(dir.path().join("history.json")).unwrap();
    assert!(history.contains("hello from psbridge"));
}

#[tokio::test]
async fn test_directory_follows_set_location() {
    if !pwsh_available() {
        eprintln!("pwsh not found, skipping");
        return;
    }

    let dir = TempDir::new().unwrap();
    let target = TempDir::new().unwrap();
    let layer = start_layer(&dir).await;

    let name = target
        .path()
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap()
        .to_string();
    layer
        .execute_command(&format!("Set-Location '{}'", target.path().display()))
        .await
        .unwrap();

    assert!(layer.current_directory().ends_with(&name));

    layer.set_prompt_style(PromptStyle::Custom);
    layer.set_custom_prompt("{dir}>");
    assert_eq!(layer.prompt(), format!("{}>", name));

    layer.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_interrupt_stops_long_command() {
    if !pwsh_available() {
        eprintln!("pwsh not found, skipping");
        return;
    }

    let dir = TempDir::new().unwrap();
    let layer = std::sync::Arc::new(start_layer(&dir).await);

    let running = std::sync::Arc::clone(&layer);
    let handle = tokio::spawn(async move {
        running
            .execute_command("while ($true) { Start-Sleep -Milliseconds 50 }")
            .await
    });

    while !layer.is_executing() {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    tokio::time::sleep(Duration::from_millis(300)).await;
    let _ = layer.stop_execution().await;

    let _ = handle.await.unwrap();
    assert!(!layer.is_executing());
    assert_eq!(layer.history().len(), 1);

    layer.shutdown().await.unwrap();
}
