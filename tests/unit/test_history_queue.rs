//! Unit tests for the command history queue
//!
//! Persistence and navigation across save/load cycles, exercised through
//! the public API with history files in temporary directories.

use psbridge::models::CommandKind;
use psbridge::{CommandHistory, Error};
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;

fn history_in(dir: &TempDir, max: usize) -> CommandHistory {
    CommandHistory::with_path(max, dir.path().join("nested").join("history.json"))
}

#[test]
fn test_save_and_load_preserves_entries_and_outcomes() {
    let dir = TempDir::new().unwrap();
    let history = history_in(&dir, 10);

    history.add_in("Get-Item C:\\nope", CommandKind::Interactive, PathBuf::from("C:\\"));
    history.update_last_entry(Duration::from_millis(42), false, 1);
    history.add_in("& './build.ps1'", CommandKind::Script, PathBuf::from("C:\\src"));
    history.save().unwrap();

    let reloaded = history_in(&dir, 10);
    reloaded.load().unwrap();
    let entries = reloaded.entries();

    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].command, "Get-Item C:\\nope");
    assert!(!entries[0].success);
    assert_eq!(entries[0].exit_code, 1);
    assert_eq!(entries[0].duration, Duration::from_millis(42));
    assert_eq!(entries[1].kind, CommandKind::Script);
    assert_eq!(entries[1].working_dir, PathBuf::from("C:\\src"));

    // navigation starts past the newest loaded entry
    assert_eq!(reloaded.cursor(), 2);
    assert_eq!(reloaded.previous().as_deref(), Some("& './build.ps1'"));
}

#[test]
fn test_load_truncates_to_capacity() {
    let dir = TempDir::new().unwrap();
    let big = history_in(&dir, 10);
    for i in 0..6 {
        big.add(&format!("cmd-{}", i), CommandKind::Interactive);
    }
    big.save().unwrap();

    let small = history_in(&dir, 3);
    small.load().unwrap();
    let commands: Vec<_> = small.entries().into_iter().map(|e| e.command).collect();
    assert_eq!(commands, vec!["cmd-3", "cmd-4", "cmd-5"]);
}

#[test]
fn test_missing_file_loads_empty() {
    let dir = TempDir::new().unwrap();
    let history = history_in(&dir, 10);

    history.load().unwrap();
    assert!(history.is_empty());
}

#[test]
fn test_corrupt_file_is_reported() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("history.json");
    std::fs::write(&path, "{ not a list").unwrap();

    let history = CommandHistory::with_path(10, path.clone());
    match history.load() {
        Err(Error::HistoryPersistFailed { path: reported, .. }) => assert_eq!(reported, path),
        other => panic!("expected persist failure, got {:?}", other),
    }
}

#[test]
fn test_clear_persists_empty_history() {
    let dir = TempDir::new().unwrap();
    let history = history_in(&dir, 10);
    history.add("Get-Date", CommandKind::Interactive);
    history.save().unwrap();

    history.clear().unwrap();

    let reloaded = history_in(&dir, 10);
    reloaded.load().unwrap();
    assert!(reloaded.is_empty());
}

#[test]
fn test_search_and_recent() {
    let dir = TempDir::new().unwrap();
    let history = history_in(&dir, 10);
    for cmd in ["Get-Process", "Set-Location ..", "get-childitem", "Clear-Host"] {
        history.add(cmd, CommandKind::Interactive);
    }

    let found: Vec<_> = history.search("GET-").into_iter().map(|e| e.command).collect();
    assert_eq!(found, vec!["Get-Process", "get-childitem"]);
    assert!(history.search("").is_empty());

    let recent: Vec<_> = history.recent(2).into_iter().map(|e| e.command).collect();
    assert_eq!(recent, vec!["get-childitem", "Clear-Host"]);
    assert_eq!(history.recent(100).len(), 4);
}

#[test]
fn test_new_entry_resets_navigation() {
    let dir = TempDir::new().unwrap();
    let history = history_in(&dir, 10);
    history.add("one", CommandKind::Interactive);
    history.add("two", CommandKind::Interactive);

    assert_eq!(history.previous().as_deref(), Some("two"));
    assert_eq!(history.previous().as_deref(), Some("one"));

    history.add("three", CommandKind::Interactive);
    assert_eq!(history.previous().as_deref(), Some("three"));
}
