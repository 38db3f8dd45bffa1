//! Persistent command history
//!
//! A bounded, chronologically ordered list of submitted commands with
//! shell-style Up/Down navigation. The whole list is persisted as a JSON
//! array and rewritten on every save.

use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::models::{CommandEntry, CommandKind};

/// Directory under the home directory holding psbridge state
pub const STATE_DIR: &str = ".psbridge";

/// Default history file name
const DEFAULT_HISTORY_FILE: &str = "history.json";

/// Maximum number of history entries to keep
pub const DEFAULT_MAX_ENTRIES: usize = 1000;

#[derive(Debug)]
struct HistoryInner {
    entries: VecDeque<CommandEntry>,
    /// Navigation position; `entries.len()` means "past the newest entry"
    cursor: usize,
}

/// Bounded command history with navigation and persistence
#[derive(Debug)]
pub struct CommandHistory {
    inner: RwLock<HistoryInner>,
    max_size: usize,
    history_file: PathBuf,
}

impl CommandHistory {
    /// Create a history persisted at the default location
    pub fn new(max_size: usize) -> Result<Self> {
        Ok(Self::with_path(max_size, Self::default_history_path()?))
    }

    /// Create with custom history file path
    pub fn with_path(max_size: usize, path: PathBuf) -> Self {
        Self {
            inner: RwLock::new(HistoryInner {
                entries: VecDeque::with_capacity(max_size.min(DEFAULT_MAX_ENTRIES)),
                cursor: 0,
            }),
            max_size: max_size.max(1),
            history_file: path,
        }
    }

    /// `~/.psbridge/history.json`
    pub fn default_history_path() -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or(Error::HomeDirectoryUnavailable)?;
        Ok(home.join(STATE_DIR).join(DEFAULT_HISTORY_FILE))
    }

    fn read(&self) -> RwLockReadGuard<'_, HistoryInner> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HistoryInner> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Add a command run in the process working directory
    pub fn add(&self, command: &str, kind: CommandKind) -> bool {
        let dir = std::env::current_dir().unwrap_or_default();
        self.add_in(command, kind, dir)
    }

    /// Add a command run in `working_dir`.
    ///
    /// Empty commands and exact repeats of the newest entry are not added;
    /// whitespace-only commands are kept like any other text. Returns whether
    /// the newest entry now holds `command`, i.e. `false` only for an empty
    /// command. Navigation resets to past the newest entry.
    pub fn add_in(&self, command: &str, kind: CommandKind, working_dir: PathBuf) -> bool {
        if command.is_empty() {
            return false;
        }

        let mut inner = self.write();
        if inner
            .entries
            .back()
            .is_some_and(|last| last.is_repeat_of(command, kind))
        {
            trace!("Skipping consecutive duplicate history entry");
            inner.cursor = inner.entries.len();
            return true;
        }

        inner
            .entries
            .push_back(CommandEntry::new(command.to_string(), kind, working_dir));
        while inner.entries.len() > self.max_size {
            inner.entries.pop_front();
        }
        inner.cursor = inner.entries.len();
        true
    }

    /// Step back toward older entries
    pub fn previous(&self) -> Option<String> {
        let mut inner = self.write();
        if inner.entries.is_empty() {
            return None;
        }

        inner.cursor = inner.cursor.saturating_sub(1);
        inner.entries.get(inner.cursor).map(|e| e.command.clone())
    }

    /// Step forward toward newer entries; past the newest yields an empty line
    pub fn next(&self) -> Option<String> {
        let mut inner = self.write();
        let len = inner.entries.len();
        if len == 0 {
            return None;
        }

        if inner.cursor + 1 >= len {
            inner.cursor = len;
            return Some(String::new());
        }

        inner.cursor += 1;
        inner.entries.get(inner.cursor).map(|e| e.command.clone())
    }

    /// Record how the newest command finished
    pub fn update_last_entry(&self, duration: Duration, success: bool, exit_code: i32) {
        if let Some(last) = self.write().entries.back_mut() {
            last.record_outcome(duration, success, exit_code);
        }
    }

    /// Write the full history to disk
    pub fn save(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.read().entries)?;

        if let Some(parent) = self.history_file.parent() {
            fs::create_dir_all(parent).map_err(|e| self.persist_error(e))?;
        }
        fs::write(&self.history_file, json).map_err(|e| self.persist_error(e))?;

        debug!("Saved history to {}", self.history_file.display());
        Ok(())
    }

    /// Replace in-memory history with the persisted one, if any
    pub fn load(&self) -> Result<()> {
        if !self.history_file.exists() {
            return Ok(());
        }

        let data = fs::read_to_string(&self.history_file).map_err(|e| self.persist_error(e))?;
        let mut entries: VecDeque<CommandEntry> =
            serde_json::from_str(&data).map_err(|e| self.persist_error(e))?;
        while entries.len() > self.max_size {
            entries.pop_front();
        }

        let mut inner = self.write();
        inner.cursor = entries.len();
        inner.entries = entries;

        info!(
            "Loaded {} history entries from {}",
            inner.entries.len(),
            self.history_file.display()
        );
        Ok(())
    }

    fn persist_error(&self, err: impl std::fmt::Display) -> Error {
        Error::HistoryPersistFailed {
            path: self.history_file.clone(),
            reason: err.to_string(),
        }
    }

    /// Case-insensitive substring search, oldest match first
    pub fn search(&self, query: &str) -> Vec<CommandEntry> {
        if query.is_empty() {
            return Vec::new();
        }

        let query = query.to_lowercase();
        self.read()
            .entries
            .iter()
            .filter(|entry| entry.command.to_lowercase().contains(&query))
            .cloned()
            .collect()
    }

    /// All entries, oldest first
    pub fn entries(&self) -> Vec<CommandEntry> {
        self.read().entries.iter().cloned().collect()
    }

    /// The newest `n` entries, oldest first
    pub fn recent(&self, n: usize) -> Vec<CommandEntry> {
        let inner = self.read();
        let skip = inner.entries.len().saturating_sub(n);
        inner.entries.iter().skip(skip).cloned().collect()
    }

    /// Drop every entry and persist the empty history
    pub fn clear(&self) -> Result<()> {
        {
            let mut inner = self.write();
            inner.entries.clear();
            inner.cursor = 0;
        }
        self.save()
    }

    pub fn reset_cursor(&self) {
        let mut inner = self.write();
        inner.cursor = inner.entries.len();
    }

    pub fn len(&self) -> usize {
        self.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().entries.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.read().cursor
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Get history file path
    pub fn history_file(&self) -> &Path {
        &self.history_file
    }
}
