//! Command Entry Model
//!
//! One historical invocation of a command: what was submitted, where, when,
//! and how the execution turned out. Entries are created with a
//! placeholder outcome when a command is accepted and updated exactly once
//! after it completes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Origin of a submitted command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CommandKind {
    /// Typed into the console
    #[default]
    Interactive,
    /// A script file run from the editor
    Script,
    /// Selected editor text
    Selection,
    /// State queries issued by the layer itself (prompt refresh, version probe)
    Internal,
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CommandKind::Interactive => "interactive",
            CommandKind::Script => "script",
            CommandKind::Selection => "selection",
            CommandKind::Internal => "internal",
        };
        f.write_str(name)
    }
}

/// A single command in history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandEntry {
    /// The command text as submitted
    pub command: String,

    /// When the command was accepted for execution
    pub timestamp: DateTime<Utc>,

    /// Where the command came from
    pub kind: CommandKind,

    /// Working directory at submission time
    pub working_dir: PathBuf,

    /// How long the execution took
    pub duration: Duration,

    /// Whether the execution succeeded
    pub success: bool,

    /// Exit code recorded for the execution
    pub exit_code: i32,
}

impl CommandEntry {
    /// Create a new entry with a successful placeholder outcome
    pub fn new(command: String, kind: CommandKind, working_dir: PathBuf) -> Self {
        Self {
            command,
            timestamp: Utc::now(),
            kind,
            working_dir,
            duration: Duration::ZERO,
            success: true,
            exit_code: 0,
        }
    }

    /// Record the outcome of the execution
    pub fn record_outcome(&mut self, duration: Duration, success: bool, exit_code: i32) {
        self.duration = duration;
        self.success = success;
        self.exit_code = exit_code;
    }

    /// Same command text and kind as `other`
    pub fn is_repeat_of(&self, command: &str, kind: CommandKind) -> bool {
        self.command == command && self.kind == kind
    }
}
