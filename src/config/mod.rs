//! Configuration management for psbridge
//!
//! Every tunable of the translation layer (how the shell is launched, the
//! framing timeouts, history persistence and prompt style) lives here.
//! All sections fall back to their defaults when omitted from a file.

pub mod loader;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::history::DEFAULT_MAX_ENTRIES;
use crate::pipes::queue::DEFAULT_QUEUE_CAPACITY;
use crate::prompt::PromptStyle;

pub use loader::{ConfigFormat, ConfigLoader};

/// Statement sent after startup so output arrives as UTF-8
pub const UTF8_INIT_COMMAND: &str = "[Console]::OutputEncoding = [System.Text.Encoding]::UTF8";

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub shell: ShellConfig,
    pub framing: FramingConfig,
    pub history: HistoryConfig,
    pub prompt: PromptConfig,
    pub session: SessionConfig,
}

impl Config {
    /// Check invariants the runtime relies on
    pub fn validate(&self) -> Result<()> {
        if self.shell.executable.trim().is_empty() {
            return Err(invalid("shell.executable", "Executable cannot be empty"));
        }
        if self.framing.queue_capacity == 0 {
            return Err(invalid(
                "framing.queue_capacity",
                "Queue capacity must be greater than 0",
            ));
        }
        if self.framing.command_timeout_ms == 0 {
            return Err(invalid(
                "framing.command_timeout_ms",
                "Command timeout must be greater than 0",
            ));
        }
        if self.framing.idle_timeout_ms >= self.framing.command_timeout_ms {
            return Err(invalid(
                "framing.idle_timeout_ms",
                "Idle timeout must be shorter than the command timeout",
            ));
        }
        if self.history.max_entries == 0 {
            return Err(invalid(
                "history.max_entries",
                "History size must be greater than 0",
            ));
        }
        Ok(())
    }
}

fn invalid(field: &str, reason: &str) -> Error {
    Error::ConfigValidationFailed {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

/// How the shell process is launched and initialized
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellConfig {
    /// Executable name or path
    pub executable: String,

    /// Startup arguments
    pub args: Vec<String>,

    /// Extra environment variables
    pub environment: HashMap<String, String>,

    /// Wait after spawn before discarding the banner
    pub settle_delay_ms: u64,

    /// Statements written once the banner has been discarded
    pub init_commands: Vec<String>,

    /// Wait after the init commands before discarding their output
    pub init_delay_ms: u64,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            executable: "pwsh".to_string(),
            args: vec![
                "-NoLogo".to_string(),
                "-NoProfile".to_string(),
                "-Interactive".to_string(),
            ],
            environment: HashMap::from([("TERM".to_string(), "xterm-256color".to_string())]),
            settle_delay_ms: 500,
            init_commands: vec![UTF8_INIT_COMMAND.to_string()],
            init_delay_ms: 100,
        }
    }
}

impl ShellConfig {
    /// Launch `executable` with no init commands and no settle delay
    pub fn bare(executable: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            executable: executable.into(),
            args,
            environment: HashMap::new(),
            settle_delay_ms: 0,
            init_commands: Vec::new(),
            init_delay_ms: 0,
        }
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn init_delay(&self) -> Duration {
        Duration::from_millis(self.init_delay_ms)
    }
}

/// Response collection timings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FramingConfig {
    /// Wait after writing a command before reading
    pub initial_delay_ms: u64,

    /// Silence after output that ends a response
    pub idle_timeout_ms: u64,

    /// Absolute ceiling for one response
    pub command_timeout_ms: u64,

    /// Lines buffered between reads
    pub queue_capacity: usize,
}

impl Default for FramingConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: 150,
            idle_timeout_ms: 400,
            command_timeout_ms: 5000,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl FramingConfig {
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }
}

/// History persistence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub max_entries: usize,

    /// History file; `~/.psbridge/history.json` when unset
    pub path: Option<PathBuf>,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_ENTRIES,
            path: None,
        }
    }
}

/// Prompt rendering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PromptConfig {
    pub style: PromptStyle,
    pub custom_format: Option<String>,
    pub remote_host: Option<String>,
}

/// Session bootstrap
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Wait before the first version and directory queries
    pub init_delay_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { init_delay_ms: 500 }
    }
}

impl SessionConfig {
    pub fn init_delay(&self) -> Duration {
        Duration::from_millis(self.init_delay_ms)
    }
}
