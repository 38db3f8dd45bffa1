//! Error types and Result aliases for psbridge

use std::fmt;
use std::path::PathBuf;

use crate::models::CommandKind;

/// Result type alias for psbridge operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for psbridge
#[derive(Debug)]
pub enum Error {
    // === Startup errors ===
    /// The shell executable could not be launched
    ProcessSpawnFailed {
        command: String,
        reason: String,
    },

    /// A standard stream of the child could not be attached
    PipeUnavailable {
        stream: &'static str,
    },

    /// `start` was called on a communicator that is already running
    AlreadyRunning,

    // === Execution errors ===
    /// Another command is still executing
    Busy,

    /// The child process is not running
    ProcessNotRunning,

    /// Writing to the child's stdin failed
    WriteFailed {
        reason: String,
    },

    /// An execution failed; wraps the underlying cause with the command kind
    ExecutionFailed {
        kind: CommandKind,
        source: Box<Error>,
    },

    /// A script could not be staged for execution
    ScriptStagingFailed {
        reason: String,
    },

    // === Signal errors ===
    /// Failed to deliver a signal to the child
    SignalSendFailed {
        signal: String,
        reason: String,
    },

    /// Signal delivery is not supported on this platform
    SignalNotSupported {
        signal: String,
        platform: String,
    },

    // === Configuration and persistence errors ===
    /// Failed to load configuration file
    ConfigLoadFailed {
        path: PathBuf,
        reason: String,
    },

    /// Failed to parse configuration
    ConfigParseFailed {
        format: String,
        reason: String,
    },

    /// Failed to serialize configuration
    ConfigSerializationFailed {
        format: String,
        reason: String,
    },

    /// Configuration validation failed
    ConfigValidationFailed {
        field: String,
        reason: String,
    },

    /// History could not be read from or written to disk
    HistoryPersistFailed {
        path: PathBuf,
        reason: String,
    },

    /// No home directory could be determined
    HomeDirectoryUnavailable,

    // === I/O and serialization errors ===
    /// I/O errors
    Io(std::io::Error),

    /// Serialization errors
    Serde(serde_json::Error),

    /// TOML parsing errors
    Toml(toml::de::Error),

    /// Regex compilation errors
    Regex(regex::Error),

    // === Generic fallback (use sparingly) ===
    Other(String),
}

impl Error {
    /// Whether the caller may simply retry later
    pub fn is_recoverable(&self) -> bool {
        match self {
            Error::Busy => true,
            Error::ExecutionFailed { source, .. } => source.is_recoverable(),
            _ => false,
        }
    }

    /// Whether this error indicates the child process is gone
    pub fn is_process_failure(&self) -> bool {
        match self {
            Error::ProcessNotRunning | Error::WriteFailed { .. } => true,
            Error::ExecutionFailed { source, .. } => source.is_process_failure(),
            _ => false,
        }
    }

    /// Wrap an execution error with the command kind that produced it
    pub fn execution(kind: CommandKind, source: Error) -> Self {
        Error::ExecutionFailed {
            kind,
            source: Box::new(source),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Startup errors
            Error::ProcessSpawnFailed { command, reason } => {
                write!(f, "Failed to start '{}': {}", command, reason)
            }
            Error::PipeUnavailable { stream } => {
                write!(f, "Failed to attach {} pipe", stream)
            }
            Error::AlreadyRunning => write!(f, "Pipe communicator already running"),

            // Execution errors
            Error::Busy => write!(f, "Another command is executing, please wait"),
            Error::ProcessNotRunning => write!(f, "Shell process is not running"),
            Error::WriteFailed { reason } => {
                write!(f, "Failed to write command: {}", reason)
            }
            Error::ExecutionFailed { kind, source } => {
                write!(f, "{} execution failed: {}", kind, source)
            }
            Error::ScriptStagingFailed { reason } => {
                write!(f, "Failed to stage script: {}", reason)
            }

            // Signal errors
            Error::SignalSendFailed { signal, reason } => {
                write!(f, "Failed to send signal '{}': {}", signal, reason)
            }
            Error::SignalNotSupported { signal, platform } => {
                write!(f, "Signal '{}' not supported on {}", signal, platform)
            }

            // Configuration and persistence errors
            Error::ConfigLoadFailed { path, reason } => {
                write!(f, "Failed to load config from '{}': {}", path.display(), reason)
            }
            Error::ConfigParseFailed { format, reason } => {
                write!(f, "Failed to parse {} config: {}", format, reason)
            }
            Error::ConfigSerializationFailed { format, reason } => {
                write!(f, "Failed to serialize config as {}: {}", format, reason)
            }
            Error::ConfigValidationFailed { field, reason } => {
                write!(f, "Configuration validation failed for '{}': {}", field, reason)
            }
            Error::HistoryPersistFailed { path, reason } => {
                write!(f, "Failed to persist history at '{}': {}", path.display(), reason)
            }
            Error::HomeDirectoryUnavailable => write!(f, "Could not find home directory"),

            // I/O and serialization errors
            Error::Io(err) => write!(f, "I/O error: {}", err),
            Error::Serde(err) => write!(f, "Serialization error: {}", err),
            Error::Toml(err) => write!(f, "TOML parsing error: {}", err),
            Error::Regex(err) => write!(f, "Regex compilation error: {}", err),

            Error::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::ExecutionFailed { source, .. } => Some(source.as_ref()),
            Error::Io(err) => Some(err),
            Error::Serde(err) => Some(err),
            Error::Toml(err) => Some(err),
            Error::Regex(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serde(err)
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Toml(err)
    }
}

impl From<regex::Error> for Error {
    fn from(err: regex::Error) -> Self {
        Error::Regex(err)
    }
}

impl From<String> for Error {
    fn from(err: String) -> Self {
        Error::Other(err)
    }
}

impl From<&str> for Error {
    fn from(err: &str) -> Self {
        Error::Other(err.to_string())
    }
}
