//! Logging setup
//!
//! Installs a `tracing` subscriber for embedding applications. `RUST_LOG`
//! overrides the level chosen by the debug flag.

use std::env;
use std::fs::{self, File};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

use crate::error::{Error, Result};
use crate::history::STATE_DIR;

/// Environment variable that turns on debug logging (`1` or `true`)
pub const DEBUG_ENV_VAR: &str = "PSBRIDGE_DEBUG";

fn env_filter(debug: bool) -> EnvFilter {
    let debug = debug
        || env::var(DEBUG_ENV_VAR).is_ok_and(|v| v == "1" || v.eq_ignore_ascii_case("true"));
    let level = if debug { "debug" } else { "info" };

    EnvFilter::from(env::var("RUST_LOG").unwrap_or_else(|_| level.to_string()))
}

/// Log compactly to stderr
pub fn init(debug: bool) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(debug))
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .compact()
        .try_init()
        .map_err(|e| Error::Other(format!("Failed to install subscriber: {}", e)))
}

/// Log everything at debug level to a new timestamped file.
///
/// Returns the path of the log file.
pub fn init_file() -> Result<PathBuf> {
    let dir = log_dir()?;
    fs::create_dir_all(&dir)?;

    let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
    let path = dir.join(format!("psbridge-debug-{}.log", stamp));
    let file = File::create(&path)?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_ansi(false)
        .with_thread_ids(true)
        .with_writer(Mutex::new(file))
        .try_init()
        .map_err(|e| Error::Other(format!("Failed to install subscriber: {}", e)))?;

    info!("Debug log started at {}", path.display());
    Ok(path)
}

/// `~/.psbridge/logs`
pub fn log_dir() -> Result<PathBuf> {
    dirs::home_dir()
        .map(|home| home.join(STATE_DIR).join("logs"))
        .ok_or(Error::HomeDirectoryUnavailable)
}
