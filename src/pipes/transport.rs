//! Shell transport abstraction
//!
//! Decouples the translation layer from the concrete child-process
//! plumbing so it can be driven by alternate transports or test doubles.

use async_trait::async_trait;
use std::io::Write;
use tempfile::NamedTempFile;

use super::framing::CommandResponse;
use crate::error::{Error, Result};
use crate::models::CommandKind;

/// Operations the translation layer needs from a running shell
#[async_trait]
pub trait ShellTransport: Send + Sync {
    /// Submit one command and collect its response
    ///
    /// # Errors
    /// Returns `Error::ProcessNotRunning` if the shell is gone, or
    /// `Error::WriteFailed` if the command could not be written.
    async fn send_command(&self, command: &str, kind: CommandKind) -> Result<CommandResponse>;

    /// Evaluate `expression` for its string output
    async fn query_state(&self, expression: &str) -> Result<String> {
        let command = format!("({}) | Out-String -Stream", expression);
        Ok(self.send_command(&command, CommandKind::Internal).await?.output)
    }

    /// Run a script file in the session
    async fn execute_script(&self, path: &str) -> Result<CommandResponse> {
        self.send_command(&script_invocation(path), CommandKind::Script)
            .await
    }

    /// Run `text` as a script; the staged file is removed afterwards
    async fn execute_script_text(&self, text: &str) -> Result<CommandResponse> {
        let staged = stage_script(text)?;
        let path = staged.path().to_string_lossy().into_owned();
        self.execute_script(&path).await
    }

    /// Interrupt the running command (Ctrl+C)
    async fn send_interrupt(&self) -> Result<()>;

    /// Terminate the shell; safe to call repeatedly
    async fn stop(&self) -> Result<()>;

    fn is_running(&self) -> bool;
}

/// `& '<path>'` with embedded single quotes doubled
pub fn script_invocation(path: &str) -> String {
    format!("& '{}'", path.replace('\'', "''"))
}

/// Write `text` to a temporary `.ps1` file
pub fn stage_script(text: &str) -> Result<NamedTempFile> {
    let staging_error = |e: std::io::Error| Error::ScriptStagingFailed {
        reason: e.to_string(),
    };

    let mut file = tempfile::Builder::new()
        .prefix("psbridge-")
        .suffix(".ps1")
        .tempfile()
        .map_err(staging_error)?;
    file.write_all(text.as_bytes()).map_err(staging_error)?;
    file.flush().map_err(staging_error)?;

    trace!("Staged {} bytes at {}", text.len(), file.path().display());
    Ok(file)
}
