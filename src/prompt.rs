//! Prompt Generation
//!
//! Renders PowerShell-style prompts for the console from the session's
//! working directory, independently of what the child process prints.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// How prompts are rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PromptStyle {
    /// `PS <path>> `
    #[default]
    Default,
    /// `[<host>]: PS <path>> `
    Remote,
    /// User template with `{path}` and `{dir}` placeholders
    Custom,
}

/// Builds prompt strings for a working directory
#[derive(Debug, Clone)]
pub struct PromptGenerator {
    style: PromptStyle,
    remote_host: String,
    custom_format: String,
    /// Home directory abbreviated to `~`, forward-slash normalized
    home: Option<String>,
}

impl PromptGenerator {
    pub fn new() -> Self {
        Self::with_home(dirs::home_dir())
    }

    /// Create with an explicit home directory (`None` disables `~` substitution)
    pub fn with_home(home: Option<PathBuf>) -> Self {
        let home = home
            .map(|h| to_slash(&h.to_string_lossy()))
            .map(|h| h.trim_end_matches('/').to_string())
            .filter(|h| !h.is_empty());

        Self {
            style: PromptStyle::Default,
            remote_host: String::new(),
            custom_format: String::new(),
            home,
        }
    }

    /// Render the prompt for `current_dir`
    pub fn generate(&self, current_dir: &str) -> String {
        let path = self.display_path(current_dir);

        match self.style {
            PromptStyle::Remote => format!("[{}]: PS {}> ", self.remote_host, path),
            PromptStyle::Custom if !self.custom_format.is_empty() => self.render_custom(&path),
            _ => format!("PS {}> ", path),
        }
    }

    /// Render the prompt wrapped in green
    pub fn generate_ansi(&self, current_dir: &str) -> String {
        format!("\x1b[32m{}\x1b[0m", self.generate(current_dir))
    }

    /// Path as shown in the prompt: `~` for home, forward slashes
    pub fn display_path(&self, current_dir: &str) -> String {
        let path = to_slash(current_dir);

        let Some(home) = self.home.as_deref() else {
            return path;
        };

        if path == home {
            return "~".to_string();
        }
        match path.strip_prefix(home) {
            Some(rest) if rest.starts_with('/') => format!("~{}", rest),
            _ => path,
        }
    }

    fn render_custom(&self, path: &str) -> String {
        let dir = path
            .rsplit('/')
            .find(|component| !component.is_empty())
            .unwrap_or(path);

        let mut result = self
            .custom_format
            .replace("{path}", path)
            .replace("{dir}", dir);

        if !result.ends_with('>') && !result.ends_with("> ") {
            result.push_str("> ");
        }
        result
    }

    pub fn set_style(&mut self, style: PromptStyle) {
        self.style = style;
    }

    /// Switch to the remote style for `host`
    pub fn set_remote_host(&mut self, host: impl Into<String>) {
        self.remote_host = host.into();
        self.style = PromptStyle::Remote;
    }

    /// Switch to the custom style with `format`
    pub fn set_custom_format(&mut self, format: impl Into<String>) {
        self.custom_format = format.into();
        self.style = PromptStyle::Custom;
    }

    pub fn style(&self) -> PromptStyle {
        self.style
    }

    pub fn is_remote_session(&self) -> bool {
        self.style == PromptStyle::Remote
    }

    pub fn remote_host(&self) -> &str {
        &self.remote_host
    }

    pub fn custom_format(&self) -> &str {
        &self.custom_format
    }
}

impl Default for PromptGenerator {
    fn default() -> Self {
        Self::new()
    }
}

fn to_slash(path: &str) -> String {
    path.replace('\\', "/")
}
