//! Configuration File Loading
//!
//! Finds, parses and saves configuration files. The first existing file
//! on the search path wins; when none exists the defaults are used.

use super::Config;
use crate::error::{Error, Result};
use crate::history::STATE_DIR;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable naming an explicit configuration file
pub const CONFIG_ENV_VAR: &str = "PSBRIDGE_CONFIG";

/// Configuration file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Json,
}

impl ConfigFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ConfigFormat::Toml => "toml",
            ConfigFormat::Json => "json",
        }
    }

    /// Format implied by a file extension; TOML when unknown
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => ConfigFormat::Json,
            _ => ConfigFormat::Toml,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            ConfigFormat::Toml => "TOML",
            ConfigFormat::Json => "JSON",
        }
    }

    fn parse(&self, content: &str) -> Result<Config> {
        let parsed = match self {
            ConfigFormat::Toml => toml::from_str(content).map_err(|e| e.to_string()),
            ConfigFormat::Json => serde_json::from_str(content).map_err(|e| e.to_string()),
        };
        parsed.map_err(|reason| Error::ConfigParseFailed {
            format: self.name().to_string(),
            reason,
        })
    }

    fn render(&self, config: &Config) -> Result<String> {
        let rendered = match self {
            ConfigFormat::Toml => toml::to_string_pretty(config).map_err(|e| e.to_string()),
            ConfigFormat::Json => serde_json::to_string_pretty(config).map_err(|e| e.to_string()),
        };
        rendered.map_err(|reason| Error::ConfigSerializationFailed {
            format: self.name().to_string(),
            reason,
        })
    }
}

/// Configuration file loader
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Base paths (without extension) probed in order
    search_paths: Vec<PathBuf>,
    /// Path the current configuration was loaded from
    current_path: Option<PathBuf>,
}

impl ConfigLoader {
    /// Loader over the standard search paths
    pub fn new() -> Self {
        Self::with_search_paths(Self::default_search_paths())
    }

    /// Loader over explicit base paths
    pub fn with_search_paths(search_paths: Vec<PathBuf>) -> Self {
        Self {
            search_paths,
            current_path: None,
        }
    }

    /// Load configuration from the standard locations
    pub fn load() -> Result<Config> {
        Self::new().load_config()
    }

    /// Load the first configuration found, or the defaults.
    ///
    /// `$PSBRIDGE_CONFIG` takes precedence over the search paths.
    pub fn load_config(&mut self) -> Result<Config> {
        if let Some(path) = env::var_os(CONFIG_ENV_VAR).map(PathBuf::from) {
            if path.exists() {
                return self.load_from_path(&path);
            }
            warn!(
                "{} points to missing file {}, ignoring",
                CONFIG_ENV_VAR,
                path.display()
            );
        }

        for base in &self.search_paths {
            for format in [ConfigFormat::Toml, ConfigFormat::Json] {
                let candidate = base.with_extension(format.extension());
                if candidate.exists() {
                    return self.load_from_path(&candidate);
                }
            }
        }

        debug!("No configuration file found, using defaults");
        Ok(Config::default())
    }

    /// Load and validate a specific file
    pub fn load_from_path(&mut self, path: &Path) -> Result<Config> {
        let content = fs::read_to_string(path).map_err(|e| Error::ConfigLoadFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config = ConfigFormat::from_path(path).parse(&content)?;
        config.validate()?;

        info!("Loaded configuration from {}", path.display());
        self.current_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Save to the path the configuration was loaded from, or the default path
    pub fn save(&self, config: &Config) -> Result<PathBuf> {
        let path = match &self.current_path {
            Some(path) => path.clone(),
            None => Self::default_config_path()?,
        };
        self.save_to_path(config, &path)?;
        Ok(path)
    }

    /// Save to `path`, choosing the format from its extension
    pub fn save_to_path(&self, config: &Config, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = ConfigFormat::from_path(path).render(config)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Standard base paths, highest priority first
    fn default_search_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("psbridge").join("config"));
        }
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(STATE_DIR).join("config"));
        }

        paths
    }

    /// `<config_dir>/psbridge/config.toml`
    pub fn default_config_path() -> Result<PathBuf> {
        dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join(STATE_DIR)))
            .map(|dir| dir.join("psbridge").join("config.toml"))
            .ok_or(Error::HomeDirectoryUnavailable)
    }

    pub fn current_path(&self) -> Option<&Path> {
        self.current_path.as_deref()
    }

    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
