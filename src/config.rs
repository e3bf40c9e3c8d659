//! Configuration management for Chatkeep
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.

use crate::derive::{DEFAULT_PREVIEW_CHARS, DEFAULT_TITLE_CHARS};
use crate::error::{ChatkeepError, Result};
use crate::settings::normalize_backend_url;
use crate::storage::default_data_dir;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure for Chatkeep
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Where conversation history lives
    #[serde(default)]
    pub storage: StorageConfig,
    /// Chat backend connection
    #[serde(default)]
    pub backend: BackendConfig,
    /// Title and preview derivation
    #[serde(default)]
    pub history: HistoryConfig,
}

/// Storage configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory of the embedded database
    ///
    /// When unset the platform data directory is used.
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Rebuild the conversation index on open if it disagrees with the records
    #[serde(default)]
    pub repair_on_open: bool,
}

/// Chat backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Fallback base URL, used when no URL has been saved in settings
    #[serde(default)]
    pub base_url: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

fn default_timeout() -> u64 {
    crate::client::DEFAULT_TIMEOUT_SECS
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_seconds: default_timeout(),
        }
    }
}

/// History derivation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Maximum characters of the preview shown in listings
    #[serde(default = "default_preview_chars")]
    pub preview_chars: usize,

    /// Maximum characters of a derived title
    #[serde(default = "default_title_chars")]
    pub title_chars: usize,
}

fn default_preview_chars() -> usize {
    DEFAULT_PREVIEW_CHARS
}

fn default_title_chars() -> usize {
    DEFAULT_TITLE_CHARS
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            preview_chars: default_preview_chars(),
            title_chars: default_title_chars(),
        }
    }
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// A missing file is not an error; defaults are used instead.
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ChatkeepError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| ChatkeepError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if let Ok(url) = std::env::var("CHATKEEP_BACKEND_URL") {
            self.backend.base_url = Some(url);
        }

        if let Ok(path) = std::env::var("CHATKEEP_STORAGE_PATH") {
            self.storage.path = Some(PathBuf::from(path));
        }

        if let Ok(timeout) = std::env::var("CHATKEEP_TIMEOUT_SECONDS") {
            if let Ok(value) = timeout.parse() {
                self.backend.timeout_seconds = value;
            } else {
                tracing::warn!("Ignoring invalid CHATKEEP_TIMEOUT_SECONDS: {}", timeout);
            }
        }

        if let Ok(chars) = std::env::var("CHATKEEP_PREVIEW_CHARS") {
            if let Ok(value) = chars.parse() {
                self.history.preview_chars = value;
            } else {
                tracing::warn!("Ignoring invalid CHATKEEP_PREVIEW_CHARS: {}", chars);
            }
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if let Some(path) = &cli.storage_path {
            self.storage.path = Some(path.clone());
        }
        if cli.verbose {
            tracing::debug!("Verbose mode enabled");
        }
    }

    /// Directory of the embedded database
    pub fn storage_dir(&self) -> Result<PathBuf> {
        match &self.storage.path {
            Some(path) => Ok(path.clone()),
            None => default_data_dir(),
        }
    }

    /// HTTP request timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.backend.timeout_seconds)
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns error if any value is out of range or the fallback URL is malformed
    pub fn validate(&self) -> Result<()> {
        if self.backend.timeout_seconds == 0 {
            return Err(ChatkeepError::Config(
                "backend.timeout_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        if self.history.preview_chars == 0 {
            return Err(ChatkeepError::Config(
                "history.preview_chars must be greater than 0".to_string(),
            )
            .into());
        }

        // Titles are cut to max - 3 plus an ellipsis
        if self.history.title_chars < 4 {
            return Err(ChatkeepError::Config(
                "history.title_chars must be at least 4".to_string(),
            )
            .into());
        }

        if let Some(url) = &self.backend.base_url {
            normalize_backend_url(url).map_err(|e| {
                ChatkeepError::Config(format!("backend.base_url is invalid: {}", e))
            })?;
        }

        if let Some(path) = &self.storage.path {
            if path.as_os_str().is_empty() {
                return Err(
                    ChatkeepError::Config("storage.path cannot be empty".to_string()).into(),
                );
            }
        }

        Ok(())
    }
}
