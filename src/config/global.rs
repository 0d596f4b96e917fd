//! Global (user-wide) configuration for tasklog.
//!
//! The file lives at `<config dir>/tasklog/config.toml`:
//! - Linux: `~/.config/tasklog/config.toml`
//! - macOS: `~/Library/Application Support/tasklog/config.toml`
//! - Windows: `%APPDATA%\tasklog\config.toml`
//!
//! The location can be overridden with the `TASKLOG_CONFIG` environment variable
//! or the global `--config` flag.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use super::UpdateConfig;

/// Environment variable overriding the configuration file location.
pub const CONFIG_ENV_VAR: &str = "TASKLOG_CONFIG";

/// Global configuration structure for tasklog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Self-update settings.
    #[serde(default)]
    pub update: UpdateConfig,
}

impl GlobalConfig {
    /// Load from the default location, or defaults if there is no file.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The default path cannot be determined
    /// - The file exists but cannot be read
    /// - The file contains invalid TOML syntax
    pub async fn load() -> Result<Self> {
        Self::load_with_optional(None).await
    }

    /// Load from `path` if given, otherwise from the default location.
    ///
    /// A missing file yields the default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub async fn load_with_optional(path: Option<PathBuf>) -> Result<Self> {
        let path = match path {
            Some(path) => path,
            None => Self::default_path()?,
        };

        if path.exists() {
            Self::load_from(&path).await
        } else {
            debug!("No config file at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Load global configuration from a specific file path.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use tasklog::config::GlobalConfig;
    /// use std::path::Path;
    ///
    /// # async fn example() -> anyhow::Result<()> {
    /// let config = GlobalConfig::load_from(Path::new("/custom/config.toml")).await?;
    /// println!("Following channel '{}'", config.update.channel);
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be read (permissions, not found, etc.)
    /// - The file contains invalid TOML syntax
    /// - The TOML structure doesn't match the expected schema
    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read global config from {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse global config from {}", path.display()))
    }

    /// Get the default file path for global configuration.
    ///
    /// `TASKLOG_CONFIG` wins when set and non-empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform configuration directory cannot be determined.
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = std::env::var_os(CONFIG_ENV_VAR).filter(|p| !p.is_empty()) {
            return Ok(PathBuf::from(path));
        }

        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Unable to determine configuration directory"))?
            .join("tasklog");

        Ok(config_dir.join("config.toml"))
    }
}
