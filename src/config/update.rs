//! Settings for the `[update]` table of the global configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Self-update settings.
///
/// ```toml
/// [update]
/// channel = "beta"          # "" or "stable" follows stable releases
/// check_interval = "12h"
/// check_on_startup = true
/// verify_checksum = true
/// cache_dir = "/var/cache/tasklog"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateConfig {
    /// Release channel to follow. Empty keeps the running build's channel.
    pub channel: String,

    /// How long a check result is reused, e.g. `"24h"`.
    pub check_interval: String,

    /// Whether commands print a banner when an update is available.
    pub check_on_startup: bool,

    /// Whether upgrades verify the published SHA256 checksum.
    pub verify_checksum: bool,

    /// Where the update cache lives. Defaults to the platform cache directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,

    /// Owner of the release repository.
    pub owner: String,

    /// Name of the release repository.
    pub repo: String,
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            channel: String::new(),
            check_interval: "24h".to_string(),
            check_on_startup: true,
            verify_checksum: true,
            cache_dir: None,
            owner: "tasklog".to_string(),
            repo: "tasklog".to_string(),
        }
    }
}

impl UpdateConfig {
    /// The configured cache directory, or `<platform cache dir>/tasklog`.
    ///
    /// Falls back to a `tasklog` directory under the system temp dir when the
    /// platform has no cache directory.
    #[must_use]
    pub fn cache_dir(&self) -> PathBuf {
        self.cache_dir.clone().unwrap_or_else(|| {
            dirs::cache_dir().unwrap_or_else(std::env::temp_dir).join("tasklog")
        })
    }
}
