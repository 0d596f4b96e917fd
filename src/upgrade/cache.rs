//! Persisted result of the last update check.
//!
//! The cache throttles network calls: a check only reaches the release host when
//! no entry exists or the entry is older than the configured interval. Every
//! failure in this module is logged and swallowed, since update checking must
//! never get in the way of normal tool usage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::debug;

use super::UpdateNotification;

/// File name of the cache inside the cache directory.
pub const CACHE_FILE_NAME: &str = "update_cache.json";

/// Cached outcome of an update check.
///
/// Serialized as a JSON object with snake_case keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateCache {
    /// When the release host was last queried.
    pub last_check: DateTime<Utc>,
    /// Whether a newer release was found at that time.
    pub update_available: bool,
    /// Running version at check time.
    pub current_version: String,
    /// Latest release version seen.
    pub latest_version: String,
    /// Whether that release is a pre-release.
    #[serde(default)]
    pub is_prerelease: bool,
    /// Web page of the release.
    #[serde(default)]
    pub release_url: String,
    /// Whether the user dismissed the notification for `latest_version`.
    #[serde(default)]
    pub dismissed: bool,
}

impl UpdateCache {
    /// Lightweight projection used for "you're out of date" banners.
    #[must_use]
    pub fn notification(&self) -> UpdateNotification {
        UpdateNotification {
            available: self.update_available,
            current_version: self.current_version.clone(),
            latest_version: self.latest_version.clone(),
            is_prerelease: self.is_prerelease,
            release_url: self.release_url.clone(),
        }
    }
}

/// Whether a new check is due, measured against the current time.
#[must_use]
pub fn should_check(cache: Option<&UpdateCache>, interval: Duration) -> bool {
    should_check_at(cache, interval, Utc::now())
}

/// Whether a new check is due at `now`.
///
/// True without a cache, or when the cache is strictly older than `interval`.
/// An age exactly equal to the interval does not trigger a check.
#[must_use]
pub fn should_check_at(
    cache: Option<&UpdateCache>,
    interval: Duration,
    now: DateTime<Utc>,
) -> bool {
    let Some(cache) = cache else {
        return true;
    };

    let Ok(interval) = chrono::Duration::from_std(interval) else {
        // Interval too large to represent; it never elapses.
        return false;
    };

    now - cache.last_check > interval
}

/// Reads and writes [`UpdateCache`] in a per-user cache directory.
#[derive(Debug, Clone)]
pub struct UpdateCacheStore {
    dir: PathBuf,
}

impl UpdateCacheStore {
    /// Create a store rooted at `dir`. The directory is created on first save.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
        }
    }

    /// Location of the cache file.
    #[must_use]
    pub fn path(&self) -> PathBuf {
        self.dir.join(CACHE_FILE_NAME)
    }

    /// Directory holding the cache file.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Load the cache. Missing, unreadable, or corrupt files read as `None`.
    pub async fn load(&self) -> Option<UpdateCache> {
        let path = self.path();
        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) => {
                debug!("No usable update cache at {}: {}", path.display(), e);
                return None;
            }
        };

        match serde_json::from_str(&content) {
            Ok(cache) => Some(cache),
            Err(e) => {
                debug!("Failed to parse update cache {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Persist the cache. Failures are logged and otherwise ignored.
    pub async fn save(&self, cache: &UpdateCache) {
        if let Err(e) = self.try_save(cache).await {
            debug!("Failed to write update cache: {:#}", e);
        }
    }

    /// Remove the cache file, if any. Failures are logged and otherwise ignored.
    pub async fn clear(&self) {
        let path = self.path();
        match fs::remove_file(&path).await {
            Ok(()) => debug!("Cleared update cache"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => debug!("Failed to remove update cache {}: {}", path.display(), e),
        }
    }

    async fn try_save(&self, cache: &UpdateCache) -> anyhow::Result<()> {
        use anyhow::Context;

        fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("Failed to create cache directory {}", self.dir.display()))?;

        let content =
            serde_json::to_string_pretty(cache).context("Failed to serialize update cache")?;

        // Write next to the target so the rename stays on one file system.
        let path = self.path();
        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, content)
            .await
            .with_context(|| format!("Failed to write {}", temp_path.display()))?;
        fs::rename(&temp_path, &path)
            .await
            .with_context(|| {
                format!("Failed to move update cache into place at {}", path.display())
            })?;

        debug!("Saved update check to cache");
        Ok(())
    }
}
