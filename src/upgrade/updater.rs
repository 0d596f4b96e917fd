//! The update orchestrator.
//!
//! [`Updater`] ties the pieces together: it consults the cache, picks a channel,
//! asks the [`ReleaseSource`] for the newest release, compares versions, and
//! hands confirmed upgrades to the [`Installer`].

use chrono::Utc;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::instrument::{WithDispatch, WithSubscriber};
use tracing::{Dispatch, debug, info, warn};

use super::asset::{platform_asset_hint, select_asset, select_checksum_asset};
use super::backup::BackupManager;
use super::cache::{UpdateCache, UpdateCacheStore, should_check};
use super::installer::{InstallFailure, Installer, current_exe_path};
use super::{Release, ReleaseSource, Version, determine_channel};
use crate::core::UpdateError;

/// Interval used when the configured one cannot be parsed.
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Outcome of a lightweight update check, used for passive banners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateNotification {
    /// Whether a newer release exists
    pub available: bool,
    /// Running version
    pub current_version: String,
    /// Newest release version (empty when no check took place)
    pub latest_version: String,
    /// Whether the newest release is a pre-release
    pub is_prerelease: bool,
    /// Web page of the newest release
    pub release_url: String,
}

impl UpdateNotification {
    fn unavailable(current_version: &str) -> Self {
        Self {
            available: false,
            current_version: current_version.to_string(),
            latest_version: String::new(),
            is_prerelease: false,
            release_url: String::new(),
        }
    }
}

/// Everything needed to install a specific newer release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateInfo {
    pub current_version: String,
    pub latest_version: String,
    pub release_url: String,
    pub release_notes: String,
    pub download_url: String,
    pub asset_name: String,
    /// Checksum file published alongside the asset, if any.
    pub checksum_url: Option<String>,
    pub is_prerelease: bool,
}

impl UpdateInfo {
    /// Multi-line description shown before asking for confirmation.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut summary = format!(
            "Current version: {}\nLatest version:  {}{}\nRelease: {}",
            self.current_version,
            self.latest_version,
            if self.is_prerelease {
                " (pre-release)"
            } else {
                ""
            },
            self.release_url
        );

        let notes = self.release_notes.trim();
        if !notes.is_empty() {
            summary.push_str("\n\nRelease notes:\n");
            summary.push_str(notes);
        }
        summary
    }
}

/// Result of [`Updater::get_update_info`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateCheck {
    /// The running version is the newest on its channel.
    UpToDate {
        current_version: String,
        latest_version: String,
    },
    /// The running version is not a release version (e.g. a local build).
    DevelopmentBuild {
        version: String,
    },
    /// A newer release with an asset for this platform exists.
    Available(UpdateInfo),
}

/// Configures an [`Updater`].
#[derive(Debug, Clone)]
pub struct UpdaterBuilder {
    cache_dir: PathBuf,
    check_interval: String,
    dispatch: Dispatch,
    executable_path: Option<PathBuf>,
    verify_checksum: bool,
}

impl UpdaterBuilder {
    /// Start configuring an updater that caches check results in `cache_dir`.
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            check_interval: "24h".to_string(),
            dispatch: Dispatch::none(),
            executable_path: None,
            verify_checksum: true,
        }
    }

    /// How long a cached check stays fresh, as a duration string like `"24h"`
    /// or `"30m"`. Unparsable values fall back to 24 hours.
    #[must_use]
    pub fn check_interval(mut self, interval: impl Into<String>) -> Self {
        self.check_interval = interval.into();
        self
    }

    /// Logging sink for every operation. Defaults to discarding all events.
    #[must_use]
    pub fn log_dispatch(mut self, dispatch: Dispatch) -> Self {
        self.dispatch = dispatch;
        self
    }

    /// Replace this executable instead of the running one.
    #[must_use]
    pub fn executable_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.executable_path = Some(path.into());
        self
    }

    /// Whether upgrades verify the published checksum (default `true`).
    #[must_use]
    pub fn verify_checksum(mut self, verify: bool) -> Self {
        self.verify_checksum = verify;
        self
    }

    pub fn build<S: ReleaseSource>(self, source: S) -> Updater<S> {
        let check_interval = tracing::dispatcher::with_default(&self.dispatch, || {
            parse_check_interval(&self.check_interval)
        });

        Updater {
            source,
            cache: UpdateCacheStore::new(self.cache_dir),
            check_interval,
            dispatch: self.dispatch,
            executable_path: self.executable_path,
            verify_checksum: self.verify_checksum,
        }
    }
}

fn parse_check_interval(text: &str) -> Duration {
    match humantime::parse_duration(text.trim()) {
        Ok(interval) => interval,
        Err(e) => {
            warn!(
                "Invalid update check interval '{}' ({}); using {}",
                text,
                e,
                humantime::format_duration(DEFAULT_CHECK_INTERVAL)
            );
            DEFAULT_CHECK_INTERVAL
        }
    }
}

/// Checks for, downloads, and installs new tasklog releases.
///
/// # Examples
///
/// ```rust,no_run
/// use tasklog::upgrade::{GithubReleaseSource, UpdateCheck, UpdaterBuilder};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let updater = UpdaterBuilder::new("/tmp/tasklog-cache")
///     .check_interval("12h")
///     .build(GithubReleaseSource::new("tasklog", "tasklog"));
///
/// if let UpdateCheck::Available(info) = updater.get_update_info("1.0.0", "").await? {
///     let backup = updater.perform_upgrade(&info, |_prompt| true).await?;
///     println!("Previous version saved to {}", backup.display());
/// }
/// # Ok(())
/// # }
/// ```
pub struct Updater<S> {
    source: S,
    cache: UpdateCacheStore,
    check_interval: Duration,
    dispatch: Dispatch,
    executable_path: Option<PathBuf>,
    verify_checksum: bool,
}

impl<S: ReleaseSource> Updater<S> {
    /// Updater with default settings.
    pub fn new(source: S, cache_dir: impl Into<PathBuf>, check_interval: &str) -> Self {
        UpdaterBuilder::new(cache_dir).check_interval(check_interval).build(source)
    }

    /// Effective check interval after parsing.
    pub fn check_interval(&self) -> Duration {
        self.check_interval
    }

    /// The release source in use.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Check whether a newer release exists, using the cache when it is fresh.
    ///
    /// An unparsable `current_version` reports no update and leaves the cache
    /// alone. A fresh cache entry for the same running version is returned
    /// without contacting the release source.
    ///
    /// # Errors
    ///
    /// Network failures and unparsable release tags.
    pub async fn check_for_update(
        &self,
        current_version: &str,
        channel: &str,
    ) -> Result<UpdateNotification, UpdateError> {
        self.logged(self.check_for_update_inner(current_version, channel)).await
    }

    async fn check_for_update_inner(
        &self,
        current_version: &str,
        channel: &str,
    ) -> Result<UpdateNotification, UpdateError> {
        let Some(current) = parse_current_version(current_version) else {
            return Ok(UpdateNotification::unavailable(current_version));
        };

        let cached = self
            .cache
            .load()
            .await
            .filter(|cache| cache.current_version == current.to_string());

        if let Some(cache) = cached.as_ref() {
            if !should_check(Some(cache), self.check_interval) {
                debug!("Using cached update check from {}", cache.last_check);
                return Ok(cache.notification());
            }
        }

        let (release, latest) = self.fetch_latest(&current, channel).await?;
        let available = latest.is_newer_than(&current);
        let latest_version = latest.to_string();

        // A dismissal only sticks while the same release is the newest.
        let dismissed = cached
            .is_some_and(|cache| cache.dismissed && cache.latest_version == latest_version);

        let entry = UpdateCache {
            last_check: Utc::now(),
            update_available: available,
            current_version: current.to_string(),
            latest_version,
            is_prerelease: release.prerelease,
            release_url: self.source.release_url(&release.tag_name),
            dismissed,
        };
        self.cache.save(&entry).await;

        if available {
            info!("Update available: {} -> {}", entry.current_version, entry.latest_version);
        } else {
            debug!("tasklog {} is up to date", entry.current_version);
        }
        Ok(entry.notification())
    }

    /// Resolve the newest release and the asset to install for this platform.
    ///
    /// Never consults the cache.
    ///
    /// # Errors
    ///
    /// Network failures, unparsable release tags, and
    /// [`UpdateError::NoMatchingAsset`] when a newer release ships no binary for
    /// this platform.
    pub async fn get_update_info(
        &self,
        current_version: &str,
        channel: &str,
    ) -> Result<UpdateCheck, UpdateError> {
        self.logged(self.get_update_info_inner(current_version, channel)).await
    }

    async fn get_update_info_inner(
        &self,
        current_version: &str,
        channel: &str,
    ) -> Result<UpdateCheck, UpdateError> {
        let Some(current) = parse_current_version(current_version) else {
            return Ok(UpdateCheck::DevelopmentBuild {
                version: current_version.to_string(),
            });
        };

        let (release, latest) = self.fetch_latest(&current, channel).await?;
        if !latest.is_newer_than(&current) {
            return Ok(UpdateCheck::UpToDate {
                current_version: current.to_string(),
                latest_version: latest.to_string(),
            });
        }

        let hint = platform_asset_hint();
        let asset = select_asset(&release.assets, &hint, &release.tag_name)?;
        let checksum_url = select_checksum_asset(&release.assets, &asset.name);
        debug!("Selected asset {} (checksum: {:?})", asset.name, checksum_url);

        Ok(UpdateCheck::Available(UpdateInfo {
            current_version: current.to_string(),
            latest_version: latest.to_string(),
            release_url: self.source.release_url(&release.tag_name),
            release_notes: release.body.unwrap_or_default(),
            download_url: asset.download_url,
            asset_name: asset.name,
            checksum_url,
            is_prerelease: release.prerelease,
        }))
    }

    /// Ask for confirmation, then download and install `info`.
    ///
    /// `confirm` receives the release summary followed by a yes/no question. A
    /// negative answer fails with [`UpdateError::UserCancelled`] before anything
    /// is written. On success the update cache is cleared and the backup path of
    /// the previous binary is returned.
    pub async fn perform_upgrade<F>(
        &self,
        info: &UpdateInfo,
        confirm: F,
    ) -> Result<PathBuf, InstallFailure>
    where
        F: FnOnce(&str) -> bool,
    {
        let prompt = format!("{}\n\nDo you want to upgrade now?", info.summary());
        if !confirm(&prompt) {
            return Err(UpdateError::UserCancelled.into());
        }

        self.logged(async {
            let installer = self.installer()?;
            let checksum_url = if self.verify_checksum {
                if info.checksum_url.is_none() {
                    warn!("Release {} publishes no checksum file", info.latest_version);
                }
                info.checksum_url.as_deref()
            } else {
                debug!("Checksum verification disabled");
                None
            };

            info!("Upgrading tasklog {} -> {}", info.current_version, info.latest_version);
            let backup_path = installer
                .download_and_replace(&info.download_url, &info.asset_name, checksum_url)
                .await?;
            self.cache.clear().await;
            Ok(backup_path)
        })
        .await
    }

    /// Restore the executable from `backup_path`.
    pub async fn rollback_upgrade(&self, backup_path: &Path) -> Result<(), UpdateError> {
        self.logged(async { self.installer()?.rollback(backup_path).await }).await
    }

    /// Where upgrades of the managed executable keep their backup.
    pub fn backup_path(&self) -> Result<PathBuf, UpdateError> {
        Ok(BackupManager::backup_path_for(&self.target_executable()?))
    }

    /// Mark the cached update as dismissed.
    ///
    /// Returns whether there was an available update to dismiss.
    pub async fn dismiss_update(&self) -> bool {
        self.logged(async {
            match self.cache.load().await {
                Some(mut cache) if cache.update_available => {
                    cache.dismissed = true;
                    self.cache.save(&cache).await;
                    info!("Dismissed update notification for {}", cache.latest_version);
                    true
                }
                _ => false,
            }
        })
        .await
    }

    /// Notification for a passive banner, if one should be shown.
    ///
    /// Errors are logged and swallowed; dismissed updates are not reported.
    pub async fn pending_notice(
        &self,
        current_version: &str,
        channel: &str,
    ) -> Option<UpdateNotification> {
        match self.check_for_update(current_version, channel).await {
            Ok(notification) if notification.available => {
                let dismissed = self.logged(self.cache.load()).await.is_some_and(|cache| {
                    cache.dismissed && cache.latest_version == notification.latest_version
                });
                (!dismissed).then_some(notification)
            }
            Ok(_) => None,
            Err(e) => {
                self.logged(async { debug!("Background update check failed: {}", e) }).await;
                None
            }
        }
    }

    async fn fetch_latest(
        &self,
        current: &Version,
        channel: &str,
    ) -> Result<(Release, Version), UpdateError> {
        let channel = determine_channel(current, channel);
        let release = if channel.is_empty() {
            debug!("Fetching latest stable release");
            self.source.get_latest_release().await?
        } else {
            debug!("Fetching latest release on channel '{}'", channel);
            self.source.get_latest_prerelease(&channel).await?
        };

        let latest = Version::parse(&release.tag_name)?;
        Ok((release, latest))
    }

    fn target_executable(&self) -> Result<PathBuf, UpdateError> {
        match &self.executable_path {
            Some(path) => Ok(path.clone()),
            None => current_exe_path(),
        }
    }

    fn installer(&self) -> Result<Installer<'_, S>, UpdateError> {
        match &self.executable_path {
            Some(path) => Ok(Installer::new(&self.source, path.clone())),
            None => Installer::for_current_exe(&self.source),
        }
    }

    fn logged<F: Future>(&self, future: F) -> WithDispatch<F> {
        future.with_subscriber(self.dispatch.clone())
    }
}

fn parse_current_version(text: &str) -> Option<Version> {
    match Version::parse(text) {
        Ok(version) => Some(version),
        Err(e) => {
            debug!("Not checking for updates from a development build: {}", e);
            None
        }
    }
}
