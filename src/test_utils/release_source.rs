//! In-memory [`ReleaseSource`] for tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::core::UpdateError;
use crate::upgrade::{Release, ReleaseAsset, ReleaseSource};

/// Base URL of the fake asset downloads.
pub const FAKE_DOWNLOAD_BASE: &str = "https://example.com/download";

/// A release tagged `tag` whose assets live under [`FAKE_DOWNLOAD_BASE`].
pub fn release_with_assets(tag: &str, asset_names: &[&str]) -> Release {
    let version = tag.trim_start_matches('v');
    Release {
        tag_name: tag.to_string(),
        name: Some(format!("tasklog {version}")),
        body: Some(format!("Changes in {version}")),
        prerelease: version.contains('-'),
        draft: false,
        assets: asset_names
            .iter()
            .map(|name| ReleaseAsset {
                name: (*name).to_string(),
                browser_download_url: format!("{FAKE_DOWNLOAD_BASE}/{tag}/{name}"),
            })
            .collect(),
    }
}

/// Serves canned releases and asset bytes, counting every call.
///
/// ```rust,no_run
/// use tasklog::test_utils::{FakeReleaseSource, release_with_assets};
///
/// let source = FakeReleaseSource::new()
///     .with_latest(release_with_assets("v1.1.0", &["tasklog_1.1.0_linux_x86_64"]))
///     .with_asset("https://example.com/download/v1.1.0/tasklog_1.1.0_linux_x86_64", b"binary");
/// assert_eq!(source.metadata_calls(), 0);
/// ```
#[derive(Debug, Default)]
pub struct FakeReleaseSource {
    latest: Mutex<Option<Release>>,
    channels: Mutex<HashMap<String, Release>>,
    assets: Mutex<HashMap<String, Vec<u8>>>,
    metadata_calls: AtomicUsize,
    download_calls: AtomicUsize,
}

impl FakeReleaseSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the latest stable release.
    #[must_use]
    pub fn with_latest(self, release: Release) -> Self {
        self.set_latest(release);
        self
    }

    /// Set the latest release on `channel`.
    #[must_use]
    pub fn with_channel_release(self, channel: &str, release: Release) -> Self {
        lock(&self.channels).insert(channel.to_string(), release);
        self
    }

    /// Serve `content` at `url`.
    #[must_use]
    pub fn with_asset(self, url: &str, content: impl AsRef<[u8]>) -> Self {
        lock(&self.assets).insert(url.to_string(), content.as_ref().to_vec());
        self
    }

    /// Replace the latest stable release after construction.
    pub fn set_latest(&self, release: Release) {
        *lock(&self.latest) = Some(release);
    }

    /// Number of release metadata requests served.
    pub fn metadata_calls(&self) -> usize {
        self.metadata_calls.load(Ordering::SeqCst)
    }

    /// Number of asset downloads attempted.
    pub fn download_count(&self) -> usize {
        self.download_calls.load(Ordering::SeqCst)
    }
}

impl ReleaseSource for FakeReleaseSource {
    async fn get_latest_release(&self) -> Result<Release, UpdateError> {
        self.metadata_calls.fetch_add(1, Ordering::SeqCst);
        lock(&self.latest)
            .clone()
            .ok_or_else(|| UpdateError::network("fetching latest release", "HTTP 404 Not Found"))
    }

    async fn get_latest_prerelease(&self, channel: &str) -> Result<Release, UpdateError> {
        self.metadata_calls.fetch_add(1, Ordering::SeqCst);
        lock(&self.channels).get(channel).cloned().ok_or_else(|| {
            UpdateError::network(
                "fetching releases",
                format!("no releases found for channel '{channel}'"),
            )
        })
    }

    async fn download_asset<W>(&self, url: &str, sink: &mut W) -> Result<(), UpdateError>
    where
        W: AsyncWrite + Unpin + Send,
    {
        self.download_calls.fetch_add(1, Ordering::SeqCst);
        let content = lock(&self.assets)
            .get(url)
            .cloned()
            .ok_or_else(|| {
                UpdateError::network(format!("downloading {url}"), "HTTP 404 Not Found")
            })?;

        sink.write_all(&content)
            .await
            .map_err(|e| UpdateError::network(format!("downloading {url}"), e))?;
        sink.flush().await.map_err(|e| UpdateError::network(format!("downloading {url}"), e))
    }

    fn release_url(&self, tag: &str) -> String {
        format!("https://github.com/tasklog/tasklog/releases/tag/{tag}")
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}
