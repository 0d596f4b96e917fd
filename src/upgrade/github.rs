//! GitHub Releases implementation of [`ReleaseSource`].

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::debug;

use super::{Release, ReleaseSource, Version};
use crate::core::UpdateError;

/// Public GitHub REST endpoint.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// Number of releases inspected when looking for a channel's latest.
const RELEASES_PER_PAGE: u32 = 30;

/// Fetches releases of `owner/repo` from GitHub.
#[derive(Debug, Clone)]
pub struct GithubReleaseSource {
    owner: String,
    repo: String,
    api_base: String,
    client: Client,
}

impl GithubReleaseSource {
    /// Create a source for `owner/repo` on github.com.
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        let client = Client::builder()
            .user_agent(concat!("tasklog/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();

        Self {
            owner: owner.into(),
            repo: repo.into(),
            api_base: DEFAULT_API_BASE.to_string(),
            client,
        }
    }

    /// Point at a different API host (GitHub Enterprise, test servers).
    #[must_use]
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        let api_base: String = api_base.into();
        self.api_base = api_base.trim_end_matches('/').to_string();
        self
    }

    /// Repository owner.
    #[must_use]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Repository name.
    #[must_use]
    pub fn repo(&self) -> &str {
        &self.repo
    }

    fn repo_url(&self) -> String {
        format!("{}/repos/{}/{}", self.api_base, self.owner, self.repo)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, UpdateError> {
        debug!("GET {}", url);
        let operation = format!("fetching {url}");

        let response = self
            .client
            .get(url)
            .header("Accept", "application/vnd.github+json")
            .send()
            .await
            .map_err(|e| UpdateError::network(&operation, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpdateError::network(operation, describe_status(status)));
        }

        response.json::<T>().await.map_err(|e| UpdateError::network(operation, e))
    }
}

impl ReleaseSource for GithubReleaseSource {
    async fn get_latest_release(&self) -> Result<Release, UpdateError> {
        self.get_json(&format!("{}/releases/latest", self.repo_url())).await
    }

    async fn get_latest_prerelease(&self, channel: &str) -> Result<Release, UpdateError> {
        let url = format!("{}/releases?per_page={RELEASES_PER_PAGE}", self.repo_url());
        let releases: Vec<Release> = self.get_json(&url).await?;

        pick_channel_release(releases, channel).ok_or_else(|| {
            UpdateError::network(
                format!("fetching {url}"),
                format!("no releases found for channel '{channel}'"),
            )
        })
    }

    async fn download_asset<W>(&self, url: &str, sink: &mut W) -> Result<(), UpdateError>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let operation = format!("downloading {url}");

        let mut response = self
            .client
            .get(url)
            .header("Accept", "application/octet-stream")
            .send()
            .await
            .map_err(|e| UpdateError::network(&operation, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpdateError::network(operation, describe_status(status)));
        }

        let mut written: u64 = 0;
        while let Some(chunk) =
            response.chunk().await.map_err(|e| UpdateError::network(&operation, e))?
        {
            sink.write_all(&chunk).await.map_err(|e| UpdateError::network(&operation, e))?;
            written += chunk.len() as u64;
        }
        sink.flush().await.map_err(|e| UpdateError::network(&operation, e))?;

        debug!("Downloaded {} bytes from {}", written, url);
        Ok(())
    }

    fn release_url(&self, tag: &str) -> String {
        format!("https://github.com/{}/{}/releases/tag/{}", self.owner, self.repo, tag)
    }
}

/// The newest release that is either stable or a pre-release on `channel`.
///
/// Stable releases qualify because they order above every pre-release of the
/// same version; a build on `beta` moves to `1.0.0` once it ships. A release
/// only counts as stable when GitHub does not flag it as a pre-release and its
/// tag carries no pre-release label. Drafts and tags that are not semantic
/// versions are skipped.
fn pick_channel_release(releases: Vec<Release>, channel: &str) -> Option<Release> {
    releases
        .into_iter()
        .filter(|release| !release.draft)
        .filter_map(|release| {
            let version = Version::parse(&release.tag_name).ok()?;
            let stable = !release.prerelease && version.is_stable();
            let on_channel = stable || version.channel() == Some(channel);
            on_channel.then_some((version, release))
        })
        .max_by(|(a, _), (b, _)| a.cmp(b))
        .map(|(_, release)| release)
}

fn describe_status(status: StatusCode) -> String {
    match status {
        StatusCode::NOT_FOUND => "HTTP 404 Not Found (no such repository or release)".to_string(),
        StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS => {
            format!("HTTP {status} (API rate limit exceeded?)")
        }
        other => format!("HTTP {other}"),
    }
}
