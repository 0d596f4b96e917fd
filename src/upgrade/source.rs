//! The release host, as seen by the updater.

use serde::Deserialize;
use std::future::Future;
use tokio::io::AsyncWrite;

use crate::core::UpdateError;

/// A published release.
///
/// Field names match the GitHub REST payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Release {
    /// Git tag, e.g. `v1.2.0`
    pub tag_name: String,
    /// Human title
    #[serde(default)]
    pub name: Option<String>,
    /// Release notes (markdown)
    #[serde(default)]
    pub body: Option<String>,
    /// Whether the release is marked as a pre-release
    #[serde(default)]
    pub prerelease: bool,
    /// Whether the release is an unpublished draft
    #[serde(default)]
    pub draft: bool,
    /// Downloadable artifacts
    #[serde(default)]
    pub assets: Vec<ReleaseAsset>,
}

/// A downloadable release artifact.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReleaseAsset {
    /// File name
    pub name: String,
    /// Direct download URL
    pub browser_download_url: String,
}

/// Source of release metadata and artifacts.
///
/// Implementations do not retry; a failed call surfaces immediately as
/// [`UpdateError::Network`].
pub trait ReleaseSource {
    /// Latest stable release.
    fn get_latest_release(&self) -> impl Future<Output = Result<Release, UpdateError>> + Send;

    /// Latest release on a pre-release channel (`alpha`, `beta`, `rc`, ...).
    fn get_latest_prerelease(
        &self,
        channel: &str,
    ) -> impl Future<Output = Result<Release, UpdateError>> + Send;

    /// Stream the artifact at `url` into `sink`.
    fn download_asset<W>(
        &self,
        url: &str,
        sink: &mut W,
    ) -> impl Future<Output = Result<(), UpdateError>> + Send
    where
        W: AsyncWrite + Unpin + Send;

    /// Web page of the release tagged `tag`.
    fn release_url(&self, tag: &str) -> String;
}
