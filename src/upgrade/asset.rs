//! Mapping the host platform to release assets.
//!
//! Release assets follow the historical `tasklog_<version>_<os>_<arch>` naming,
//! with Go-style OS names (`darwin`) and `x86_64`/`arm64`/`i386` architectures.

use super::ReleaseAsset;
use crate::core::UpdateError;

/// Suffixes of per-asset checksum sidecar files.
const CHECKSUM_SUFFIXES: [&str; 2] = [".sha256", ".sha256sum"];

/// Names of aggregate checksum files listing every asset.
const CHECKSUM_MANIFESTS: [&str; 3] = ["checksums.txt", "sha256sums", "sha256sums.txt"];

/// An asset chosen for download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedAsset {
    /// Asset file name
    pub name: String,
    /// Direct download URL
    pub download_url: String,
}

/// Platform token for the running host, e.g. `linux_x86_64` or `darwin_arm64`.
#[must_use]
pub fn platform_asset_hint() -> String {
    platform_asset_hint_for(std::env::consts::OS, std::env::consts::ARCH)
}

/// Platform token for the given Rust OS and architecture names.
#[must_use]
pub fn platform_asset_hint_for(os: &str, arch: &str) -> String {
    let os = match os {
        "macos" => "darwin",
        other => other,
    };
    let arch = match arch {
        "x86_64" | "amd64" => "x86_64",
        "x86" | "386" => "i386",
        "aarch64" => "arm64",
        other => other,
    };
    format!("{os}_{arch}")
}

/// Pick the asset for the platform named by `hint`.
///
/// The raw binary, whose name ends in `hint` (or `hint.exe`), always wins
/// whatever order the release lists assets in. Any other asset containing
/// `hint` (an archive, a package, a signature) is only returned when no raw
/// binary exists. Checksum files are never selected.
///
/// # Errors
///
/// Returns [`UpdateError::NoMatchingAsset`] when nothing matches. `release`
/// only feeds the error message.
pub fn select_asset(
    candidates: &[ReleaseAsset],
    hint: &str,
    release: &str,
) -> Result<SelectedAsset, UpdateError> {
    let exe_name = format!("{hint}.exe");
    let is_raw_binary =
        |asset: &&ReleaseAsset| asset.name.ends_with(hint) || asset.name.ends_with(&exe_name);

    candidates
        .iter()
        .find(is_raw_binary)
        .or_else(|| {
            candidates
                .iter()
                .find(|asset| asset.name.contains(hint) && !is_checksum_file(&asset.name))
        })
        .map(|asset| SelectedAsset {
            name: asset.name.clone(),
            download_url: asset.browser_download_url.clone(),
        })
        .ok_or_else(|| UpdateError::NoMatchingAsset {
            platform: hint.to_string(),
            release: release.to_string(),
        })
}

/// Find the checksum file covering `asset_name`.
///
/// An exact `<asset>.sha256` sidecar is preferred over an aggregate
/// `checksums.txt`/`SHA256SUMS` manifest.
#[must_use]
pub fn select_checksum_asset(candidates: &[ReleaseAsset], asset_name: &str) -> Option<String> {
    let sidecar = candidates.iter().find(|asset| {
        CHECKSUM_SUFFIXES
            .iter()
            .any(|suffix| asset.name.strip_suffix(suffix) == Some(asset_name))
    });

    sidecar
        .or_else(|| {
            candidates
                .iter()
                .find(|asset| CHECKSUM_MANIFESTS.contains(&asset.name.to_lowercase().as_str()))
        })
        .map(|asset| asset.browser_download_url.clone())
}

fn is_checksum_file(name: &str) -> bool {
    let lower = name.to_lowercase();
    CHECKSUM_SUFFIXES.iter().any(|suffix| lower.ends_with(suffix))
        || CHECKSUM_MANIFESTS.contains(&lower.as_str())
}
