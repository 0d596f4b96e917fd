use anyhow::Result;
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use tasklog::test_utils::{
    FAKE_DOWNLOAD_BASE, FakeReleaseSource, init_test_logging, release_with_assets,
};
use tasklog::upgrade::asset::platform_asset_hint;
use tasklog::upgrade::cache::{CACHE_FILE_NAME, UpdateCache};
use tasklog::upgrade::{UpdateCheck, Updater, UpdaterBuilder};
use tempfile::TempDir;
use tokio::fs;

const INSTALLED: &[u8] = b"#!/bin/sh\necho tasklog 1.0.0\n";
const RELEASED: &[u8] = b"#!/bin/sh\necho tasklog 1.1.0\n";

struct Install {
    _temp_dir: TempDir,
    binary: PathBuf,
    cache_dir: PathBuf,
}

async fn install() -> Result<Install> {
    init_test_logging(None);

    let temp_dir = TempDir::new()?;
    let binary = temp_dir.path().join("tasklog");
    fs::write(&binary, INSTALLED).await?;
    let cache_dir = temp_dir.path().join("cache");
    Ok(Install {
        _temp_dir: temp_dir,
        binary,
        cache_dir,
    })
}

fn released_source(tag: &str, binary: &[u8]) -> FakeReleaseSource {
    let version = tag.trim_start_matches('v');
    let name = format!("tasklog_{version}_{}", platform_asset_hint());
    let digest = hex::encode(Sha256::digest(binary));

    FakeReleaseSource::new()
        .with_latest(release_with_assets(tag, &[name.as_str(), "checksums.txt"]))
        .with_asset(&format!("{FAKE_DOWNLOAD_BASE}/{tag}/{name}"), binary)
        .with_asset(
            &format!("{FAKE_DOWNLOAD_BASE}/{tag}/checksums.txt"),
            format!("{digest}  {name}\n"),
        )
}

fn updater(install: &Install, source: FakeReleaseSource) -> Updater<FakeReleaseSource> {
    UpdaterBuilder::new(&install.cache_dir).executable_path(&install.binary).build(source)
}

#[tokio::test]
async fn test_same_version_is_not_an_update() -> Result<()> {
    let install = install().await?;
    let updater = updater(&install, released_source("v1.0.0", RELEASED));

    let notification = updater.check_for_update("1.0.0", "").await?;
    assert!(!notification.available);
    assert!(matches!(updater.get_update_info("1.0.0", "").await?, UpdateCheck::UpToDate { .. }));
    Ok(())
}

#[tokio::test]
async fn test_cached_check_makes_no_second_request() -> Result<()> {
    let install = install().await?;
    let updater = updater(&install, released_source("v1.1.0", RELEASED));

    let first = updater.check_for_update("1.0.0", "").await?;
    assert!(first.available);
    assert_eq!(first.latest_version, "1.1.0");

    let second = updater.check_for_update("1.0.0", "").await?;
    assert_eq!(first, second);
    assert_eq!(updater.source().metadata_calls(), 1);
    Ok(())
}

#[tokio::test]
async fn test_cache_file_format() -> Result<()> {
    let install = install().await?;
    let updater = updater(&install, released_source("v1.1.0", RELEASED));
    updater.check_for_update("v1.0.0", "").await?;

    let raw = fs::read_to_string(install.cache_dir.join(CACHE_FILE_NAME)).await?;
    let json: serde_json::Value = serde_json::from_str(&raw)?;
    assert_eq!(json["update_available"], true);
    assert_eq!(json["current_version"], "1.0.0");
    assert_eq!(json["latest_version"], "1.1.0");
    assert_eq!(json["is_prerelease"], false);
    assert_eq!(json["dismissed"], false);

    let cache: UpdateCache = serde_json::from_str(&raw)?;
    assert!(cache.release_url.ends_with("/releases/tag/v1.1.0"));
    Ok(())
}

#[tokio::test]
async fn test_full_upgrade_and_rollback() -> Result<()> {
    let install = install().await?;
    let updater = updater(&install, released_source("v1.1.0", RELEASED));
    updater.check_for_update("1.0.0", "").await?;

    let UpdateCheck::Available(info) = updater.get_update_info("1.0.0", "").await? else {
        panic!("expected an update to 1.1.0");
    };
    let backup = updater.perform_upgrade(&info, |_| true).await?;

    assert_eq!(fs::read(&install.binary).await?, RELEASED);
    assert_eq!(fs::read(&backup).await?, INSTALLED);
    assert!(!install.cache_dir.join(CACHE_FILE_NAME).exists());

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = fs::metadata(&install.binary).await?.permissions().mode();
        assert_ne!(mode & 0o111, 0, "installed binary must be executable");
    }

    updater.rollback_upgrade(&backup).await?;
    assert_eq!(fs::read(&install.binary).await?, INSTALLED);
    Ok(())
}

#[tokio::test]
async fn test_second_upgrade_overwrites_backup() -> Result<()> {
    let install = install().await?;

    let first = updater(&install, released_source("v1.1.0", RELEASED));
    let UpdateCheck::Available(info) = first.get_update_info("1.0.0", "").await? else {
        panic!("expected an update to 1.1.0");
    };
    let backup = first.perform_upgrade(&info, |_| true).await?;

    let next_release: &[u8] = b"tasklog 1.2.0";
    let second = updater(&install, released_source("v1.2.0", next_release));
    let UpdateCheck::Available(info) = second.get_update_info("1.1.0", "").await? else {
        panic!("expected an update to 1.2.0");
    };
    let second_backup = second.perform_upgrade(&info, |_| true).await?;

    assert_eq!(second_backup, backup);
    assert_eq!(fs::read(&backup).await?, RELEASED);
    assert_eq!(fs::read(&install.binary).await?, next_release);
    Ok(())
}

#[tokio::test]
async fn test_tampered_download_is_rejected() -> Result<()> {
    let install = install().await?;
    let name = format!("tasklog_1.1.0_{}", platform_asset_hint());
    let genuine_digest = hex::encode(Sha256::digest(RELEASED));
    let source = FakeReleaseSource::new()
        .with_latest(release_with_assets("v1.1.0", &[name.as_str(), "checksums.txt"]))
        .with_asset(&format!("{FAKE_DOWNLOAD_BASE}/v1.1.0/{name}"), b"malicious")
        .with_asset(
            &format!("{FAKE_DOWNLOAD_BASE}/v1.1.0/checksums.txt"),
            format!("{genuine_digest}  {name}\n"),
        );
    let updater = updater(&install, source);

    let UpdateCheck::Available(info) = updater.get_update_info("1.0.0", "").await? else {
        panic!("expected an update to 1.1.0");
    };
    let failure = updater.perform_upgrade(&info, |_| true).await.unwrap_err();

    assert!(failure.to_string().contains("Checksum mismatch"));
    assert!(failure.backup_path.is_none());
    assert_eq!(fs::read(&install.binary).await?, INSTALLED);
    Ok(())
}

#[tokio::test]
async fn test_beta_user_follows_beta_channel() -> Result<()> {
    let install = install().await?;
    let name = format!("tasklog_1.1.0-beta.2_{}", platform_asset_hint());
    let source = FakeReleaseSource::new()
        .with_latest(release_with_assets("v1.0.0", &[]))
        .with_channel_release("beta", release_with_assets("v1.1.0-beta.2", &[name.as_str()]));
    let updater = updater(&install, source);

    let UpdateCheck::Available(info) = updater.get_update_info("1.1.0-beta.1", "").await? else {
        panic!("expected a beta update");
    };
    assert_eq!(info.latest_version, "1.1.0-beta.2");
    assert!(info.is_prerelease);
    assert_eq!(info.checksum_url, None);

    // Stable builds never see the beta.
    let notification = updater.check_for_update("1.0.0", "").await?;
    assert!(!notification.available);
    assert_eq!(notification.latest_version, "1.0.0");
    Ok(())
}
