use anyhow::Result;
use std::io;
use std::path::Path;
use tasklog::core::UpdateError;
use tasklog::test_utils::FakeReleaseSource;
use tasklog::upgrade::Installer;
use tempfile::TempDir;
use tokio::fs;

const ASSET: &str = "tasklog_1.1.0_linux_x86_64";
const URL: &str = "https://example.com/download/v1.1.0/tasklog_1.1.0_linux_x86_64";

fn rename_fails(_from: &Path, _to: &Path) -> io::Result<()> {
    Err(io::Error::other("device busy"))
}

/// A failed swap after the backup was taken leaves the live binary intact and
/// hands back a backup that restores it.
#[tokio::test]
async fn test_rename_failure_is_recoverable() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let binary = temp_dir.path().join("tasklog");
    fs::write(&binary, b"v1.0.0").await?;

    let source = FakeReleaseSource::new().with_asset(URL, b"v1.1.0");
    let installer = Installer::new(&source, binary.clone()).with_rename(rename_fails);

    let failure = installer.download_and_replace(URL, ASSET, None).await.unwrap_err();
    assert!(matches!(failure.error, UpdateError::FileSystem { .. }));
    assert_eq!(fs::read(&binary).await?, b"v1.0.0");

    let backup = failure.backup_path.expect("backup is reported after a failed swap");
    assert_eq!(fs::read(&backup).await?, b"v1.0.0");

    // Only the binary and its backup remain; the staged download is gone.
    let mut entries = fs::read_dir(temp_dir.path()).await?;
    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        names.push(entry.file_name().to_string_lossy().into_owned());
    }
    names.sort();
    assert_eq!(names, ["tasklog", "tasklog.backup"]);

    installer.rollback(&backup).await?;
    assert_eq!(fs::read(&binary).await?, b"v1.0.0");
    Ok(())
}

#[tokio::test]
async fn test_unwritable_location_fails_before_download() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let binary = temp_dir.path().join("missing-dir").join("tasklog");
    let source = FakeReleaseSource::new().with_asset(URL, b"v1.1.0");

    let failure =
        Installer::new(&source, binary).download_and_replace(URL, ASSET, None).await.unwrap_err();
    assert!(matches!(failure.error, UpdateError::PermissionDenied { .. }));
    assert!(failure.to_string().contains("sudo"));
    assert_eq!(source.download_count(), 0);
    Ok(())
}
