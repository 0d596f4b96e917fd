//! Download, verify, and swap in a new tasklog binary.
//!
//! Every step that could damage the live binary is ordered so that a failure
//! leaves the previous binary in place:
//!
//! ```text
//! 1. permission probe        (nothing written yet)
//! 2. download to temp file   (same directory as the binary, never the live path)
//! 3. checksum verification   (temp file discarded on mismatch)
//! 4. chmod +x on temp file
//! 5. copy live binary -> <binary>.backup
//! 6. rename temp file -> live binary (single atomic step)
//! ```

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::{debug, info, warn};

use super::ReleaseSource;
use super::backup::BackupManager;
use super::verification::ChecksumVerifier;
use crate::core::UpdateError;

/// Name of the sentinel file used to probe write access.
const WRITE_PROBE_NAME: &str = ".tasklog_write_test";

/// Prefix of temporary download files.
const TEMP_PREFIX: &str = ".tasklog-update-";

/// Signature of the final swap step.
pub type RenameFn = fn(&Path, &Path) -> io::Result<()>;

/// A failed install, with the backup path when one was written.
///
/// `backup_path` is only set when the failure happened after the backup was
/// taken, i.e. when the final rename failed.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct InstallFailure {
    /// What went wrong
    pub error: UpdateError,
    /// Backup of the previous binary, if it was created
    pub backup_path: Option<PathBuf>,
}

impl From<UpdateError> for InstallFailure {
    fn from(error: UpdateError) -> Self {
        Self {
            error,
            backup_path: None,
        }
    }
}

/// Check that the directory holding `path` is writable.
///
/// Creates and removes a sentinel file next to `path`.
///
/// # Errors
///
/// [`UpdateError::PermissionDenied`] when the sentinel cannot be created.
pub async fn check_write_permission(path: &Path) -> Result<(), UpdateError> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let probe = dir.join(WRITE_PROBE_NAME);

    fs::File::create(&probe).await.map_err(|e| UpdateError::PermissionDenied {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let _ = fs::remove_file(&probe).await;
    Ok(())
}

/// Resolve the running executable to a symlink-free path.
pub fn current_exe_path() -> Result<PathBuf, UpdateError> {
    let exe = std::env::current_exe()
        .map_err(|e| UpdateError::fs("locate current executable", PathBuf::new(), e))?;
    exe.canonicalize().map_err(|e| UpdateError::fs("resolve executable path", exe, e))
}

/// Replaces one executable with a downloaded release artifact.
pub struct Installer<'a, S> {
    source: &'a S,
    exe_path: PathBuf,
    rename: RenameFn,
}

impl<'a, S: ReleaseSource> Installer<'a, S> {
    /// Installer targeting an explicit executable path.
    pub fn new(source: &'a S, exe_path: PathBuf) -> Self {
        Self {
            source,
            exe_path,
            rename: default_rename,
        }
    }

    /// Installer targeting the running executable.
    pub fn for_current_exe(source: &'a S) -> Result<Self, UpdateError> {
        Ok(Self::new(source, current_exe_path()?))
    }

    /// Replace the rename used for the final swap.
    #[must_use]
    pub fn with_rename(mut self, rename: RenameFn) -> Self {
        self.rename = rename;
        self
    }

    /// The executable this installer replaces.
    pub fn exe_path(&self) -> &Path {
        &self.exe_path
    }

    /// Download `download_url` and atomically replace the executable with it.
    ///
    /// When `checksum_url` is given, the artifact's SHA256 must match the digest
    /// published there for `asset_name` before anything touches the live path.
    ///
    /// On success returns the backup path. If the final rename fails, the
    /// returned [`InstallFailure`] still names the backup so the caller can recover.
    pub async fn download_and_replace(
        &self,
        download_url: &str,
        asset_name: &str,
        checksum_url: Option<&str>,
    ) -> Result<PathBuf, InstallFailure> {
        let binary_path = &self.exe_path;
        info!("Current binary path: {}", binary_path.display());

        check_write_permission(binary_path).await?;

        let staged = self.download_to_temp(download_url).await?;

        match checksum_url {
            Some(checksum_url) => self.verify_download(&staged, asset_name, checksum_url).await?,
            None => warn!("Installing {} without checksum verification", download_url),
        }

        make_executable(&staged).await?;

        let backup = BackupManager::new(binary_path.clone());
        backup.create_backup().await?;
        let backup_path = backup.backup_path().to_path_buf();

        info!("Replacing binary");
        // Dropping `staged` on the error path deletes the temp file.
        if let Err(e) = (self.rename)(&staged, binary_path) {
            return Err(InstallFailure {
                error: UpdateError::fs("replace binary", binary_path, e),
                backup_path: Some(backup_path),
            });
        }
        // The temp path now names the live binary; disarm its cleanup.
        if let Err(e) = staged.keep() {
            debug!("Temp file handle already released: {}", e);
        }

        info!("Update completed successfully");
        Ok(backup_path)
    }

    /// Put the backup at `backup_path` back in place of the executable.
    pub async fn rollback(&self, backup_path: &Path) -> Result<(), UpdateError> {
        BackupManager::with_backup_path(self.exe_path.clone(), backup_path.to_path_buf())
            .restore_backup()
            .await
    }

    async fn download_to_temp(&self, url: &str) -> Result<tempfile::TempPath, UpdateError> {
        let dir = self.exe_path.parent().unwrap_or_else(|| Path::new("."));
        let temp = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .tempfile_in(dir)
            .map_err(|e| UpdateError::fs("create temp file", dir, e))?;

        let (std_file, temp_path) = temp.into_parts();
        let mut file = fs::File::from_std(std_file);

        info!("Downloading new version from {}", url);
        self.source.download_asset(url, &mut file).await?;

        file.sync_all()
            .await
            .map_err(|e| UpdateError::fs("flush download", &*temp_path, e))?;
        drop(file);

        Ok(temp_path)
    }

    async fn verify_download(
        &self,
        file: &Path,
        asset_name: &str,
        checksum_url: &str,
    ) -> Result<(), UpdateError> {
        debug!("Verifying checksum of {} against {}", asset_name, checksum_url);

        let mut content = Vec::new();
        self.source.download_asset(checksum_url, &mut content).await?;
        let content = String::from_utf8_lossy(&content);

        let expected = ChecksumVerifier::parse_expected_checksum(&content, asset_name)
            .ok_or_else(|| UpdateError::ChecksumUnavailable {
                url: checksum_url.to_string(),
                file: asset_name.to_string(),
            })?;

        ChecksumVerifier::verify_checksum(file, &expected)
            .await
            .map_err(|e| match e {
                UpdateError::ChecksumMismatch { expected, actual, .. } => {
                    UpdateError::ChecksumMismatch {
                        file: asset_name.to_string(),
                        expected,
                        actual,
                    }
                }
                other => other,
            })
    }
}

fn default_rename(from: &Path, to: &Path) -> io::Result<()> {
    std::fs::rename(from, to)
}

async fn make_executable(path: &Path) -> Result<(), UpdateError> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
            .await
            .map_err(|e| UpdateError::fs("make binary executable", path, e))?;
    }
    #[cfg(not(unix))]
    let _ = path;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::FakeReleaseSource;
    use tempfile::TempDir;

    const NEW_BINARY: &[u8] = b"#!/bin/sh\necho tasklog 1.1.0\n";
    const OLD_BINARY: &[u8] = b"#!/bin/sh\necho tasklog 1.0.0\n";
    const ASSET_NAME: &str = "tasklog_1.1.0_linux_x86_64";
    const DOWNLOAD_URL: &str = "https://example.com/download/tasklog_1.1.0_linux_x86_64";
    const CHECKSUM_URL: &str = "https://example.com/download/checksums.txt";

    async fn setup() -> (TempDir, PathBuf) {
        let temp_dir = TempDir::new().unwrap();
        let binary = temp_dir.path().join("tasklog");
        fs::write(&binary, OLD_BINARY).await.unwrap();
        (temp_dir, binary)
    }

    fn leftover_temp_files(dir: &Path) -> Vec<String> {
        std::fs::read_dir(dir)
            .unwrap()
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .filter(|name| name.starts_with(TEMP_PREFIX))
            .collect()
    }

    fn failing_rename(_: &Path, _: &Path) -> io::Result<()> {
        Err(io::Error::other("simulated rename failure"))
    }

    #[tokio::test]
    async fn test_check_write_permission() {
        let (_temp_dir, binary) = setup().await;
        check_write_permission(&binary).await.unwrap();
        assert!(!binary.with_file_name(WRITE_PROBE_NAME).exists());

        let err =
            check_write_permission(Path::new("/nonexistent/dir/tasklog")).await.unwrap_err();
        assert!(matches!(err, UpdateError::PermissionDenied { .. }));
    }

    #[tokio::test]
    async fn test_download_and_replace_success() {
        let (temp_dir, binary) = setup().await;
        let source = FakeReleaseSource::new().with_asset(DOWNLOAD_URL, NEW_BINARY);

        let backup = Installer::new(&source, binary.clone())
            .download_and_replace(DOWNLOAD_URL, ASSET_NAME, None)
            .await
            .unwrap();

        assert_eq!(backup, temp_dir.path().join("tasklog.backup"));
        assert_eq!(fs::read(&binary).await.unwrap(), NEW_BINARY);
        assert_eq!(fs::read(&backup).await.unwrap(), OLD_BINARY);
        assert!(leftover_temp_files(temp_dir.path()).is_empty());

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&binary).await.unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o755);
        }
    }

    #[tokio::test]
    async fn test_download_and_replace_with_valid_checksum() {
        let (_temp_dir, binary) = setup().await;
        let digest = {
            use sha2::{Digest, Sha256};
            hex::encode(Sha256::digest(NEW_BINARY))
        };
        let manifest =
            format!("{digest}  tasklog_1.1.0_linux_x86_64\n0000  tasklog_1.1.0_darwin_arm64\n");
        let source = FakeReleaseSource::new()
            .with_asset(DOWNLOAD_URL, NEW_BINARY)
            .with_asset(CHECKSUM_URL, manifest.as_bytes());

        Installer::new(&source, binary.clone())
            .download_and_replace(DOWNLOAD_URL, ASSET_NAME, Some(CHECKSUM_URL))
            .await
            .unwrap();
        assert_eq!(fs::read(&binary).await.unwrap(), NEW_BINARY);
    }

    #[tokio::test]
    async fn test_checksum_mismatch_leaves_binary_untouched() {
        let (temp_dir, binary) = setup().await;
        let manifest = format!("{}  tasklog_1.1.0_linux_x86_64\n", "ab".repeat(32));
        let source = FakeReleaseSource::new()
            .with_asset(DOWNLOAD_URL, NEW_BINARY)
            .with_asset(CHECKSUM_URL, manifest.as_bytes());

        let InstallFailure {
            error,
            backup_path,
        } = Installer::new(&source, binary.clone())
            .download_and_replace(DOWNLOAD_URL, ASSET_NAME, Some(CHECKSUM_URL))
            .await
            .unwrap_err();

        match error {
            UpdateError::ChecksumMismatch { file, expected, .. } => {
                assert_eq!(file, "tasklog_1.1.0_linux_x86_64");
                assert_eq!(expected, "ab".repeat(32));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(backup_path.is_none());
        assert_eq!(fs::read(&binary).await.unwrap(), OLD_BINARY);
        assert!(!temp_dir.path().join("tasklog.backup").exists());
        assert!(leftover_temp_files(temp_dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_checksum_file_without_entry() {
        let (_temp_dir, binary) = setup().await;
        let source = FakeReleaseSource::new()
            .with_asset(DOWNLOAD_URL, NEW_BINARY)
            .with_asset(CHECKSUM_URL, b"aaaa  some_other_file\nbbbb  another_file\n");

        let failure = Installer::new(&source, binary.clone())
            .download_and_replace(DOWNLOAD_URL, ASSET_NAME, Some(CHECKSUM_URL))
            .await
            .unwrap_err();
        assert!(matches!(failure.error, UpdateError::ChecksumUnavailable { .. }));
        assert_eq!(fs::read(&binary).await.unwrap(), OLD_BINARY);
    }

    #[tokio::test]
    async fn test_rename_failure_keeps_binary_and_returns_backup() {
        let (temp_dir, binary) = setup().await;
        let source = FakeReleaseSource::new().with_asset(DOWNLOAD_URL, NEW_BINARY);

        let failure = Installer::new(&source, binary.clone())
            .with_rename(failing_rename)
            .download_and_replace(DOWNLOAD_URL, ASSET_NAME, None)
            .await
            .unwrap_err();

        assert!(matches!(failure.error, UpdateError::FileSystem { .. }));
        assert_eq!(fs::read(&binary).await.unwrap(), OLD_BINARY);

        let backup = failure.backup_path.expect("backup path returned on rename failure");
        assert_eq!(fs::read(&backup).await.unwrap(), OLD_BINARY);
        assert!(leftover_temp_files(temp_dir.path()).is_empty());

        // The returned backup is restorable.
        fs::write(&binary, b"corrupted").await.unwrap();
        Installer::new(&source, binary.clone()).rollback(&backup).await.unwrap();
        assert_eq!(fs::read(&binary).await.unwrap(), OLD_BINARY);
    }

    #[tokio::test]
    async fn test_download_failure_leaves_binary_untouched() {
        let (temp_dir, binary) = setup().await;
        let source = FakeReleaseSource::new();

        let failure = Installer::new(&source, binary.clone())
            .download_and_replace(DOWNLOAD_URL, ASSET_NAME, None)
            .await
            .unwrap_err();

        assert!(matches!(failure.error, UpdateError::Network { .. }));
        assert!(failure.backup_path.is_none());
        assert_eq!(fs::read(&binary).await.unwrap(), OLD_BINARY);
        assert!(leftover_temp_files(temp_dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_permission_failure_is_reported_first() {
        let source = FakeReleaseSource::new().with_asset(DOWNLOAD_URL, NEW_BINARY);
        let failure = Installer::new(&source, PathBuf::from("/nonexistent/dir/tasklog"))
            .download_and_replace(DOWNLOAD_URL, ASSET_NAME, None)
            .await
            .unwrap_err();
        assert!(matches!(failure.error, UpdateError::PermissionDenied { .. }));
        assert_eq!(source.download_count(), 0);
    }

    #[tokio::test]
    async fn test_checksum_keyed_by_asset_name_not_url() {
        let (_temp_dir, binary) = setup().await;
        let signed_url = format!("{DOWNLOAD_URL}?X-Amz-Signature=abc%2Fdef&id=42");
        let digest = {
            use sha2::{Digest, Sha256};
            hex::encode(Sha256::digest(NEW_BINARY))
        };
        let source = FakeReleaseSource::new()
            .with_asset(&signed_url, NEW_BINARY)
            .with_asset(CHECKSUM_URL, format!("{digest}  {ASSET_NAME}\n"));

        Installer::new(&source, binary.clone())
            .download_and_replace(&signed_url, ASSET_NAME, Some(CHECKSUM_URL))
            .await
            .unwrap();
        assert_eq!(fs::read(&binary).await.unwrap(), NEW_BINARY);
    }

    #[test]
    fn test_for_current_exe_targets_running_binary() {
        let source = FakeReleaseSource::new();
        let installer = Installer::for_current_exe(&source).unwrap();
        let expected = std::env::current_exe().unwrap().canonicalize().unwrap();
        assert_eq!(installer.exe_path(), expected);
    }

    #[tokio::test]
    async fn test_rollback_without_backup() {
        let (temp_dir, binary) = setup().await;
        let source = FakeReleaseSource::new();
        let err = Installer::new(&source, binary.clone())
            .rollback(&temp_dir.path().join("tasklog.backup"))
            .await
            .unwrap_err();
        assert!(matches!(err, UpdateError::Rollback { .. }));
        assert_eq!(fs::read(&binary).await.unwrap(), OLD_BINARY);
    }
}
