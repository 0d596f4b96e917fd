//! Backup and restore of the tasklog executable around an upgrade.

use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

use crate::core::UpdateError;

/// Manages the single-slot backup of the tasklog binary.
///
/// The backup lives next to the executable as `<name>.backup`, so it shares the
/// executable's file system and restoring it is a plain rename. Each upgrade
/// overwrites the previous backup.
///
/// # Examples
///
/// ```rust,no_run
/// use tasklog::upgrade::backup::BackupManager;
/// use std::path::PathBuf;
///
/// # async fn example() -> Result<(), tasklog::core::UpdateError> {
/// let manager = BackupManager::new(PathBuf::from("/usr/local/bin/tasklog"));
/// manager.create_backup().await?;
///
/// // ... replace the binary ...
///
/// if manager.backup_exists() {
///     manager.restore_backup().await?;
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct BackupManager {
    /// Path to the live binary.
    original_path: PathBuf,
    /// Path of the backup copy.
    backup_path: PathBuf,
}

impl BackupManager {
    /// Create a manager for `executable_path` with the conventional backup path.
    ///
    /// `/usr/local/bin/tasklog` is backed up to `/usr/local/bin/tasklog.backup`.
    pub fn new(executable_path: PathBuf) -> Self {
        let backup_path = Self::backup_path_for(&executable_path);
        Self {
            original_path: executable_path,
            backup_path,
        }
    }

    /// Create a manager restoring from an explicit backup location.
    pub fn with_backup_path(executable_path: PathBuf, backup_path: PathBuf) -> Self {
        Self {
            original_path: executable_path,
            backup_path,
        }
    }

    /// The conventional backup path for an executable.
    #[must_use]
    pub fn backup_path_for(executable_path: &Path) -> PathBuf {
        let mut backup_path = executable_path.to_path_buf();
        backup_path.set_file_name(format!(
            "{}.backup",
            executable_path.file_name().unwrap_or_default().to_string_lossy()
        ));
        backup_path
    }

    /// Copy the live binary to the backup location, preserving permissions.
    ///
    /// The live binary is only read, never moved, so it stays intact whatever
    /// happens here. An existing backup is replaced.
    pub async fn create_backup(&self) -> Result<(), UpdateError> {
        if self.backup_path.exists() {
            debug!("Removing old backup at {:?}", self.backup_path);
            fs::remove_file(&self.backup_path)
                .await
                .map_err(|e| UpdateError::fs("remove old backup", &self.backup_path, e))?;
        }

        info!("Creating backup at {:?}", self.backup_path);
        // fs::copy carries the permission bits over on every platform.
        fs::copy(&self.original_path, &self.backup_path)
            .await
            .map_err(|e| UpdateError::fs("create backup", &self.backup_path, e))?;

        #[cfg(unix)]
        {
            let metadata = fs::metadata(&self.original_path)
                .await
                .map_err(|e| UpdateError::fs("read binary metadata", &self.original_path, e))?;
            fs::set_permissions(&self.backup_path, metadata.permissions())
                .await
                .map_err(|e| UpdateError::fs("set backup permissions", &self.backup_path, e))?;
        }

        Ok(())
    }

    /// Move the backup back onto the live binary path.
    ///
    /// # Errors
    ///
    /// [`UpdateError::Rollback`] when no backup exists or the rename fails.
    pub async fn restore_backup(&self) -> Result<(), UpdateError> {
        if !self.backup_path.exists() {
            return Err(UpdateError::Rollback {
                backup: self.backup_path.clone(),
                reason: "no backup found".to_string(),
            });
        }

        warn!("Restoring {:?} from backup at {:?}", self.original_path, self.backup_path);
        fs::rename(&self.backup_path, &self.original_path)
            .await
            .map_err(|e| UpdateError::Rollback {
                backup: self.backup_path.clone(),
                reason: e.to_string(),
            })?;

        info!("Successfully restored from backup");
        Ok(())
    }

    /// Whether a backup file is present.
    pub fn backup_exists(&self) -> bool {
        self.backup_path.exists()
    }

    /// Location of the backup file.
    pub fn backup_path(&self) -> &Path {
        &self.backup_path
    }
}
