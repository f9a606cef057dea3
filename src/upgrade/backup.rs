use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

/// Sibling backup of an executable that is about to be replaced.
///
/// The backup lives next to the original as `<file>.backup`, so it stays on
/// the same filesystem and in the same permission context, and a restore is
/// a plain copy back.
///
/// # Examples
///
/// ```rust,no_run
/// use pget_cli::upgrade::BackupManager;
/// use std::path::PathBuf;
///
/// # async fn example() -> anyhow::Result<()> {
/// let backup = BackupManager::new(PathBuf::from("/usr/local/bin/pget"));
/// backup.create_backup().await?;
///
/// // ... replace the executable ...
///
/// let replaced = true;
/// if replaced {
///     backup.cleanup_backup().await?;
/// } else {
///     backup.restore_backup().await?;
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct BackupManager {
    original_path: PathBuf,
    backup_path: PathBuf,
}

impl BackupManager {
    /// `/usr/local/bin/pget` is backed up to `/usr/local/bin/pget.backup`.
    pub fn new(executable_path: PathBuf) -> Self {
        let mut backup_path = executable_path.clone();
        backup_path.set_file_name(format!(
            "{}.backup",
            executable_path.file_name().unwrap_or_default().to_string_lossy()
        ));

        Self {
            original_path: executable_path,
            backup_path,
        }
    }

    /// Copy the original aside, replacing any earlier backup.
    ///
    /// Permissions are carried over on unix so a restored file is executable.
    pub async fn create_backup(&self) -> Result<()> {
        if !self.original_path.exists() {
            bail!("Original file does not exist: {}", self.original_path.display());
        }

        if self.backup_path.exists() {
            debug!("Removing old backup at {}", self.backup_path.display());
            fs::remove_file(&self.backup_path).await.context("Failed to remove old backup")?;
        }

        info!("Creating backup at {}", self.backup_path.display());
        fs::copy(&self.original_path, &self.backup_path)
            .await
            .context("Failed to create backup")?;

        #[cfg(unix)]
        {
            let permissions = fs::metadata(&self.original_path)
                .await
                .context("Failed to read original file metadata")?
                .permissions();
            fs::set_permissions(&self.backup_path, permissions)
                .await
                .context("Failed to set backup permissions")?;
        }

        Ok(())
    }

    /// Put the backup back in place of whatever is at the original path.
    ///
    /// Retried a few times since the target can be briefly locked on Windows.
    pub async fn restore_backup(&self) -> Result<()> {
        if !self.backup_path.exists() {
            bail!("No backup found at {}", self.backup_path.display());
        }

        warn!("Restoring {} from backup", self.original_path.display());

        const MAX_ATTEMPTS: u32 = 3;
        let mut attempts = 0;
        loop {
            match self.attempt_restore().await {
                Ok(()) => {
                    info!("Restored {} from backup", self.original_path.display());
                    return Ok(());
                }
                Err(e) if attempts < MAX_ATTEMPTS - 1 => {
                    warn!("Restore attempt {} failed: {e:#}. Retrying...", attempts + 1);
                    tokio::time::sleep(tokio::time::Duration::from_millis(500)).await;
                    attempts += 1;
                }
                Err(e) => {
                    return Err(e.context(format!("Failed to restore backup after {MAX_ATTEMPTS} attempts")));
                }
            }
        }
    }

    async fn attempt_restore(&self) -> Result<()> {
        if fs::symlink_metadata(&self.original_path).await.is_ok() {
            fs::remove_file(&self.original_path)
                .await
                .context("Failed to remove the replaced file")?;
        }

        fs::copy(&self.backup_path, &self.original_path)
            .await
            .context("Failed to copy backup into place")?;

        #[cfg(unix)]
        {
            let permissions =
                fs::metadata(&self.backup_path).await.context("Failed to read backup metadata")?.permissions();
            fs::set_permissions(&self.original_path, permissions)
                .await
                .context("Failed to restore permissions")?;
        }

        Ok(())
    }

    /// Delete the backup; a missing backup is fine.
    pub async fn cleanup_backup(&self) -> Result<()> {
        if self.backup_path.exists() {
            debug!("Cleaning up backup at {}", self.backup_path.display());
            fs::remove_file(&self.backup_path).await.context("Failed to remove backup")?;
        }
        Ok(())
    }

    pub fn backup_exists(&self) -> bool {
        self.backup_path.exists()
    }

    pub fn backup_path(&self) -> &Path {
        &self.backup_path
    }

    pub fn original_path(&self) -> &Path {
        &self.original_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_backup_path() {
        let manager = BackupManager::new(PathBuf::from("/usr/local/bin/pget"));
        assert_eq!(manager.backup_path(), Path::new("/usr/local/bin/pget.backup"));
    }

    #[tokio::test]
    async fn test_create_restore_cleanup() {
        let temp = TempDir::new().unwrap();
        let exe = temp.path().join("pget");
        std::fs::write(&exe, b"old").unwrap();
        let manager = BackupManager::new(exe.clone());

        manager.create_backup().await.unwrap();
        assert!(manager.backup_exists());

        std::fs::write(&exe, b"broken").unwrap();
        manager.restore_backup().await.unwrap();
        assert_eq!(std::fs::read(&exe).unwrap(), b"old");

        manager.cleanup_backup().await.unwrap();
        assert!(!manager.backup_exists());
        manager.cleanup_backup().await.unwrap();
    }

    #[tokio::test]
    async fn test_restore_when_original_missing() {
        let temp = TempDir::new().unwrap();
        let exe = temp.path().join("pget");
        std::fs::write(&exe, b"old").unwrap();
        let manager = BackupManager::new(exe.clone());
        manager.create_backup().await.unwrap();

        std::fs::remove_file(&exe).unwrap();
        manager.restore_backup().await.unwrap();
        assert_eq!(std::fs::read(&exe).unwrap(), b"old");
    }

    #[tokio::test]
    async fn test_errors_without_files() {
        let temp = TempDir::new().unwrap();
        let manager = BackupManager::new(temp.path().join("missing"));
        assert!(manager.create_backup().await.is_err());
        assert!(manager.restore_backup().await.is_err());
    }
}
