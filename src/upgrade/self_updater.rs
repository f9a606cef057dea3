use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, error, warn};

use super::backup::BackupManager;
use crate::catalog::Transport;
use crate::core::PgetError;
use crate::fetcher::ArtifactFetcher;
use crate::installer::build::{Builder, build_tool_names, find_build_tool};
use crate::installer::{InstallMode, InstallOptions, Installer};
use crate::metadata::{InstallRecord, Strategy};
use crate::resolver::{VersionResolver, is_newer};
use crate::utils::fs::{make_executable, make_writable};

/// Package name of the installer itself in the catalog.
pub const SELF_NAME: &str = "pget";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelfUpdateOutcome {
    UpToDate {
        version: String,
    },
    Updated {
        from: String,
        to: String,
    },
}

/// Replaces the running `pget` executable with a newer build.
///
/// The new binary is fully downloaded, verified (or built) before the current
/// executable is touched. The swap itself goes through [`replace_executable`].
/// A script-mode install of `pget` has no locked executable and goes through
/// the ordinary update path instead.
pub struct SelfUpdater<'i, 'a, T> {
    installer: &'i Installer<'a, T>,
    executable: PathBuf,
    current_version: String,
}

impl<'i, 'a, T: Transport> SelfUpdater<'i, 'a, T> {
    pub fn new(installer: &'i Installer<'a, T>, executable: PathBuf) -> Self {
        Self {
            installer,
            executable,
            current_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    #[must_use]
    pub fn with_current_version(mut self, version: impl Into<String>) -> Self {
        self.current_version = version.into();
        self
    }

    pub fn current_version(&self) -> &str {
        &self.current_version
    }

    pub async fn update(&self, edge: bool) -> Result<SelfUpdateOutcome> {
        let ctx = self.installer.context();
        let reporter = ctx.reporter;
        let current = self.current_version.clone();

        if self.installer.store().load(SELF_NAME).map(|record| record.strategy) == Some(Strategy::Script) {
            reporter.info("pget is installed as a script; reinstalling it");
            let options = InstallOptions::default().with_edge(edge).with_mode(InstallMode::Script);
            return Ok(match self.installer.update(SELF_NAME, &options).await? {
                Some(outcome) => SelfUpdateOutcome::Updated {
                    from: current,
                    to: outcome.version,
                },
                None => SelfUpdateOutcome::UpToDate {
                    version: current,
                },
            });
        }

        let selection = VersionResolver::new(ctx.catalog, reporter).resolve(SELF_NAME, None, edge).await?;
        let target = selection.version();
        if !edge {
            if selection.reference.is_branch() {
                reporter.info(&format!(
                    "No pget releases are published; use --edge to build from {}",
                    selection.reference
                ));
                return Ok(SelfUpdateOutcome::UpToDate {
                    version: current,
                });
            }
            if !is_newer(&current, &target) {
                reporter.info(&format!("pget is up to date ({current})"));
                return Ok(SelfUpdateOutcome::UpToDate {
                    version: current,
                });
            }
        }

        reporter.progress(&format!("Updating pget {current} -> {}", selection.reference));
        let mut fetcher = ArtifactFetcher::new(ctx.catalog, ctx.layout);
        let (replacement, strategy) = if selection.reference.is_branch() {
            let source = fetcher.fetch_source(SELF_NAME, &selection).await?;
            let tool = find_build_tool(ctx.config).ok_or_else(|| PgetError::ToolMissing {
                tool: build_tool_names(ctx.config),
                purpose: "building pget from source".to_string(),
            })?;
            let artifact = Builder::new(tool, ctx.config.timeouts.build(), reporter)
                .build(SELF_NAME, &source.root)
                .await?;
            (artifact, Strategy::Build)
        } else {
            let binary = fetcher
                .fetch_binary(SELF_NAME, &ctx.platform, &selection)
                .await?
                .ok_or_else(|| PgetError::SelfUpdateFailed {
                    reason: format!(
                        "release {} has no pget-{} asset",
                        selection.reference, ctx.platform
                    ),
                    restored: false,
                })?;
            self.installer.verify_binary(&mut fetcher, SELF_NAME, &selection, &binary).await?;
            (binary.path, Strategy::Binary)
        };

        let backup = replace_executable(&self.executable, &replacement).await?;

        let record = InstallRecord::new(target.clone(), ctx.catalog.repo_url(SELF_NAME), strategy)
            .with_platform(ctx.platform.to_string())
            .stamped();
        self.installer.store().save(SELF_NAME, &record)?;
        if let Err(e) = backup.cleanup_backup().await {
            warn!("Could not remove {}: {e:#}", backup.backup_path().display());
        }
        if let Err(e) = fetcher.clear(SELF_NAME) {
            debug!("Could not clear the pget download cache: {e:#}");
        }

        reporter.success(&format!("Updated pget {current} -> {target}"));
        Ok(SelfUpdateOutcome::Updated {
            from: current,
            to: target,
        })
    }
}

/// Swap `target` for a copy of `replacement`.
///
/// The target is made writable and backed up, then unlinked and the
/// replacement copied in. If anything fails after the unlink, the backup is
/// copied back (and then discarded) before the error is returned, so the host
/// always keeps either the old or the new executable. On success the backup is handed to the
/// caller, which removes it once the new version is recorded.
pub async fn replace_executable(target: &Path, replacement: &Path) -> Result<BackupManager> {
    let backup = BackupManager::new(target.to_path_buf());
    make_writable(target)?;
    backup.create_backup().await.map_err(|e| PgetError::SelfUpdateFailed {
        reason: format!("{e:#}"),
        restored: false,
    })?;

    let mut unlinked = false;
    match swap(target, replacement, &mut unlinked).await {
        Ok(()) => Ok(backup),
        Err(e) => {
            let restored = if unlinked {
                match backup.restore_backup().await {
                    Ok(()) => {
                        if let Err(cleanup_error) = backup.cleanup_backup().await {
                            debug!("Could not remove backup after restore: {cleanup_error:#}");
                        }
                        true
                    }
                    Err(restore_error) => {
                        error!(
                            "Could not restore {} from {}: {restore_error:#}",
                            target.display(),
                            backup.backup_path().display()
                        );
                        false
                    }
                }
            } else {
                // The original was never removed; the backup is redundant.
                if let Err(e) = backup.cleanup_backup().await {
                    debug!("Could not remove backup: {e:#}");
                }
                false
            };
            Err(PgetError::SelfUpdateFailed {
                reason: format!("{e:#}"),
                restored,
            }
            .into())
        }
    }
}

async fn swap(target: &Path, replacement: &Path, unlinked: &mut bool) -> Result<()> {
    tokio::fs::remove_file(target)
        .await
        .with_context(|| format!("Failed to remove {}", target.display()))?;
    *unlinked = true;
    tokio::fs::copy(replacement, target).await.with_context(|| {
        format!("Failed to copy {} to {}", replacement.display(), target.display())
    })?;
    make_executable(target)
}
