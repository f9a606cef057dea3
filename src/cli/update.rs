//! `pget update`

use anyhow::{Context, Result};
use clap::Args;

use super::common::{CommandEnv, GlobalOptions, PackageSpec, install_mode, parse_package_specs};
use crate::catalog::HttpTransport;
use crate::core::{PgetError, user_friendly_error};
use crate::installer::{InstallContext, InstallOptions, Installer};
use crate::ui::Reporter;
use crate::upgrade::{SELF_NAME, SelfUpdateOutcome, SelfUpdater};

#[derive(Args)]
pub struct UpdateCommand {
    /// Packages to update (default: every installed package). `pget` updates pget itself
    #[arg(value_name = "PACKAGE")]
    packages: Vec<String>,

    /// Update to the latest development state of the default branch
    #[arg(long)]
    edge: bool,

    /// Reinstall as a Python script bundle
    #[arg(long, conflicts_with = "build")]
    script: bool,

    /// Rebuild from source
    #[arg(long)]
    build: bool,
}

impl UpdateCommand {
    pub async fn execute(self, global: &GlobalOptions) -> Result<()> {
        let env = CommandEnv::load(global).await?;
        let catalog = env.catalog()?;
        let installer =
            Installer::new(InstallContext::builder(&env.config, &env.layout, &catalog, &env.reporter).build())?;

        let specs = if self.packages.is_empty() {
            let installed: Vec<PackageSpec> = installer
                .installed()?
                .into_iter()
                .filter(|package| package.name != SELF_NAME)
                .map(|package| PackageSpec {
                    name: package.name,
                    version: None,
                })
                .collect();
            if installed.is_empty() {
                env.reporter.info("No packages installed");
                return Ok(());
            }
            installed
        } else {
            parse_package_specs(&self.packages)?
        };

        let mode = install_mode(self.script, self.build);
        let mut failed = 0;
        for spec in specs {
            let result = if spec.name == SELF_NAME {
                self.update_self(&installer).await
            } else {
                let mut options = InstallOptions::default().with_edge(self.edge).with_mode(mode);
                if let Some(version) = spec.version {
                    options = options.with_version(version);
                }
                installer.update(&spec.name, &options).await.map(|_| ())
            };
            if let Err(e) = result {
                failed += 1;
                env.reporter.error(&format!("{}: {}", spec.name, user_friendly_error(e)));
            }
        }

        if failed == 0 {
            Ok(())
        } else {
            Err(PgetError::Other {
                message: format!("{failed} package(s) could not be updated"),
            }
            .into())
        }
    }

    async fn update_self(&self, installer: &Installer<'_, HttpTransport>) -> Result<()> {
        let executable = std::env::current_exe().context("Failed to locate the running pget executable")?;
        let executable = executable.canonicalize().unwrap_or(executable);

        match SelfUpdater::new(installer, executable).update(self.edge).await? {
            SelfUpdateOutcome::UpToDate {
                ..
            } => {}
            SelfUpdateOutcome::Updated {
                to,
                ..
            } => tracing::debug!("pget now at {to}"),
        }
        Ok(())
    }
}
