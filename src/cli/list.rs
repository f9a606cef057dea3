//! `pget list`

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use super::common::{CommandEnv, GlobalOptions};
use crate::installer::{InstallContext, InstalledPackage, Installer};

#[derive(Args)]
pub struct ListCommand {
    /// Print names only
    #[arg(long)]
    names: bool,
}

impl ListCommand {
    pub async fn execute(self, global: &GlobalOptions) -> Result<()> {
        let env = CommandEnv::load(global).await?;
        let catalog = env.catalog()?;
        let installer =
            Installer::new(InstallContext::builder(&env.config, &env.layout, &catalog, &env.reporter).build())?;

        let packages = installer.installed()?;
        if packages.is_empty() {
            if !global.quiet {
                println!("No packages installed");
            }
            return Ok(());
        }

        if self.names {
            for package in &packages {
                println!("{}", package.name);
            }
            return Ok(());
        }

        let width = packages.iter().map(|p| p.name.len()).max().unwrap_or(0);
        for package in &packages {
            println!("{}", format_row(package, width));
        }
        Ok(())
    }
}

fn format_row(package: &InstalledPackage, width: usize) -> String {
    let version = package.version.as_deref().unwrap_or("unknown");
    let strategy = package.strategy.map(|s| s.to_string()).unwrap_or_else(|| "-".to_string());
    let location = package
        .executable
        .as_ref()
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| "(no executable)".to_string());
    format!(
        "{:<width$}  {:<10}  {:<6}  {}",
        package.name.bold(),
        version,
        strategy,
        location.dimmed()
    )
}
