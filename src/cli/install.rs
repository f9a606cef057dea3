//! `pget install`

use anyhow::Result;
use clap::Args;

use super::common::{CommandEnv, GlobalOptions, install_mode, parse_package_specs};
use crate::core::PgetError;
use crate::installer::{InstallContext, InstallOptions, Installer};
use crate::ui::{Confirm, FixedAnswer, TerminalConfirm};

#[derive(Args)]
pub struct InstallCommand {
    /// Packages to install: NAME or NAME@VERSION, comma-separated lists allowed
    #[arg(required = true, value_name = "PACKAGE")]
    packages: Vec<String>,

    /// Install from source as a Python script bundle
    #[arg(long, conflicts_with = "build")]
    script: bool,

    /// Build from source even when a prebuilt binary exists
    #[arg(long)]
    build: bool,

    /// Install the latest development state from the default branch
    #[arg(long)]
    edge: bool,

    /// Answer yes to prompts (accept the script fallback)
    #[arg(short, long)]
    yes: bool,
}

impl InstallCommand {
    pub async fn execute(self, global: &GlobalOptions) -> Result<()> {
        let specs = parse_package_specs(&self.packages)?;
        let env = CommandEnv::load(global).await?;
        let catalog = env.catalog()?;

        let terminal = TerminalConfirm;
        let accept = FixedAnswer(true);
        let confirm: &dyn Confirm = if self.yes { &accept } else { &terminal };

        let installer = Installer::new(
            InstallContext::builder(&env.config, &env.layout, &catalog, &env.reporter)
                .confirm(confirm)
                .build(),
        )?;

        let mode = install_mode(self.script, self.build);
        let requests: Vec<(String, InstallOptions)> = specs
            .into_iter()
            .map(|spec| {
                let mut options = InstallOptions::default().with_edge(self.edge).with_mode(mode);
                if let Some(version) = spec.version {
                    options = options.with_version(version);
                }
                (spec.name, options)
            })
            .collect();

        if installer.install_many(&requests).await {
            Ok(())
        } else {
            Err(PgetError::Other {
                message: "one or more packages were not installed".to_string(),
            }
            .into())
        }
    }
}
