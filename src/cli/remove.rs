//! `pget remove`

use anyhow::Result;
use clap::Args;

use super::common::{CommandEnv, GlobalOptions, parse_package_specs};
use crate::core::{PgetError, user_friendly_error};
use crate::installer::{InstallContext, Installer};
use crate::ui::Reporter;

#[derive(Args)]
pub struct RemoveCommand {
    /// Packages to uninstall
    #[arg(required = true, value_name = "PACKAGE")]
    packages: Vec<String>,
}

impl RemoveCommand {
    pub async fn execute(self, global: &GlobalOptions) -> Result<()> {
        let specs = parse_package_specs(&self.packages)?;
        let env = CommandEnv::load(global).await?;
        let catalog = env.catalog()?;
        let installer =
            Installer::new(InstallContext::builder(&env.config, &env.layout, &catalog, &env.reporter).build())?;

        let mut failed = 0;
        for spec in specs {
            if spec.version.is_some() {
                env.reporter.warning(&format!("Ignoring version for {}; removing it", spec.name));
            }
            if let Err(e) = installer.uninstall(&spec.name) {
                failed += 1;
                env.reporter.error(&format!("{}: {}", spec.name, user_friendly_error(e)));
            }
        }

        if failed == 0 {
            Ok(())
        } else {
            Err(PgetError::Other {
                message: format!("{failed} package(s) could not be removed"),
            }
            .into())
        }
    }
}
