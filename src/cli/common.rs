//! Shared setup for subcommands.

use anyhow::{Result, bail};
use std::path::PathBuf;

use crate::catalog::{Catalog, HttpTransport};
use crate::config::PgetConfig;
use crate::installer::InstallMode;
use crate::layout::Layout;
use crate::ui::ConsoleReporter;

/// Flags accepted by every subcommand.
#[derive(Debug, Clone, Default)]
pub struct GlobalOptions {
    pub verbose: bool,
    pub quiet: bool,
    pub config: Option<PathBuf>,
}

/// Everything a command needs before it can build an installer.
pub struct CommandEnv {
    pub config: PgetConfig,
    pub layout: Layout,
    pub reporter: ConsoleReporter,
}

impl CommandEnv {
    pub async fn load(global: &GlobalOptions) -> Result<Self> {
        let config = PgetConfig::load_with_optional(global.config.clone()).await?;
        let layout = Layout::from_config(&config)?;
        tracing::debug!("Using install root {}", layout.root().display());
        Ok(Self {
            config,
            layout,
            reporter: ConsoleReporter::new(global.verbose, global.quiet),
        })
    }

    pub fn catalog(&self) -> Result<Catalog<HttpTransport>> {
        Ok(Catalog::new(HttpTransport::new()?, &self.config))
    }
}

/// A package argument: `name` or `name@version`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageSpec {
    pub name: String,
    pub version: Option<String>,
}

/// Split arguments on commas and parse each `name[@version]`.
pub fn parse_package_specs<S: AsRef<str>>(args: &[S]) -> Result<Vec<PackageSpec>> {
    let mut specs = Vec::new();
    for arg in args {
        for part in arg.as_ref().split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let spec = match part.split_once('@') {
                Some((name, version)) => {
                    if name.is_empty() || version.is_empty() {
                        bail!("Invalid package spec '{part}': expected NAME or NAME@VERSION");
                    }
                    PackageSpec {
                        name: name.to_string(),
                        version: Some(version.to_string()),
                    }
                }
                None => PackageSpec {
                    name: part.to_string(),
                    version: None,
                },
            };
            specs.push(spec);
        }
    }
    if specs.is_empty() {
        bail!("No package names given");
    }
    Ok(specs)
}

pub const fn install_mode(script: bool, build: bool) -> InstallMode {
    match (script, build) {
        (true, _) => InstallMode::Script,
        (false, true) => InstallMode::Build,
        (false, false) => InstallMode::Auto,
    }
}
