//! Command-line interface for pget.
//!
//! Each subcommand lives in its own module as a clap `Args` struct with an
//! async `execute` method. The top-level [`Cli`] owns the global flags and
//! dispatches:
//!
//! - `install <pkg[@version]>...` - install packages (`--script`, `--build`, `--edge`, `--yes`)
//! - `remove <pkg>...` - uninstall packages
//! - `update [pkg[@version]]...` - update packages; `update pget` updates pget itself
//! - `list` - installed packages
//! - `search [query]` - installable packages in the organization
//! - `versions <pkg>` - published releases of a package
//!
//! Package arguments accept comma-separated lists, so `pget install a,b@1.0 c`
//! names three packages.

pub mod common;
mod install;
mod list;
mod remove;
mod search;
mod update;
mod versions;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

pub use common::{GlobalOptions, PackageSpec, parse_package_specs};

#[derive(Parser)]
#[command(
    name = "pget",
    about = "pget - install command-line programs from the pynosaur organization",
    version,
    long_about = "pget installs programs published in the pynosaur GitHub organization as \
                  prebuilt binaries, Python script bundles, or local builds, and keeps them up to date."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Show debug output
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only print warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to the configuration file (default: ~/.pget/config.toml)
    #[arg(short, long, global = true, env = "PGET_CONFIG_PATH", value_name = "PATH")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Install one or more packages
    Install(install::InstallCommand),

    /// Uninstall packages
    #[command(visible_alias = "uninstall")]
    Remove(remove::RemoveCommand),

    /// Update installed packages, or pget itself
    Update(update::UpdateCommand),

    /// List installed packages
    List(list::ListCommand),

    /// Search installable packages
    Search(search::SearchCommand),

    /// Show published versions of a package
    Versions(versions::VersionsCommand),
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        init_logging(self.verbose);
        let global = GlobalOptions {
            verbose: self.verbose,
            quiet: self.quiet,
            config: self.config,
        };

        match self.command {
            Commands::Install(cmd) => cmd.execute(&global).await,
            Commands::Remove(cmd) => cmd.execute(&global).await,
            Commands::Update(cmd) => cmd.execute(&global).await,
            Commands::List(cmd) => cmd.execute(&global).await,
            Commands::Search(cmd) => cmd.execute(&global).await,
            Commands::Versions(cmd) => cmd.execute(&global).await,
        }
    }
}

/// `RUST_LOG` wins; otherwise `--verbose` enables debug output for pget.
fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("pget_cli=debug,pget::tool=debug")
        } else {
            EnvFilter::new("pget_cli=warn")
        }
    });

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
