//! `pget search`

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use super::common::{CommandEnv, GlobalOptions};
use crate::catalog::RepoInfo;
use crate::config::PgetConfig;
use crate::ui::Reporter;

#[derive(Args)]
pub struct SearchCommand {
    /// Case-insensitive text matched against names and descriptions
    query: Option<String>,
}

impl SearchCommand {
    pub async fn execute(self, global: &GlobalOptions) -> Result<()> {
        let env = CommandEnv::load(global).await?;
        let catalog = env.catalog()?;

        let candidates = filter_repos(catalog.org_repos().await?, self.query.as_deref(), &env.config);
        env.reporter.debug(&format!("Checking {} repositories for the .program marker", candidates.len()));

        let mut found = 0;
        for repo in candidates {
            match catalog.has_program_marker(&repo.name).await {
                Ok(true) => {
                    found += 1;
                    match repo.description.as_deref().filter(|d| !d.is_empty()) {
                        Some(description) => println!("{}  {}", repo.name.bold(), description),
                        None => println!("{}", repo.name.bold()),
                    }
                }
                Ok(false) => {}
                Err(e) => env.reporter.warning(&format!("Skipping {}: {e:#}", repo.name)),
            }
        }

        if found == 0 {
            env.reporter.info("No matching packages");
        }
        Ok(())
    }
}

/// Drop ignored repositories and those not matching `query`; sorted by name.
fn filter_repos(repos: Vec<RepoInfo>, query: Option<&str>, config: &PgetConfig) -> Vec<RepoInfo> {
    let query = query.map(str::to_lowercase);
    let mut repos: Vec<RepoInfo> = repos
        .into_iter()
        .filter(|repo| !config.is_ignored(&repo.name))
        .filter(|repo| match &query {
            Some(q) => {
                repo.name.to_lowercase().contains(q)
                    || repo.description.as_deref().is_some_and(|d| d.to_lowercase().contains(q))
            }
            None => true,
        })
        .collect();
    repos.sort_by(|a, b| a.name.cmp(&b.name));
    repos
}
