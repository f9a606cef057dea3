//! `pget versions`

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::Args;
use colored::Colorize;

use super::common::{CommandEnv, GlobalOptions};
use crate::catalog::Release;
use crate::core::PgetError;
use crate::ui::Reporter;

#[derive(Args)]
pub struct VersionsCommand {
    /// Package name
    package: String,
}

impl VersionsCommand {
    pub async fn execute(self, global: &GlobalOptions) -> Result<()> {
        let env = CommandEnv::load(global).await?;
        let catalog = env.catalog()?;
        let name = self.package.as_str();

        let Some(releases) = catalog.releases(name).await? else {
            return Err(PgetError::PackageNotFound {
                name: name.to_string(),
                org: catalog.org().to_string(),
            }
            .into());
        };
        if releases.is_empty() {
            env.reporter.info(&format!(
                "{name} has no releases; installs use the {} branch",
                catalog.default_branch()
            ));
            return Ok(());
        }

        let latest = catalog.latest_release(name).await?.map(|release| release.tag_name);
        for release in &releases {
            let is_latest = latest.as_deref() == Some(release.tag_name.as_str());
            println!("{}", format_release(release, is_latest));
        }
        Ok(())
    }
}

fn format_release(release: &Release, is_latest: bool) -> String {
    let date = release
        .published_at
        .as_deref()
        .and_then(|raw| raw.parse::<DateTime<Utc>>().ok())
        .map(|date| date.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "-".to_string());
    let mut line = format!("{:<12}  {date}", release.tag_name);
    if let Some(title) = release.name.as_deref().filter(|t| !t.is_empty() && *t != release.tag_name) {
        line.push_str("  ");
        line.push_str(title);
    }
    if is_latest {
        line.push_str(&format!("  {}", "(latest)".green()));
    }
    line
}
