//! The remote package catalog: repositories of one organization on GitHub.
//!
//! [`Transport`] is the narrow request/response seam ("fetch JSON for URL",
//! "download bytes for URL", "does URL exist"); [`HttpTransport`] implements it
//! over HTTPS, and tests substitute an in-memory fake. [`Catalog`] turns
//! package names into GitHub REST endpoints and typed models.
//!
//! A 404 is never an error at this layer: lookups return `None` (or `false`)
//! so callers can fall back. Every other failure surfaces as
//! [`PgetError::NetworkError`](crate::core::PgetError::NetworkError).

mod http;
mod models;

pub use http::HttpTransport;
pub use models::{Asset, Release, RepoInfo};

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::future::Future;
use std::path::Path;
use std::time::Duration;

use crate::config::{PgetConfig, Timeouts};
use crate::core::PgetError;

/// Marker file that makes a repository installable.
pub const PROGRAM_MARKER: &str = ".program";

pub trait Transport {
    /// Fetch and decode a JSON document. `Ok(None)` when the URL is 404.
    fn get_json(
        &self,
        url: &str,
        timeout: Duration,
    ) -> impl Future<Output = Result<Option<serde_json::Value>>>;

    /// Stream the body of `url` into `dest`. `Ok(false)` when the URL is 404.
    fn download(&self, url: &str, dest: &Path, timeout: Duration) -> impl Future<Output = Result<bool>>;

    /// Whether `url` resolves to a resource.
    fn exists(&self, url: &str, timeout: Duration) -> impl Future<Output = Result<bool>>;
}

pub struct Catalog<T> {
    transport: T,
    org: String,
    api_base: String,
    raw_base: String,
    default_branch: String,
    timeouts: Timeouts,
}

impl<T: Transport> Catalog<T> {
    pub fn new(transport: T, config: &PgetConfig) -> Self {
        Self {
            transport,
            org: config.org.clone(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            raw_base: config.raw_base.trim_end_matches('/').to_string(),
            default_branch: config.default_branch.clone(),
            timeouts: config.timeouts,
        }
    }

    pub fn org(&self) -> &str {
        &self.org
    }

    pub fn default_branch(&self) -> &str {
        &self.default_branch
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Human-facing URL recorded as the package's source origin.
    pub fn repo_url(&self, name: &str) -> String {
        format!("https://github.com/{}/{name}", self.org)
    }

    fn repo_api(&self, name: &str) -> String {
        format!("{}/repos/{}/{name}", self.api_base, self.org)
    }

    pub fn tarball_url(&self, name: &str, reference: &str) -> String {
        format!("{}/tarball/{reference}", self.repo_api(name))
    }

    async fn get_typed<D: DeserializeOwned>(&self, url: &str) -> Result<Option<D>> {
        let Some(value) = self.transport.get_json(url, self.timeouts.metadata()).await? else {
            return Ok(None);
        };
        let typed = serde_json::from_value(value)
            .with_context(|| format!("Unexpected response from {url}"))?;
        Ok(Some(typed))
    }

    pub async fn repo_info(&self, name: &str) -> Result<Option<RepoInfo>> {
        self.get_typed(&self.repo_api(name)).await
    }

    pub async fn latest_release(&self, name: &str) -> Result<Option<Release>> {
        self.get_typed(&format!("{}/releases/latest", self.repo_api(name))).await
    }

    pub async fn release_by_tag(&self, name: &str, tag: &str) -> Result<Option<Release>> {
        self.get_typed(&format!("{}/releases/tags/{tag}", self.repo_api(name))).await
    }

    /// Up to 100 releases, newest first. `None` when the repository does not exist.
    pub async fn releases(&self, name: &str) -> Result<Option<Vec<Release>>> {
        self.get_typed(&format!("{}/releases?per_page=100", self.repo_api(name))).await
    }

    /// Up to 100 repositories of the organization.
    pub async fn org_repos(&self) -> Result<Vec<RepoInfo>> {
        let url = format!("{}/orgs/{}/repos?per_page=100", self.api_base, self.org);
        match self.get_typed(&url).await? {
            Some(repos) => Ok(repos),
            None => Err(PgetError::NetworkError {
                operation: format!("GET {url}"),
                reason: format!("organization '{}' not found", self.org),
            }
            .into()),
        }
    }

    /// Probe for the `.program` marker on the default branch.
    pub async fn has_program_marker(&self, name: &str) -> Result<bool> {
        let url = format!(
            "{}/{}/{name}/{}/{PROGRAM_MARKER}",
            self.raw_base, self.org, self.default_branch
        );
        self.transport.exists(&url, self.timeouts.probe()).await
    }

    pub async fn download_asset(&self, asset: &Asset, dest: &Path) -> Result<bool> {
        self.transport.download(&asset.browser_download_url, dest, self.timeouts.download()).await
    }

    pub async fn download_tarball(&self, name: &str, reference: &str, dest: &Path) -> Result<bool> {
        self.transport
            .download(&self.tarball_url(name, reference), dest, self.timeouts.download())
            .await
    }
}
