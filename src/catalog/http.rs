use anyhow::{Context, Result};
use reqwest::StatusCode;
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;

use super::Transport;
use crate::core::PgetError;
use crate::utils::progress::download_bar;

/// [`Transport`] over HTTPS with reqwest.
///
/// Sends a `pget/<version>` user agent and, when `GITHUB_TOKEN` is set, a
/// bearer token to lift API rate limits.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    token: Option<String>,
}

impl HttpTransport {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("pget/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            token: std::env::var("GITHUB_TOKEN").ok().filter(|t| !t.is_empty()),
        })
    }

    fn request(&self, url: &str, timeout: Duration) -> reqwest::RequestBuilder {
        let mut request = self
            .client
            .get(url)
            .timeout(timeout)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        request
    }

    async fn send(&self, url: &str, timeout: Duration) -> Result<Option<reqwest::Response>> {
        let response = self.request(url, timeout).send().await.map_err(|e| network_error(url, &e))?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => Ok(Some(response)),
            status => Err(PgetError::NetworkError {
                operation: format!("GET {url}"),
                reason: format!("HTTP {status}"),
            }
            .into()),
        }
    }
}

fn network_error(url: &str, error: &reqwest::Error) -> anyhow::Error {
    let reason = if error.is_timeout() {
        "request timed out".to_string()
    } else {
        error.to_string()
    };
    PgetError::NetworkError {
        operation: format!("GET {url}"),
        reason,
    }
    .into()
}

impl Transport for HttpTransport {
    async fn get_json(&self, url: &str, timeout: Duration) -> Result<Option<serde_json::Value>> {
        tracing::debug!("GET {url}");
        let Some(response) = self.send(url, timeout).await? else {
            return Ok(None);
        };
        let value = response.json().await.map_err(|e| network_error(url, &e))?;
        Ok(Some(value))
    }

    async fn download(&self, url: &str, dest: &Path, timeout: Duration) -> Result<bool> {
        tracing::debug!("Downloading {url} -> {}", dest.display());
        let Some(mut response) = self.send(url, timeout).await? else {
            return Ok(false);
        };

        let label = dest.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();
        let bar = download_bar(&label, response.content_length());
        let partial = dest.with_extension("part");
        let mut file = tokio::fs::File::create(&partial)
            .await
            .with_context(|| format!("Failed to create {}", partial.display()))?;

        while let Some(chunk) = response.chunk().await.map_err(|e| network_error(url, &e))? {
            file.write_all(&chunk)
                .await
                .with_context(|| format!("Failed to write {}", partial.display()))?;
            bar.inc(chunk.len() as u64);
        }
        file.flush().await?;
        drop(file);
        bar.finish_and_clear();

        tokio::fs::rename(&partial, dest)
            .await
            .with_context(|| format!("Failed to move download to {}", dest.display()))?;
        Ok(true)
    }

    async fn exists(&self, url: &str, timeout: Duration) -> Result<bool> {
        tracing::debug!("Probing {url}");
        Ok(self.send(url, timeout).await?.is_some())
    }
}
