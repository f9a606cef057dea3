use anyhow::Result;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use crate::catalog::Transport;
use crate::core::PgetError;

/// In-memory [`Transport`].
///
/// Unknown URLs behave like 404s. URLs registered with
/// [`with_failure`](Self::with_failure) fail with a network error.
#[derive(Debug, Default)]
pub struct FakeTransport {
    json: HashMap<String, serde_json::Value>,
    files: HashMap<String, Vec<u8>>,
    probes: HashSet<String>,
    failures: HashSet<String>,
    requests: Mutex<Vec<String>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_json(mut self, url: &str, value: serde_json::Value) -> Self {
        self.json.insert(url.to_string(), value);
        self
    }

    #[must_use]
    pub fn with_file(mut self, url: &str, bytes: impl Into<Vec<u8>>) -> Self {
        self.files.insert(url.to_string(), bytes.into());
        self
    }

    #[must_use]
    pub fn with_probe(mut self, url: &str) -> Self {
        self.probes.insert(url.to_string());
        self
    }

    #[must_use]
    pub fn with_failure(mut self, url: &str) -> Self {
        self.failures.insert(url.to_string());
        self
    }

    /// Every URL requested so far, in order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn request_count(&self, url: &str) -> usize {
        self.requests().iter().filter(|r| *r == url).count()
    }

    fn record(&self, url: &str) -> Result<()> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(url.to_string());
        }
        if self.failures.contains(url) {
            return Err(PgetError::NetworkError {
                operation: format!("GET {url}"),
                reason: "connection refused".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

impl Transport for FakeTransport {
    async fn get_json(&self, url: &str, _timeout: Duration) -> Result<Option<serde_json::Value>> {
        self.record(url)?;
        Ok(self.json.get(url).cloned())
    }

    async fn download(&self, url: &str, dest: &Path, _timeout: Duration) -> Result<bool> {
        self.record(url)?;
        match self.files.get(url) {
            Some(bytes) => {
                std::fs::write(dest, bytes)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn exists(&self, url: &str, _timeout: Duration) -> Result<bool> {
        self.record(url)?;
        Ok(self.probes.contains(url) || self.json.contains_key(url) || self.files.contains_key(url))
    }
}
