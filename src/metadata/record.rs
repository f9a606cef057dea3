use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How a package was installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Prebuilt release asset.
    Binary,
    /// Copied source tree behind a launcher.
    Script,
    /// Compiled locally from source.
    Build,
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Binary => "binary",
            Self::Script => "script",
            Self::Build => "build",
        };
        f.write_str(name)
    }
}

/// The persisted install record for one package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "StoredRecord")]
pub struct InstallRecord {
    pub version: String,
    pub source_url: String,
    pub strategy: Strategy,
    /// Host platform for binary and build installs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub installed_at: Option<DateTime<Utc>>,
}

impl InstallRecord {
    pub fn new(version: impl Into<String>, source_url: impl Into<String>, strategy: Strategy) -> Self {
        Self {
            version: version.into(),
            source_url: source_url.into(),
            strategy,
            platform: None,
            installed_at: None,
        }
    }

    #[must_use]
    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = Some(platform.into());
        self
    }

    #[must_use]
    pub fn stamped(mut self) -> Self {
        self.installed_at = Some(Utc::now());
        self
    }
}

/// On-disk shape. Older records carry no `strategy` and store either
/// `"script"` or the platform string in `platform`.
#[derive(Deserialize)]
struct StoredRecord {
    version: String,
    #[serde(default)]
    source_url: String,
    #[serde(default)]
    strategy: Option<Strategy>,
    #[serde(default)]
    platform: Option<String>,
    #[serde(default)]
    installed_at: Option<DateTime<Utc>>,
}

impl From<StoredRecord> for InstallRecord {
    fn from(stored: StoredRecord) -> Self {
        let (strategy, platform) = match (stored.strategy, stored.platform) {
            (Some(strategy), platform) => (strategy, platform),
            (None, Some(platform)) if platform == "script" => (Strategy::Script, None),
            (None, platform) => (Strategy::Binary, platform),
        };
        Self {
            version: stored.version,
            source_url: stored.source_url,
            strategy,
            platform,
            installed_at: stored.installed_at,
        }
    }
}
