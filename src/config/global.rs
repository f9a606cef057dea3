//! User configuration for pget.
//!
//! The configuration lives at `~/.pget/config.toml` (or wherever
//! `PGET_CONFIG_PATH` points). Every field has a default, so a missing file or
//! a partial file is valid:
//!
//! ```toml
//! org = "pynosaur"
//! ignored_repos = ["pget", ".github"]
//! require_manifest = false
//!
//! [timeouts]
//! metadata_secs = 30
//! download_secs = 300
//! ```
//!
//! Path-valued settings accept `~` and environment variables, expanded with
//! `shellexpand` when the paths are resolved.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

/// Default catalog organization.
pub const DEFAULT_ORG: &str = "pynosaur";
/// Default REST API base.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";
/// Default raw-file base used for marker probes.
pub const DEFAULT_RAW_BASE: &str = "https://raw.githubusercontent.com";

/// Environment variable overriding the config file location.
pub const CONFIG_PATH_ENV: &str = "PGET_CONFIG_PATH";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PgetConfig {
    /// Organization whose repositories form the catalog.
    pub org: String,
    pub api_base: String,
    pub raw_base: String,
    /// Branch used for edge installs and marker probes.
    pub default_branch: String,
    /// Install root; `~/.pget` when unset.
    pub root: Option<String>,
    /// Higher-priority bin directory tried before the user bin directory.
    pub system_bin: Option<String>,
    pub system_install: bool,
    /// Repositories in the org that are never installable.
    pub ignored_repos: Vec<String>,
    /// Directory of `*.asc` public keys trusted for manifest signatures.
    pub trusted_keys_dir: Option<String>,
    /// Refuse binary releases that ship no signed manifest.
    pub require_manifest: bool,
    /// Build tools tried in order.
    pub build_tools: Vec<String>,
    pub signature_tool: String,
    pub timeouts: Timeouts,
}

impl Default for PgetConfig {
    fn default() -> Self {
        Self {
            org: DEFAULT_ORG.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            raw_base: DEFAULT_RAW_BASE.to_string(),
            default_branch: "main".to_string(),
            root: None,
            system_bin: default_system_bin(),
            system_install: true,
            ignored_repos: vec!["pget".to_string(), ".github".to_string()],
            trusted_keys_dir: None,
            require_manifest: false,
            build_tools: vec!["bazelisk".to_string(), "bazel".to_string()],
            signature_tool: "gpg".to_string(),
            timeouts: Timeouts::default(),
        }
    }
}

fn default_system_bin() -> Option<String> {
    if cfg!(windows) {
        None
    } else {
        Some("/usr/local/bin".to_string())
    }
}

/// Timeouts in seconds for every blocking network call and subprocess.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Timeouts {
    pub metadata_secs: u64,
    pub probe_secs: u64,
    pub download_secs: u64,
    pub build_secs: u64,
    pub signature_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            metadata_secs: 30,
            probe_secs: 5,
            download_secs: 300,
            build_secs: 1800,
            signature_secs: 60,
        }
    }
}

impl Timeouts {
    pub const fn metadata(&self) -> Duration {
        Duration::from_secs(self.metadata_secs)
    }

    pub const fn probe(&self) -> Duration {
        Duration::from_secs(self.probe_secs)
    }

    pub const fn download(&self) -> Duration {
        Duration::from_secs(self.download_secs)
    }

    pub const fn build(&self) -> Duration {
        Duration::from_secs(self.build_secs)
    }

    pub const fn signature(&self) -> Duration {
        Duration::from_secs(self.signature_secs)
    }
}

impl PgetConfig {
    /// Load from the default location, falling back to defaults when absent.
    pub async fn load() -> Result<Self> {
        Self::load_with_optional(None).await
    }

    /// Load from an explicit path if given, else from the default location.
    pub async fn load_with_optional(path: Option<PathBuf>) -> Result<Self> {
        let path = match path {
            Some(path) => path,
            None => Self::default_path()?,
        };
        if path.exists() {
            Self::load_from(&path).await
        } else {
            Ok(Self::default())
        }
    }

    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    pub async fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content)
            .await
            .with_context(|| format!("Failed to write config to {}", path.display()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;

            let mut perms = fs::metadata(path)
                .await
                .with_context(|| format!("Failed to read permissions for {}", path.display()))?
                .permissions();
            perms.set_mode(0o600);
            fs::set_permissions(path, perms).await.with_context(|| {
                format!("Failed to set permissions on {}", path.display())
            })?;
        }

        Ok(())
    }

    /// `$PGET_CONFIG_PATH`, else `~/.pget/config.toml`.
    pub fn default_path() -> Result<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            return Ok(PathBuf::from(path));
        }
        let home = dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("Unable to determine home directory"))?;
        Ok(home.join(".pget").join("config.toml"))
    }

    /// Install root with `~` expanded.
    pub fn root_dir(&self) -> Result<PathBuf> {
        match &self.root {
            Some(root) => expand_path(root),
            None => {
                let home = dirs::home_dir()
                    .ok_or_else(|| anyhow::anyhow!("Unable to determine home directory"))?;
                Ok(home.join(".pget"))
            }
        }
    }

    /// The system bin directory, or `None` when system installs are disabled.
    pub fn system_bin_dir(&self) -> Result<Option<PathBuf>> {
        if !self.system_install {
            return Ok(None);
        }
        self.system_bin.as_deref().map(expand_path).transpose()
    }

    pub fn trusted_keys_path(&self) -> Result<PathBuf> {
        match &self.trusted_keys_dir {
            Some(dir) => expand_path(dir),
            None => Ok(self.root_dir()?.join("keys")),
        }
    }

    pub fn is_ignored(&self, name: &str) -> bool {
        self.ignored_repos.iter().any(|repo| repo.eq_ignore_ascii_case(name))
    }
}

fn expand_path(raw: &str) -> Result<PathBuf> {
    let expanded = shellexpand::full(raw)
        .with_context(|| format!("Failed to expand path '{raw}'"))?;
    Ok(PathBuf::from(expanded.as_ref()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = PgetConfig::default();
        assert_eq!(config.org, "pynosaur");
        assert_eq!(config.api_base, "https://api.github.com");
        assert_eq!(config.raw_base, "https://raw.githubusercontent.com");
        assert_eq!(config.build_tools, vec!["bazelisk", "bazel"]);
        assert_eq!(config.timeouts.probe(), Duration::from_secs(5));
        assert!(config.is_ignored("PGET"));
        assert!(!config.is_ignored("foo"));
    }

    #[tokio::test]
    async fn test_partial_file_uses_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "org = \"acme\"\n[timeouts]\ndownload_secs = 10\n").unwrap();

        let config = PgetConfig::load_from(&path).await.unwrap();
        assert_eq!(config.org, "acme");
        assert_eq!(config.timeouts.download_secs, 10);
        assert_eq!(config.timeouts.metadata_secs, 30);
        assert_eq!(config.default_branch, "main");
    }

    #[tokio::test]
    async fn test_save_and_reload() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("config.toml");

        let config = PgetConfig {
            root: Some(temp.path().join("root").display().to_string()),
            require_manifest: true,
            ..PgetConfig::default()
        };
        config.save_to(&path).await.unwrap();

        let loaded = PgetConfig::load_from(&path).await.unwrap();
        assert_eq!(loaded, config);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[tokio::test]
    async fn test_missing_file_gives_defaults() {
        let temp = TempDir::new().unwrap();
        let config =
            PgetConfig::load_with_optional(Some(temp.path().join("absent.toml"))).await.unwrap();
        assert_eq!(config, PgetConfig::default());
    }

    #[test]
    fn test_system_bin_disabled() {
        let config = PgetConfig {
            system_install: false,
            ..PgetConfig::default()
        };
        assert_eq!(config.system_bin_dir().unwrap(), None);
    }

    #[test]
    fn test_trusted_keys_default_under_root() {
        let config = PgetConfig {
            root: Some("/opt/pget".to_string()),
            ..PgetConfig::default()
        };
        assert_eq!(config.trusted_keys_path().unwrap(), PathBuf::from("/opt/pget/keys"));
    }
}
