//! On-disk layout of a pget installation.
//!
//! ```text
//! ~/.pget/
//! ├── bin/                      user executables (on PATH)
//! ├── helpers/<name>/
//! │   ├── doc/ data/ config/ cache/
//! │   └── .pget-metadata.json   install record
//! ├── script/<name>/            copied source trees for script installs
//! └── keys/                     trusted signing keys
//! $TMPDIR/pget/<name>/          downloaded artifacts
//! ```
//!
//! An optional system bin directory (default `/usr/local/bin`) takes
//! precedence over `~/.pget/bin` both for placement and for lookup.

use anyhow::Result;
use std::path::{Path, PathBuf};

use crate::config::PgetConfig;
use crate::utils::fs::ensure_dir;
use crate::utils::platform::executable_name;

pub const METADATA_FILE: &str = ".pget-metadata.json";

/// Subdirectories created for every installed package.
pub const HELPER_SUBDIRS: [&str; 4] = ["doc", "data", "config", "cache"];

#[derive(Debug, Clone)]
pub struct Layout {
    root: PathBuf,
    system_bin: Option<PathBuf>,
    cache_root: PathBuf,
}

impl Layout {
    pub fn new(root: impl Into<PathBuf>, system_bin: Option<PathBuf>, cache_root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            system_bin,
            cache_root: cache_root.into(),
        }
    }

    pub fn from_config(config: &PgetConfig) -> Result<Self> {
        Ok(Self::new(
            config.root_dir()?,
            config.system_bin_dir()?,
            std::env::temp_dir().join("pget"),
        ))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn bin_dir(&self) -> PathBuf {
        self.root.join("bin")
    }

    pub fn system_bin_dir(&self) -> Option<&Path> {
        self.system_bin.as_deref()
    }

    pub fn helpers_dir(&self) -> PathBuf {
        self.root.join("helpers")
    }

    pub fn helper_dir(&self, name: &str) -> PathBuf {
        self.helpers_dir().join(name)
    }

    pub fn doc_dir(&self, name: &str) -> PathBuf {
        self.helper_dir(name).join("doc")
    }

    pub fn metadata_path(&self, name: &str) -> PathBuf {
        self.helper_dir(name).join(METADATA_FILE)
    }

    pub fn script_root(&self) -> PathBuf {
        self.root.join("script")
    }

    pub fn legacy_script_root(&self) -> PathBuf {
        self.root.join("scripts")
    }

    pub fn script_dir(&self, name: &str) -> PathBuf {
        self.script_root().join(name)
    }

    pub fn cache_root(&self) -> &Path {
        &self.cache_root
    }

    /// Per-package download cache.
    pub fn package_cache(&self, name: &str) -> PathBuf {
        self.cache_root.join(name)
    }

    pub fn user_executable(&self, name: &str) -> PathBuf {
        self.bin_dir().join(executable_name(name))
    }

    pub fn system_executable(&self, name: &str) -> Option<PathBuf> {
        self.system_bin.as_ref().map(|dir| dir.join(executable_name(name)))
    }

    /// The authoritative installed executable: system copy first, then user copy.
    pub fn find_executable(&self, name: &str) -> Option<PathBuf> {
        self.system_executable(name)
            .filter(|path| path.is_file())
            .or_else(|| Some(self.user_executable(name)).filter(|path| path.is_file()))
    }

    /// Create `helpers/<name>/{doc,data,config,cache}`.
    pub fn ensure_helper_dirs(&self, name: &str) -> Result<()> {
        let helper = self.helper_dir(name);
        for sub in HELPER_SUBDIRS {
            ensure_dir(&helper.join(sub))?;
        }
        Ok(())
    }
}
