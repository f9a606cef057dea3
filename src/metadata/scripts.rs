use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::layout::Layout;
use crate::utils::fs::{copy_dir_filtered, ensure_dir, remove_dir_all};

/// Directory names never copied into a script bundle. `bazel-*` output
/// symlinks are excluded separately by prefix.
pub const SCRIPT_SKIP_PATTERNS: [&str; 5] =
    [".git", "__pycache__", ".pytest_cache", ".mypy_cache", "node_modules"];

pub fn should_skip_in_bundle(name: &str) -> bool {
    name.starts_with("bazel-") || SCRIPT_SKIP_PATTERNS.contains(&name)
}

/// Copied source trees for script-mode installs, under `<root>/script/`.
///
/// Opening the store moves a legacy `<root>/scripts/` directory into place
/// when the current root does not exist yet. The move happens at most once;
/// if both roots exist the legacy one is left alone and only consulted for
/// listing and removal.
#[derive(Debug, Clone)]
pub struct ScriptStore {
    layout: Layout,
}

impl ScriptStore {
    pub fn open(layout: Layout) -> Result<Self> {
        let store = Self {
            layout,
        };
        store.migrate_legacy_root()?;
        Ok(store)
    }

    fn migrate_legacy_root(&self) -> Result<bool> {
        let legacy = self.layout.legacy_script_root();
        let current = self.layout.script_root();
        if !legacy.is_dir() || current.exists() {
            return Ok(false);
        }
        std::fs::rename(&legacy, &current).with_context(|| {
            format!("Failed to move {} to {}", legacy.display(), current.display())
        })?;
        tracing::info!("Migrated script bundles from {} to {}", legacy.display(), current.display());
        Ok(true)
    }

    pub fn bundle_dir(&self, name: &str) -> PathBuf {
        self.layout.script_dir(name)
    }

    /// Replace the bundle for `name` with a filtered copy of `source_root`.
    pub fn install_bundle(&self, name: &str, source_root: &Path) -> Result<PathBuf> {
        let target = self.bundle_dir(name);
        remove_dir_all(&target)?;
        ensure_dir(&self.layout.script_root())?;
        copy_dir_filtered(source_root, &target, should_skip_in_bundle)
            .with_context(|| format!("Failed to copy sources of '{name}' into {}", target.display()))?;
        Ok(target)
    }

    /// Remove the bundle from both the current and the legacy root.
    pub fn remove_bundle(&self, name: &str) -> Result<()> {
        remove_dir_all(&self.bundle_dir(name))?;
        remove_dir_all(&self.layout.legacy_script_root().join(name))
    }

    pub fn has_bundle(&self, name: &str) -> bool {
        self.bundle_dir(name).is_dir() || self.layout.legacy_script_root().join(name).is_dir()
    }

    /// Names of all bundles in either root, sorted.
    pub fn bundles(&self) -> Result<Vec<String>> {
        let mut names = BTreeSet::new();
        for root in [self.layout.script_root(), self.layout.legacy_script_root()] {
            if !root.is_dir() {
                continue;
            }
            for entry in std::fs::read_dir(&root)
                .with_context(|| format!("Failed to read {}", root.display()))?
            {
                let entry = entry?;
                if entry.file_type()?.is_dir() {
                    names.insert(entry.file_name().to_string_lossy().to_string());
                }
            }
        }
        Ok(names.into_iter().collect())
    }

    /// Launcher placed on PATH for a script install.
    pub fn wrapper_content(&self, name: &str) -> String {
        let bundle = self.bundle_dir(name);
        format!(
            "#!/usr/bin/env python3\n\
             import sys\n\
             sys.path.insert(0, r\"{}\")\n\
             from app.main import main\n\
             sys.exit(main())\n",
            bundle.display()
        )
    }
}
