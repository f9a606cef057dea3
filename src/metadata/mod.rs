//! Installation state: one record file per package, plus the script bundle store.
//!
//! Records live at `helpers/<name>/.pget-metadata.json`. There is no central
//! index; listing installed packages walks the bin and script directories.
//! A record exists exactly when the package's executable exists, which the
//! installer maintains by writing the record last and deleting it with the
//! helper directory on uninstall.

mod record;
mod scripts;

pub use record::{InstallRecord, Strategy};
pub use scripts::{SCRIPT_SKIP_PATTERNS, ScriptStore, should_skip_in_bundle};

use anyhow::Result;
use std::path::Path;

use crate::layout::Layout;
use crate::utils::fs::{read_json_file, write_json_file};

#[derive(Debug, Clone)]
pub struct MetadataStore {
    layout: Layout,
}

impl MetadataStore {
    pub fn new(layout: Layout) -> Self {
        Self {
            layout,
        }
    }

    /// Load the record for `name`. Missing or unreadable records yield `None`.
    pub fn load(&self, name: &str) -> Option<InstallRecord> {
        let path = self.layout.metadata_path(name);
        if !path.exists() {
            return None;
        }
        match read_json_file::<InstallRecord>(&path) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!("Ignoring unreadable install record for {name}: {e:#}");
                None
            }
        }
    }

    /// Persist the record. Callers write this only after the executable is in place.
    pub fn save(&self, name: &str, record: &InstallRecord) -> Result<()> {
        write_json_file(&self.layout.metadata_path(name), record, true)
    }

    pub fn remove(&self, name: &str) -> Result<()> {
        crate::utils::fs::remove_file_if_exists(&self.layout.metadata_path(name))?;
        Ok(())
    }

    /// Installed version without the tag marker.
    ///
    /// Falls back to the `VERSION` key of the package's bundled
    /// `doc/<name>.yaml` when no record is available.
    pub fn installed_version(&self, name: &str) -> Option<String> {
        if let Some(record) = self.load(name) {
            return Some(strip_tag_marker(&record.version).to_string());
        }
        version_from_doc(&self.layout.doc_dir(name), name)
    }
}

/// `v1.2.0` -> `1.2.0`.
pub fn strip_tag_marker(version: &str) -> &str {
    version.strip_prefix('v').unwrap_or(version)
}

/// Read `VERSION` from `<doc_dir>/<name>.yaml`.
pub fn version_from_doc(doc_dir: &Path, name: &str) -> Option<String> {
    let path = doc_dir.join(format!("{name}.yaml"));
    let content = std::fs::read_to_string(&path).ok()?;
    let doc: serde_yaml::Value = match serde_yaml::from_str(&content) {
        Ok(doc) => doc,
        Err(e) => {
            tracing::debug!("Could not parse {}: {e}", path.display());
            return None;
        }
    };
    match doc.get("VERSION")? {
        serde_yaml::Value::String(s) => Some(strip_tag_marker(s).to_string()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
