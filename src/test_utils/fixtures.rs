use anyhow::Result;
use flate2::Compression;
use flate2::write::GzEncoder;
use std::path::PathBuf;
use tempfile::TempDir;

use crate::config::PgetConfig;
use crate::layout::Layout;

/// Build a gzipped tarball whose entries all live under `wrapper/`, the way
/// GitHub source snapshots are produced.
pub fn source_tarball(wrapper: &str, files: &[(&str, &[u8])]) -> Result<Vec<u8>> {
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);

    let mut dir_header = tar::Header::new_gnu();
    dir_header.set_entry_type(tar::EntryType::Directory);
    dir_header.set_mode(0o755);
    dir_header.set_size(0);
    builder.append_data(&mut dir_header, format!("{wrapper}/"), std::io::empty())?;

    for (path, content) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        header.set_entry_type(tar::EntryType::Regular);
        builder.append_data(&mut header, format!("{wrapper}/{path}"), *content)?;
    }

    let encoder = builder.into_inner()?;
    Ok(encoder.finish()?)
}

/// An isolated pget root, system bin and cache under one temp directory.
pub struct TestEnv {
    pub temp: TempDir,
    pub config: PgetConfig,
    pub layout: Layout,
}

impl TestEnv {
    /// No system bin directory; every install lands in the user bin.
    pub fn new() -> Result<Self> {
        Self::build(false)
    }

    /// With a writable system bin directory under the temp root.
    pub fn with_system_bin() -> Result<Self> {
        Self::build(true)
    }

    fn build(system: bool) -> Result<Self> {
        let temp = TempDir::new()?;
        let root = temp.path().join("home").join(".pget");
        let system_bin = temp.path().join("usr-local-bin");
        if system {
            std::fs::create_dir_all(&system_bin)?;
        }
        let config = PgetConfig {
            root: Some(root.display().to_string()),
            system_bin: system.then(|| system_bin.display().to_string()),
            system_install: system,
            build_tools: vec!["pget-test-missing-build-tool".to_string()],
            signature_tool: "pget-test-missing-gpg".to_string(),
            trusted_keys_dir: Some(temp.path().join("keys").display().to_string()),
            ..PgetConfig::default()
        };
        let layout = Layout::new(
            root,
            system.then_some(system_bin),
            temp.path().join("cache"),
        );
        Ok(Self {
            temp,
            config,
            layout,
        })
    }

    /// `https://api.github.com/<path>`
    pub fn api(&self, path: &str) -> String {
        format!("{}/{path}", self.config.api_base)
    }

    /// Raw URL of the `.program` marker for `name`.
    pub fn marker(&self, name: &str) -> String {
        format!(
            "{}/{}/{name}/{}/.program",
            self.config.raw_base, self.config.org, self.config.default_branch
        )
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.temp.path().join(rel)
    }
}
