//! Compile-from-source with the external build tool.
//!
//! The tool is invoked as `<tool> build //:<name>_bin` in the source root and
//! the artifact is expected at `bazel-bin/<name>`.

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::PgetConfig;
use crate::core::PgetError;
use crate::ui::Reporter;
use crate::utils::platform::executable_name;
use crate::utils::{ToolCommand, find_tool};

/// Files that mark a source tree as buildable.
pub const BUILD_DESCRIPTORS: [&str; 3] = ["MODULE.bazel", "BUILD", "BUILD.bazel"];

pub fn has_build_descriptor(source_root: &Path) -> bool {
    BUILD_DESCRIPTORS.iter().any(|file| source_root.join(file).is_file())
}

/// First configured build tool found on PATH.
pub fn find_build_tool(config: &PgetConfig) -> Option<PathBuf> {
    find_tool(&config.build_tools)
}

/// Human-readable list of accepted build tools.
pub fn build_tool_names(config: &PgetConfig) -> String {
    config.build_tools.join(" or ")
}

pub struct Builder<'a> {
    tool: PathBuf,
    timeout: Duration,
    reporter: &'a dyn Reporter,
}

impl<'a> Builder<'a> {
    pub fn new(tool: PathBuf, timeout: Duration, reporter: &'a dyn Reporter) -> Self {
        Self {
            tool,
            timeout,
            reporter,
        }
    }

    /// Build `name` from `source_root`; returns the path of the produced binary.
    pub async fn build(&self, name: &str, source_root: &Path) -> Result<PathBuf> {
        if !has_build_descriptor(source_root) {
            return Err(PgetError::BuildDescriptorMissing {
                name: name.to_string(),
            }
            .into());
        }

        // Stale output from an earlier build must not be picked up; failures here are harmless.
        match ToolCommand::new(&self.tool)
            .arg("clean")
            .current_dir(source_root)
            .with_timeout(self.timeout)
            .with_context("build")
            .execute()
            .await
        {
            Ok(output) if !output.success => {
                tracing::debug!("clean failed for {name}: {}", output.diagnostics());
            }
            Ok(_) => {}
            Err(e) => tracing::debug!("clean failed for {name}: {e:#}"),
        }

        self.reporter.progress(&format!("Building {name} (this can take a while)"));
        let output = ToolCommand::new(&self.tool)
            .arg("build")
            .arg(format!("//:{name}_bin"))
            .current_dir(source_root)
            .with_timeout(self.timeout)
            .with_context("build")
            .execute()
            .await
            .map_err(|e| PgetError::BuildFailed {
                name: name.to_string(),
                reason: format!("{e:#}"),
            })?;
        if !output.success {
            return Err(PgetError::BuildFailed {
                name: name.to_string(),
                reason: output.diagnostics(),
            }
            .into());
        }

        let artifact = source_root.join("bazel-bin").join(executable_name(name));
        if !artifact.is_file() {
            return Err(PgetError::BuildFailed {
                name: name.to_string(),
                reason: format!("expected output {} was not produced", artifact.display()),
            }
            .into());
        }
        Ok(artifact)
    }
}
