//! Builder for running external tools (build tool, signature tool) with a timeout.
//!
//! Unlike a plain [`tokio::process::Command`], every invocation carries a
//! timeout and a context label for logging, and a non-zero exit status is
//! returned to the caller as data rather than an error: `gpg --verify` exits
//! non-zero for a bad signature and `bazel clean` failures are tolerated.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;

use crate::core::PgetError;

pub struct ToolCommand {
    program: PathBuf,
    args: Vec<String>,
    current_dir: Option<PathBuf>,
    env_vars: Vec<(String, String)>,
    capture_output: bool,
    timeout_duration: Duration,
    context: Option<String>,
}

impl ToolCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
            env_vars: Vec::new(),
            capture_output: true,
            timeout_duration: Duration::from_secs(300),
            context: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.current_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_vars.push((key.into(), value.into()));
        self
    }

    /// Stream the tool's output to the terminal instead of capturing it.
    pub const fn inherit_stdio(mut self) -> Self {
        self.capture_output = false;
        self
    }

    pub const fn with_timeout(mut self, duration: Duration) -> Self {
        self.timeout_duration = duration;
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    fn display_line(&self) -> String {
        let mut line = self.program.display().to_string();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }

    /// Run the tool to completion.
    ///
    /// Errors only when the process cannot be spawned or exceeds its timeout.
    pub async fn execute(self) -> Result<ToolOutput> {
        let start = std::time::Instant::now();
        let line = self.display_line();
        let ctx = self.context.as_deref().unwrap_or("tool");

        tracing::debug!(target: "pget::tool", "({ctx}) Executing command: {line}");

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        if let Some(dir) = &self.current_dir {
            cmd.current_dir(dir);
        }
        for (key, value) in &self.env_vars {
            tracing::trace!(target: "pget::tool", "Setting env var: {key}={value}");
            cmd.env(key, value);
        }
        cmd.stdin(Stdio::null());
        if self.capture_output {
            cmd.stdout(Stdio::piped());
            cmd.stderr(Stdio::piped());
        } else {
            cmd.stdout(Stdio::inherit());
            cmd.stderr(Stdio::inherit());
        }
        cmd.kill_on_drop(true);

        let output = match timeout(self.timeout_duration, cmd.output()).await {
            Ok(result) => result.with_context(|| format!("Failed to execute {line}"))?,
            Err(_) => {
                tracing::warn!(
                    target: "pget::tool",
                    "({ctx}) Command timed out after {} seconds: {line}",
                    self.timeout_duration.as_secs()
                );
                return Err(PgetError::Other {
                    message: format!(
                        "{line} timed out after {} seconds",
                        self.timeout_duration.as_secs()
                    ),
                }
                .into());
            }
        };

        let result = ToolOutput {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        };

        if !result.success {
            tracing::debug!(
                target: "pget::tool",
                "({ctx}) Command failed with exit code: {:?}",
                result.code
            );
            if !result.stderr.is_empty() {
                tracing::debug!(target: "pget::tool", "({ctx}) {}", result.stderr.trim());
            }
        }

        tracing::debug!(
            target: "pget::tool",
            "({ctx}) finished in {}ms",
            start.elapsed().as_millis()
        );
        Ok(result)
    }
}

#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    /// Trimmed stderr, or stdout when stderr is empty.
    pub fn diagnostics(&self) -> String {
        if self.stderr.trim().is_empty() {
            self.stdout.trim().to_string()
        } else {
            self.stderr.trim().to_string()
        }
    }
}
