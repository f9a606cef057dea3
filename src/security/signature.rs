//! Detached-signature verification with GnuPG.
//!
//! Each verification builds a throwaway GnuPG home in a temp directory,
//! imports the trusted `*.asc` keys into a fresh keyring there, and runs
//! `--verify` with `--status-fd 1`. The signer is accepted only when the
//! status stream carries a `[GNUPG:] VALIDSIG <fingerprint>` line. The
//! user's own GnuPG home and keyrings are never read or written.

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

use crate::config::PgetConfig;
use crate::core::PgetError;
use crate::utils::{ToolCommand, find_tool};

fn invalid(reason: impl Into<String>) -> anyhow::Error {
    PgetError::SignatureInvalid {
        reason: reason.into(),
    }
    .into()
}

/// Extract the fingerprint from a `VALIDSIG` status line.
pub fn parse_validsig(status: &str) -> Option<String> {
    status.lines().find_map(|line| {
        let mut parts = line.split_whitespace();
        match (parts.next(), parts.next(), parts.next()) {
            (Some("[GNUPG:]"), Some("VALIDSIG"), Some(fingerprint)) => Some(fingerprint.to_string()),
            _ => None,
        }
    })
}

#[derive(Debug, Clone)]
pub struct SignatureVerifier {
    tool: String,
    keys_dir: PathBuf,
    timeout: Duration,
}

impl SignatureVerifier {
    pub fn new(tool: impl Into<String>, keys_dir: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            tool: tool.into(),
            keys_dir: keys_dir.into(),
            timeout,
        }
    }

    pub fn from_config(config: &PgetConfig) -> Result<Self> {
        Ok(Self::new(
            config.signature_tool.clone(),
            config.trusted_keys_path()?,
            config.timeouts.signature(),
        ))
    }

    /// Trusted key files, sorted by path.
    pub fn trusted_keys(&self) -> Result<Vec<PathBuf>> {
        let pattern = self.keys_dir.join("*.asc");
        let pattern = pattern.to_string_lossy();
        let mut keys: Vec<PathBuf> = glob::glob(&pattern)
            .map_err(|e| invalid(format!("bad trusted key pattern {pattern}: {e}")))?
            .filter_map(Result::ok)
            .collect();
        keys.sort();
        Ok(keys)
    }

    fn gpg_command(&self, program: &Path, home: &Path, keyring: &Path) -> ToolCommand {
        ToolCommand::new(program)
            .args(["--homedir".to_string(), home.display().to_string()])
            .args(["--batch", "--no-tty", "--no-default-keyring", "--keyring"])
            .arg(keyring.display().to_string())
            .env("GNUPGHOME", home.display().to_string())
            .with_timeout(self.timeout)
            .with_context("signature")
    }

    /// Verify `signature` over `data`; returns the signer's fingerprint.
    pub async fn verify(&self, data: &Path, signature: &Path) -> Result<String> {
        let program = find_tool(&[self.tool.as_str()]).ok_or_else(|| PgetError::ToolMissing {
            tool: self.tool.clone(),
            purpose: "manifest signature verification".to_string(),
        })?;

        let keys = self.trusted_keys()?;
        if keys.is_empty() {
            return Err(invalid(format!("no trusted keys found in {}", self.keys_dir.display())));
        }

        let home = TempDir::new()?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(home.path(), std::fs::Permissions::from_mode(0o700))?;
        }
        let keyring = home.path().join("trusted.gpg");

        let import = self
            .gpg_command(&program, home.path(), &keyring)
            .arg("--import")
            .args(keys.iter().map(|k| k.display().to_string()))
            .execute()
            .await
            .map_err(|e| invalid(format!("key import did not complete: {e:#}")))?;
        if !import.success {
            return Err(invalid(format!("failed to import trusted keys: {}", import.diagnostics())));
        }

        let output = self
            .gpg_command(&program, home.path(), &keyring)
            .args(["--trust-model", "always", "--status-fd", "1", "--verify"])
            .arg(signature.display().to_string())
            .arg(data.display().to_string())
            .execute()
            .await
            .map_err(|e| invalid(format!("verification did not complete: {e:#}")))?;

        match parse_validsig(&output.stdout) {
            Some(fingerprint) if output.success => {
                tracing::debug!("Valid signature from {fingerprint}");
                Ok(fingerprint)
            }
            _ => Err(invalid(format!(
                "{} was not signed by a trusted key: {}",
                data.display(),
                output.diagnostics()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_validsig() {
        let status = "[GNUPG:] NEWSIG\n\
                      [GNUPG:] GOODSIG 0123456789ABCDEF Release Key\n\
                      [GNUPG:] VALIDSIG 89ABCDEF0123456789ABCDEF0123456789ABCDEF 2025-01-01 1735689600 0\n";
        assert_eq!(
            parse_validsig(status).as_deref(),
            Some("89ABCDEF0123456789ABCDEF0123456789ABCDEF")
        );
        assert_eq!(parse_validsig("[GNUPG:] BADSIG 0123 Someone\n"), None);
        assert_eq!(parse_validsig(""), None);
    }

    #[test]
    fn test_trusted_keys_only_asc() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("b.asc"), "key").unwrap();
        std::fs::write(temp.path().join("a.asc"), "key").unwrap();
        std::fs::write(temp.path().join("notes.txt"), "no").unwrap();

        let verifier = SignatureVerifier::new("gpg", temp.path(), Duration::from_secs(5));
        let keys = verifier.trusted_keys().unwrap();
        assert_eq!(keys, vec![temp.path().join("a.asc"), temp.path().join("b.asc")]);
    }

    #[tokio::test]
    async fn test_missing_tool() {
        let temp = TempDir::new().unwrap();
        let verifier =
            SignatureVerifier::new("pget-test-missing-gpg", temp.path(), Duration::from_secs(5));
        let err = verifier
            .verify(&temp.path().join("manifest.json"), &temp.path().join("manifest.json.asc"))
            .await
            .unwrap_err();
        assert!(matches!(err.downcast_ref::<PgetError>(), Some(PgetError::ToolMissing { .. })));
    }

    #[cfg(unix)]
    fn fake_tool(dir: &Path, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("fake-gpg");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_hung_tool_is_a_verification_failure() {
        let temp = TempDir::new().unwrap();
        let keys = temp.path().join("keys");
        std::fs::create_dir_all(&keys).unwrap();
        std::fs::write(keys.join("a.asc"), "key").unwrap();
        let tool = fake_tool(temp.path(), "sleep 5");

        let verifier = SignatureVerifier::new(tool.display().to_string(), &keys, Duration::from_millis(200));
        let err = verifier
            .verify(&temp.path().join("manifest.json"), &temp.path().join("manifest.json.asc"))
            .await
            .unwrap_err();
        let err = err.downcast_ref::<PgetError>().unwrap();
        assert!(matches!(err, PgetError::SignatureInvalid { .. }));
        assert!(err.is_verification_failure());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_validsig_status_yields_fingerprint() {
        let temp = TempDir::new().unwrap();
        let keys = temp.path().join("keys");
        std::fs::create_dir_all(&keys).unwrap();
        std::fs::write(keys.join("a.asc"), "key").unwrap();
        let tool = fake_tool(
            temp.path(),
            "echo '[GNUPG:] VALIDSIG 0123456789ABCDEF0123456789ABCDEF01234567 2025-01-01 0 0'",
        );

        let verifier = SignatureVerifier::new(tool.display().to_string(), &keys, Duration::from_secs(5));
        let fingerprint = verifier
            .verify(&temp.path().join("manifest.json"), &temp.path().join("manifest.json.asc"))
            .await
            .unwrap();
        assert_eq!(fingerprint, "0123456789ABCDEF0123456789ABCDEF01234567");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_no_trusted_keys() {
        let temp = TempDir::new().unwrap();
        let verifier = SignatureVerifier::new("sh", temp.path().join("keys"), Duration::from_secs(5));
        let err = verifier
            .verify(&temp.path().join("manifest.json"), &temp.path().join("manifest.json.asc"))
            .await
            .unwrap_err();
        assert!(err.downcast_ref::<PgetError>().unwrap().is_verification_failure());
    }
}
