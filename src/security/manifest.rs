//! Release manifest schema and per-file digest checks.

use anyhow::{Context, Result};
use regex::Regex;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::LazyLock;

use crate::core::PgetError;

static SHA256_RE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"^[a-f0-9]{64}$").ok());

fn is_sha256_hex(digest: &str) -> bool {
    SHA256_RE.as_ref().is_some_and(|re| re.is_match(digest))
}

const CHUNK_SIZE: usize = 1024 * 1024;

fn malformed(reason: impl Into<String>) -> anyhow::Error {
    PgetError::ManifestMalformed {
        reason: reason.into(),
    }
    .into()
}

/// Asset name to lowercase hex SHA-256 digest, as published with a release.
///
/// Only constructed through [`Manifest::from_json`], so every instance has a
/// non-empty asset map with well-formed digests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    assets: BTreeMap<String, String>,
}

impl Manifest {
    /// Parse and validate a manifest document.
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let value: serde_json::Value =
            serde_json::from_slice(bytes).map_err(|e| malformed(format!("invalid JSON: {e}")))?;
        let root = value.as_object().ok_or_else(|| malformed("manifest must be a JSON object"))?;
        let assets = root
            .get("assets")
            .and_then(serde_json::Value::as_object)
            .ok_or_else(|| malformed("'assets' must be an object"))?;
        if assets.is_empty() {
            return Err(malformed("'assets' is empty"));
        }

        let mut validated = BTreeMap::new();
        for (name, digest) in assets {
            let digest = digest
                .as_str()
                .ok_or_else(|| malformed(format!("digest for '{name}' is not a string")))?;
            if !is_sha256_hex(digest) {
                return Err(malformed(format!("digest for '{name}' is not 64 lowercase hex characters")));
            }
            validated.insert(name.clone(), digest.to_string());
        }

        Ok(Self {
            assets: validated,
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read manifest {}", path.display()))?;
        Self::from_json(&bytes)
    }

    pub fn digest(&self, asset: &str) -> Option<&str> {
        self.assets.get(asset).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// Verify `file` against the digest recorded for `asset`.
    ///
    /// An asset missing from the manifest is rejected, never trusted.
    pub fn check_asset(&self, asset: &str, file: &Path) -> Result<()> {
        let expected = self.digest(asset).ok_or_else(|| PgetError::AssetNotManifested {
            asset: asset.to_string(),
        })?;
        let actual = sha256_file(file)?;
        if actual != expected {
            return Err(PgetError::ChecksumMismatch {
                asset: asset.to_string(),
                expected: expected.to_string(),
                actual,
            }
            .into());
        }
        tracing::debug!("Checksum verified for {asset}");
        Ok(())
    }
}

/// Hex SHA-256 of a file, read in 1 MiB chunks.
pub fn sha256_file(path: &Path) -> Result<String> {
    let mut file = File::open(path)
        .with_context(|| format!("Failed to open {} for checksum", path.display()))?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; CHUNK_SIZE];
    loop {
        let read = file
            .read(&mut buffer)
            .with_context(|| format!("Failed to read {} for checksum", path.display()))?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    const EMPTY_SHA: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

    fn is_malformed(err: &anyhow::Error) -> bool {
        matches!(err.downcast_ref::<PgetError>(), Some(PgetError::ManifestMalformed { .. }))
    }

    #[test]
    fn test_valid_manifest() {
        let manifest =
            Manifest::from_json(json!({"assets": {"foo-linux-x86_64": EMPTY_SHA}}).to_string().as_bytes())
                .unwrap();
        assert_eq!(manifest.len(), 1);
        assert_eq!(manifest.digest("foo-linux-x86_64"), Some(EMPTY_SHA));
    }

    #[test]
    fn test_empty_assets_rejected() {
        let err = Manifest::from_json(br#"{"assets": {}}"#).unwrap_err();
        assert!(is_malformed(&err));
    }

    #[test]
    fn test_schema_violations_rejected() {
        let upper = EMPTY_SHA.to_uppercase();
        let cases = [
            json!([]),
            json!({}),
            json!({"assets": []}),
            json!({"assets": {"foo": 42}}),
            json!({"assets": {"foo": "abc"}}),
            json!({"assets": {"foo": upper}}),
        ];
        for case in cases {
            let err = Manifest::from_json(case.to_string().as_bytes()).unwrap_err();
            assert!(is_malformed(&err), "accepted {case}");
        }
        assert!(is_malformed(&Manifest::from_json(b"not json").unwrap_err()));
    }

    #[test]
    fn test_check_asset_detects_single_bit_flip() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("foo-linux-x86_64");
        let mut content: Vec<u8> = (0..=255u8).cycle().take(3 * CHUNK_SIZE / 2).collect();
        std::fs::write(&file, &content).unwrap();

        let digest = sha256_file(&file).unwrap();
        let manifest = Manifest::from_json(
            json!({"assets": {"foo-linux-x86_64": digest}}).to_string().as_bytes(),
        )
        .unwrap();
        manifest.check_asset("foo-linux-x86_64", &file).unwrap();

        for index in [0, CHUNK_SIZE, content.len() - 1] {
            content[index] ^= 0x01;
            std::fs::write(&file, &content).unwrap();
            let err = manifest.check_asset("foo-linux-x86_64", &file).unwrap_err();
            assert!(matches!(err.downcast_ref::<PgetError>(), Some(PgetError::ChecksumMismatch { .. })));
            content[index] ^= 0x01;
        }
    }

    #[test]
    fn test_unlisted_asset_rejected() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("other");
        std::fs::write(&file, b"").unwrap();
        let manifest =
            Manifest::from_json(json!({"assets": {"foo": EMPTY_SHA}}).to_string().as_bytes()).unwrap();

        let err = manifest.check_asset("other", &file).unwrap_err();
        assert!(matches!(err.downcast_ref::<PgetError>(), Some(PgetError::AssetNotManifested { .. })));
    }

    #[test]
    fn test_sha256_of_empty_file() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("empty");
        std::fs::write(&file, b"").unwrap();
        assert_eq!(sha256_file(&file).unwrap(), EMPTY_SHA);
    }
}
