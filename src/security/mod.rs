//! Artifact authentication.
//!
//! A release is trusted in two steps. First the detached signature over
//! `manifest.json` must validate against a bundled trusted key
//! ([`SignatureVerifier`]); only then is the manifest parsed and its schema
//! enforced ([`Manifest`]). Each downloaded asset is afterwards checked
//! against the digest the manifest lists for it. Any failure is fatal for the
//! package being installed.

pub mod manifest;
pub mod signature;

pub use manifest::{Manifest, sha256_file};
pub use signature::{SignatureVerifier, parse_validsig};

use anyhow::Result;
use std::path::Path;

/// Authenticate a manifest and return it with the signer's fingerprint.
pub async fn verify_manifest(
    verifier: &SignatureVerifier,
    manifest_path: &Path,
    signature_path: &Path,
) -> Result<(Manifest, String)> {
    let fingerprint = verifier.verify(manifest_path, signature_path).await?;
    let manifest = Manifest::load(manifest_path)?;
    Ok((manifest, fingerprint))
}
