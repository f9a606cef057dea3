//! Artifact retrieval into the per-package download cache.
//!
//! Two paths exist for every package:
//!
//! - [`ArtifactFetcher::fetch_binary`] looks for a release asset named
//!   `<name>-<os>-<arch>`. Its absence is `Ok(None)`, meaning "install from
//!   source instead".
//! - [`ArtifactFetcher::fetch_source`] downloads the snapshot tarball for the
//!   ref and extracts it to `<cache>/<name>/src` with the wrapper directory
//!   stripped.
//!
//! Downloads are cached by `(package, file name)` for the lifetime of the
//! fetcher only. Files left in the cache by an earlier process are
//! re-downloaded rather than trusted.

pub mod archive;

use anyhow::Result;
use std::collections::HashSet;
use std::path::PathBuf;

use crate::catalog::{Asset, Catalog, Release, Transport};
use crate::core::PgetError;
use crate::layout::Layout;
use crate::resolver::{RefSelection, ReleaseRef};
use crate::utils::Platform;
use crate::utils::fs::{ensure_dir, remove_dir_all};

/// Asset name of a signed release manifest.
pub const MANIFEST_ASSET: &str = "manifest.json";
/// Asset name of the detached manifest signature.
pub const SIGNATURE_ASSET: &str = "manifest.json.asc";

#[derive(Debug, Clone)]
pub struct FetchedBinary {
    pub path: PathBuf,
    pub asset_name: String,
    pub version: String,
}

#[derive(Debug, Clone)]
pub struct FetchedSource {
    pub root: PathBuf,
    pub version: String,
}

#[derive(Debug, Clone)]
pub struct FetchedManifest {
    pub manifest: PathBuf,
    pub signature: PathBuf,
}

/// Release asset name for a package on a platform.
pub fn binary_asset_name(name: &str, platform: &Platform) -> String {
    format!("{name}-{platform}")
}

pub struct ArtifactFetcher<'a, T> {
    catalog: &'a Catalog<T>,
    layout: &'a Layout,
    fetched: HashSet<PathBuf>,
}

impl<'a, T: Transport> ArtifactFetcher<'a, T> {
    pub fn new(catalog: &'a Catalog<T>, layout: &'a Layout) -> Self {
        Self {
            catalog,
            layout,
            fetched: HashSet::new(),
        }
    }

    fn cache_path(&self, name: &str, file_name: &str) -> PathBuf {
        self.layout.package_cache(name).join(file_name)
    }

    async fn fetch_asset(&mut self, name: &str, asset: &Asset) -> Result<Option<PathBuf>> {
        let dest = self.cache_path(name, &asset.name);
        if self.fetched.contains(&dest) && dest.is_file() {
            tracing::debug!("Using cached {}", dest.display());
            return Ok(Some(dest));
        }
        ensure_dir(&self.layout.package_cache(name))?;
        if !self.catalog.download_asset(asset, &dest).await? {
            return Ok(None);
        }
        self.fetched.insert(dest.clone());
        Ok(Some(dest))
    }

    /// Download `<name>-<platform>` from the selected release.
    ///
    /// Branch selections have no assets and always yield `None`.
    pub async fn fetch_binary(
        &mut self,
        name: &str,
        platform: &Platform,
        selection: &RefSelection,
    ) -> Result<Option<FetchedBinary>> {
        let Some(release) = &selection.release else {
            return Ok(None);
        };
        let asset_name = binary_asset_name(name, platform);
        let Some(asset) = release.asset(&asset_name) else {
            tracing::debug!("Release {} of {name} has no asset {asset_name}", release.tag_name);
            return Ok(None);
        };

        let Some(path) = self.fetch_asset(name, asset).await? else {
            return Ok(None);
        };
        Ok(Some(FetchedBinary {
            path,
            asset_name,
            version: selection.version(),
        }))
    }

    /// Download the release manifest and its signature, if the release has one.
    ///
    /// A manifest shipped without a signature is a verification failure.
    pub async fn fetch_manifest(&mut self, name: &str, release: &Release) -> Result<Option<FetchedManifest>> {
        let Some(manifest_asset) = release.asset(MANIFEST_ASSET) else {
            return Ok(None);
        };
        let Some(signature_asset) = release.asset(SIGNATURE_ASSET) else {
            return Err(PgetError::SignatureInvalid {
                reason: format!(
                    "release {} of '{name}' ships {MANIFEST_ASSET} without {SIGNATURE_ASSET}",
                    release.tag_name
                ),
            }
            .into());
        };

        let missing = |asset: &str| PgetError::SignatureInvalid {
            reason: format!("{asset} of '{name}' could not be downloaded"),
        };
        let manifest =
            self.fetch_asset(name, manifest_asset).await?.ok_or_else(|| missing(MANIFEST_ASSET))?;
        let signature =
            self.fetch_asset(name, signature_asset).await?.ok_or_else(|| missing(SIGNATURE_ASSET))?;
        Ok(Some(FetchedManifest {
            manifest,
            signature,
        }))
    }

    /// Download and extract the source snapshot for the selected ref.
    pub async fn fetch_source(&mut self, name: &str, selection: &RefSelection) -> Result<FetchedSource> {
        let reference = selection.reference.as_str();
        let archive = self.cache_path(name, &format!("{name}-{}.tar.gz", sanitize(reference)));
        let extract_dir = self.layout.package_cache(name).join("src");

        if !(self.fetched.contains(&archive) && archive.is_file()) {
            ensure_dir(&self.layout.package_cache(name))?;
            if !self.catalog.download_tarball(name, reference, &archive).await? {
                return Err(match &selection.reference {
                    ReleaseRef::Tag(tag) => PgetError::VersionNotFound {
                        name: name.to_string(),
                        version: tag.clone(),
                    },
                    ReleaseRef::Branch(_) => PgetError::PackageNotFound {
                        name: name.to_string(),
                        org: self.catalog.org().to_string(),
                    },
                }
                .into());
            }
            self.fetched.insert(archive.clone());
        }

        remove_dir_all(&extract_dir)?;
        archive::extract_source_tarball(&archive, &extract_dir)?;
        tracing::debug!("Extracted {} to {}", archive.display(), extract_dir.display());

        Ok(FetchedSource {
            root: extract_dir,
            version: selection.version(),
        })
    }

    /// Drop everything cached for `name`, on disk and in memory.
    pub fn clear(&mut self, name: &str) -> Result<()> {
        let dir = self.layout.package_cache(name);
        self.fetched.retain(|path| !path.starts_with(&dir));
        remove_dir_all(&dir)
    }
}

fn sanitize(reference: &str) -> String {
    reference.chars().map(|c| if c == '/' || c == '\\' { '_' } else { c }).collect()
}

/// Remove `name`'s download cache without a fetcher instance.
pub fn clear_package_cache(layout: &Layout, name: &str) -> Result<()> {
    remove_dir_all(&layout.package_cache(name))
}
