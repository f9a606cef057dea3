//! Version resolution: turn "what the user asked for" into a concrete ref.
//!
//! Three request modes are supported:
//!
//! - **Explicit version** (`foo@1.2.0`): normalized to a tag (`v1.2.0`) that
//!   must have a published release, otherwise [`PgetError::VersionNotFound`].
//!   An edge flag given alongside is ignored with a warning.
//! - **Edge** (`--edge`): always the default branch, without consulting
//!   releases at all.
//! - **Default**: the latest published release, or the default branch when
//!   the repository has never cut a release.
//!
//! Resolution is a pure query against the catalog; the resulting
//! [`RefSelection`] lives for one install or update operation only.

use anyhow::Result;
use semver::Version;
use std::fmt;

use crate::catalog::{Catalog, Release, Transport};
use crate::core::PgetError;
use crate::metadata::strip_tag_marker;
use crate::ui::Reporter;

/// Identifier of a fetchable snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleaseRef {
    /// Immutable release tag, e.g. `v1.2.0`.
    Tag(String),
    /// Mutable branch, e.g. `main`.
    Branch(String),
}

impl ReleaseRef {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Tag(tag) => tag,
            Self::Branch(branch) => branch,
        }
    }

    pub const fn is_branch(&self) -> bool {
        matches!(self, Self::Branch(_))
    }

    /// Version string recorded for installs of this ref.
    pub fn version(&self) -> String {
        match self {
            Self::Tag(tag) => strip_tag_marker(tag).to_string(),
            Self::Branch(branch) => branch.clone(),
        }
    }
}

impl fmt::Display for ReleaseRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a resolve call: the ref plus its release when it is a tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefSelection {
    pub reference: ReleaseRef,
    pub release: Option<Release>,
}

impl RefSelection {
    pub fn branch(branch: impl Into<String>) -> Self {
        Self {
            reference: ReleaseRef::Branch(branch.into()),
            release: None,
        }
    }

    pub fn tag(release: Release) -> Self {
        Self {
            reference: ReleaseRef::Tag(release.tag_name.clone()),
            release: Some(release),
        }
    }

    pub fn version(&self) -> String {
        self.reference.version()
    }
}

/// `1.2.0` -> `v1.2.0`; already-prefixed input is returned unchanged.
pub fn normalize_tag(version: &str) -> String {
    if version.starts_with('v') {
        version.to_string()
    } else {
        format!("v{version}")
    }
}

/// Whether `candidate` should replace `current`.
///
/// Compares as semver when both sides parse, otherwise any difference counts.
pub fn is_newer(current: &str, candidate: &str) -> bool {
    let current = strip_tag_marker(current);
    let candidate = strip_tag_marker(candidate);
    match (Version::parse(current), Version::parse(candidate)) {
        (Ok(current), Ok(candidate)) => candidate > current,
        _ => current != candidate,
    }
}

pub struct VersionResolver<'a, T> {
    catalog: &'a Catalog<T>,
    reporter: &'a dyn Reporter,
}

impl<'a, T: Transport> VersionResolver<'a, T> {
    pub fn new(catalog: &'a Catalog<T>, reporter: &'a dyn Reporter) -> Self {
        Self {
            catalog,
            reporter,
        }
    }

    pub async fn resolve(
        &self,
        name: &str,
        explicit_version: Option<&str>,
        edge: bool,
    ) -> Result<RefSelection> {
        if let Some(version) = explicit_version {
            if edge {
                self.reporter.warning(&format!(
                    "Both a version and --edge were given for '{name}'; using version {version}"
                ));
            }
            let tag = normalize_tag(version);
            return match self.catalog.release_by_tag(name, &tag).await? {
                Some(release) => Ok(RefSelection::tag(release)),
                None => Err(PgetError::VersionNotFound {
                    name: name.to_string(),
                    version: tag,
                }
                .into()),
            };
        }

        if edge {
            tracing::debug!("Resolving {name} to branch {} (edge)", self.catalog.default_branch());
            return Ok(RefSelection::branch(self.catalog.default_branch()));
        }

        match self.catalog.latest_release(name).await? {
            Some(release) => {
                tracing::debug!("Resolved {name} to latest release {}", release.tag_name);
                Ok(RefSelection::tag(release))
            }
            None => {
                self.reporter.info(&format!(
                    "No releases found for {name}, using the {} branch",
                    self.catalog.default_branch()
                ));
                Ok(RefSelection::branch(self.catalog.default_branch()))
            }
        }
    }
}
