//! pget - a package installer for the programs of one GitHub organization
//! (by default `pynosaur`).
//!
//! A package is a repository of the organization that carries a `.program`
//! marker file. pget installs it in one of three ways:
//!
//! - **binary**: the release asset `<name>-<os>-<arch>`, authenticated against
//!   the release's signed `manifest.json` when one is published
//! - **script**: the source tree copied under `~/.pget/script/<name>` behind a
//!   small `python3` launcher
//! - **build**: the source tree compiled locally with `bazelisk`/`bazel`
//!
//! # Layout
//!
//! ```text
//! ~/.pget/bin/<name>                       executable (or /usr/local/bin/<name>)
//! ~/.pget/helpers/<name>/{doc,data,config,cache}/
//! ~/.pget/helpers/<name>/.pget-metadata.json
//! ~/.pget/script/<name>/                   script bundles
//! $TMPDIR/pget/<name>/                     download cache
//! ```
//!
//! # Modules
//!
//! - [`catalog`] - GitHub queries behind the [`catalog::Transport`] seam
//! - [`resolver`] - explicit version, edge, or latest release
//! - [`fetcher`] - release assets and source tarballs
//! - [`security`] - signed manifests and per-asset digests
//! - [`installer`] - the per-package installation engine
//! - [`upgrade`] - replacing the running pget executable
//! - [`metadata`] - install records and script bundles
//! - [`config`], [`layout`], [`ui`], [`utils`], [`core`] - supporting pieces
//! - [`cli`] - the `pget` command line

pub mod catalog;
pub mod cli;
pub mod config;
pub mod core;
pub mod fetcher;
pub mod installer;
pub mod layout;
pub mod metadata;
pub mod resolver;
pub mod security;
pub mod ui;
pub mod upgrade;
pub mod utils;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
