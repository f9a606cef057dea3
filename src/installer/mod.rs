//! The installation engine.
//!
//! Each requested package goes through the same sequence, entered fresh for
//! every name:
//!
//! 1. **Pre-flight** (no network): ignored repositories are rejected, and an
//!    already-installed package either short-circuits with
//!    [`PgetError::AlreadyInstalled`] or is marked for replacement when a
//!    different explicit version was requested.
//! 2. **Catalog checks**: the repository must exist and carry the `.program`
//!    marker.
//! 3. **Resolve** the ref with [`VersionResolver`].
//! 4. **Binary path** (unless script or build mode is forced): fetch
//!    `<name>-<os>-<arch>`, authenticate it against the signed manifest, and
//!    fetch the source snapshot opportunistically for its documentation.
//! 5. **Source path** otherwise: script bundle when requested, a build when a
//!    build tool is available, and an interactive script fallback when it is
//!    not.
//! 6. **Place** the executable (system bin first, user bin on permission
//!    failure) and finally **record** the install.
//!
//! A package being replaced is only retired right before placement, after
//! every fetch, verification and build step for the new version succeeded.
//! The install record is written last, so a record never outlives or
//! precedes its executable.

pub mod build;
pub mod context;
pub mod placement;

pub use context::{InstallContext, InstallContextBuilder};

use anyhow::Result;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::catalog::Transport;
use crate::core::{PgetError, user_friendly_error};
use crate::fetcher::{ArtifactFetcher, FetchedBinary, clear_package_cache};
use crate::layout::METADATA_FILE;
use crate::metadata::{
    InstallRecord, MetadataStore, ScriptStore, Strategy, strip_tag_marker, version_from_doc,
};
use crate::resolver::{RefSelection, VersionResolver, is_newer};
use crate::security::{SignatureVerifier, verify_manifest};
use crate::utils::fs::{copy_dir, remove_dir_all};

use build::{Builder, build_tool_names, find_build_tool};

/// Which installation strategies the caller allows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InstallMode {
    /// Binary first, then build, then an interactive script fallback.
    #[default]
    Auto,
    /// Always install the source tree behind a launcher.
    Script,
    /// Always build from source; a missing build tool is fatal.
    Build,
}

/// Parsed per-package request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallOptions {
    pub version: Option<String>,
    pub edge: bool,
    pub mode: InstallMode,
}

impl InstallOptions {
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub const fn with_edge(mut self, edge: bool) -> Self {
        self.edge = edge;
        self
    }

    pub const fn with_mode(mut self, mode: InstallMode) -> Self {
        self.mode = mode;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallOutcome {
    pub name: String,
    pub version: String,
    pub strategy: Strategy,
    pub path: PathBuf,
}

/// One row of `pget list`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledPackage {
    pub name: String,
    pub version: Option<String>,
    pub strategy: Option<Strategy>,
    pub executable: Option<PathBuf>,
}

enum SourcePlan {
    Script,
    Build(PathBuf),
}

pub struct Installer<'a, T> {
    ctx: InstallContext<'a, T>,
    store: MetadataStore,
    scripts: ScriptStore,
}

impl<'a, T: Transport> Installer<'a, T> {
    /// Opening the installer runs the one-time script root migration.
    pub fn new(ctx: InstallContext<'a, T>) -> Result<Self> {
        let store = MetadataStore::new(ctx.layout.clone());
        let scripts = ScriptStore::open(ctx.layout.clone())?;
        Ok(Self {
            ctx,
            store,
            scripts,
        })
    }

    pub fn context(&self) -> &InstallContext<'a, T> {
        &self.ctx
    }

    pub fn store(&self) -> &MetadataStore {
        &self.store
    }

    pub fn scripts(&self) -> &ScriptStore {
        &self.scripts
    }

    pub fn is_installed(&self, name: &str) -> bool {
        self.ctx.layout.find_executable(name).is_some() || self.store.load(name).is_some()
    }

    /// Install one package.
    pub async fn install(&self, name: &str, options: &InstallOptions) -> Result<InstallOutcome> {
        let reporter = self.ctx.reporter;
        if self.ctx.config.is_ignored(name) {
            return Err(PgetError::PackageIgnored {
                name: name.to_string(),
            }
            .into());
        }

        let replacing = if self.is_installed(name) {
            let current =
                self.store.installed_version(name).unwrap_or_else(|| "unknown".to_string());
            match options.version.as_deref() {
                Some(requested) if strip_tag_marker(requested) == current => {
                    return Err(PgetError::AlreadyInstalled {
                        name: name.to_string(),
                        version: current,
                    }
                    .into());
                }
                Some(requested) => {
                    reporter.info(&format!(
                        "{name} {current} is installed; replacing it with {}",
                        strip_tag_marker(requested)
                    ));
                    true
                }
                None => {
                    self.hint_update(name, &current).await;
                    return Err(PgetError::AlreadyInstalled {
                        name: name.to_string(),
                        version: current,
                    }
                    .into());
                }
            }
        } else {
            false
        };

        self.ensure_installable(name).await?;
        let selection = VersionResolver::new(self.ctx.catalog, reporter)
            .resolve(name, options.version.as_deref(), options.edge)
            .await?;
        reporter.progress(&format!("Installing {name} ({})", selection.reference));

        let mut fetcher = ArtifactFetcher::new(self.ctx.catalog, self.ctx.layout);
        self.install_selection(&mut fetcher, name, &selection, options.mode, replacing).await
    }

    /// Install every request in order; one failure does not stop the rest.
    ///
    /// Returns whether all of them succeeded.
    pub async fn install_many(&self, requests: &[(String, InstallOptions)]) -> bool {
        let mut all_ok = true;
        for (name, options) in requests {
            if let Err(e) = self.install(name, options).await {
                all_ok = false;
                self.ctx.reporter.error(&format!("{name}: {}", user_friendly_error(e)));
            }
        }
        all_ok
    }

    /// Bring an installed package to the requested or latest version.
    ///
    /// Returns `None` when it is already current. Script installs stay script
    /// installs unless another mode is requested.
    pub async fn update(&self, name: &str, options: &InstallOptions) -> Result<Option<InstallOutcome>> {
        let reporter = self.ctx.reporter;
        if !self.is_installed(name) {
            return Err(PgetError::NotInstalled {
                name: name.to_string(),
            }
            .into());
        }

        let record = self.store.load(name);
        let mode = match (options.mode, record.as_ref().map(|r| r.strategy)) {
            (InstallMode::Auto, Some(Strategy::Script)) => InstallMode::Script,
            (mode, _) => mode,
        };
        let current = self.store.installed_version(name);

        let selection = VersionResolver::new(self.ctx.catalog, reporter)
            .resolve(name, options.version.as_deref(), options.edge)
            .await?;
        let mut fetcher = ArtifactFetcher::new(self.ctx.catalog, self.ctx.layout);

        let up_to_date = if options.edge {
            false
        } else if selection.reference.is_branch() {
            // Without releases the only version signal is the bundled doc file.
            let source = fetcher.fetch_source(name, &selection).await?;
            let available = version_from_doc(&source.root.join("doc"), name);
            let installed = version_from_doc(&self.ctx.layout.doc_dir(name), name);
            available.is_some() && available == installed
        } else {
            let target = selection.version();
            match current.as_deref() {
                Some(current) if options.version.is_some() => strip_tag_marker(current) == target,
                Some(current) => !is_newer(current, &target),
                None => false,
            }
        };

        if up_to_date {
            reporter.info(&format!(
                "{name} is up to date ({})",
                current.as_deref().unwrap_or("unknown")
            ));
            return Ok(None);
        }

        reporter.progress(&format!(
            "Updating {name} {} -> {}",
            current.as_deref().unwrap_or("unknown"),
            selection.reference
        ));
        self.install_selection(&mut fetcher, name, &selection, mode, true).await.map(Some)
    }

    /// Remove a package's executables, helper directory, bundle and cache.
    pub fn uninstall(&self, name: &str) -> Result<()> {
        let layout = self.ctx.layout;
        if !self.is_installed(name) && !self.scripts.has_bundle(name) {
            return Err(PgetError::NotInstalled {
                name: name.to_string(),
            }
            .into());
        }

        let removed = placement::remove_executables(layout, name, self.ctx.reporter)?;
        remove_dir_all(&layout.helper_dir(name))?;
        self.scripts.remove_bundle(name)?;
        clear_package_cache(layout, name)?;

        tracing::debug!("Removed {removed} executable(s) of {name}");
        self.ctx.reporter.success(&format!("Removed {name}"));
        Ok(())
    }

    /// Installed packages, sorted by name.
    pub fn installed(&self) -> Result<Vec<InstalledPackage>> {
        let layout = self.ctx.layout;
        let mut names: BTreeSet<String> = self.scripts.bundles()?.into_iter().collect();

        let helpers = layout.helpers_dir();
        if helpers.is_dir() {
            for entry in std::fs::read_dir(&helpers)? {
                let entry = entry?;
                if entry.path().join(METADATA_FILE).is_file() {
                    names.insert(entry.file_name().to_string_lossy().to_string());
                }
            }
        }
        let bin = layout.bin_dir();
        if bin.is_dir() {
            for entry in std::fs::read_dir(&bin)? {
                let entry = entry?;
                if entry.file_type()?.is_file() {
                    let file_name = entry.file_name().to_string_lossy().to_string();
                    let name = file_name.strip_suffix(".exe").unwrap_or(&file_name).to_string();
                    names.insert(name);
                }
            }
        }

        Ok(names
            .into_iter()
            .map(|name| {
                let strategy = self
                    .store
                    .load(&name)
                    .map(|record| record.strategy)
                    .or_else(|| self.scripts.has_bundle(&name).then_some(Strategy::Script));
                InstalledPackage {
                    version: self.store.installed_version(&name),
                    executable: layout.find_executable(&name),
                    strategy,
                    name,
                }
            })
            .collect())
    }

    async fn hint_update(&self, name: &str, current: &str) {
        let reporter = self.ctx.reporter;
        match self.ctx.catalog.latest_release(name).await {
            Ok(Some(release)) if is_newer(current, &release.tag_name) => reporter.info(&format!(
                "{name} {current} is installed; {} is available. Run `pget update {name}` to upgrade",
                strip_tag_marker(&release.tag_name)
            )),
            Ok(_) => reporter.info(&format!("{name} {current} is already installed")),
            Err(e) => {
                tracing::debug!("Could not check for a newer {name}: {e:#}");
                reporter.info(&format!("{name} {current} is already installed"));
            }
        }
    }

    async fn ensure_installable(&self, name: &str) -> Result<()> {
        let catalog = self.ctx.catalog;
        if catalog.repo_info(name).await?.is_none() {
            return Err(PgetError::PackageNotFound {
                name: name.to_string(),
                org: catalog.org().to_string(),
            }
            .into());
        }
        if !catalog.has_program_marker(name).await? {
            return Err(PgetError::NotInstallable {
                name: name.to_string(),
            }
            .into());
        }
        Ok(())
    }

    async fn install_selection(
        &self,
        fetcher: &mut ArtifactFetcher<'a, T>,
        name: &str,
        selection: &RefSelection,
        mode: InstallMode,
        replacing: bool,
    ) -> Result<InstallOutcome> {
        let ctx = &self.ctx;

        if mode == InstallMode::Auto {
            if let Some(binary) = fetcher.fetch_binary(name, &ctx.platform, selection).await? {
                self.verify_binary(fetcher, name, selection, &binary).await?;
                let docs = match fetcher.fetch_source(name, selection).await {
                    Ok(source) => Some(source.root),
                    Err(e) => {
                        tracing::debug!("No source documentation for {name}: {e:#}");
                        None
                    }
                };
                if replacing {
                    self.retire(name)?;
                }
                self.prepare(name, docs.as_deref())?;
                let path = placement::place_binary(ctx.layout, name, &binary.path, ctx.reporter)?;
                return self.finish(name, selection, Strategy::Binary, path);
            }
            ctx.reporter.info(&format!(
                "No prebuilt {name} for {}, installing from source",
                ctx.platform
            ));
        }

        let source = fetcher.fetch_source(name, selection).await?;
        match self.plan_source_install(name, mode)? {
            SourcePlan::Script => {
                if replacing {
                    self.retire(name)?;
                }
                self.scripts.install_bundle(name, &source.root)?;
                self.prepare(name, Some(&source.root))?;
                let content = self.scripts.wrapper_content(name);
                let path = placement::place_wrapper(ctx.layout, name, &content, ctx.reporter)?;
                self.finish(name, selection, Strategy::Script, path)
            }
            SourcePlan::Build(tool) => {
                let artifact = Builder::new(tool, ctx.config.timeouts.build(), ctx.reporter)
                    .build(name, &source.root)
                    .await?;
                if replacing {
                    self.retire(name)?;
                }
                self.prepare(name, Some(&source.root))?;
                let path = placement::place_binary(ctx.layout, name, &artifact, ctx.reporter)?;
                self.finish(name, selection, Strategy::Build, path)
            }
        }
    }

    fn plan_source_install(&self, name: &str, mode: InstallMode) -> Result<SourcePlan> {
        let config = self.ctx.config;
        match mode {
            InstallMode::Script => Ok(SourcePlan::Script),
            InstallMode::Build => find_build_tool(config).map(SourcePlan::Build).ok_or_else(|| {
                PgetError::ToolMissing {
                    tool: build_tool_names(config),
                    purpose: format!("building {name} from source"),
                }
                .into()
            }),
            InstallMode::Auto => {
                if let Some(tool) = find_build_tool(config) {
                    return Ok(SourcePlan::Build(tool));
                }
                self.ctx.reporter.warning(&format!(
                    "No build tool ({}) found to build {name}",
                    build_tool_names(config)
                ));
                if self.ctx.confirm.confirm(&format!("Install {name} as a script instead?")) {
                    Ok(SourcePlan::Script)
                } else {
                    Err(PgetError::InstallationCancelled {
                        name: name.to_string(),
                    }
                    .into())
                }
            }
        }
    }

    /// Authenticate a downloaded binary against the release's signed manifest.
    pub(crate) async fn verify_binary(
        &self,
        fetcher: &mut ArtifactFetcher<'a, T>,
        name: &str,
        selection: &RefSelection,
        binary: &FetchedBinary,
    ) -> Result<()> {
        let Some(release) = &selection.release else {
            return Ok(());
        };
        let reporter = self.ctx.reporter;

        match fetcher.fetch_manifest(name, release).await? {
            Some(fetched) => {
                let verifier = SignatureVerifier::from_config(self.ctx.config)?;
                let (manifest, fingerprint) =
                    verify_manifest(&verifier, &fetched.manifest, &fetched.signature).await?;
                manifest.check_asset(&binary.asset_name, &binary.path)?;
                reporter.debug(&format!(
                    "{} verified (manifest signed by {fingerprint})",
                    binary.asset_name
                ));
                Ok(())
            }
            None if self.ctx.config.require_manifest => Err(PgetError::SignatureInvalid {
                reason: format!("release {} of '{name}' has no signed manifest", release.tag_name),
            }
            .into()),
            None => {
                reporter.warning(&format!(
                    "Release {} of {name} has no signed manifest; installing unverified",
                    release.tag_name
                ));
                Ok(())
            }
        }
    }

    /// Take the previous install off disk before the new one is placed.
    ///
    /// Helper `data/` and `config/` directories survive. Executables go first so a stuck copy leaves the record intact.
    fn retire(&self, name: &str) -> Result<()> {
        placement::remove_executables(self.ctx.layout, name, self.ctx.reporter)?;
        self.store.remove(name)?;
        self.scripts.remove_bundle(name)
    }

    /// Docs and helper directories, set up before anything lands on PATH.
    fn prepare(&self, name: &str, source_root: Option<&Path>) -> Result<()> {
        if let Some(root) = source_root {
            self.install_docs(name, root)?;
        }
        self.ctx.layout.ensure_helper_dirs(name)
    }

    fn finish(
        &self,
        name: &str,
        selection: &RefSelection,
        strategy: Strategy,
        path: PathBuf,
    ) -> Result<InstallOutcome> {
        let ctx = &self.ctx;
        let version = selection.version();
        let mut record =
            InstallRecord::new(version.clone(), ctx.catalog.repo_url(name), strategy).stamped();
        if strategy != Strategy::Script {
            record = record.with_platform(ctx.platform.to_string());
        }
        self.store.save(name, &record)?;

        ctx.reporter.success(&format!("Installed {name} {version} ({strategy}) at {}", path.display()));
        Ok(InstallOutcome {
            name: name.to_string(),
            version,
            strategy,
            path,
        })
    }

    fn install_docs(&self, name: &str, source_root: &Path) -> Result<()> {
        let docs = source_root.join("doc");
        if !docs.is_dir() {
            return Ok(());
        }
        let dest = self.ctx.layout.doc_dir(name);
        remove_dir_all(&dest)?;
        copy_dir(&docs, &dest)
    }
}
