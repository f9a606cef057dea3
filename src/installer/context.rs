//! Installation context shared by every step of one install run.

use crate::catalog::Catalog;
use crate::config::PgetConfig;
use crate::layout::Layout;
use crate::ui::{Confirm, FixedAnswer, Reporter};
use crate::utils::Platform;

static DECLINE: FixedAnswer = FixedAnswer(false);

/// Bundles the collaborators the engine calls into.
///
/// * `config` - timeouts, tool names and verification policy
/// * `layout` - where executables, helpers, bundles and caches live
/// * `catalog` - remote repository queries and downloads
/// * `reporter` - user-facing progress output
/// * `confirm` - the yes/no prompt capability
/// * `platform` - the `<os>-<arch>` string binary assets are matched against
pub struct InstallContext<'a, T> {
    pub config: &'a PgetConfig,
    pub layout: &'a Layout,
    pub catalog: &'a Catalog<T>,
    pub reporter: &'a dyn Reporter,
    pub confirm: &'a dyn Confirm,
    pub platform: Platform,
}

/// Builder for [`InstallContext`].
pub struct InstallContextBuilder<'a, T> {
    config: &'a PgetConfig,
    layout: &'a Layout,
    catalog: &'a Catalog<T>,
    reporter: &'a dyn Reporter,

    confirm: Option<&'a dyn Confirm>,
    platform: Option<Platform>,
}

impl<'a, T> InstallContextBuilder<'a, T> {
    pub fn new(
        config: &'a PgetConfig,
        layout: &'a Layout,
        catalog: &'a Catalog<T>,
        reporter: &'a dyn Reporter,
    ) -> Self {
        Self {
            config,
            layout,
            catalog,
            reporter,
            confirm: None,
            platform: None,
        }
    }

    /// Prompt used for the script fallback. Without one every prompt is declined.
    pub fn confirm(mut self, confirm: &'a dyn Confirm) -> Self {
        self.confirm = Some(confirm);
        self
    }

    /// Override the host platform.
    pub fn platform(mut self, platform: Platform) -> Self {
        self.platform = Some(platform);
        self
    }

    #[must_use]
    pub fn build(self) -> InstallContext<'a, T> {
        InstallContext {
            config: self.config,
            layout: self.layout,
            catalog: self.catalog,
            reporter: self.reporter,
            confirm: self.confirm.unwrap_or(&DECLINE),
            platform: self.platform.unwrap_or_else(Platform::current),
        }
    }
}

impl<'a, T> InstallContext<'a, T> {
    pub fn builder(
        config: &'a PgetConfig,
        layout: &'a Layout,
        catalog: &'a Catalog<T>,
        reporter: &'a dyn Reporter,
    ) -> InstallContextBuilder<'a, T> {
        InstallContextBuilder::new(config, layout, catalog, reporter)
    }
}
