//! Shared setup for the integration suite.

use pget_cli::catalog::Catalog;
use pget_cli::installer::{InstallContext, Installer};
use pget_cli::test_utils::{FakeTransport, TestEnv, init_test_logging};
use pget_cli::ui::{Confirm, MemoryReporter};
use pget_cli::utils::Platform;
use serde_json::json;

pub fn linux() -> Platform {
    Platform::new("linux", "x86_64")
}

/// Register `name` as an existing, installable repository.
pub fn installable(env: &TestEnv, transport: FakeTransport, name: &str) -> FakeTransport {
    transport
        .with_json(&env.api(&format!("repos/pynosaur/{name}")), json!({"name": name}))
        .with_probe(&env.marker(name))
}

/// A release JSON document with one binary asset per listed platform.
pub fn release(name: &str, tag: &str, platforms: &[&str]) -> serde_json::Value {
    let assets: Vec<_> = platforms
        .iter()
        .map(|platform| {
            let asset = format!("{name}-{platform}");
            json!({"name": asset, "browser_download_url": format!("https://dl.test/{tag}/{asset}")})
        })
        .collect();
    json!({"tag_name": tag, "assets": assets})
}

pub fn installer<'a>(
    env: &'a TestEnv,
    catalog: &'a Catalog<FakeTransport>,
    reporter: &'a MemoryReporter,
    confirm: &'a dyn Confirm,
) -> Installer<'a, FakeTransport> {
    init_test_logging(None);
    Installer::new(
        InstallContext::builder(&env.config, &env.layout, catalog, reporter)
            .confirm(confirm)
            .platform(linux())
            .build(),
    )
    .unwrap()
}
