use pget_cli::catalog::Catalog;
use pget_cli::core::PgetError;
use pget_cli::installer::{InstallMode, InstallOptions};
use pget_cli::metadata::Strategy;
use pget_cli::test_utils::{FakeTransport, TestEnv, source_tarball};
use pget_cli::ui::{FixedAnswer, Level, MemoryReporter, ScriptedConfirm};
use std::fs;

use crate::common::{installable, installer, release};

fn foo_transport(env: &TestEnv) -> FakeTransport {
    let tarball = source_tarball(
        "pynosaur-foo-0f1e2d",
        &[("doc/foo.yaml", b"VERSION: v1.2.0\n"), ("doc/foo.1", b".TH FOO 1")],
    )
    .unwrap();
    installable(env, FakeTransport::new(), "foo")
        .with_json(
            &env.api("repos/pynosaur/foo/releases/latest"),
            release("foo", "v1.2.0", &["linux-x86_64", "darwin-arm64"]),
        )
        .with_file("https://dl.test/v1.2.0/foo-linux-x86_64", b"\x7fELF foo 1.2.0".to_vec())
        .with_file(&env.api("repos/pynosaur/foo/tarball/v1.2.0"), tarball)
}

#[tokio::test]
async fn test_binary_install_from_latest_release() {
    let env = TestEnv::new().unwrap();
    let catalog = Catalog::new(foo_transport(&env), &env.config);
    let reporter = MemoryReporter::new();
    let installer = installer(&env, &catalog, &reporter, &FixedAnswer(false));

    let outcome = installer.install("foo", &InstallOptions::default()).await.unwrap();

    assert_eq!(outcome.version, "1.2.0");
    assert_eq!(outcome.strategy, Strategy::Binary);
    assert_eq!(outcome.path, env.layout.user_executable("foo"));
    assert_eq!(fs::read(&outcome.path).unwrap(), b"\x7fELF foo 1.2.0");

    let record = installer.store().load("foo").unwrap();
    assert_eq!(record.version, "1.2.0");
    assert_eq!(record.strategy, Strategy::Binary);
    assert_eq!(record.platform.as_deref(), Some("linux-x86_64"));
    assert_eq!(record.source_url, "https://github.com/pynosaur/foo");

    assert!(env.layout.doc_dir("foo").join("foo.1").is_file());
    for sub in ["data", "config", "cache"] {
        assert!(env.layout.helper_dir("foo").join(sub).is_dir());
    }
    assert!(reporter.contains(Level::Warning, "no signed manifest"));
    assert_eq!(catalog.transport().request_count("https://dl.test/v1.2.0/foo-darwin-arm64"), 0);
}

#[tokio::test]
async fn test_script_fallback_without_release_or_build_tool() {
    let env = TestEnv::new().unwrap();
    let tarball = source_tarball(
        "pynosaur-bar-7c8d9e",
        &[
            ("app/__init__.py", b""),
            ("app/main.py", b"def main():\n    return 0\n"),
            ("doc/bar.yaml", b"VERSION: 0.3.0\n"),
            ("bazel-out/junk", b"x"),
        ],
    )
    .unwrap();
    let transport = installable(&env, FakeTransport::new(), "bar")
        .with_file(&env.api("repos/pynosaur/bar/tarball/main"), tarball);
    let catalog = Catalog::new(transport, &env.config);
    let reporter = MemoryReporter::new();
    let confirm = ScriptedConfirm::new([true]);
    let installer = installer(&env, &catalog, &reporter, &confirm);

    let outcome = installer.install("bar", &InstallOptions::default()).await.unwrap();

    assert_eq!(outcome.strategy, Strategy::Script);
    assert_eq!(outcome.version, "main");
    assert_eq!(confirm.questions(), vec!["Install bar as a script instead?".to_string()]);
    assert!(reporter.contains(Level::Info, "No releases found for bar"));
    assert!(reporter.contains(Level::Warning, "No build tool"));

    let bundle = env.layout.script_dir("bar");
    assert!(bundle.join("app/main.py").is_file());
    assert!(!bundle.join("bazel-out").exists());

    let wrapper = fs::read_to_string(env.layout.user_executable("bar")).unwrap();
    assert!(wrapper.starts_with("#!/usr/bin/env python3"));
    assert!(wrapper.contains(&bundle.display().to_string()));
    assert!(wrapper.contains("from app.main import main"));

    let record = installer.store().load("bar").unwrap();
    assert_eq!(record.strategy, Strategy::Script);
    assert_eq!(record.platform, None);
}

#[tokio::test]
async fn test_declined_script_fallback_leaves_nothing_behind() {
    let env = TestEnv::new().unwrap();
    let tarball = source_tarball("pynosaur-bar-7c8d9e", &[("app/main.py", b"")]).unwrap();
    let transport = installable(&env, FakeTransport::new(), "bar")
        .with_file(&env.api("repos/pynosaur/bar/tarball/main"), tarball);
    let catalog = Catalog::new(transport, &env.config);
    let reporter = MemoryReporter::new();
    let installer = installer(&env, &catalog, &reporter, &FixedAnswer(false));

    let err = installer.install("bar", &InstallOptions::default()).await.unwrap_err();

    assert!(matches!(
        err.downcast_ref::<PgetError>(),
        Some(PgetError::InstallationCancelled { .. })
    ));
    assert!(!env.layout.user_executable("bar").exists());
    assert!(installer.store().load("bar").is_none());
}

#[tokio::test]
async fn test_unknown_version_leaves_previous_install_untouched() {
    let env = TestEnv::new().unwrap();
    let catalog = Catalog::new(foo_transport(&env), &env.config);
    let reporter = MemoryReporter::new();
    let installer = installer(&env, &catalog, &reporter, &FixedAnswer(false));
    installer.install("foo", &InstallOptions::default()).await.unwrap();
    let before = fs::read(env.layout.user_executable("foo")).unwrap();

    let err = installer
        .install("foo", &InstallOptions::default().with_version("9.9.9"))
        .await
        .unwrap_err();

    assert_eq!(
        err.downcast_ref::<PgetError>(),
        Some(&PgetError::VersionNotFound {
            name: "foo".into(),
            version: "v9.9.9".into()
        })
    );
    assert_eq!(fs::read(env.layout.user_executable("foo")).unwrap(), before);
    assert_eq!(installer.store().load("foo").unwrap().version, "1.2.0");
}

#[tokio::test]
async fn test_reinstalling_same_version_is_refused() {
    let env = TestEnv::new().unwrap();
    let catalog = Catalog::new(foo_transport(&env), &env.config);
    let reporter = MemoryReporter::new();
    let installer = installer(&env, &catalog, &reporter, &FixedAnswer(false));
    installer.install("foo", &InstallOptions::default()).await.unwrap();

    let explicit = installer
        .install("foo", &InstallOptions::default().with_version("v1.2.0"))
        .await
        .unwrap_err();
    assert!(matches!(
        explicit.downcast_ref::<PgetError>(),
        Some(PgetError::AlreadyInstalled { version, .. }) if version == "1.2.0"
    ));

    let implicit = installer.install("foo", &InstallOptions::default()).await.unwrap_err();
    assert!(matches!(
        implicit.downcast_ref::<PgetError>(),
        Some(PgetError::AlreadyInstalled { .. })
    ));
    assert!(reporter.contains(Level::Info, "foo 1.2.0 is already installed"));
}

#[tokio::test]
async fn test_ignored_and_unmarked_repositories() {
    let env = TestEnv::new().unwrap();
    let transport = FakeTransport::new()
        .with_json(&env.api("repos/pynosaur/notes"), serde_json::json!({"name": "notes"}));
    let catalog = Catalog::new(transport, &env.config);
    let reporter = MemoryReporter::new();
    let installer = installer(&env, &catalog, &reporter, &FixedAnswer(true));

    let ignored = installer.install(".github", &InstallOptions::default()).await.unwrap_err();
    assert!(matches!(ignored.downcast_ref::<PgetError>(), Some(PgetError::PackageIgnored { .. })));
    assert!(catalog.transport().requests().is_empty());

    let unmarked = installer.install("notes", &InstallOptions::default()).await.unwrap_err();
    assert!(matches!(unmarked.downcast_ref::<PgetError>(), Some(PgetError::NotInstallable { .. })));

    let missing = installer.install("ghost", &InstallOptions::default()).await.unwrap_err();
    assert!(matches!(missing.downcast_ref::<PgetError>(), Some(PgetError::PackageNotFound { .. })));
}

#[tokio::test]
async fn test_forced_build_without_tool_skips_binary() {
    let env = TestEnv::new().unwrap();
    let catalog = Catalog::new(foo_transport(&env), &env.config);
    let reporter = MemoryReporter::new();
    let installer = installer(&env, &catalog, &reporter, &FixedAnswer(true));

    let err = installer
        .install("foo", &InstallOptions::default().with_mode(InstallMode::Build))
        .await
        .unwrap_err();

    assert!(matches!(err.downcast_ref::<PgetError>(), Some(PgetError::ToolMissing { .. })));
    assert_eq!(catalog.transport().request_count("https://dl.test/v1.2.0/foo-linux-x86_64"), 0);
    assert!(!env.layout.user_executable("foo").exists());
}

#[tokio::test]
async fn test_uninstall_then_list() {
    let env = TestEnv::new().unwrap();
    let catalog = Catalog::new(foo_transport(&env), &env.config);
    let reporter = MemoryReporter::new();
    let installer = installer(&env, &catalog, &reporter, &FixedAnswer(false));
    installer.install("foo", &InstallOptions::default()).await.unwrap();

    let listed = installer.installed().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].name, "foo");
    assert_eq!(listed[0].version.as_deref(), Some("1.2.0"));

    installer.uninstall("foo").unwrap();
    assert!(installer.installed().unwrap().is_empty());
    assert!(!env.layout.helper_dir("foo").exists());
    assert!(!env.layout.package_cache("foo").exists());

    let again = installer.uninstall("foo").unwrap_err();
    assert!(matches!(again.downcast_ref::<PgetError>(), Some(PgetError::NotInstalled { .. })));
}
