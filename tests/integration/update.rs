use pget_cli::catalog::Catalog;
use pget_cli::core::PgetError;
use pget_cli::installer::InstallOptions;
use pget_cli::metadata::Strategy;
use pget_cli::resolver::{ReleaseRef, VersionResolver};
use pget_cli::test_utils::{FakeTransport, TestEnv};
use pget_cli::ui::{FixedAnswer, Level, MemoryReporter};
use pget_cli::upgrade::{BackupManager, SelfUpdateOutcome, SelfUpdater, replace_executable};
use pget_cli::utils::fs::{is_executable, make_executable};
use std::fs;

use crate::common::{installable, installer, release};

fn foo_transport(env: &TestEnv, latest: &str) -> FakeTransport {
    installable(env, FakeTransport::new(), "foo")
        .with_json(
            &env.api("repos/pynosaur/foo/releases/latest"),
            release("foo", latest, &["linux-x86_64"]),
        )
        .with_json(
            &env.api("repos/pynosaur/foo/releases/tags/v1.0.0"),
            release("foo", "v1.0.0", &["linux-x86_64"]),
        )
        .with_file("https://dl.test/v1.0.0/foo-linux-x86_64", b"foo 1.0.0".to_vec())
        .with_file(&format!("https://dl.test/{latest}/foo-linux-x86_64"), format!("foo {latest}"))
}

#[tokio::test]
async fn test_update_replaces_older_install() {
    let env = TestEnv::new().unwrap();
    let catalog = Catalog::new(foo_transport(&env, "v1.1.0"), &env.config);
    let reporter = MemoryReporter::new();
    let installer = installer(&env, &catalog, &reporter, &FixedAnswer(false));

    installer.install("foo", &InstallOptions::default().with_version("1.0.0")).await.unwrap();
    let data_file = env.layout.helper_dir("foo").join("data/state.db");
    fs::write(&data_file, "keep me").unwrap();

    let outcome = installer.update("foo", &InstallOptions::default()).await.unwrap().unwrap();

    assert_eq!(outcome.version, "1.1.0");
    assert_eq!(fs::read_to_string(env.layout.user_executable("foo")).unwrap(), "foo v1.1.0");
    assert_eq!(installer.store().load("foo").unwrap().version, "1.1.0");
    assert_eq!(fs::read_to_string(&data_file).unwrap(), "keep me");
}

#[tokio::test]
async fn test_update_is_noop_when_current() {
    let env = TestEnv::new().unwrap();
    let catalog = Catalog::new(foo_transport(&env, "v1.0.0"), &env.config);
    let reporter = MemoryReporter::new();
    let installer = installer(&env, &catalog, &reporter, &FixedAnswer(false));
    installer.install("foo", &InstallOptions::default()).await.unwrap();

    let outcome = installer.update("foo", &InstallOptions::default()).await.unwrap();

    assert!(outcome.is_none());
    assert!(reporter.contains(Level::Info, "foo is up to date (1.0.0)"));
    assert_eq!(catalog.transport().request_count("https://dl.test/v1.0.0/foo-linux-x86_64"), 1);
}

#[tokio::test]
async fn test_update_requires_installed_package() {
    let env = TestEnv::new().unwrap();
    let catalog = Catalog::new(FakeTransport::new(), &env.config);
    let reporter = MemoryReporter::new();
    let installer = installer(&env, &catalog, &reporter, &FixedAnswer(false));

    let err = installer.update("foo", &InstallOptions::default()).await.unwrap_err();
    assert!(matches!(err.downcast_ref::<PgetError>(), Some(PgetError::NotInstalled { .. })));
    assert!(catalog.transport().requests().is_empty());
}

#[tokio::test]
async fn test_resolver_falls_back_to_default_branch() {
    let env = TestEnv::new().unwrap();
    let catalog = Catalog::new(FakeTransport::new(), &env.config);
    let reporter = MemoryReporter::new();
    let resolver = VersionResolver::new(&catalog, &reporter);

    let selection = resolver.resolve("bar", None, false).await.unwrap();
    assert_eq!(selection.reference, ReleaseRef::Branch("main".into()));
    assert_eq!(selection.version(), "main");

    let err = resolver.resolve("bar", Some("2.0.0"), false).await.unwrap_err();
    assert!(matches!(err.downcast_ref::<PgetError>(), Some(PgetError::VersionNotFound { .. })));
}

#[tokio::test]
async fn test_replace_executable_rolls_back_on_failed_copy() {
    let env = TestEnv::new().unwrap();
    let target = env.path("bin/pget");
    fs::create_dir_all(target.parent().unwrap()).unwrap();
    fs::write(&target, "pget 0.1.0").unwrap();
    make_executable(&target).unwrap();

    // A directory cannot be copied over a file path.
    let bogus = env.path("not-a-binary");
    fs::create_dir_all(&bogus).unwrap();

    let err = replace_executable(&target, &bogus).await.unwrap_err();

    assert!(matches!(
        err.downcast_ref::<PgetError>(),
        Some(PgetError::SelfUpdateFailed { restored: true, .. })
    ));
    assert_eq!(fs::read_to_string(&target).unwrap(), "pget 0.1.0");
    assert!(is_executable(&target));
    assert!(!BackupManager::new(target).backup_exists());
}

#[tokio::test]
async fn test_self_update_records_new_version() {
    let env = TestEnv::new().unwrap();
    let exe = env.path("bin/pget");
    fs::create_dir_all(exe.parent().unwrap()).unwrap();
    fs::write(&exe, "pget 0.1.0").unwrap();

    let transport = FakeTransport::new()
        .with_json(
            &env.api("repos/pynosaur/pget/releases/latest"),
            release("pget", "v0.2.0", &["linux-x86_64"]),
        )
        .with_file("https://dl.test/v0.2.0/pget-linux-x86_64", b"pget 0.2.0".to_vec());
    let catalog = Catalog::new(transport, &env.config);
    let reporter = MemoryReporter::new();
    let installer = installer(&env, &catalog, &reporter, &FixedAnswer(false));

    let outcome = SelfUpdater::new(&installer, exe.clone())
        .with_current_version("0.1.0")
        .update(false)
        .await
        .unwrap();

    assert_eq!(
        outcome,
        SelfUpdateOutcome::Updated {
            from: "0.1.0".into(),
            to: "0.2.0".into()
        }
    );
    assert_eq!(fs::read_to_string(&exe).unwrap(), "pget 0.2.0");
    let record = installer.store().load("pget").unwrap();
    assert_eq!(record.strategy, Strategy::Binary);
    assert!(!env.layout.package_cache("pget").exists());
}
