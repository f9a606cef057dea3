use assert_cmd::Command;
use pget_cli::metadata::{InstallRecord, MetadataStore, Strategy};
use pget_cli::test_utils::TestEnv;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;

/// Write a config that points the install root into `env` and disables the
/// system bin directory.
fn write_config(env: &TestEnv) -> PathBuf {
    let path = env.path("config.toml");
    let content = format!(
        "root = '{}'\nsystem_install = false\n",
        env.layout.root().display()
    );
    fs::write(&path, content).unwrap();
    path
}

fn pget(env: &TestEnv) -> Command {
    let mut cmd = Command::cargo_bin("pget").unwrap();
    cmd.env("PGET_CONFIG_PATH", write_config(env))
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .env_remove("GITHUB_TOKEN");
    cmd
}

#[test]
fn test_help_lists_commands() {
    let env = TestEnv::new().unwrap();
    pget(&env)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("install"))
        .stdout(predicate::str::contains("remove"))
        .stdout(predicate::str::contains("versions"));
}

#[test]
fn test_script_and_build_conflict() {
    let env = TestEnv::new().unwrap();
    pget(&env)
        .args(["install", "foo", "--script", "--build"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}

#[test]
fn test_list_empty_root() {
    let env = TestEnv::new().unwrap();
    pget(&env)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("No packages installed"));
}

#[test]
fn test_list_shows_recorded_packages() {
    let env = TestEnv::new().unwrap();
    let store = MetadataStore::new(env.layout.clone());
    store
        .save(
            "foo",
            &InstallRecord::new("1.2.0", "https://github.com/pynosaur/foo", Strategy::Binary),
        )
        .unwrap();
    let exe = env.layout.user_executable("foo");
    fs::create_dir_all(exe.parent().unwrap()).unwrap();
    fs::write(&exe, "foo").unwrap();

    pget(&env)
        .args(["list", "--names"])
        .assert()
        .success()
        .stdout(predicate::str::diff("foo\n"));

    pget(&env)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("1.2.0"))
        .stdout(predicate::str::contains("binary"));
}

#[test]
fn test_remove_missing_package_fails() {
    let env = TestEnv::new().unwrap();
    pget(&env)
        .args(["remove", "ghost"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("could not be removed"));
}

#[test]
fn test_invalid_package_spec() {
    let env = TestEnv::new().unwrap();
    pget(&env)
        .args(["install", "foo@"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid package spec"));
}
