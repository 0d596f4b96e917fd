use assert_cmd::Command;
use predicates::prelude::*;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Config that keeps the binary off the network and out of the user's cache.
fn offline_config(dir: &Path) -> PathBuf {
    let config_path = dir.join("config.toml");
    let cache_dir = dir.join("cache");
    std::fs::write(
        &config_path,
        format!(
            "[update]\ncheck_on_startup = false\ncache_dir = {}\n",
            toml_string(&cache_dir.display().to_string())
        ),
    )
    .unwrap();
    config_path
}

fn toml_string(value: &str) -> String {
    format!("'{value}'")
}

fn tasklog(config: &Path) -> Command {
    let mut cmd = Command::cargo_bin("tasklog").unwrap();
    cmd.env_remove("RUST_LOG").arg("--config").arg(config);
    cmd
}

#[test]
fn test_help_lists_upgrade() {
    Command::cargo_bin("tasklog")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("upgrade"))
        .stdout(predicate::str::contains("version"));
}

#[test]
fn test_upgrade_help_lists_modes() {
    Command::cargo_bin("tasklog")
        .unwrap()
        .args(["upgrade", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--check"))
        .stdout(predicate::str::contains("--rollback"))
        .stdout(predicate::str::contains("--channel"));
}

#[test]
fn test_version_without_startup_check() {
    let temp = TempDir::new().unwrap();
    let config = offline_config(temp.path());

    tasklog(&config)
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("tasklog {}", env!("CARGO_PKG_VERSION"))));
}

#[test]
fn test_dismiss_without_cache() {
    let temp = TempDir::new().unwrap();
    let config = offline_config(temp.path());

    tasklog(&config)
        .args(["upgrade", "--dismiss"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No pending update notification"));
}

#[test]
fn test_rollback_without_backup_fails() {
    let temp = TempDir::new().unwrap();
    let config = offline_config(temp.path());

    tasklog(&config)
        .args(["upgrade", "--rollback"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Failed to restore from backup"))
        .stderr(predicate::str::contains("no backup found"));
}

#[test]
fn test_malformed_config_is_reported() {
    let temp = TempDir::new().unwrap();
    let config = temp.path().join("config.toml");
    std::fs::write(&config, "[update\n").unwrap();

    tasklog(&config)
        .arg("version")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Failed to parse global config"));
}

#[test]
fn test_conflicting_flags_are_usage_errors() {
    let temp = TempDir::new().unwrap();
    let config = offline_config(temp.path());

    tasklog(&config).args(["upgrade", "--check", "--rollback"]).assert().failure().code(2);
}
