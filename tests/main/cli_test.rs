//! End-to-end tests for the `roster` binary: each test runs the real
//! executable against a throwaway database in a temp directory.

use std::str::FromStr;

use assert_cmd::Command;
use tempfile::TempDir;
use uuid::Uuid;

/// Builds a `roster` command whose config and database both live inside
/// `dir`, so tests never see a real roster.toml or each other's state.
fn roster_in(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("roster").expect("roster binary should be built");
    cmd.env("ROSTER_CONFIG_PATH", dir.path().join("roster.toml"));
    cmd.env("ROSTER_DB_PATH", dir.path().join("contacts.db"));
    cmd.env_remove("ROSTER_DB_MAX_CONNECTIONS");
    cmd
}

fn stdout_of(assert: assert_cmd::assert::Assert) -> String {
    String::from_utf8_lossy(&assert.get_output().stdout).into_owned()
}

fn stderr_of(assert: assert_cmd::assert::Assert) -> String {
    String::from_utf8_lossy(&assert.get_output().stderr).into_owned()
}

#[test]
fn migrate_creates_the_database_file() {
    let dir = TempDir::new().expect("temp dir should be created");

    roster_in(&dir).arg("migrate").assert().success();

    let db_path = dir.path().join("contacts.db");
    assert!(db_path.exists(), "migrate should create {}", db_path.display());
}

#[test]
fn check_reports_zero_counts_for_a_fresh_database() {
    let dir = TempDir::new().expect("temp dir should be created");

    roster_in(&dir).arg("migrate").assert().success();
    let assert = roster_in(&dir).arg("check").assert().success();

    let stdout = stdout_of(assert);
    for field in ["users", "contact_requests", "contacts", "blocks"] {
        assert!(
            stdout.contains(&format!("\"{field}\": 0")),
            "check output should report zero {field}, got: {stdout}"
        );
    }
}

#[test]
fn seed_user_prints_the_new_user_id() {
    let dir = TempDir::new().expect("temp dir should be created");

    let assert = roster_in(&dir)
        .args(["seed-user", "--username", "ada", "--email", "ada@example.com"])
        .assert()
        .success();

    let stdout = stdout_of(assert);
    Uuid::from_str(stdout.trim()).expect("seed-user should print a UUID on stdout");

    let assert = roster_in(&dir).arg("check").assert().success();
    assert!(stdout_of(assert).contains("\"users\": 1"));
}

#[test]
fn seeding_a_taken_username_fails() {
    let dir = TempDir::new().expect("temp dir should be created");

    roster_in(&dir)
        .args(["seed-user", "--username", "ada"])
        .assert()
        .success();
    let assert = roster_in(&dir)
        .args(["seed-user", "--username", "ada"])
        .assert()
        .failure();

    assert!(stderr_of(assert).contains("must be unused"));
}

#[test]
fn seed_user_rejects_a_malformed_username() {
    let dir = TempDir::new().expect("temp dir should be created");

    let assert = roster_in(&dir)
        .args(["seed-user", "--username", "no spaces allowed"])
        .assert()
        .failure();

    assert!(stderr_of(assert).contains("invalid username"));
    assert!(
        !dir.path().join("contacts.db").exists(),
        "validation should fail before the database is touched"
    );
}

#[test]
fn seed_user_rejects_a_malformed_phone() {
    let dir = TempDir::new().expect("temp dir should be created");

    let assert = roster_in(&dir)
        .args(["seed-user", "--username", "ada", "--phone", "555-0111"])
        .assert()
        .failure();

    assert!(stderr_of(assert).contains("invalid phone"));
}

#[test]
fn config_file_overrides_the_default_database_path() {
    let dir = TempDir::new().expect("temp dir should be created");
    let db_path = dir.path().join("elsewhere.db");
    let config = format!("[database]\npath = {:?}\n", db_path);
    std::fs::write(dir.path().join("roster.toml"), config)
        .expect("config file should be written");

    // No ROSTER_DB_PATH override here; the path must come from the file.
    let mut cmd = Command::cargo_bin("roster").expect("roster binary should be built");
    cmd.env("ROSTER_CONFIG_PATH", dir.path().join("roster.toml"));
    cmd.env_remove("ROSTER_DB_PATH");
    cmd.env_remove("ROSTER_DB_MAX_CONNECTIONS");
    cmd.arg("migrate").assert().success();

    assert!(db_path.exists());
}
