//! CLI tests for the `submitter` binary.
//!
//! Spawns the binary and checks that fatal configuration problems are reported
//! with the `INVALID` exit code before any network call.

use std::fs;
use std::path::Path;
use std::process::Command;

use submitter::exit_codes;
use submitter::io::completion::{CREDENTIALS_FILE, TOKEN_ENV};
use submitter::io::config::load_config;

/// Command with `home` as the home directory and no token in the environment.
fn submitter(home: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_submitter"));
    cmd.env("HOME", home)
        .env_remove(TOKEN_ENV)
        .env_remove("RUST_LOG");
    cmd
}

fn write_credentials(home: &Path, contents: &str) {
    let path = home.join(CREDENTIALS_FILE);
    fs::create_dir_all(path.parent().expect("credentials parent")).expect("create config dir");
    fs::write(path, contents).expect("write credentials");
}

#[test]
fn missing_token_exits_invalid() {
    let temp = tempfile::tempdir().expect("tempdir");

    let output = submitter(temp.path())
        .current_dir(temp.path())
        .args(["abc200", "c"])
        .output()
        .expect("run submitter");

    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("OPENAI_TOKEN is not set"), "stderr: {stderr}");
}

#[test]
fn invalid_config_exits_invalid() {
    let temp = tempfile::tempdir().expect("tempdir");
    fs::write(
        temp.path().join("submitter.toml"),
        "[rounds]\ninitial_batch = 0\n",
    )
    .expect("write config");

    let output = submitter(temp.path())
        .current_dir(temp.path())
        .env(TOKEN_ENV, "test-token")
        .args(["abc200", "c"])
        .output()
        .expect("run submitter");

    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("rounds.initial_batch"), "stderr: {stderr}");
}

#[test]
fn missing_problem_files_exit_invalid() {
    let temp = tempfile::tempdir().expect("tempdir");

    let output = submitter(temp.path())
        .current_dir(temp.path())
        .env(TOKEN_ENV, "test-token")
        .args(["abc200", "c"])
        .output()
        .expect("run submitter");

    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("main.py"), "stderr: {stderr}");
}

#[test]
fn write_config_persists_overrides() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = temp.path().join("conf").join("submitter.toml");

    let status = submitter(temp.path())
        .current_dir(temp.path())
        .args(["abc200", "c", "--testcases", "3", "--temperature", "0.5"])
        .arg("--config")
        .arg(&path)
        .arg("--write-config")
        .status()
        .expect("run submitter");

    assert_eq!(status.code(), Some(exit_codes::OK));
    let config = load_config(&path).expect("load written config");
    assert_eq!(config.rounds.initial_batch, 3);
    assert_eq!(config.rounds.escalated_batch, 9);
    assert_eq!(config.completion.parameters.temperature, Some(0.5));
}

#[test]
fn token_from_credentials_file_is_used() {
    let temp = tempfile::tempdir().expect("tempdir");
    write_credentials(temp.path(), "OPENAI_TOKEN=from-dotenv\n");

    let output = submitter(temp.path())
        .current_dir(temp.path())
        .args(["abc200", "c"])
        .output()
        .expect("run submitter");

    // Gets past the credential check and fails on the missing problem files.
    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(!stderr.contains("OPENAI_TOKEN is not set"), "stderr: {stderr}");
    assert!(stderr.contains("main.py"), "stderr: {stderr}");
}

#[test]
fn environment_token_wins_over_credentials_file() {
    let temp = tempfile::tempdir().expect("tempdir");
    write_credentials(temp.path(), "OPENAI_TOKEN=from-dotenv\n");

    let output = submitter(temp.path())
        .current_dir(temp.path())
        .env(TOKEN_ENV, "")
        .args(["abc200", "c"])
        .output()
        .expect("run submitter");

    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("OPENAI_TOKEN is not set"), "stderr: {stderr}");
}
