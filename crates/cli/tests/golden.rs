//! Golden tests for verifying JSON output format stability
//!
//! These cover the paths that fail before any network access, so they run
//! without a bucket.
//!
//! Run with: `cargo test --features golden`

#![cfg(feature = "golden")]

use std::process::{Command, Output};

use tempfile::TempDir;

/// Run `bkt` with an empty config directory and no credential overrides
fn bkt(config_dir: &TempDir, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_bkt"))
        .args(args)
        .env("BKT_CONFIG_DIR", config_dir.path())
        .env_remove("BKT_CONFIG")
        .env_remove("BKT_BUCKET")
        .env_remove("BKT_ENDPOINT")
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute bkt")
}

fn stderr_json(output: &Output) -> serde_json::Value {
    let stderr = String::from_utf8_lossy(&output.stderr);
    serde_json::from_str(&stderr).expect("stderr should be a JSON error document")
}

#[test]
fn test_ls_without_bucket_json() {
    let config_dir = TempDir::new().unwrap();

    let output = bkt(&config_dir, &["ls", "--json"]);

    assert_eq!(output.status.code(), Some(2));
    assert!(output.stdout.is_empty(), "stdout must stay clean on error");
    insta::assert_json_snapshot!("ls_without_bucket", stderr_json(&output));
}

#[test]
fn test_rm_folder_refuses_empty_prefix_json() {
    let config_dir = TempDir::new().unwrap();

    let output = bkt(&config_dir, &["rm-folder", "/", "--bucket", "archive", "--json"]);

    assert_eq!(output.status.code(), Some(2));
    insta::assert_json_snapshot!("rm_folder_empty_prefix", stderr_json(&output));
}

#[test]
fn test_invalid_config_json() {
    let config_dir = TempDir::new().unwrap();
    std::fs::write(
        config_dir.path().join("config.toml"),
        "[defaults]\nworkers = 0\n",
    )
    .unwrap();

    let output = bkt(&config_dir, &["ls", "--bucket", "archive", "--json"]);

    assert_eq!(output.status.code(), Some(2));
    insta::assert_json_snapshot!("invalid_config", stderr_json(&output));
}

#[test]
fn test_missing_credentials_file_json() {
    let config_dir = TempDir::new().unwrap();
    let missing = config_dir.path().join("no-such-credentials");

    let output = bkt(
        &config_dir,
        &[
            "ls",
            "--bucket",
            "archive",
            "--credentials-file",
            missing.to_str().unwrap(),
            "--json",
        ],
    );

    assert_eq!(output.status.code(), Some(4));
    let json = stderr_json(&output);
    let message = json["error"].as_str().unwrap();
    assert!(message.starts_with("Authentication error: Credentials file not found"));
}

#[test]
fn test_completions_bash() {
    let config_dir = TempDir::new().unwrap();

    let output = bkt(&config_dir, &["completions", "bash"]);

    assert!(output.status.success());
    let script = String::from_utf8_lossy(&output.stdout);
    assert!(script.contains("bkt"));
    assert!(script.contains("rm-folder"));
}
