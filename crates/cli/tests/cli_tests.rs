//! CLI integration tests

use std::process::Command;

fn exo() -> Command {
    Command::new(env!("CARGO_BIN_EXE_exo"))
}

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let output = exo().arg("--help").output().expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(stdout.contains("ExoScope"), "Should show app name");
    assert!(stdout.contains("health"), "Should show health command");
    assert!(stdout.contains("metadata"), "Should show metadata command");
    assert!(stdout.contains("classify"), "Should show classify command");
    assert!(stdout.contains("regress"), "Should show regress command");
    assert!(stdout.contains("history"), "Should show history command");
}

/// Test that the CLI shows version
#[test]
fn test_cli_version() {
    let output = exo().arg("--version").output().expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout.contains("exo"), "Should show binary name");
}

/// Test classify subcommand help
#[test]
fn test_classify_help() {
    let output = exo()
        .args(["classify", "--help"])
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Classify help should succeed");
    assert!(stdout.contains("--sample"), "Should show sample option");
    assert!(stdout.contains("--file"), "Should show file option");
    assert!(stdout.contains("--set"), "Should show set option");
    assert!(
        stdout.contains("false-positive"),
        "Should list the false-positive sample"
    );
}

/// Test history subcommand help
#[test]
fn test_history_help() {
    let output = exo()
        .args(["history", "--help"])
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "History help should succeed");
    assert!(stdout.contains("--task"), "Should show task option");
}

/// An unreachable server is reported as an error, not a panic
#[test]
fn test_unreachable_server_fails_cleanly() {
    let output = exo()
        .args(["--api-url", "http://127.0.0.1:9", "health"])
        .output()
        .expect("Failed to execute command");

    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success(), "Health against a closed port should fail");
    assert!(
        stderr.contains("Failed to send request"),
        "Should explain the failure"
    );
}

/// Bad overrides are rejected before any request is made
#[test]
fn test_invalid_override_rejected() {
    let output = exo()
        .args([
            "--api-url",
            "http://127.0.0.1:9",
            "regress",
            "--sample",
            "confirmed",
            "--set",
            "koi_depth=deep",
        ])
        .output()
        .expect("Failed to execute command");

    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success());
    assert!(stderr.contains("koi_depth"), "Should name the bad feature");
    assert!(
        !stderr.contains("Failed to send request"),
        "Should fail before contacting the server"
    );
}
