//! Error scenario integration tests

use std::process::Command;

use tempfile::TempDir;

fn skycam_bin(config_home: &TempDir) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_skycam"));
    cmd.env("XDG_CONFIG_HOME", config_home.path());
    cmd
}

#[test]
fn config_get_unknown_key() {
    let dir = TempDir::new().unwrap();
    let output = skycam_bin(&dir)
        .args(["config", "get", "unknown_key"])
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("Unknown") || stderr.contains("Valid"),
        "Expected error about unknown key, got: {}",
        stderr
    );
}

#[test]
fn config_set_unknown_key() {
    let dir = TempDir::new().unwrap();
    let output = skycam_bin(&dir)
        .args(["config", "set", "unknown_key", "value"])
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("Unknown") || stderr.contains("Valid"),
        "Expected error about unknown key, got: {}",
        stderr
    );
}

#[test]
fn config_set_invalid_timeout() {
    let dir = TempDir::new().unwrap();
    let output = skycam_bin(&dir)
        .args(["config", "set", "transcode_timeout", "invalid"])
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("transcode_timeout"),
        "Expected error about invalid timeout, got: {}",
        stderr
    );
}

#[test]
fn config_set_zero_fps() {
    let dir = TempDir::new().unwrap();
    let output = skycam_bin(&dir)
        .args(["config", "set", "video.fps", "0"])
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("positive integer"),
        "Expected error about fps, got: {}",
        stderr
    );
}

#[test]
fn config_set_invalid_boolean() {
    let dir = TempDir::new().unwrap();
    let output = skycam_bin(&dir)
        .args(["config", "set", "software_fallback", "maybe"])
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("true") || stderr.contains("false"),
        "Expected error about invalid boolean, got: {}",
        stderr
    );
}

#[test]
fn config_set_relative_device() {
    let dir = TempDir::new().unwrap();
    let output = skycam_bin(&dir)
        .args(["config", "set", "video.device", "video0"])
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("absolute path"), "got: {}", stderr);
}

#[test]
fn config_list_with_no_file() {
    let dir = TempDir::new().unwrap();
    let output = skycam_bin(&dir)
        .args(["config", "list"])
        .output()
        .expect("Failed to execute command");

    // Unset keys are listed as "(not set)"
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("not set") && stdout.contains("video.device"),
        "Expected config list output, got: {}",
        stdout
    );
}

#[test]
fn photo_without_daemon_fails() {
    let dir = TempDir::new().unwrap();
    let output = skycam_bin(&dir)
        .arg("--socket")
        .arg(dir.path().join("missing.sock"))
        .arg("photo")
        .output()
        .expect("Failed to execute command");

    assert_eq!(output.status.code(), Some(1));
}
