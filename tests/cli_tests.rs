//! CLI integration tests

use std::process::Command;

use tempfile::TempDir;

fn skycam_bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_skycam"))
}

#[test]
fn help_output() {
    let output = skycam_bin()
        .arg("--help")
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("serve"));
    assert!(stdout.contains("photo"));
    assert!(stdout.contains("record"));
    assert!(stdout.contains("status"));
    assert!(stdout.contains("--socket"));
}

#[test]
fn version_output() {
    let output = skycam_bin()
        .arg("--version")
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("skycam"));
    assert!(stdout.contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn serve_help_lists_camera_flags() {
    let output = skycam_bin()
        .args(["serve", "--help"])
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("--device"));
    assert!(stdout.contains("--fps"));
    assert!(stdout.contains("--media-dir"));
    assert!(stdout.contains("--no-software-fallback"));
}

#[test]
fn config_path_command() {
    let dir = TempDir::new().unwrap();
    let output = skycam_bin()
        .env("XDG_CONFIG_HOME", dir.path())
        .args(["config", "path"])
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("skycam"));
    assert!(stdout.contains("config.toml"));
}

#[test]
fn config_help() {
    let output = skycam_bin()
        .args(["config", "--help"])
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("init"));
    assert!(stdout.contains("set"));
    assert!(stdout.contains("get"));
    assert!(stdout.contains("list"));
    assert!(stdout.contains("path"));
}

#[test]
fn config_set_then_get() {
    let dir = TempDir::new().unwrap();
    let set = skycam_bin()
        .env("XDG_CONFIG_HOME", dir.path())
        .args(["config", "set", "video.fps", "25"])
        .output()
        .expect("Failed to execute command");
    assert!(set.status.success());

    let get = skycam_bin()
        .env("XDG_CONFIG_HOME", dir.path())
        .args(["config", "get", "video.fps"])
        .output()
        .expect("Failed to execute command");
    assert!(get.status.success());
    assert_eq!(String::from_utf8_lossy(&get.stdout).trim(), "25");
}

#[test]
fn invalid_duration_is_usage_error() {
    let dir = TempDir::new().unwrap();
    let output = skycam_bin()
        .args(["--socket"])
        .arg(dir.path().join("none.sock"))
        .args(["record", "start", "--duration", "invalid"])
        .output()
        .expect("Failed to execute command");

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("Invalid duration"),
        "Expected error about invalid duration, got: {}",
        stderr
    );
}

#[test]
fn status_without_daemon_fails() {
    let dir = TempDir::new().unwrap();
    let output = skycam_bin()
        .arg("--socket")
        .arg(dir.path().join("none.sock"))
        .arg("status")
        .output()
        .expect("Failed to execute command");

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("No daemon running"),
        "Expected daemon-not-running error, got: {}",
        stderr
    );
}
