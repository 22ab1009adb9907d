//! End-to-end tests against a software-only daemon

use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use assert_cmd::Command as AssertCommand;
use predicates::prelude::*;
use tempfile::TempDir;

/// A daemon with no camera tools on `PATH` and no real device
struct TestDaemon {
    child: Child,
    dir: TempDir,
}

impl TestDaemon {
    fn start() -> Self {
        let dir = TempDir::new().unwrap();
        let bin_dir = dir.path().join("bin");
        std::fs::create_dir_all(&bin_dir).unwrap();

        let child = Command::new(env!("CARGO_BIN_EXE_skycam"))
            .env("PATH", &bin_dir)
            .env("XDG_CONFIG_HOME", dir.path().join("config"))
            .env("SKYCAM_MEDIA_DIR", dir.path().join("media"))
            .env_remove("VIDEO_DEVICE")
            .env_remove("SKYCAM_SOCKET")
            .arg("--socket")
            .arg(dir.path().join("skycam.sock"))
            .arg("serve")
            .arg("--device")
            .arg(dir.path().join("video-missing"))
            .arg("--pid-file")
            .arg(dir.path().join("skycam.pid"))
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .expect("Failed to spawn daemon");

        let daemon = Self { child, dir };
        daemon.wait_for_socket();
        daemon
    }

    fn socket(&self) -> std::path::PathBuf {
        self.dir.path().join("skycam.sock")
    }

    fn media(&self) -> &Path {
        self.dir.path()
    }

    fn wait_for_socket(&self) {
        let deadline = Instant::now() + Duration::from_secs(10);
        while !self.socket().exists() {
            assert!(Instant::now() < deadline, "daemon socket never appeared");
            thread::sleep(Duration::from_millis(50));
        }
    }

    fn client(&self) -> AssertCommand {
        let mut cmd = AssertCommand::cargo_bin("skycam").unwrap();
        cmd.env("XDG_CONFIG_HOME", self.dir.path().join("config"))
            .arg("--socket")
            .arg(self.socket());
        cmd
    }

    fn terminate(mut self) -> std::process::ExitStatus {
        let pid = nix::unistd::Pid::from_raw(self.child.id() as i32);
        nix::sys::signal::kill(pid, nix::sys::signal::Signal::SIGTERM).unwrap();
        let status = self.child.wait().unwrap();
        assert!(!self.socket().exists(), "socket left behind after shutdown");
        status
    }
}

impl Drop for TestDaemon {
    fn drop(&mut self) {
        let _ = self.child.kill();
    }
}

#[test]
fn timed_recording_stops_itself() {
    let daemon = TestDaemon::start();

    let output = daemon
        .client()
        .args(["record", "start", "--name", "demo", "--duration", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("demo").and(predicate::str::contains(".mjpeg")))
        .get_output()
        .stdout
        .clone();
    let file = String::from_utf8_lossy(&output).trim().to_string();
    assert!(Path::new(&file).starts_with(daemon.media()));

    daemon
        .client()
        .args(["status", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"recording\": true"));

    thread::sleep(Duration::from_millis(3500));

    daemon
        .client()
        .args(["status", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"recording\": false"));
    assert!(Path::new(&file).exists());

    assert!(daemon.terminate().success());
}

#[test]
fn second_start_is_rejected() {
    let daemon = TestDaemon::start();

    daemon.client().args(["record", "start"]).assert().success();
    daemon
        .client()
        .args(["record", "start"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("already"));

    daemon
        .client()
        .args(["record", "stop"])
        .assert()
        .success()
        .stdout(predicate::str::contains(".mjpeg"));
    daemon
        .client()
        .args(["record", "stop"])
        .assert()
        .code(1);

    assert!(daemon.terminate().success());
}

#[test]
fn photo_lands_in_media_dir() {
    let daemon = TestDaemon::start();

    daemon
        .client()
        .args(["photo", "still.jpg"])
        .assert()
        .success()
        .stdout(predicate::str::ends_with("still.jpg\n"));
    assert!(daemon.media().join("media/photos/still.jpg").exists());

    let copy = daemon.media().join("copied.jpg");
    daemon
        .client()
        .args(["media", "still.jpg", "--output"])
        .arg(&copy)
        .assert()
        .success();
    assert_eq!(
        std::fs::read(&copy).unwrap(),
        std::fs::read(daemon.media().join("media/photos/still.jpg")).unwrap()
    );
    daemon
        .client()
        .args(["media", "../config"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Path escapes"));

    daemon
        .client()
        .arg("health")
        .assert()
        .success()
        .stdout(predicate::str::contains("software"));

    assert!(daemon.terminate().success());
}

#[test]
fn second_daemon_refuses_to_start() {
    let daemon = TestDaemon::start();

    Command::new(env!("CARGO_BIN_EXE_skycam"))
        .env("XDG_CONFIG_HOME", daemon.dir.path().join("config"))
        .env("PATH", daemon.dir.path().join("bin"))
        .arg("--socket")
        .arg(daemon.socket())
        .arg("serve")
        .arg("--pid-file")
        .arg(daemon.dir.path().join("skycam.pid"))
        .output()
        .map(|output| assert_eq!(output.status.code(), Some(1)))
        .unwrap();

    assert!(daemon.socket().exists());
    assert!(daemon.terminate().success());
}
