//! Forced release of a camera held by another process

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration as StdDuration;

use tokio::process::Command;
use tokio::time::{sleep, timeout};
use tracing::{info, warn};

/// Processes that commonly keep the camera open
pub const KNOWN_CAMERA_PROCESSES: &[&str] = &[
    "rpicam-vid",
    "rpicam-still",
    "libcamera-vid",
    "libcamera-still",
    "ffmpeg",
    "raspivid",
];

const FUSER_TIMEOUT: StdDuration = StdDuration::from_secs(3);
const KILLALL_TIMEOUT: StdDuration = StdDuration::from_secs(2);

/// Time for killed processes to let go of the device
const SETTLE: StdDuration = StdDuration::from_millis(500);

/// What a release attempt did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleaseOutcome {
    /// `fuser -k` killed whoever held the device
    DeviceFreed,
    /// Fell back to killing known camera processes by name
    KilledByName(Vec<String>),
    /// Nothing was running that we know how to stop
    NothingToRelease,
}

/// Kills processes holding the video device.
///
/// Never runs implicitly: the daemon calls it only when `release_camera`
/// is set, and `skycam release` on request.
pub struct CameraRelease {
    device: PathBuf,
    fuser: PathBuf,
    killall: PathBuf,
}

impl CameraRelease {
    pub fn new(device: impl Into<PathBuf>) -> Self {
        Self {
            device: device.into(),
            fuser: PathBuf::from("fuser"),
            killall: PathBuf::from("killall"),
        }
    }

    /// Use other `fuser` and `killall` executables
    pub fn with_tools(mut self, fuser: impl Into<PathBuf>, killall: impl Into<PathBuf>) -> Self {
        self.fuser = fuser.into();
        self.killall = killall.into();
        self
    }

    pub async fn release(&self) -> ReleaseOutcome {
        warn!(device = %self.device.display(), "forcing camera release");

        let device = self.device.to_string_lossy().to_string();
        if run(&self.fuser, &["-k", device.as_str()], FUSER_TIMEOUT).await {
            sleep(SETTLE).await;
            info!(device = %device, "camera released by fuser");
            return ReleaseOutcome::DeviceFreed;
        }

        let mut killed = Vec::new();
        for name in KNOWN_CAMERA_PROCESSES {
            if run(&self.killall, &[name], KILLALL_TIMEOUT).await {
                warn!(process = name, "killed camera process");
                killed.push(name.to_string());
            }
        }

        if killed.is_empty() {
            info!("no camera process to release");
            return ReleaseOutcome::NothingToRelease;
        }
        sleep(SETTLE).await;
        ReleaseOutcome::KilledByName(killed)
    }
}

/// Run a tool, true on a zero exit. Missing tools and timeouts read as false.
async fn run(program: &Path, args: &[&str], limit: StdDuration) -> bool {
    let child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn();

    let mut child = match child {
        Ok(child) => child,
        Err(e) => {
            warn!(program = %program.display(), error = %e, "cannot run release tool");
            return false;
        }
    };

    match timeout(limit, child.wait()).await {
        Ok(Ok(status)) => status.success(),
        Ok(Err(e)) => {
            warn!(program = %program.display(), error = %e, "release tool failed");
            false
        }
        Err(_) => {
            warn!(program = %program.display(), "release tool timed out");
            false
        }
    }
}
