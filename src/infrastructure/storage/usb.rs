//! Media storage on a USB stick when mounted, local directory otherwise

use std::env;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use tokio::fs;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::application::ports::{MediaRoot, MediaStorage, StorageError};
use crate::domain::config::StorageSettings;

/// Directory on the stick that holds photos and videos
pub const USB_MEDIA_SUBDIR: &str = "Movies";

/// Overrides the local media directory
pub const MEDIA_DIR_ENV: &str = "SKYCAM_MEDIA_DIR";

const PROC_MOUNTS: &str = "/proc/mounts";
const MOUNT_TIMEOUT: StdDuration = StdDuration::from_secs(15);

/// Local media directory used when none is configured
pub fn default_media_dir() -> PathBuf {
    if let Some(dir) = env::var_os(MEDIA_DIR_ENV).filter(|d| !d.is_empty()) {
        return PathBuf::from(dir);
    }
    dirs::data_local_dir()
        .map(|d| d.join("skycam").join("media"))
        .unwrap_or_else(|| PathBuf::from("media"))
}

/// `/proc/mounts` escapes whitespace in paths as octal sequences
fn unescape_mount_field(field: &str) -> String {
    field
        .replace("\\040", " ")
        .replace("\\011", "\t")
        .replace("\\012", "\n")
        .replace("\\134", "\\")
}

fn is_listed(mounts: &str, mount_point: &Path) -> bool {
    mounts.lines().any(|line| {
        line.split_whitespace()
            .nth(1)
            .is_some_and(|target| Path::new(&unescape_mount_field(target)) == mount_point)
    })
}

pub struct UsbMediaStorage {
    settings: StorageSettings,
    mounts_file: PathBuf,
    mounted_by_us: AtomicBool,
}

impl UsbMediaStorage {
    pub fn new(settings: StorageSettings) -> Self {
        Self {
            settings,
            mounts_file: PathBuf::from(PROC_MOUNTS),
            mounted_by_us: AtomicBool::new(false),
        }
    }

    /// Read mounts from another file instead of `/proc/mounts`
    pub fn with_mounts_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.mounts_file = path.into();
        self
    }

    pub fn settings(&self) -> &StorageSettings {
        &self.settings
    }

    /// Whether the USB mount point is currently mounted
    pub async fn usb_mounted(&self) -> bool {
        match fs::read_to_string(&self.mounts_file).await {
            Ok(mounts) => is_listed(&mounts, &self.settings.usb_mount_point),
            Err(e) => {
                debug!(path = %self.mounts_file.display(), error = %e, "cannot read mount table");
                false
            }
        }
    }

    /// Mount the stick if `auto_mount` is set and it is not mounted yet.
    ///
    /// Returns whether this call mounted it.
    pub async fn auto_mount(&self) -> Result<bool, StorageError> {
        if !self.settings.auto_mount || self.usb_mounted().await {
            return Ok(false);
        }

        let mount_point = &self.settings.usb_mount_point;
        fs::create_dir_all(mount_point)
            .await
            .map_err(|e| StorageError::MountFailed(format!("{}: {}", mount_point.display(), e)))?;

        let device = self.settings.usb_device.to_string_lossy().to_string();
        let target = mount_point.to_string_lossy().to_string();
        run_tool("mount", &[device.as_str(), target.as_str()]).await?;

        self.mounted_by_us.store(true, Ordering::SeqCst);
        info!(device = %device, mount_point = %target, "USB storage mounted");
        Ok(true)
    }

    /// Unmount the stick, but only if `auto_mount` mounted it
    pub async fn unmount_if_mounted(&self) {
        if !self.mounted_by_us.swap(false, Ordering::SeqCst) {
            return;
        }
        self.sync().await;

        let target = self.settings.usb_mount_point.to_string_lossy().to_string();
        match run_tool("umount", &[target.as_str()]).await {
            Ok(()) => info!(mount_point = %target, "USB storage unmounted"),
            Err(e) => warn!(mount_point = %target, error = %e, "unmount failed"),
        }
    }

    async fn removable_root(&self) -> Option<MediaRoot> {
        if !self.usb_mounted().await {
            return None;
        }
        let dir = self.settings.usb_mount_point.join(USB_MEDIA_SUBDIR);
        match fs::create_dir_all(&dir).await {
            Ok(()) => Some(MediaRoot {
                photos: dir.clone(),
                videos: dir,
                removable: true,
            }),
            Err(e) => {
                warn!(path = %dir.display(), error = %e, "USB storage not writable, using local media dir");
                None
            }
        }
    }

    async fn local_root(&self) -> Result<MediaRoot, StorageError> {
        let photos = self.settings.media_dir.join("photos");
        let videos = self.settings.media_dir.join("videos");
        for dir in [&photos, &videos] {
            fs::create_dir_all(dir)
                .await
                .map_err(|e| StorageError::Unavailable(format!("{}: {}", dir.display(), e)))?;
        }
        Ok(MediaRoot {
            photos,
            videos,
            removable: false,
        })
    }
}

async fn run_tool(program: &str, args: &[&str]) -> Result<(), StorageError> {
    let child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| StorageError::MountFailed(format!("{}: {}", program, e)))?;

    let output = timeout(MOUNT_TIMEOUT, child.wait_with_output())
        .await
        .map_err(|_| StorageError::MountFailed(format!("{} timed out", program)))?
        .map_err(|e| StorageError::MountFailed(e.to_string()))?;

    if output.status.success() {
        Ok(())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        Err(StorageError::MountFailed(if stderr.is_empty() {
            format!("{} exited with {}", program, output.status)
        } else {
            stderr
        }))
    }
}

#[async_trait]
impl MediaStorage for UsbMediaStorage {
    async fn media_root(&self) -> Result<MediaRoot, StorageError> {
        match self.removable_root().await {
            Some(root) => Ok(root),
            None => self.local_root().await,
        }
    }

    async fn sync(&self) {
        let _ = tokio::task::spawn_blocking(nix::unistd::sync).await;
    }
}
