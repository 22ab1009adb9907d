//! Backend availability detection

use std::env;
use std::ffi::OsString;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::domain::backend::{BackendCapabilities, LibcameraTools};

/// `rpicam-*` replaced `libcamera-*` on newer Raspberry Pi OS releases
const LIBCAMERA_FAMILIES: [(&str, &str); 2] = [
    ("rpicam-vid", "rpicam-still"),
    ("libcamera-vid", "libcamera-still"),
];

/// Detects which capture backends exist on this host.
///
/// Every check is a lookup that cannot fail loudly: a missing tool or
/// device simply reads as unavailable.
#[derive(Debug, Clone)]
pub struct BackendDetector {
    search_path: Option<OsString>,
    device: PathBuf,
    software_fallback: bool,
}

impl BackendDetector {
    /// Search the process `PATH`
    pub fn new(device: impl Into<PathBuf>, software_fallback: bool) -> Self {
        Self {
            search_path: env::var_os("PATH"),
            device: device.into(),
            software_fallback,
        }
    }

    /// Use a custom search path instead of `PATH`
    pub fn with_search_path(mut self, path: impl Into<OsString>) -> Self {
        self.search_path = Some(path.into());
        self
    }

    /// Resolve an executable by name on the search path
    pub fn find_tool(&self, name: &str) -> Option<PathBuf> {
        let search_path = self.search_path.as_ref()?;
        env::split_paths(search_path)
            .map(|dir| dir.join(name))
            .find(|candidate| is_executable(candidate))
    }

    fn find_libcamera(&self) -> Option<LibcameraTools> {
        LIBCAMERA_FAMILIES.iter().find_map(|(vid, still)| {
            Some(LibcameraTools {
                vid: self.find_tool(vid)?,
                still: self.find_tool(still)?,
            })
        })
    }

    fn has_v4l2(&self) -> bool {
        cfg!(feature = "v4l2") && self.device.exists()
    }

    pub fn detect(&self) -> BackendCapabilities {
        let caps = BackendCapabilities {
            v4l2: self.has_v4l2(),
            libcamera: self.find_libcamera(),
            ffmpeg: self.find_tool("ffmpeg"),
            software: self.software_fallback,
        };
        info!(
            v4l2 = caps.v4l2,
            libcamera = ?caps.libcamera.as_ref().map(|t| t.vid.display().to_string()),
            ffmpeg = ?caps.ffmpeg.as_ref().map(|p| p.display().to_string()),
            software = caps.software,
            "detected capture backends"
        );
        caps
    }
}

fn is_executable(path: &Path) -> bool {
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::backend::BackendKind;
    use std::fs;
    use tempfile::TempDir;

    fn install(dir: &Path, name: &str, mode: u32) {
        let path = dir.join(name);
        fs::write(&path, "#!/bin/sh\n").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(mode)).unwrap();
    }

    fn detector(dir: &TempDir, software: bool) -> BackendDetector {
        BackendDetector::new(dir.path().join("video0"), software).with_search_path(dir.path())
    }

    #[test]
    fn empty_path_finds_only_software() {
        let dir = TempDir::new().unwrap();
        let caps = detector(&dir, true).detect();
        assert_eq!(caps.available(), vec![BackendKind::Software]);
    }

    #[test]
    fn nothing_when_fallback_disabled() {
        let dir = TempDir::new().unwrap();
        assert!(!detector(&dir, false).detect().any());
    }

    #[test]
    fn finds_ffmpeg() {
        let dir = TempDir::new().unwrap();
        install(dir.path(), "ffmpeg", 0o755);
        let caps = detector(&dir, false).detect();
        assert_eq!(caps.ffmpeg, Some(dir.path().join("ffmpeg")));
        assert_eq!(caps.remux_tool(), Some(dir.path().join("ffmpeg").as_path()));
    }

    #[test]
    fn ignores_non_executable_files() {
        let dir = TempDir::new().unwrap();
        install(dir.path(), "ffmpeg", 0o644);
        assert!(detector(&dir, false).detect().ffmpeg.is_none());
    }

    #[test]
    fn prefers_rpicam_tools() {
        let dir = TempDir::new().unwrap();
        for tool in ["rpicam-vid", "rpicam-still", "libcamera-vid", "libcamera-still"] {
            install(dir.path(), tool, 0o755);
        }
        let tools = detector(&dir, false).detect().libcamera.unwrap();
        assert_eq!(tools.vid, dir.path().join("rpicam-vid"));
        assert_eq!(tools.still, dir.path().join("rpicam-still"));
    }

    #[test]
    fn libcamera_needs_both_tools() {
        let dir = TempDir::new().unwrap();
        install(dir.path(), "libcamera-vid", 0o755);
        assert!(detector(&dir, false).detect().libcamera.is_none());

        install(dir.path(), "libcamera-still", 0o755);
        let tools = detector(&dir, false).detect().libcamera.unwrap();
        assert_eq!(tools.vid, dir.path().join("libcamera-vid"));
    }

    #[test]
    fn missing_device_means_no_v4l2() {
        let dir = TempDir::new().unwrap();
        assert!(!detector(&dir, false).detect().v4l2);
    }
}
