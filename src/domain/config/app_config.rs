//! Application configuration value object

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::recording::Duration;

pub const DEFAULT_VIDEO_DEVICE: &str = "/dev/video0";
pub const DEFAULT_WIDTH: u32 = 1280;
pub const DEFAULT_HEIGHT: u32 = 720;
pub const DEFAULT_FPS: u32 = 30;
pub const DEFAULT_USB_MOUNT_POINT: &str = "/mnt/usb";
pub const DEFAULT_USB_DEVICE: &str = "/dev/sda1";

/// Camera device section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VideoConfig {
    pub device: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub fps: Option<u32>,
}

/// Media storage section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    pub media_dir: Option<String>,
    pub usb_mount_point: Option<String>,
    pub usb_device: Option<String>,
    pub auto_mount: Option<bool>,
}

/// Resolved camera parameters handed to backends
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraSettings {
    pub device: PathBuf,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            device: PathBuf::from(DEFAULT_VIDEO_DEVICE),
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            fps: DEFAULT_FPS,
        }
    }
}

/// Resolved storage parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageSettings {
    pub media_dir: PathBuf,
    pub usb_mount_point: PathBuf,
    pub usb_device: PathBuf,
    pub auto_mount: bool,
}

/// Application configuration.
/// All fields are optional to support partial configs and merging.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub transcode_timeout: Option<String>,
    pub software_fallback: Option<bool>,
    pub release_camera: Option<bool>,
    pub video: Option<VideoConfig>,
    pub storage: Option<StorageConfig>,
}

impl AppConfig {
    /// Create config with default values
    pub fn defaults() -> Self {
        Self {
            transcode_timeout: Some("60s".to_string()),
            software_fallback: Some(true),
            release_camera: Some(false),
            video: Some(VideoConfig {
                device: Some(DEFAULT_VIDEO_DEVICE.to_string()),
                width: Some(DEFAULT_WIDTH),
                height: Some(DEFAULT_HEIGHT),
                fps: Some(DEFAULT_FPS),
            }),
            storage: Some(StorageConfig {
                media_dir: None,
                usb_mount_point: Some(DEFAULT_USB_MOUNT_POINT.to_string()),
                usb_device: Some(DEFAULT_USB_DEVICE.to_string()),
                auto_mount: Some(false),
            }),
        }
    }

    /// Create an empty config (all None)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Merge this config with another, where other takes precedence.
    /// Only non-None values from other will override this.
    pub fn merge(self, other: Self) -> Self {
        Self {
            transcode_timeout: other.transcode_timeout.or(self.transcode_timeout),
            software_fallback: other.software_fallback.or(self.software_fallback),
            release_camera: other.release_camera.or(self.release_camera),
            video: Self::merge_video(self.video, other.video),
            storage: Self::merge_storage(self.storage, other.storage),
        }
    }

    fn merge_video(base: Option<VideoConfig>, other: Option<VideoConfig>) -> Option<VideoConfig> {
        match (base, other) {
            (None, None) => None,
            (Some(b), None) => Some(b),
            (None, Some(o)) => Some(o),
            (Some(b), Some(o)) => Some(VideoConfig {
                device: o.device.or(b.device),
                width: o.width.or(b.width),
                height: o.height.or(b.height),
                fps: o.fps.or(b.fps),
            }),
        }
    }

    fn merge_storage(
        base: Option<StorageConfig>,
        other: Option<StorageConfig>,
    ) -> Option<StorageConfig> {
        match (base, other) {
            (None, None) => None,
            (Some(b), None) => Some(b),
            (None, Some(o)) => Some(o),
            (Some(b), Some(o)) => Some(StorageConfig {
                media_dir: o.media_dir.or(b.media_dir),
                usb_mount_point: o.usb_mount_point.or(b.usb_mount_point),
                usb_device: o.usb_device.or(b.usb_device),
                auto_mount: o.auto_mount.or(b.auto_mount),
            }),
        }
    }

    /// Mutable access to the video section, creating it if absent
    pub fn video_mut(&mut self) -> &mut VideoConfig {
        self.video.get_or_insert_with(VideoConfig::default)
    }

    /// Mutable access to the storage section, creating it if absent
    pub fn storage_mut(&mut self) -> &mut StorageConfig {
        self.storage.get_or_insert_with(StorageConfig::default)
    }

    /// Get transcode timeout, or 60s if not set/invalid
    pub fn transcode_timeout_or_default(&self) -> Duration {
        self.transcode_timeout
            .as_ref()
            .and_then(|s| s.parse().ok())
            .unwrap_or_else(Duration::default_transcode_timeout)
    }

    /// Get software fallback setting, or true if not set
    pub fn software_fallback_or_default(&self) -> bool {
        self.software_fallback.unwrap_or(true)
    }

    /// Get release camera setting, or false if not set
    pub fn release_camera_or_default(&self) -> bool {
        self.release_camera.unwrap_or(false)
    }

    /// Resolve camera parameters. Zero dimensions or rates fall back to defaults.
    pub fn camera_settings(&self) -> CameraSettings {
        let defaults = CameraSettings::default();
        let video = self.video.clone().unwrap_or_default();
        CameraSettings {
            device: video.device.map(PathBuf::from).unwrap_or(defaults.device),
            width: video.width.filter(|w| *w > 0).unwrap_or(defaults.width),
            height: video.height.filter(|h| *h > 0).unwrap_or(defaults.height),
            fps: video.fps.filter(|f| *f > 0).unwrap_or(defaults.fps),
        }
    }

    /// Resolve storage parameters, using `default_media_dir` when unset
    pub fn storage_settings(&self, default_media_dir: &Path) -> StorageSettings {
        let storage = self.storage.clone().unwrap_or_default();
        StorageSettings {
            media_dir: storage
                .media_dir
                .map(PathBuf::from)
                .unwrap_or_else(|| default_media_dir.to_path_buf()),
            usb_mount_point: PathBuf::from(
                storage
                    .usb_mount_point
                    .as_deref()
                    .unwrap_or(DEFAULT_USB_MOUNT_POINT),
            ),
            usb_device: PathBuf::from(
                storage.usb_device.as_deref().unwrap_or(DEFAULT_USB_DEVICE),
            ),
            auto_mount: storage.auto_mount.unwrap_or(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_have_expected_values() {
        let config = AppConfig::defaults();
        assert_eq!(config.transcode_timeout, Some("60s".to_string()));
        assert_eq!(config.software_fallback, Some(true));
        assert_eq!(config.release_camera, Some(false));

        let video = config.video.as_ref().unwrap();
        assert_eq!(video.device.as_deref(), Some("/dev/video0"));
        assert_eq!(video.width, Some(1280));
        assert_eq!(video.height, Some(720));
        assert_eq!(video.fps, Some(30));

        let storage = config.storage.as_ref().unwrap();
        assert!(storage.media_dir.is_none());
        assert_eq!(storage.usb_mount_point.as_deref(), Some("/mnt/usb"));
        assert_eq!(storage.auto_mount, Some(false));
    }

    #[test]
    fn empty_has_all_none() {
        let config = AppConfig::empty();
        assert!(config.transcode_timeout.is_none());
        assert!(config.software_fallback.is_none());
        assert!(config.video.is_none());
        assert!(config.storage.is_none());
    }

    #[test]
    fn merge_other_takes_precedence() {
        let base = AppConfig {
            transcode_timeout: Some("30s".to_string()),
            software_fallback: Some(true),
            ..Default::default()
        };
        let other = AppConfig {
            transcode_timeout: None,
            software_fallback: Some(false),
            ..Default::default()
        };

        let merged = base.merge(other);
        assert_eq!(merged.transcode_timeout, Some("30s".to_string()));
        assert_eq!(merged.software_fallback, Some(false));
    }

    #[test]
    fn merge_video_fields_individually() {
        let base = AppConfig {
            video: Some(VideoConfig {
                device: Some("/dev/video0".to_string()),
                width: Some(1280),
                ..Default::default()
            }),
            ..Default::default()
        };
        let other = AppConfig {
            video: Some(VideoConfig {
                width: Some(640),
                fps: Some(15),
                ..Default::default()
            }),
            ..Default::default()
        };

        let settings = base.merge(other).camera_settings();
        assert_eq!(settings.device, PathBuf::from("/dev/video0"));
        assert_eq!(settings.width, 640);
        assert_eq!(settings.height, DEFAULT_HEIGHT);
        assert_eq!(settings.fps, 15);
    }

    #[test]
    fn merge_storage_preserves_base() {
        let base = AppConfig {
            storage: Some(StorageConfig {
                media_dir: Some("/srv/media".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let merged = base.merge(AppConfig::empty());
        let settings = merged.storage_settings(Path::new("/unused"));
        assert_eq!(settings.media_dir, PathBuf::from("/srv/media"));
    }

    #[test]
    fn camera_settings_zero_falls_back() {
        let config = AppConfig {
            video: Some(VideoConfig {
                fps: Some(0),
                width: Some(0),
                ..Default::default()
            }),
            ..Default::default()
        };
        let settings = config.camera_settings();
        assert_eq!(settings.fps, DEFAULT_FPS);
        assert_eq!(settings.width, DEFAULT_WIDTH);
    }

    #[test]
    fn storage_settings_uses_fallback_media_dir() {
        let settings = AppConfig::empty().storage_settings(Path::new("/var/lib/skycam"));
        assert_eq!(settings.media_dir, PathBuf::from("/var/lib/skycam"));
        assert_eq!(settings.usb_mount_point, PathBuf::from("/mnt/usb"));
        assert_eq!(settings.usb_device, PathBuf::from("/dev/sda1"));
        assert!(!settings.auto_mount);
    }

    #[test]
    fn transcode_timeout_or_default_parses() {
        let config = AppConfig {
            transcode_timeout: Some("2m".to_string()),
            ..Default::default()
        };
        assert_eq!(config.transcode_timeout_or_default().as_secs(), 120);
    }

    #[test]
    fn transcode_timeout_or_default_uses_default_on_invalid() {
        let config = AppConfig {
            transcode_timeout: Some("soon".to_string()),
            ..Default::default()
        };
        assert_eq!(config.transcode_timeout_or_default().as_secs(), 60);
    }

    #[test]
    fn boolean_defaults() {
        let config = AppConfig::empty();
        assert!(config.software_fallback_or_default());
        assert!(!config.release_camera_or_default());
    }

    #[test]
    fn section_accessors_create_missing_sections() {
        let mut config = AppConfig::empty();
        config.video_mut().fps = Some(24);
        config.storage_mut().auto_mount = Some(true);
        assert_eq!(config.camera_settings().fps, 24);
        assert!(config.storage_settings(Path::new("/m")).auto_mount);
    }
}
