//! Camera service: the explicit state handed to the boundary layer

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::domain::backend::BackendCapabilities;
use crate::domain::media::secure_join;
use crate::domain::recording::{CaptureRequest, RecordingState, RecordingStatus};

use super::capture::{CapturedPhoto, PhotoCapture};
use super::controller::{RecordingController, StartedRecording, StoppedRecording};
use super::error::CameraError;
use super::ports::{CameraBackend, MediaStorage, Remuxer, StatusBroadcaster};

/// Storage part of a health report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageHealth {
    pub available: bool,
    pub removable: bool,
    pub photos: Option<PathBuf>,
    pub videos: Option<PathBuf>,
    pub error: Option<String>,
}

/// Health report for monitoring
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    pub backends: BTreeMap<String, bool>,
    pub storage: StorageHealth,
    pub state: RecordingState,
}

/// A stored photo or recording
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaFile {
    pub file: PathBuf,
    pub size: u64,
}

/// Everything the request layer needs, created once at startup
pub struct CameraService {
    capabilities: BackendCapabilities,
    controller: RecordingController,
    photos: PhotoCapture,
    storage: Arc<dyn MediaStorage>,
    // Photos and recording starts contend for the same device
    camera: tokio::sync::Mutex<()>,
}

impl CameraService {
    /// `backends` must be ordered by priority
    pub fn new(
        capabilities: BackendCapabilities,
        backends: Vec<Arc<dyn CameraBackend>>,
        storage: Arc<dyn MediaStorage>,
        remuxer: Arc<dyn Remuxer>,
        broadcaster: Arc<dyn StatusBroadcaster>,
        fps: u32,
    ) -> Self {
        let controller = RecordingController::new(
            backends.clone(),
            Arc::clone(&storage),
            remuxer,
            Arc::clone(&broadcaster),
            fps,
        );
        let photos = PhotoCapture::new(backends, Arc::clone(&storage), broadcaster);
        Self {
            capabilities,
            controller,
            photos,
            storage,
            camera: tokio::sync::Mutex::new(()),
        }
    }

    pub fn capabilities(&self) -> &BackendCapabilities {
        &self.capabilities
    }

    /// Validate raw boundary input and start a recording
    pub async fn start_recording(
        &self,
        basename: Option<&str>,
        duration_secs: Option<i64>,
    ) -> Result<StartedRecording, CameraError> {
        let request = CaptureRequest::new(basename, duration_secs)?;
        let _camera = self.camera.lock().await;
        self.controller.start(request).await
    }

    pub async fn stop_recording(&self) -> Result<StoppedRecording, CameraError> {
        self.controller.stop().await
    }

    pub fn status(&self) -> RecordingStatus {
        self.controller.status()
    }

    /// Capture a still. Refused while a recording holds the camera.
    pub async fn capture_photo(&self, filename: Option<&str>) -> Result<CapturedPhoto, CameraError> {
        let _camera = self.camera.lock().await;
        if !self.controller.is_idle() {
            return Err(CameraError::AlreadyRecording);
        }
        self.photos.capture(filename).await
    }

    pub async fn health(&self) -> HealthReport {
        let storage = match self.storage.media_root().await {
            Ok(root) => StorageHealth {
                available: true,
                removable: root.removable,
                photos: Some(root.photos),
                videos: Some(root.videos),
                error: None,
            },
            Err(e) => StorageHealth {
                available: false,
                removable: false,
                photos: None,
                videos: None,
                error: Some(e.to_string()),
            },
        };

        HealthReport {
            backends: self
                .capabilities
                .summary()
                .into_iter()
                .map(|(name, available)| (name.to_string(), available))
                .collect(),
            storage,
            state: self.controller.status().state,
        }
    }

    /// Find a stored file by name under the current media root, videos
    /// first. Names may include subdirectories but never leave the root.
    pub async fn locate_media(&self, name: &str) -> Result<MediaFile, CameraError> {
        let root = self
            .storage
            .media_root()
            .await
            .map_err(|e| CameraError::MediaNotFound(format!("{} ({})", name, e)))?;

        let mut dirs = vec![root.videos];
        if !dirs.contains(&root.photos) {
            dirs.push(root.photos);
        }
        for dir in &dirs {
            let candidate = secure_join(dir, name)?;
            if let Some(size) = regular_file_within(dir, &candidate).await {
                return Ok(MediaFile {
                    file: candidate,
                    size,
                });
            }
        }
        Err(CameraError::MediaNotFound(name.to_string()))
    }

    pub async fn shutdown(&self) -> Option<StoppedRecording> {
        self.controller.shutdown().await
    }
}

/// Size of `path` if it is a regular file whose real location (symlinks
/// resolved) is still inside `dir`
async fn regular_file_within(dir: &Path, path: &Path) -> Option<u64> {
    let real_dir = fs::canonicalize(dir).await.ok()?;
    let real = fs::canonicalize(path).await.ok()?;
    if !real.starts_with(&real_dir) {
        return None;
    }
    let meta = fs::metadata(&real).await.ok()?;
    meta.is_file().then(|| meta.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{
        BackendError, BroadcastError, MediaRoot, RecorderEvent, RecordingHandle, RemuxError,
        StopMethod, StorageError, TeardownReport,
    };
    use crate::domain::backend::BackendKind;
    use async_trait::async_trait;
    use std::path::Path;
    use tempfile::TempDir;
    use tokio::fs;

    struct Pattern;
    struct PatternHandle;

    #[async_trait]
    impl RecordingHandle for PatternHandle {
        fn kind(&self) -> BackendKind {
            BackendKind::Software
        }

        fn is_alive(&mut self) -> bool {
            true
        }

        async fn teardown(&mut self) -> TeardownReport {
            TeardownReport::clean(StopMethod::Joined)
        }
    }

    #[async_trait]
    impl CameraBackend for Pattern {
        fn kind(&self) -> BackendKind {
            BackendKind::Software
        }

        async fn start_recording(
            &self,
            raw_path: &Path,
        ) -> Result<Box<dyn RecordingHandle>, BackendError> {
            fs::write(raw_path, b"frames").await.unwrap();
            Ok(Box::new(PatternHandle))
        }

        async fn capture_still(&self, output: &Path) -> Result<(), BackendError> {
            fs::write(output, b"jpeg").await.unwrap();
            Ok(())
        }
    }

    struct DirStorage(PathBuf);

    #[async_trait]
    impl MediaStorage for DirStorage {
        async fn media_root(&self) -> Result<MediaRoot, StorageError> {
            Ok(MediaRoot {
                photos: self.0.join("photos"),
                videos: self.0.clone(),
                removable: false,
            })
        }

        async fn sync(&self) {}
    }

    struct NoRemux;

    #[async_trait]
    impl Remuxer for NoRemux {
        fn is_available(&self) -> bool {
            false
        }

        async fn remux(&self, _raw: &Path, _target: &Path, _fps: u32) -> Result<(), RemuxError> {
            Err(RemuxError::Unavailable)
        }
    }

    struct Silent;

    impl StatusBroadcaster for Silent {
        fn publish(&self, _event: RecorderEvent) -> Result<(), BroadcastError> {
            Ok(())
        }
    }

    fn service(dir: &TempDir) -> CameraService {
        std::fs::create_dir_all(dir.path().join("photos")).unwrap();
        let caps = BackendCapabilities {
            software: true,
            ..BackendCapabilities::none()
        };
        CameraService::new(
            caps,
            vec![Arc::new(Pattern)],
            Arc::new(DirStorage(dir.path().to_path_buf())),
            Arc::new(NoRemux),
            Arc::new(Silent),
            10,
        )
    }

    #[tokio::test]
    async fn invalid_duration_is_rejected_before_start() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir);
        for bad in [0, -5] {
            let err = service.start_recording(None, Some(bad)).await.unwrap_err();
            assert_eq!(err.kind(), "invalid_request");
        }
        assert!(!service.status().recording);
    }

    #[tokio::test]
    async fn photo_refused_while_recording() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir);
        service.start_recording(Some("demo"), None).await.unwrap();

        let err = service.capture_photo(None).await.unwrap_err();
        assert!(matches!(err, CameraError::AlreadyRecording));

        service.stop_recording().await.unwrap();
        let photo = service.capture_photo(Some("after")).await.unwrap();
        assert_eq!(photo.file, dir.path().join("photos").join("after.jpg"));
    }

    #[tokio::test]
    async fn health_lists_backends_and_storage() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir);
        let health = service.health().await;

        assert_eq!(health.backends.get("software"), Some(&true));
        assert_eq!(health.backends.get("v4l2"), Some(&false));
        assert_eq!(health.backends.len(), 4);
        assert!(health.storage.available);
        assert_eq!(health.state, RecordingState::Idle);
    }

    #[tokio::test]
    async fn media_is_found_in_videos_then_photos() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir);
        service.start_recording(Some("clip"), None).await.unwrap();
        service.stop_recording().await.unwrap();
        service.capture_photo(Some("still.png")).await.unwrap();

        let video = service.locate_media("clip.mjpeg").await.unwrap();
        assert_eq!(video.file, dir.path().join("clip.mjpeg"));
        assert_eq!(video.size, 6);

        let photo = service.locate_media("still.png").await.unwrap();
        assert_eq!(photo.file, dir.path().join("photos").join("still.png"));
        assert_eq!(photo.size, 4);
    }

    #[tokio::test]
    async fn media_lookup_rejects_escapes_and_misses() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir);

        let err = service.locate_media("../etc/passwd").await.unwrap_err();
        assert_eq!(err.kind(), "invalid_request");

        let err = service.locate_media("photos").await.unwrap_err();
        assert_eq!(err.kind(), "not_found");

        let err = service.locate_media("missing.mp4").await.unwrap_err();
        assert!(matches!(err, CameraError::MediaNotFound(ref name) if name == "missing.mp4"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn media_symlink_out_of_root_is_not_served() {
        let dir = TempDir::new().unwrap();
        let outside = TempDir::new().unwrap();
        std::fs::write(outside.path().join("secret"), b"x").unwrap();
        std::os::unix::fs::symlink(outside.path().join("secret"), dir.path().join("link.mp4"))
            .unwrap();

        let service = service(&dir);
        let err = service.locate_media("link.mp4").await.unwrap_err();
        assert_eq!(err.kind(), "not_found");
    }
}
