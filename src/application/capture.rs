//! Still-photo capture with ordered backend fallback

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Local;
use tokio::fs;
use tracing::{debug, info, warn};

use crate::domain::backend::BackendKind;
use crate::domain::media::{sanitize_photo_name, secure_join, timestamped_basename, PHOTO_EXTENSIONS};

use super::error::CameraError;
use super::ports::{CameraBackend, MediaStorage, RecorderEvent, StatusBroadcaster};

/// A photo that was written to disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedPhoto {
    pub backend: BackendKind,
    pub file: PathBuf,
}

/// Stateless photo use case: the first backend that delivers a non-empty
/// file wins.
pub struct PhotoCapture {
    backends: Vec<Arc<dyn CameraBackend>>,
    storage: Arc<dyn MediaStorage>,
    broadcaster: Arc<dyn StatusBroadcaster>,
}

impl PhotoCapture {
    pub fn new(
        backends: Vec<Arc<dyn CameraBackend>>,
        storage: Arc<dyn MediaStorage>,
        broadcaster: Arc<dyn StatusBroadcaster>,
    ) -> Self {
        Self {
            backends,
            storage,
            broadcaster,
        }
    }

    /// Resolve the output path for an optional requested name
    async fn resolve(&self, filename: Option<&str>) -> Result<PathBuf, CameraError> {
        let name = match filename {
            Some(name) => sanitize_photo_name(name)?,
            None => format!(
                "{}.{}",
                timestamped_basename("photo", Local::now()),
                PHOTO_EXTENSIONS[0]
            ),
        };
        let root = self
            .storage
            .media_root()
            .await
            .map_err(|e| CameraError::NoBackendAvailable(e.to_string()))?;
        Ok(secure_join(&root.photos, &name)?)
    }

    pub async fn capture(&self, filename: Option<&str>) -> Result<CapturedPhoto, CameraError> {
        let output = self.resolve(filename).await?;

        if self.backends.is_empty() {
            return Err(CameraError::NoBackendAvailable(
                "no capture backend available".to_string(),
            ));
        }

        let mut failures = Vec::new();
        for backend in &self.backends {
            let kind = backend.kind();
            debug!(backend = %kind, path = %output.display(), "capturing photo");

            let result = match backend.capture_still(&output).await {
                Ok(()) => {
                    if has_content(&output).await {
                        Ok(())
                    } else {
                        Err("no image written".to_string())
                    }
                }
                Err(e) => Err(e.to_string()),
            };

            match result {
                Ok(()) => {
                    self.storage.sync().await;
                    info!(backend = %kind, file = %output.display(), "photo captured");
                    if let Err(e) = self.broadcaster.publish(RecorderEvent::PhotoCaptured {
                        backend: kind.to_string(),
                        file: output.clone(),
                    }) {
                        debug!(error = %e, "photo event not delivered");
                    }
                    return Ok(CapturedPhoto {
                        backend: kind,
                        file: output,
                    });
                }
                Err(reason) => {
                    warn!(backend = %kind, error = %reason, "photo capture failed, trying next");
                    remove_leftover(&output).await;
                    failures.push(format!("{}: {}", kind, reason));
                }
            }
        }

        Err(CameraError::NoBackendAvailable(failures.join("; ")))
    }
}

async fn has_content(path: &Path) -> bool {
    fs::metadata(path)
        .await
        .map(|m| m.len() > 0)
        .unwrap_or(false)
}

async fn remove_leftover(path: &Path) {
    if fs::metadata(path).await.is_ok() {
        if let Err(e) = fs::remove_file(path).await {
            debug!(path = %path.display(), error = %e, "could not remove failed capture output");
        }
    }
}
