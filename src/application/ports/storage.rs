//! Media storage port interface

use std::path::PathBuf;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

/// Storage errors
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    #[error("No writable media directory: {0}")]
    Unavailable(String),

    #[error("Mount failed: {0}")]
    MountFailed(String),
}

/// Current writable media locations
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MediaRoot {
    pub photos: PathBuf,
    pub videos: PathBuf,
    /// True when the files land on removable media
    pub removable: bool,
}

/// Port for the storage provider.
///
/// The root may move between calls (USB stick plugged or pulled), so
/// callers ask again on every operation.
#[async_trait]
pub trait MediaStorage: Send + Sync {
    async fn media_root(&self) -> Result<MediaRoot, StorageError>;

    /// Flush pending writes to disk
    async fn sync(&self);
}
