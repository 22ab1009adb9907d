//! Port interfaces (traits) for external systems
//!
//! These traits define the boundaries between the application
//! and infrastructure layers.

pub mod backend;
pub mod broadcaster;
pub mod config;
pub mod remux;
pub mod storage;

// Re-export common types
pub use backend::{
    BackendError, CameraBackend, RecordingHandle, StopMethod, TeardownReport, TeardownWarning,
};
pub use broadcaster::{BroadcastError, RecorderEvent, StatusBroadcaster};
pub use config::ConfigStore;
pub use remux::{RemuxError, Remuxer};
pub use storage::{MediaRoot, MediaStorage, StorageError};
