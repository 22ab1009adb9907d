//! Domain layer - Core business logic
//!
//! Contains value objects, entities, and domain errors.
//! This layer has no dependencies on external systems.

pub mod backend;
pub mod config;
pub mod error;
pub mod media;
pub mod recording;

// Re-export common types
pub use backend::{BackendCapabilities, BackendKind, BackendShape, OutputKind};
pub use config::AppConfig;
pub use error::*;
pub use recording::{CaptureRequest, Duration, RecordingSession, RecordingState, RecordingStatus};
