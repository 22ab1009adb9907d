//! Application layer - Use cases and port interfaces
//!
//! Contains the core business operations and trait definitions
//! for external system interactions.

pub mod capture;
pub mod controller;
pub mod error;
pub mod finalize;
pub mod ports;
pub mod service;

// Re-export use cases
pub use capture::{CapturedPhoto, PhotoCapture};
pub use controller::{RecordingController, StartedRecording, StoppedRecording};
pub use error::CameraError;
pub use finalize::{finalize, FinalizeOutcome, FinalizeWarning};
pub use service::{CameraService, HealthReport, MediaFile, StorageHealth};
