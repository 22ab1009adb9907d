//! Caller-facing camera errors

use thiserror::Error;

use crate::domain::error::PathError;
use crate::domain::recording::RequestError;

/// The only failures a caller of the camera service ever sees.
/// Teardown and finalize problems degrade to warnings instead.
#[derive(Debug, Clone, Error)]
pub enum CameraError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("A recording is already in progress")]
    AlreadyRecording,

    #[error("No active recording")]
    NoActiveRecording,

    #[error("Recording unavailable: {0}")]
    RecordingUnavailable(String),

    #[error("No camera backend available: {0}")]
    NoBackendAvailable(String),

    #[error("No such media file: {0}")]
    MediaNotFound(String),
}

impl CameraError {
    /// Stable machine-readable code used on the wire
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "invalid_request",
            Self::AlreadyRecording => "already_recording",
            Self::NoActiveRecording => "no_active_recording",
            Self::RecordingUnavailable(_) => "recording_unavailable",
            Self::NoBackendAvailable(_) => "no_backend_available",
            Self::MediaNotFound(_) => "not_found",
        }
    }

    /// Whether the caller, not the environment, is at fault
    pub const fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidRequest(_)
                | Self::AlreadyRecording
                | Self::NoActiveRecording
                | Self::MediaNotFound(_)
        )
    }
}

impl From<RequestError> for CameraError {
    fn from(err: RequestError) -> Self {
        Self::InvalidRequest(err.to_string())
    }
}

impl From<PathError> for CameraError {
    fn from(err: PathError) -> Self {
        Self::InvalidRequest(err.to_string())
    }
}
