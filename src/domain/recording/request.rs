//! Capture request value object

use crate::domain::error::{DurationParseError, PathError};
use crate::domain::media::sanitize_basename;

use super::Duration;

/// Why a request was refused before touching any backend
#[derive(Debug, Clone, thiserror::Error)]
pub enum RequestError {
    #[error(transparent)]
    Duration(#[from] DurationParseError),

    #[error(transparent)]
    Filename(#[from] PathError),
}

/// A validated start-recording request. Consumed once by the controller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptureRequest {
    basename: Option<String>,
    duration: Option<Duration>,
}

impl CaptureRequest {
    /// Validate raw boundary input.
    ///
    /// The basename is sanitized (any extension dropped) and the duration,
    /// when present, must be strictly positive.
    pub fn new(basename: Option<&str>, duration_secs: Option<i64>) -> Result<Self, RequestError> {
        let duration = duration_secs.map(Duration::from_signed_secs).transpose()?;
        let basename = basename.map(sanitize_basename).transpose()?;
        Ok(Self { basename, duration })
    }

    pub fn basename(&self) -> Option<&str> {
        self.basename.as_deref()
    }

    pub fn duration(&self) -> Option<Duration> {
        self.duration
    }
}
