//! Status snapshot reported to observers

use std::path::PathBuf;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use super::RecordingState;

/// Point-in-time view of the recorder. Never an error: idle is a normal value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecordingStatus {
    /// True only while frames are being captured (ACTIVE)
    pub recording: bool,
    pub state: RecordingState,
    pub started_at: Option<DateTime<Local>>,
    pub elapsed_secs: Option<f64>,
    pub raw_file: Option<PathBuf>,
    pub file: Option<PathBuf>,
    /// Backend name, `none` when idle
    pub backend: String,
    /// Liveness of the backend process/session when it could be checked
    /// without waiting
    pub backend_alive: Option<bool>,
    /// File delivered by the most recent stop
    pub last_file: Option<PathBuf>,
}

impl RecordingStatus {
    /// Elapsed time rendered as whole seconds, for display
    pub fn elapsed_whole_secs(&self) -> Option<u64> {
        self.elapsed_secs.map(|s| s.max(0.0) as u64)
    }
}
