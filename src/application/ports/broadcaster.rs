//! Status broadcaster port interface

use std::path::PathBuf;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Broadcast errors
#[derive(Debug, Clone, Error)]
pub enum BroadcastError {
    #[error("No observers connected")]
    NoObservers,

    #[error("Broadcast failed: {0}")]
    Failed(String),
}

/// Events emitted at controller transitions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RecorderEvent {
    RecordingStarted {
        backend: String,
        file: PathBuf,
        raw_file: PathBuf,
        started_at: DateTime<Local>,
    },
    RecordingStopping {
        backend: String,
    },
    RecordingStopped {
        backend: String,
        file: PathBuf,
        finalized: bool,
    },
    FinalizeWarning {
        raw_file: PathBuf,
        reason: String,
    },
    PhotoCaptured {
        backend: String,
        file: PathBuf,
    },
}

impl RecorderEvent {
    /// Event name as it appears on the wire
    pub const fn name(&self) -> &'static str {
        match self {
            Self::RecordingStarted { .. } => "recording_started",
            Self::RecordingStopping { .. } => "recording_stopping",
            Self::RecordingStopped { .. } => "recording_stopped",
            Self::FinalizeWarning { .. } => "finalize_warning",
            Self::PhotoCaptured { .. } => "photo_captured",
        }
    }
}

/// Port for fanning out controller events.
///
/// Fire-and-forget: callers log a failed publish and carry on.
pub trait StatusBroadcaster: Send + Sync {
    fn publish(&self, event: RecorderEvent) -> Result<(), BroadcastError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_are_tagged() {
        let event = RecorderEvent::RecordingStopping {
            backend: "software".to_string(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "recording_stopping");
        assert_eq!(json["backend"], "software");
        assert_eq!(event.name(), "recording_stopping");
    }

    #[test]
    fn stopped_event_parses() {
        let line = r#"{"event":"recording_stopped","backend":"ffmpeg","file":"/m/v.mp4","finalized":true}"#;
        let event: RecorderEvent = serde_json::from_str(line).unwrap();
        assert_eq!(
            event,
            RecorderEvent::RecordingStopped {
                backend: "ffmpeg".to_string(),
                file: PathBuf::from("/m/v.mp4"),
                finalized: true,
            }
        );
    }
}
