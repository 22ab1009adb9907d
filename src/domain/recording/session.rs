//! Recording session state machine

use std::fmt;
use std::path::PathBuf;
use std::time::Instant;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::backend::BackendKind;

use super::status::RecordingStatus;

/// Recording states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordingState {
    #[default]
    Idle,
    Starting,
    Active,
    Stopping,
}

impl RecordingState {
    /// Get the string representation
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Starting => "starting",
            Self::Active => "active",
            Self::Stopping => "stopping",
        }
    }
}

impl fmt::Display for RecordingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error when an invalid state transition is attempted
#[derive(Debug, Clone, Error)]
#[error("Invalid state transition: cannot {action} while in {current_state} state")]
pub struct InvalidStateTransition {
    pub current_state: RecordingState,
    pub action: String,
}

/// What a backend reported once its session went live
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveRecording {
    pub backend: BackendKind,
    pub raw_path: PathBuf,
    pub final_path: PathBuf,
}

/// The single recording session owned by the controller.
///
/// State machine:
///   IDLE -> STARTING (begin_start)
///   STARTING -> ACTIVE (activate)
///   STARTING -> IDLE (abort_start, no backend came up)
///   ACTIVE -> STOPPING (begin_stop)
///   STOPPING -> IDLE (finish_stop)
///
/// Each start bumps a generation counter so a delayed auto-stop can tell
/// whether the session it was armed for is still the current one.
#[derive(Debug, Default)]
pub struct RecordingSession {
    state: RecordingState,
    generation: u64,
    live: Option<LiveRecording>,
    started_at: Option<DateTime<Local>>,
    started_instant: Option<Instant>,
    last_output: Option<PathBuf>,
}

impl RecordingSession {
    /// Create a new session in idle state
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the current state
    pub fn state(&self) -> RecordingState {
        self.state
    }

    /// Generation of the most recent start
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_idle(&self) -> bool {
        self.state == RecordingState::Idle
    }

    pub fn is_active(&self) -> bool {
        self.state == RecordingState::Active
    }

    /// The live recording, present in ACTIVE and STOPPING
    pub fn live(&self) -> Option<&LiveRecording> {
        self.live.as_ref()
    }

    fn invalid(&self, action: &str) -> InvalidStateTransition {
        InvalidStateTransition {
            current_state: self.state,
            action: action.to_string(),
        }
    }

    /// Transition from IDLE to STARTING, returning the new generation
    pub fn begin_start(&mut self) -> Result<u64, InvalidStateTransition> {
        if self.state != RecordingState::Idle {
            return Err(self.invalid("start recording"));
        }
        self.state = RecordingState::Starting;
        self.generation += 1;
        Ok(self.generation)
    }

    /// Transition from STARTING back to IDLE when no backend could start
    pub fn abort_start(&mut self) -> Result<(), InvalidStateTransition> {
        if self.state != RecordingState::Starting {
            return Err(self.invalid("abort start"));
        }
        self.reset();
        Ok(())
    }

    /// Transition from STARTING to ACTIVE
    pub fn activate(&mut self, live: LiveRecording) -> Result<(), InvalidStateTransition> {
        if self.state != RecordingState::Starting {
            return Err(self.invalid("activate recording"));
        }
        self.state = RecordingState::Active;
        self.live = Some(live);
        self.started_at = Some(Local::now());
        self.started_instant = Some(Instant::now());
        Ok(())
    }

    /// Transition from ACTIVE to STOPPING, returning the recording to tear down
    pub fn begin_stop(&mut self) -> Result<LiveRecording, InvalidStateTransition> {
        if self.state != RecordingState::Active {
            return Err(self.invalid("stop recording"));
        }
        let live = self
            .live
            .clone()
            .ok_or_else(|| self.invalid("stop recording"))?;
        self.state = RecordingState::Stopping;
        Ok(live)
    }

    /// Transition from STOPPING to IDLE, remembering the delivered file
    pub fn finish_stop(&mut self, output: PathBuf) -> Result<(), InvalidStateTransition> {
        if self.state != RecordingState::Stopping {
            return Err(self.invalid("finish stop"));
        }
        self.reset();
        self.last_output = Some(output);
        Ok(())
    }

    fn reset(&mut self) {
        self.state = RecordingState::Idle;
        self.live = None;
        self.started_at = None;
        self.started_instant = None;
    }

    /// Consistent read-only view of the session
    pub fn snapshot(&self) -> RecordingStatus {
        RecordingStatus {
            recording: self.state == RecordingState::Active,
            state: self.state,
            started_at: self.started_at,
            elapsed_secs: self
                .started_instant
                .map(|start| start.elapsed().as_secs_f64()),
            raw_file: self.live.as_ref().map(|l| l.raw_path.clone()),
            file: self.live.as_ref().map(|l| l.final_path.clone()),
            backend: self
                .live
                .as_ref()
                .map(|l| l.backend.as_str())
                .unwrap_or("none")
                .to_string(),
            backend_alive: None,
            last_file: self.last_output.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn live() -> LiveRecording {
        LiveRecording {
            backend: BackendKind::Libcamera,
            raw_path: PathBuf::from("/media/videos/demo.h264"),
            final_path: PathBuf::from("/media/videos/demo.mp4"),
        }
    }

    #[test]
    fn new_session_is_idle() {
        let session = RecordingSession::new();
        assert!(session.is_idle());
        assert_eq!(session.generation(), 0);
        assert!(session.live().is_none());
    }

    #[test]
    fn full_cycle() {
        let mut session = RecordingSession::new();
        let generation = session.begin_start().unwrap();
        assert_eq!(generation, 1);
        assert_eq!(session.state(), RecordingState::Starting);

        session.activate(live()).unwrap();
        assert!(session.is_active());

        let stopping = session.begin_stop().unwrap();
        assert_eq!(stopping, live());
        assert_eq!(session.state(), RecordingState::Stopping);

        session
            .finish_stop(PathBuf::from("/media/videos/demo.mp4"))
            .unwrap();
        assert!(session.is_idle());
        assert!(session.live().is_none());

        // Can start another cycle with a new generation
        assert_eq!(session.begin_start().unwrap(), 2);
    }

    #[test]
    fn start_while_not_idle_fails() {
        let mut session = RecordingSession::new();
        session.begin_start().unwrap();

        let err = session.begin_start().unwrap_err();
        assert_eq!(err.current_state, RecordingState::Starting);

        session.activate(live()).unwrap();
        let err = session.begin_start().unwrap_err();
        assert_eq!(err.current_state, RecordingState::Active);

        session.begin_stop().unwrap();
        let err = session.begin_start().unwrap_err();
        assert_eq!(err.current_state, RecordingState::Stopping);
    }

    #[test]
    fn stop_only_from_active() {
        let mut session = RecordingSession::new();
        assert!(session.begin_stop().is_err());

        session.begin_start().unwrap();
        assert!(session.begin_stop().is_err());

        session.activate(live()).unwrap();
        session.begin_stop().unwrap();
        let err = session.begin_stop().unwrap_err();
        assert_eq!(err.current_state, RecordingState::Stopping);
    }

    #[test]
    fn abort_start_returns_to_idle() {
        let mut session = RecordingSession::new();
        session.begin_start().unwrap();
        session.abort_start().unwrap();
        assert!(session.is_idle());

        assert!(session.abort_start().is_err());
    }

    #[test]
    fn activate_requires_starting() {
        let mut session = RecordingSession::new();
        let err = session.activate(live()).unwrap_err();
        assert_eq!(err.current_state, RecordingState::Idle);
    }

    #[test]
    fn snapshot_reflects_state() {
        let mut session = RecordingSession::new();
        let idle = session.snapshot();
        assert!(!idle.recording);
        assert_eq!(idle.backend, "none");
        assert!(idle.started_at.is_none());
        assert!(idle.elapsed_secs.is_none());

        session.begin_start().unwrap();
        session.activate(live()).unwrap();
        let active = session.snapshot();
        assert!(active.recording);
        assert_eq!(active.backend, "libcamera");
        assert!(active.started_at.is_some());
        assert_eq!(active.raw_file, Some(PathBuf::from("/media/videos/demo.h264")));
        assert_eq!(active.file, Some(PathBuf::from("/media/videos/demo.mp4")));

        session.begin_stop().unwrap();
        let stopping = session.snapshot();
        assert!(!stopping.recording);
        assert_eq!(stopping.state, RecordingState::Stopping);

        session.finish_stop(PathBuf::from("/media/videos/demo.mp4")).unwrap();
        let done = session.snapshot();
        assert!(done.file.is_none());
        assert_eq!(done.last_file, Some(PathBuf::from("/media/videos/demo.mp4")));
    }

    #[test]
    fn state_display() {
        assert_eq!(RecordingState::Idle.to_string(), "idle");
        assert_eq!(RecordingState::Starting.to_string(), "starting");
        assert_eq!(RecordingState::Active.to_string(), "active");
        assert_eq!(RecordingState::Stopping.to_string(), "stopping");
    }

    #[test]
    fn error_display() {
        let err = InvalidStateTransition {
            current_state: RecordingState::Stopping,
            action: "start recording".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("start recording"));
        assert!(msg.contains("stopping"));
    }
}
