//! Capture backend port interfaces

use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::backend::BackendKind;

/// Backend errors. Every variant is an operation-time failure that makes the
/// caller move on to the next backend.
#[derive(Debug, Clone, Error)]
pub enum BackendError {
    #[error("{0} not found")]
    ToolNotFound(String),

    #[error("Failed to start: {0}")]
    StartFailed(String),

    #[error("Exited during startup: {0}")]
    ExitedEarly(String),

    #[error("Device error: {0}")]
    Device(String),

    #[error("Capture failed: {0}")]
    CaptureFailed(String),

    #[error("Timed out after {0}s")]
    Timeout(u64),

    #[error("I/O error: {0}")]
    Io(String),
}

/// How a teardown finally ended the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopMethod {
    /// Process had already exited before any signal
    AlreadyExited,
    Interrupt,
    Terminate,
    Kill,
    /// Native session stopped and closed
    Closed,
    /// Capture worker thread joined
    Joined,
    /// Nothing confirmed the session ended
    Abandoned,
}

impl StopMethod {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::AlreadyExited => "already-exited",
            Self::Interrupt => "interrupt",
            Self::Terminate => "terminate",
            Self::Kill => "kill",
            Self::Closed => "closed",
            Self::Joined => "joined",
            Self::Abandoned => "abandoned",
        }
    }
}

/// A teardown step that partially failed. The session is released anyway.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TeardownWarning {
    #[error("Failed to send {signal}: {reason}")]
    SignalFailed { signal: &'static str, reason: String },

    #[error("Process did not exit within the wait after {0}")]
    WaitTimedOut(&'static str),

    #[error("Stop step failed: {0}")]
    StopFailed(String),

    #[error("Close step failed: {0}")]
    CloseFailed(String),

    #[error("Capture worker failed: {0}")]
    WorkerFailed(String),

    #[error("Capture worker did not finish in time")]
    WorkerJoinTimedOut,
}

/// Result of a best-effort teardown
#[derive(Debug, Clone)]
pub struct TeardownReport {
    pub method: StopMethod,
    pub warnings: Vec<TeardownWarning>,
}

impl TeardownReport {
    pub fn clean(method: StopMethod) -> Self {
        Self {
            method,
            warnings: Vec::new(),
        }
    }
}

/// Exclusively owned handle to a live recording session
#[async_trait]
pub trait RecordingHandle: Send {
    /// Backend driving this session
    fn kind(&self) -> BackendKind;

    /// Non-blocking liveness check
    fn is_alive(&mut self) -> bool;

    /// Stop the session with the strategy of its shape.
    ///
    /// Never fails and never blocks indefinitely; partial failures are
    /// reported as warnings. Calling it twice is a no-op the second time.
    async fn teardown(&mut self) -> TeardownReport;
}

/// Port for one capture strategy
#[async_trait]
pub trait CameraBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Start recording into `raw_path`.
    ///
    /// Returns once the session is live. On error every partially acquired
    /// resource (device, process, worker) has already been released.
    async fn start_recording(&self, raw_path: &Path)
        -> Result<Box<dyn RecordingHandle>, BackendError>;

    /// Acquire a single still image into `output`
    async fn capture_still(&self, output: &Path) -> Result<(), BackendError>;
}
