//! Recording value objects and the session state machine

mod duration;
mod request;
mod session;
mod status;

pub use duration::{Duration, DEFAULT_TRANSCODE_TIMEOUT_SECS};
pub use request::{CaptureRequest, RequestError};
pub use session::{InvalidStateTransition, LiveRecording, RecordingSession, RecordingState};
pub use status::RecordingStatus;
