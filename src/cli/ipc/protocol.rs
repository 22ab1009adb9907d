//! JSON-lines control protocol
//!
//! One request object per line, one response object per line. Responses
//! carry `"status": "ok"` with the payload fields flattened next to it, or
//! `"status": "error"` with a stable `error` code and a `message`.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::application::{CameraError, CapturedPhoto, StartedRecording, StoppedRecording};

/// Client requests
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum Request {
    Photo {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        filename: Option<String>,
    },
    Start {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        filename: Option<String>,
        /// Seconds; validated by the daemon
        #[serde(default, skip_serializing_if = "Option::is_none")]
        duration: Option<i64>,
    },
    Stop,
    Status,
    Health,
    /// Look up a stored photo or recording by name
    Media {
        filename: String,
    },
    Subscribe,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplyStatus {
    Ok,
    Error,
}

/// Successful reply wrapper
#[derive(Debug, Serialize)]
pub struct OkReply<T> {
    pub status: ReplyStatus,
    #[serde(flatten)]
    pub body: T,
}

impl<T: Serialize> OkReply<T> {
    pub fn new(body: T) -> Self {
        Self {
            status: ReplyStatus::Ok,
            body,
        }
    }
}

/// Failure reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReply {
    pub status: ReplyStatus,
    /// Stable machine-readable code
    pub error: String,
    pub message: String,
}

impl ErrorReply {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status: ReplyStatus::Error,
            error: error.into(),
            message: message.into(),
        }
    }

    /// Code for requests that could not be parsed
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new("invalid_request", message)
    }
}

impl From<&CameraError> for ErrorReply {
    fn from(err: &CameraError) -> Self {
        Self::new(err.kind(), err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoReply {
    pub file: PathBuf,
    pub backend: String,
}

impl From<CapturedPhoto> for PhotoReply {
    fn from(photo: CapturedPhoto) -> Self {
        Self {
            file: photo.file,
            backend: photo.backend.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartReply {
    /// Where the finished recording will be
    pub file: PathBuf,
    pub raw_file: PathBuf,
    pub backend: String,
}

impl From<StartedRecording> for StartReply {
    fn from(started: StartedRecording) -> Self {
        Self {
            file: started.file,
            raw_file: started.raw_file,
            backend: started.backend.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopReply {
    pub file: PathBuf,
    pub backend: String,
    pub finalized: bool,
    /// Why the raw file was kept, if it was
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl From<StoppedRecording> for StopReply {
    fn from(stopped: StoppedRecording) -> Self {
        Self {
            backend: stopped.backend.to_string(),
            finalized: stopped.outcome.finalized(),
            warning: stopped.outcome.warning().map(|w| w.to_string()),
            file: stopped.outcome.into_path(),
        }
    }
}

/// Acknowledges a subscription; events follow on the same connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscribeReply {
    pub subscribed: bool,
}

/// Serialize a reply to one wire line
pub fn encode_line<T: Serialize>(reply: &T) -> String {
    match serde_json::to_string(reply) {
        Ok(mut line) => {
            line.push('\n');
            line
        }
        Err(e) => {
            // ErrorReply only holds strings, so this cannot recurse
            let fallback = ErrorReply::new("internal", e.to_string());
            format!(
                "{{\"status\":\"error\",\"error\":\"{}\",\"message\":{}}}\n",
                fallback.error,
                serde_json::Value::String(fallback.message)
            )
        }
    }
}
