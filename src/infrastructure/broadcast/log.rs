//! Tracing-backed broadcaster

use tracing::info;

use crate::application::ports::{BroadcastError, RecorderEvent, StatusBroadcaster};

/// Writes each event to the log as structured JSON
#[derive(Debug, Default, Clone, Copy)]
pub struct LogBroadcaster;

impl LogBroadcaster {
    pub fn new() -> Self {
        Self
    }
}

impl StatusBroadcaster for LogBroadcaster {
    fn publish(&self, event: RecorderEvent) -> Result<(), BroadcastError> {
        let payload =
            serde_json::to_string(&event).map_err(|e| BroadcastError::Failed(e.to_string()))?;
        info!(event = event.name(), %payload, "recorder event");
        Ok(())
    }
}
