//! Remux port interface

use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;

/// Remux errors
#[derive(Debug, Clone, Error)]
pub enum RemuxError {
    #[error("Remux tool not available")]
    Unavailable,

    #[error("Remux failed: {0}")]
    Failed(String),

    #[error("Remux timed out after {0}s")]
    TimedOut(u64),
}

/// Port for repackaging a raw elementary stream into a container
/// without re-encoding
#[async_trait]
pub trait Remuxer: Send + Sync {
    /// Whether the underlying tool was found at startup
    fn is_available(&self) -> bool;

    /// Stream-copy `raw` into `target` at the declared frame rate
    async fn remux(&self, raw: &Path, target: &Path, fps: u32) -> Result<(), RemuxError>;
}
