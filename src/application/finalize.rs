//! Finalization: raw artifact to final container

use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::fs;
use tracing::{debug, info, warn};

use super::ports::Remuxer;

/// Why the raw artifact was kept instead of the promised container
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FinalizeWarning {
    #[error("remux tool unavailable, raw file kept")]
    RemuxerUnavailable,

    #[error("raw file missing")]
    RawMissing,

    #[error("remux failed, raw file kept: {0}")]
    RemuxFailed(String),

    #[error("remux produced an empty file, raw file kept")]
    EmptyOutput,
}

/// What the finalize step delivered
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinalizeOutcome {
    /// Raw output already was the final container
    NoOp(PathBuf),
    /// Remuxed into the final container; raw deleted
    Remuxed(PathBuf),
    /// Raw artifact returned as the fallback
    Preserved {
        path: PathBuf,
        warning: FinalizeWarning,
    },
}

impl FinalizeOutcome {
    /// The path handed back to the caller
    pub fn path(&self) -> &Path {
        match self {
            Self::NoOp(path) | Self::Remuxed(path) => path,
            Self::Preserved { path, .. } => path,
        }
    }

    pub fn into_path(self) -> PathBuf {
        match self {
            Self::NoOp(path) | Self::Remuxed(path) => path,
            Self::Preserved { path, .. } => path,
        }
    }

    /// Whether the promised container was delivered
    pub fn finalized(&self) -> bool {
        !matches!(self, Self::Preserved { .. })
    }

    pub fn warning(&self) -> Option<&FinalizeWarning> {
        match self {
            Self::Preserved { warning, .. } => Some(warning),
            _ => None,
        }
    }
}

async fn non_empty(path: &Path) -> bool {
    fs::metadata(path)
        .await
        .map(|m| m.is_file() && m.len() > 0)
        .unwrap_or(false)
}

/// Turn the raw artifact into the final file.
///
/// Never fails: a failed remux keeps the raw artifact and reports a warning.
pub async fn finalize(
    remuxer: &dyn Remuxer,
    raw: &Path,
    target: &Path,
    fps: u32,
) -> FinalizeOutcome {
    if raw == target {
        debug!(path = %raw.display(), "raw output is already final");
        return FinalizeOutcome::NoOp(raw.to_path_buf());
    }

    let preserved = |warning| FinalizeOutcome::Preserved {
        path: raw.to_path_buf(),
        warning,
    };

    if fs::metadata(raw).await.is_err() {
        return preserved(FinalizeWarning::RawMissing);
    }

    if !remuxer.is_available() {
        return preserved(FinalizeWarning::RemuxerUnavailable);
    }

    if let Err(e) = remuxer.remux(raw, target, fps).await {
        remove_partial(target).await;
        return preserved(FinalizeWarning::RemuxFailed(e.to_string()));
    }

    if !non_empty(target).await {
        remove_partial(target).await;
        return preserved(FinalizeWarning::EmptyOutput);
    }

    if let Err(e) = fs::remove_file(raw).await {
        warn!(path = %raw.display(), error = %e, "failed to delete raw file after remux");
    }
    info!(file = %target.display(), "remuxed recording");
    FinalizeOutcome::Remuxed(target.to_path_buf())
}

async fn remove_partial(path: &Path) {
    match fs::remove_file(path).await {
        Ok(()) => debug!(path = %path.display(), "removed partial remux output"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "failed to remove partial remux output"),
    }
}
