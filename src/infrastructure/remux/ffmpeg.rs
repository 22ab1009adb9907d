//! FFmpeg stream-copy remuxer

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::application::ports::{RemuxError, Remuxer};

/// Wraps a raw H.264 stream into MP4 without re-encoding
pub struct FfmpegRemuxer {
    program: Option<PathBuf>,
    limit: StdDuration,
}

impl FfmpegRemuxer {
    /// `program` is `None` when ffmpeg was not found at startup
    pub fn new(program: Option<PathBuf>, limit: StdDuration) -> Self {
        Self { program, limit }
    }

    fn build_args(raw: &Path, target: &Path, fps: u32) -> Vec<String> {
        vec![
            "-y".to_string(),
            "-hide_banner".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
            "-r".to_string(),
            fps.max(1).to_string(),
            "-i".to_string(),
            raw.to_string_lossy().to_string(),
            "-c".to_string(),
            "copy".to_string(),
            target.to_string_lossy().to_string(),
        ]
    }
}

#[async_trait]
impl Remuxer for FfmpegRemuxer {
    fn is_available(&self) -> bool {
        self.program.is_some()
    }

    async fn remux(&self, raw: &Path, target: &Path, fps: u32) -> Result<(), RemuxError> {
        let program = self.program.as_ref().ok_or(RemuxError::Unavailable)?;
        let args = Self::build_args(raw, target, fps);
        debug!(program = %program.display(), ?args, "remuxing");

        let child = Command::new(program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| RemuxError::Failed(e.to_string()))?;

        let output = match timeout(self.limit, child.wait_with_output()).await {
            Ok(result) => result.map_err(|e| RemuxError::Failed(e.to_string()))?,
            Err(_) => {
                warn!(raw = %raw.display(), "remux timed out");
                return Err(RemuxError::TimedOut(self.limit.as_secs()));
            }
        };

        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let reason = stderr
                .lines()
                .rev()
                .find(|l| !l.trim().is_empty())
                .map(|l| l.trim().to_string())
                .unwrap_or_else(|| format!("exited with {}", output.status));
            Err(RemuxError::Failed(reason))
        }
    }
}
