//! ffmpeg backend reading the V4L2 device

use std::path::{Path, PathBuf};
use std::time::Duration as StdDuration;

use async_trait::async_trait;

use crate::application::ports::{BackendError, CameraBackend, RecordingHandle};
use crate::domain::backend::BackendKind;
use crate::domain::config::CameraSettings;

use super::process::{run_capture_command, ProcessRecording, TeardownPolicy, STARTUP_GRACE, STILL_TIMEOUT};

/// Encodes straight into a fragmented MP4, so the raw file is already final
/// and stays playable even if the process has to be killed
pub struct FfmpegBackend {
    program: PathBuf,
    settings: CameraSettings,
    policy: TeardownPolicy,
    grace: StdDuration,
}

impl FfmpegBackend {
    pub fn new(program: PathBuf, settings: CameraSettings, policy: TeardownPolicy) -> Self {
        Self {
            program,
            settings,
            policy,
            grace: STARTUP_GRACE,
        }
    }

    fn input_args(&self) -> Vec<String> {
        vec![
            "-y".to_string(),
            "-hide_banner".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
            "-f".to_string(),
            "v4l2".to_string(),
            "-video_size".to_string(),
            format!("{}x{}", self.settings.width, self.settings.height),
            "-framerate".to_string(),
            self.settings.fps.to_string(),
            "-i".to_string(),
            self.settings.device.to_string_lossy().to_string(),
        ]
    }

    fn record_args(&self, raw_path: &Path) -> Vec<String> {
        let mut args = self.input_args();
        args.extend(
            [
                "-c:v",
                "libx264",
                "-preset",
                "ultrafast",
                "-pix_fmt",
                "yuv420p",
                "-movflags",
                "+frag_keyframe+empty_moov",
            ]
            .map(String::from),
        );
        args.push(raw_path.to_string_lossy().to_string());
        args
    }

    fn still_args(&self, output: &Path) -> Vec<String> {
        let mut args = self.input_args();
        args.extend(["-vframes", "1", "-pix_fmt", "yuvj420p"].map(String::from));
        args.push(output.to_string_lossy().to_string());
        args
    }
}

#[async_trait]
impl CameraBackend for FfmpegBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Ffmpeg
    }

    async fn start_recording(
        &self,
        raw_path: &Path,
    ) -> Result<Box<dyn RecordingHandle>, BackendError> {
        let recording = ProcessRecording::spawn(
            BackendKind::Ffmpeg,
            &self.program,
            &self.record_args(raw_path),
            self.grace,
            self.policy,
        )
        .await?;
        Ok(Box::new(recording))
    }

    async fn capture_still(&self, output: &Path) -> Result<(), BackendError> {
        run_capture_command(&self.program, &self.still_args(output), STILL_TIMEOUT).await
    }
}
