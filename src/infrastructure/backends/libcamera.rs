//! libcamera command-line backend (`rpicam-*` / `libcamera-*`)

use std::path::Path;
use std::time::Duration as StdDuration;

use async_trait::async_trait;

use crate::application::ports::{BackendError, CameraBackend, RecordingHandle};
use crate::domain::backend::{BackendKind, LibcameraTools};
use crate::domain::config::CameraSettings;

use super::process::{run_capture_command, ProcessRecording, TeardownPolicy, STARTUP_GRACE, STILL_TIMEOUT};

/// Records a raw H.264 elementary stream with the `*-vid` tool and takes
/// stills with the `*-still` tool
pub struct LibcameraBackend {
    tools: LibcameraTools,
    settings: CameraSettings,
    policy: TeardownPolicy,
    grace: StdDuration,
}

impl LibcameraBackend {
    pub fn new(tools: LibcameraTools, settings: CameraSettings, policy: TeardownPolicy) -> Self {
        Self {
            tools,
            settings,
            policy,
            grace: STARTUP_GRACE,
        }
    }

    /// Runs until signalled; the controller owns the duration bound
    fn record_args(&self, raw_path: &Path) -> Vec<String> {
        vec![
            "-n".to_string(),
            "-t".to_string(),
            "0".to_string(),
            "--codec".to_string(),
            "h264".to_string(),
            "--framerate".to_string(),
            self.settings.fps.to_string(),
            "--width".to_string(),
            self.settings.width.to_string(),
            "--height".to_string(),
            self.settings.height.to_string(),
            "-o".to_string(),
            raw_path.to_string_lossy().to_string(),
        ]
    }

    fn still_args(&self, output: &Path) -> Vec<String> {
        let mut args = vec![
            "-n".to_string(),
            "-t".to_string(),
            "1000".to_string(),
            "--width".to_string(),
            self.settings.width.to_string(),
            "--height".to_string(),
            self.settings.height.to_string(),
        ];
        if output
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("png"))
        {
            args.extend(["-e".to_string(), "png".to_string()]);
        }
        args.extend(["-o".to_string(), output.to_string_lossy().to_string()]);
        args
    }
}

#[async_trait]
impl CameraBackend for LibcameraBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Libcamera
    }

    async fn start_recording(
        &self,
        raw_path: &Path,
    ) -> Result<Box<dyn RecordingHandle>, BackendError> {
        let recording = ProcessRecording::spawn(
            BackendKind::Libcamera,
            &self.tools.vid,
            &self.record_args(raw_path),
            self.grace,
            self.policy,
        )
        .await?;
        Ok(Box::new(recording))
    }

    async fn capture_still(&self, output: &Path) -> Result<(), BackendError> {
        run_capture_command(&self.tools.still, &self.still_args(output), STILL_TIMEOUT).await
    }
}
