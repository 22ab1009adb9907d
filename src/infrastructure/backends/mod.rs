//! Capture backend adapters
//!
//! One adapter per backend kind. `build_backends` turns the detected
//! capability set into the priority-ordered list the controller walks.

mod ffmpeg;
mod libcamera;
mod process;
mod software;
#[cfg(feature = "v4l2")]
mod v4l2;
mod worker;

use std::sync::Arc;

use crate::application::ports::CameraBackend;
use crate::domain::backend::{BackendCapabilities, BackendKind};
use crate::domain::config::CameraSettings;

pub use ffmpeg::FfmpegBackend;
pub use libcamera::LibcameraBackend;
pub use process::{escalate, run_capture_command, ProcessRecording, TeardownPolicy, STARTUP_GRACE, STILL_TIMEOUT};
pub use software::{SoftwareBackend, TestPattern, MAX_SOFTWARE_FPS};
#[cfg(feature = "v4l2")]
pub use v4l2::V4l2Backend;
pub use worker::{FrameSource, FrameWorker};

/// Instantiate every available backend, highest priority first
pub fn build_backends(
    caps: &BackendCapabilities,
    settings: &CameraSettings,
    policy: TeardownPolicy,
) -> Vec<Arc<dyn CameraBackend>> {
    let mut backends: Vec<Arc<dyn CameraBackend>> = Vec::new();
    for kind in caps.available() {
        match kind {
            #[cfg(feature = "v4l2")]
            BackendKind::V4l2 => backends.push(Arc::new(V4l2Backend::new(settings.clone()))),
            #[cfg(not(feature = "v4l2"))]
            BackendKind::V4l2 => {}
            BackendKind::Libcamera => {
                if let Some(tools) = caps.libcamera.clone() {
                    backends.push(Arc::new(LibcameraBackend::new(
                        tools,
                        settings.clone(),
                        policy,
                    )));
                }
            }
            BackendKind::Ffmpeg => {
                if let Some(program) = caps.ffmpeg.clone() {
                    backends.push(Arc::new(FfmpegBackend::new(
                        program,
                        settings.clone(),
                        policy,
                    )));
                }
            }
            BackendKind::Software => {
                backends.push(Arc::new(SoftwareBackend::new(settings.clone())))
            }
        }
    }
    backends
}
