//! Native V4L2 capture session

use std::io;
use std::path::Path;
use std::time::{Duration as StdDuration, Instant};

use async_trait::async_trait;
use image::ImageFormat;
use tracing::{debug, info};
use v4l::buffer::Type;
use v4l::io::mmap::Stream;
use v4l::io::traits::{CaptureStream, Stream as _};
use v4l::video::Capture;
use v4l::{Device, Format, FourCC};

use crate::application::ports::{BackendError, CameraBackend, RecordingHandle};
use crate::domain::backend::BackendKind;
use crate::domain::config::CameraSettings;

use super::worker::{FrameSource, FrameWorker};

const BUFFER_COUNT: u32 = 4;

/// Frames dropped before a still so exposure can settle
const WARMUP_FRAMES: usize = 3;

/// How long one dequeue may block before the capture thread rechecks its
/// stop flag
const POLL_INTERVAL: StdDuration = StdDuration::from_millis(250);

/// Bound on a still capture waiting for frames
const STILL_FRAME_TIMEOUT: StdDuration = StdDuration::from_secs(5);

/// An open device streaming in one pixel format
struct DeviceStream {
    stream: Option<Stream<'static>>,
    device: Option<Device>,
}

impl DeviceStream {
    fn open(settings: &CameraSettings, fourcc: &[u8; 4]) -> Result<Self, String> {
        let device = Device::with_path(&settings.device)
            .map_err(|e| format!("Failed to open {}: {}", settings.device.display(), e))?;

        let wanted = FourCC::new(fourcc);
        let format = device
            .set_format(&Format::new(settings.width, settings.height, wanted))
            .map_err(|e| format!("Failed to set format: {}", e))?;
        if format.fourcc != wanted {
            return Err(format!(
                "Device does not support {} (offered {})",
                wanted, format.fourcc
            ));
        }
        info!(
            width = format.width,
            height = format.height,
            fourcc = %format.fourcc,
            "V4L2 format configured"
        );

        let mut stream = Stream::with_buffers(&device, Type::VideoCapture, BUFFER_COUNT)
            .map_err(|e| format!("Failed to create stream: {}", e))?;
        stream.set_timeout(POLL_INTERVAL);

        Ok(Self {
            stream: Some(stream),
            device: Some(device),
        })
    }
}

impl FrameSource for DeviceStream {
    fn next_frame(&mut self) -> Result<Option<Vec<u8>>, String> {
        let stream = self.stream.as_mut().ok_or("stream closed")?;
        match stream.next() {
            Ok((buf, meta)) => {
                let used = (meta.bytesused as usize).min(buf.len());
                Ok(Some(buf[..used].to_vec()))
            }
            Err(e) if e.kind() == io::ErrorKind::TimedOut => Ok(None),
            Err(e) => Err(e.to_string()),
        }
    }

    fn stop(&mut self) -> Result<(), String> {
        match self.stream.as_mut() {
            Some(stream) => stream.stop().map_err(|e| e.to_string()),
            None => Ok(()),
        }
    }

    fn close(&mut self) -> Result<(), String> {
        // Buffers must be unmapped before the device handle goes away
        drop(self.stream.take());
        drop(self.device.take());
        debug!("V4L2 device closed");
        Ok(())
    }
}

pub struct V4l2Backend {
    settings: CameraSettings,
}

impl V4l2Backend {
    pub fn new(settings: CameraSettings) -> Self {
        Self { settings }
    }
}

/// Next frame, waiting through empty polls until `deadline`
fn frame_before(session: &mut DeviceStream, deadline: Instant) -> Result<Vec<u8>, BackendError> {
    loop {
        if let Some(frame) = session.next_frame().map_err(BackendError::CaptureFailed)? {
            return Ok(frame);
        }
        if Instant::now() >= deadline {
            return Err(BackendError::Timeout(STILL_FRAME_TIMEOUT.as_secs()));
        }
    }
}

fn grab_still(settings: &CameraSettings, output: &Path) -> Result<(), BackendError> {
    let mut session = DeviceStream::open(settings, b"MJPG").map_err(BackendError::Device)?;
    let deadline = Instant::now() + STILL_FRAME_TIMEOUT;

    let result = (|| {
        for _ in 0..WARMUP_FRAMES {
            frame_before(&mut session, deadline)?;
        }
        let jpeg = frame_before(&mut session, deadline)?;

        match ImageFormat::from_path(output) {
            Ok(ImageFormat::Png) => {
                let img = image::load_from_memory_with_format(&jpeg, ImageFormat::Jpeg)
                    .map_err(|e| BackendError::CaptureFailed(e.to_string()))?;
                img.save_with_format(output, ImageFormat::Png)
                    .map_err(|e| BackendError::Io(e.to_string()))
            }
            _ => std::fs::write(output, &jpeg).map_err(|e| BackendError::Io(e.to_string())),
        }
    })();

    if let Err(e) = session.stop() {
        debug!(error = %e, "V4L2 still stream did not stop cleanly");
    }
    if let Err(e) = session.close() {
        debug!(error = %e, "V4L2 device did not close cleanly");
    }
    result
}

#[async_trait]
impl CameraBackend for V4l2Backend {
    fn kind(&self) -> BackendKind {
        BackendKind::V4l2
    }

    async fn start_recording(
        &self,
        raw_path: &Path,
    ) -> Result<Box<dyn RecordingHandle>, BackendError> {
        let settings = self.settings.clone();
        let worker = FrameWorker::start(
            BackendKind::V4l2,
            raw_path,
            Box::new(move || {
                DeviceStream::open(&settings, b"H264").map(|s| Box::new(s) as Box<dyn FrameSource>)
            }),
        )
        .await?;
        Ok(Box::new(worker))
    }

    async fn capture_still(&self, output: &Path) -> Result<(), BackendError> {
        let settings = self.settings.clone();
        let output = output.to_path_buf();
        tokio::task::spawn_blocking(move || grab_still(&settings, &output))
            .await
            .map_err(|e| BackendError::CaptureFailed(e.to_string()))?
    }
}
