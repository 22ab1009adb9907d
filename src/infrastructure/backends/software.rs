//! Software fallback backend: a synthetic test pattern, no hardware needed

use std::io::Cursor;
use std::path::Path;
use std::thread;
use std::time::{Duration as StdDuration, Instant};

use async_trait::async_trait;
use image::{ImageFormat, Rgb, RgbImage};

use crate::application::ports::{BackendError, CameraBackend, RecordingHandle};
use crate::domain::backend::BackendKind;
use crate::domain::config::CameraSettings;

use super::worker::{FrameSource, FrameWorker};

/// Frame rate ceiling for the software source
pub const MAX_SOFTWARE_FPS: u32 = 10;

const MAX_WIDTH: u32 = 640;
const MAX_HEIGHT: u32 = 480;

const BARS: [[u8; 3]; 7] = [
    [192, 192, 192],
    [192, 192, 0],
    [0, 192, 192],
    [0, 192, 0],
    [192, 0, 192],
    [192, 0, 0],
    [0, 0, 192],
];

/// Colour bars with a moving marker so consecutive frames differ
#[derive(Debug, Clone)]
pub struct TestPattern {
    width: u32,
    height: u32,
    frame: u64,
}

impl TestPattern {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.clamp(16, MAX_WIDTH),
            height: height.clamp(16, MAX_HEIGHT),
            frame: 0,
        }
    }

    pub fn render(&mut self) -> RgbImage {
        let (w, h) = (self.width, self.height);
        let marker_x = (self.frame * 8 % u64::from(w)) as u32;
        let marker_w = (w / 32).max(2);
        let band = h * 3 / 4;

        let img = RgbImage::from_fn(w, h, |x, y| {
            if x >= marker_x && x < marker_x + marker_w && y >= band {
                return Rgb([255, 255, 255]);
            }
            if y < band {
                let bar = (x * BARS.len() as u32 / w) as usize;
                Rgb(BARS[bar.min(BARS.len() - 1)])
            } else {
                let shade = (x * 255 / w) as u8;
                Rgb([shade, shade, shade])
            }
        });
        self.frame += 1;
        img
    }

    /// Render one frame encoded as `format`
    pub fn encode(&mut self, format: ImageFormat) -> Result<Vec<u8>, String> {
        let img = self.render();
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, format).map_err(|e| e.to_string())?;
        Ok(buf.into_inner())
    }
}

/// Paced JPEG frame source for recordings (MJPEG stream)
struct PacedPattern {
    pattern: TestPattern,
    interval: StdDuration,
    next_at: Instant,
}

impl FrameSource for PacedPattern {
    fn next_frame(&mut self) -> Result<Option<Vec<u8>>, String> {
        let now = Instant::now();
        if self.next_at > now {
            thread::sleep(self.next_at - now);
        }
        self.next_at += self.interval;
        self.pattern.encode(ImageFormat::Jpeg).map(Some)
    }
}

pub struct SoftwareBackend {
    settings: CameraSettings,
}

impl SoftwareBackend {
    pub fn new(settings: CameraSettings) -> Self {
        Self { settings }
    }

    fn fps(&self) -> u32 {
        self.settings.fps.clamp(1, MAX_SOFTWARE_FPS)
    }
}

#[async_trait]
impl CameraBackend for SoftwareBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Software
    }

    async fn start_recording(
        &self,
        raw_path: &Path,
    ) -> Result<Box<dyn RecordingHandle>, BackendError> {
        let pattern = TestPattern::new(self.settings.width, self.settings.height);
        let interval = StdDuration::from_millis(1000 / u64::from(self.fps()));
        let worker = FrameWorker::start(
            BackendKind::Software,
            raw_path,
            Box::new(move || {
                Ok(Box::new(PacedPattern {
                    pattern,
                    interval,
                    next_at: Instant::now(),
                }) as Box<dyn FrameSource>)
            }),
        )
        .await?;
        Ok(Box::new(worker))
    }

    async fn capture_still(&self, output: &Path) -> Result<(), BackendError> {
        let format = ImageFormat::from_path(output).unwrap_or(ImageFormat::Jpeg);
        let mut pattern = TestPattern::new(self.settings.width, self.settings.height);
        let output = output.to_path_buf();

        tokio::task::spawn_blocking(move || {
            let bytes = pattern.encode(format).map_err(BackendError::CaptureFailed)?;
            std::fs::write(&output, bytes).map_err(|e| BackendError::Io(e.to_string()))
        })
        .await
        .map_err(|e| BackendError::CaptureFailed(e.to_string()))?
    }
}
