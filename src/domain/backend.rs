//! Capture backend kinds and the capability set detected at startup

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// The interchangeable capture backends, one variant per strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BackendKind {
    /// Native V4L2 capture session
    V4l2,
    /// libcamera command-line tools (rpicam-* / libcamera-*)
    Libcamera,
    /// ffmpeg reading the V4L2 device
    Ffmpeg,
    /// Synthetic test-pattern source, needs no hardware
    Software,
}

impl BackendKind {
    /// Fixed selection order, highest priority first
    pub const PRIORITY: [BackendKind; 4] = [
        BackendKind::V4l2,
        BackendKind::Libcamera,
        BackendKind::Ffmpeg,
        BackendKind::Software,
    ];

    /// Get the string representation
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::V4l2 => "v4l2",
            Self::Libcamera => "libcamera",
            Self::Ffmpeg => "ffmpeg",
            Self::Software => "software",
        }
    }

    /// How a session of this backend is driven and torn down
    pub const fn shape(&self) -> BackendShape {
        match self {
            Self::V4l2 => BackendShape::Native,
            Self::Libcamera | Self::Ffmpeg => BackendShape::ProcessBased,
            Self::Software => BackendShape::Fallback,
        }
    }

    /// Format of the file this backend writes while recording
    pub const fn raw_output(&self) -> OutputKind {
        match self {
            Self::V4l2 | Self::Libcamera => OutputKind::H264Elementary,
            Self::Ffmpeg => OutputKind::Mp4,
            Self::Software => OutputKind::Mjpeg,
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Session shape: decides the teardown strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendShape {
    /// In-process session with explicit stop and close steps
    Native,
    /// External OS process stopped by escalating signals
    ProcessBased,
    /// In-process software source
    Fallback,
}

/// File format produced by a backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    /// Raw H.264 byte stream, needs remuxing into a container
    H264Elementary,
    /// MP4 container, final as written
    Mp4,
    /// Concatenated JPEG frames, final as written
    Mjpeg,
}

impl OutputKind {
    /// File extension without the dot
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::H264Elementary => "h264",
            Self::Mp4 => "mp4",
            Self::Mjpeg => "mjpeg",
        }
    }

    /// Whether a remux step can turn this into the promised container
    pub const fn needs_remux(&self) -> bool {
        matches!(self, Self::H264Elementary)
    }

    /// The container the remux step produces
    pub const fn remux_target(&self) -> OutputKind {
        match self {
            Self::H264Elementary => OutputKind::Mp4,
            other => *other,
        }
    }
}

/// Resolved libcamera tool pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibcameraTools {
    /// Video recorder (`rpicam-vid` or `libcamera-vid`)
    pub vid: PathBuf,
    /// Still capture (`rpicam-still` or `libcamera-still`)
    pub still: PathBuf,
}

/// Immutable set of backends found on the host.
/// Computed once at process start and never rechecked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackendCapabilities {
    pub v4l2: bool,
    pub libcamera: Option<LibcameraTools>,
    pub ffmpeg: Option<PathBuf>,
    pub software: bool,
}

impl BackendCapabilities {
    /// A capability set with nothing available
    pub fn none() -> Self {
        Self::default()
    }

    /// Whether the given backend was found
    pub fn has(&self, kind: BackendKind) -> bool {
        match kind {
            BackendKind::V4l2 => self.v4l2,
            BackendKind::Libcamera => self.libcamera.is_some(),
            BackendKind::Ffmpeg => self.ffmpeg.is_some(),
            BackendKind::Software => self.software,
        }
    }

    /// Available backends in selection order
    pub fn available(&self) -> Vec<BackendKind> {
        BackendKind::PRIORITY
            .into_iter()
            .filter(|kind| self.has(*kind))
            .collect()
    }

    /// Whether any backend can serve a request
    pub fn any(&self) -> bool {
        !self.available().is_empty()
    }

    /// The transcoding tool used for finalization, if present
    pub fn remux_tool(&self) -> Option<&Path> {
        self.ffmpeg.as_deref()
    }

    /// Backend name to availability, for health reports
    pub fn summary(&self) -> BTreeMap<&'static str, bool> {
        BackendKind::PRIORITY
            .into_iter()
            .map(|kind| (kind.as_str(), self.has(kind)))
            .collect()
    }
}
