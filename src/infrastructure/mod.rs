//! Infrastructure layer - Adapter implementations
//!
//! Contains concrete implementations of the port interfaces,
//! integrating with the camera stack, ffmpeg, removable storage, etc.

pub mod backends;
pub mod broadcast;
pub mod camera_release;
pub mod config;
pub mod detect;
pub mod remux;
pub mod storage;

// Re-export adapters
pub use backends::{build_backends, TeardownPolicy};
pub use broadcast::{ChannelBroadcaster, FanOutBroadcaster, LogBroadcaster};
pub use camera_release::{CameraRelease, ReleaseOutcome};
pub use config::XdgConfigStore;
pub use detect::BackendDetector;
pub use remux::FfmpegRemuxer;
pub use storage::{default_media_dir, UsbMediaStorage};
