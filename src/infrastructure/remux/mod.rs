//! Remux adapters

mod ffmpeg;

pub use ffmpeg::FfmpegRemuxer;
