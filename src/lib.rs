//! SkyCam - remote photo and video capture controller
//!
//! Drives whichever camera stack a drone or rover payload offers (native
//! V4L2, the libcamera tools, ffmpeg, or a synthetic test pattern) behind
//! one recording state machine, and serves it over a local control socket.
//!
//! # Architecture
//!
//! The crate follows hexagonal (ports & adapters) architecture:
//!
//! - **Domain**: Value objects, the recording state machine, file naming and errors
//! - **Application**: Use cases (recording controller, photo capture) and port traits
//! - **Infrastructure**: Adapter implementations (capture backends, ffmpeg, storage, etc.)
//! - **CLI**: Command-line interface, daemon runner, socket protocol and signal handling

pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;
