//! Config loading and the local (daemon-less) subcommands

use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use tracing::warn;

use crate::application::ports::ConfigStore;
use crate::domain::config::{AppConfig, VideoConfig};
use crate::infrastructure::{BackendDetector, CameraRelease, ReleaseOutcome, XdgConfigStore};

use super::presenter::Presenter;

/// Exit codes
pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_ERROR: u8 = 1;
pub const EXIT_USAGE_ERROR: u8 = 2;

/// Camera overrides read from the environment
fn env_config() -> AppConfig {
    let text = |name: &str| env::var(name).ok().filter(|s| !s.is_empty());
    let number = |name: &str| {
        let raw = text(name)?;
        match raw.parse::<u32>() {
            Ok(n) => Some(n),
            Err(_) => {
                warn!(variable = name, value = %raw, "ignoring non-numeric environment value");
                None
            }
        }
    };

    let video = VideoConfig {
        device: text("VIDEO_DEVICE"),
        width: number("VIDEO_WIDTH"),
        height: number("VIDEO_HEIGHT"),
        fps: number("VIDEO_FPS"),
    };
    let any = video.device.is_some()
        || video.width.is_some()
        || video.height.is_some()
        || video.fps.is_some();

    AppConfig {
        video: any.then_some(video),
        ..AppConfig::empty()
    }
}

/// Load and merge configuration from file, env, and CLI
pub async fn load_merged_config(cli_config: AppConfig) -> AppConfig {
    let store = XdgConfigStore::new();
    let file_config = match store.load().await {
        Ok(config) => config,
        Err(e) => {
            warn!(path = %store.path().display(), error = %e, "ignoring unreadable config file");
            AppConfig::empty()
        }
    };

    // Merge: defaults < file < env < cli
    AppConfig::defaults()
        .merge(file_config)
        .merge(env_config())
        .merge(cli_config)
}

/// `skycam backends`: detect capture backends on this host and print them
pub async fn run_backends(presenter: &Presenter) -> ExitCode {
    let config = load_merged_config(AppConfig::empty()).await;
    let camera = config.camera_settings();
    let caps = BackendDetector::new(&camera.device, config.software_fallback_or_default()).detect();

    for (name, available) in caps.summary() {
        presenter.backend_line(name, available);
    }
    match caps.remux_tool() {
        Some(tool) => presenter.key_value("remux", &tool.display().to_string()),
        None => presenter.key_value("remux", "unavailable (raw .h264 kept)"),
    }
    presenter.key_value("device", &camera.device.display().to_string());

    if caps.any() {
        ExitCode::from(EXIT_SUCCESS)
    } else {
        presenter.error("No capture backend available");
        ExitCode::from(EXIT_ERROR)
    }
}

/// `skycam release`: kill whatever holds the camera
pub async fn run_release(device: Option<PathBuf>, presenter: &Presenter) -> ExitCode {
    let device = match device {
        Some(device) => device,
        None => load_merged_config(AppConfig::empty())
            .await
            .camera_settings()
            .device,
    };

    match CameraRelease::new(&device).release().await {
        ReleaseOutcome::DeviceFreed => {
            presenter.success(&format!("Released {}", device.display()));
        }
        ReleaseOutcome::KilledByName(names) => {
            presenter.success(&format!("Stopped {}", names.join(", ")));
        }
        ReleaseOutcome::NothingToRelease => {
            presenter.info("Nothing was holding the camera");
        }
    }
    ExitCode::from(EXIT_SUCCESS)
}
