//! Daemon app runner

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use tracing::{info, warn};

use crate::application::ports::{MediaStorage, Remuxer, StatusBroadcaster};
use crate::application::CameraService;
use crate::domain::config::AppConfig;
use crate::infrastructure::{
    build_backends, default_media_dir, BackendDetector, CameraRelease, ChannelBroadcaster,
    FanOutBroadcaster, FfmpegRemuxer, LogBroadcaster, TeardownPolicy, UsbMediaStorage,
};

use super::app::{EXIT_ERROR, EXIT_SUCCESS};
use super::ipc::{SocketPath, UnixSocketServer};
use super::pid_file::{PidFile, PidFileError};
use super::presenter::Presenter;
use super::signals::DaemonSignalHandler;

/// Parsed daemon options
#[derive(Debug, Clone)]
pub struct DaemonOptions {
    /// Fully merged configuration
    pub config: AppConfig,
    pub socket: SocketPath,
    pub pid_file: Option<PathBuf>,
}

/// Run daemon mode
pub async fn run_daemon(options: DaemonOptions) -> ExitCode {
    let presenter = Presenter::new();
    let config = options.config;

    // Acquire PID file
    let mut pid_file = options
        .pid_file
        .map(PidFile::with_path)
        .unwrap_or_default();
    if let Err(e) = pid_file.acquire() {
        match e {
            PidFileError::AlreadyRunning(pid) => {
                presenter.error(&format!("Another daemon is already running (PID: {})", pid));
            }
            _ => {
                presenter.error(&e.to_string());
            }
        }
        return ExitCode::from(EXIT_ERROR);
    }

    let camera = config.camera_settings();
    let storage = Arc::new(UsbMediaStorage::new(
        config.storage_settings(&default_media_dir()),
    ));

    match storage.auto_mount().await {
        Ok(true) => presenter.info("USB storage mounted"),
        Ok(false) => {}
        Err(e) => presenter.warn(&format!("USB auto-mount failed: {}", e)),
    }

    if config.release_camera_or_default() {
        let outcome = CameraRelease::new(&camera.device).release().await;
        info!(?outcome, "camera release before startup");
    }

    // Detected once; never rechecked while running
    let caps = BackendDetector::new(&camera.device, config.software_fallback_or_default()).detect();
    if !caps.any() {
        presenter.warn("No capture backend available; capture requests will fail");
    }
    if caps.remux_tool().is_none() {
        warn!("ffmpeg not found, H.264 recordings will be kept as raw .h264");
    }

    let backends = build_backends(&caps, &camera, TeardownPolicy::default());
    let remuxer = FfmpegRemuxer::new(
        caps.ffmpeg.clone(),
        config.transcode_timeout_or_default().as_std(),
    );
    let events = ChannelBroadcaster::new();
    let broadcaster = FanOutBroadcaster::new(vec![
        Arc::new(events.clone()) as Arc<dyn StatusBroadcaster>,
        Arc::new(LogBroadcaster::new()),
    ]);

    let service = Arc::new(CameraService::new(
        caps,
        backends,
        Arc::clone(&storage) as Arc<dyn MediaStorage>,
        Arc::new(remuxer) as Arc<dyn Remuxer>,
        Arc::new(broadcaster) as Arc<dyn StatusBroadcaster>,
        camera.fps,
    ));

    let mut signals = match DaemonSignalHandler::new() {
        Ok(s) => s,
        Err(e) => {
            presenter.error(&format!("Failed to setup signal handler: {}", e));
            return ExitCode::from(EXIT_ERROR);
        }
    };

    let mut socket_server = UnixSocketServer::new(options.socket.clone());
    if let Err(e) = socket_server.bind().await {
        presenter.error(&format!("Failed to bind socket: {}", e));
        return ExitCode::from(EXIT_ERROR);
    }

    let server_service = Arc::clone(&service);
    let server = tokio::spawn(async move {
        if let Err(e) = socket_server.run(server_service, events).await {
            warn!(error = %e, "socket server stopped");
        }
    });

    presenter.daemon_status("Started, waiting for requests...");
    presenter.info(&format!(
        "PID: {} | Socket: {} | SIGINT/SIGTERM: exit",
        std::process::id(),
        options.socket.path().display()
    ));

    let signal = signals.recv().await;
    presenter.daemon_status("Shutting down...");
    info!(signal = ?signal.map(|s| s.name()), "shutdown requested");

    // Stop accepting requests first; dropping the server removes the socket
    server.abort();
    let _ = server.await;

    if let Some(stopped) = service.shutdown().await {
        presenter.info(&format!(
            "Active recording stopped: {}",
            stopped.file().display()
        ));
    }
    storage.sync().await;
    storage.unmount_if_mounted().await;

    let _ = pid_file.release();
    let result = if signal.is_some() {
        EXIT_SUCCESS
    } else {
        EXIT_ERROR
    };
    ExitCode::from(result)
}
