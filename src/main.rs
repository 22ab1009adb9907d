//! SkyCam CLI entry point

use std::process::ExitCode;

use clap::Parser;

use skycam::cli::{
    app::{load_merged_config, run_backends, run_release, EXIT_ERROR, EXIT_USAGE_ERROR},
    args::{Cli, Commands, ServeArgs},
    client_cmd::{
        handle_health, handle_media, handle_photo, handle_record, handle_status, handle_watch,
        CommandError,
    },
    config_cmd::handle_config_command,
    daemon_app::{run_daemon, DaemonOptions},
    ipc::SocketPath,
    presenter::Presenter,
};
use skycam::domain::config::{AppConfig, StorageConfig, VideoConfig};
use skycam::infrastructure::XdgConfigStore;

fn init_tracing(default_level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Config layer from `serve` flags
fn serve_config(args: &ServeArgs) -> AppConfig {
    let video = VideoConfig {
        device: args.device.clone(),
        width: args.width,
        height: args.height,
        fps: args.fps,
    };
    let has_video =
        video.device.is_some() || video.width.is_some() || video.height.is_some() || video.fps.is_some();

    AppConfig {
        software_fallback: args.no_software_fallback.then_some(false),
        release_camera: args.release_camera.then_some(true),
        video: has_video.then_some(video),
        storage: args.media_dir.clone().map(|dir| StorageConfig {
            media_dir: Some(dir),
            ..StorageConfig::default()
        }),
        ..AppConfig::empty()
    }
}

fn command_exit(result: Result<(), CommandError>, presenter: &Presenter) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(CommandError::Usage(message)) => {
            presenter.error(&message);
            ExitCode::from(EXIT_USAGE_ERROR)
        }
        Err(e) => {
            presenter.error(&e.to_string());
            ExitCode::from(EXIT_ERROR)
        }
    }
}

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let serving = matches!(cli.command, Commands::Serve(_));
    init_tracing(if serving { "info" } else { "warn" });

    let mut presenter = Presenter::new();
    let socket = cli.socket;

    match cli.command {
        Commands::Serve(args) => {
            let config = load_merged_config(serve_config(&args)).await;
            run_daemon(DaemonOptions {
                config,
                socket: SocketPath::resolve(socket),
                pid_file: args.pid_file,
            })
            .await
        }
        Commands::Config { action } => {
            let store = XdgConfigStore::new();
            match handle_config_command(action, &store, &presenter).await {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    presenter.error(&e.to_string());
                    ExitCode::from(EXIT_ERROR)
                }
            }
        }
        Commands::Backends => run_backends(&presenter).await,
        Commands::Release { device } => run_release(device, &presenter).await,
        Commands::Photo { filename } => {
            let result = handle_photo(socket, filename, &presenter).await;
            command_exit(result, &presenter)
        }
        Commands::Record { action } => {
            let result = handle_record(socket, action, &mut presenter).await;
            command_exit(result, &presenter)
        }
        Commands::Status { json } => {
            let result = handle_status(socket, json, &presenter).await;
            command_exit(result, &presenter)
        }
        Commands::Health => {
            let result = handle_health(socket, &presenter).await;
            command_exit(result, &presenter)
        }
        Commands::Media { filename, output } => {
            let result = handle_media(socket, filename, output, &presenter).await;
            command_exit(result, &presenter)
        }
        Commands::Watch => {
            let result = handle_watch(socket, &presenter).await;
            command_exit(result, &presenter)
        }
    }
}
