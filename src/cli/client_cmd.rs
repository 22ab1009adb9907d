//! Client subcommands: talk to a running daemon over its socket

use std::path::PathBuf;

use crate::application::{HealthReport, MediaFile};
use crate::domain::recording::{Duration, RecordingStatus};

use super::args::RecordAction;
use super::ipc::{
    ClientError, PhotoReply, Request, SocketPath, StartReply, StopReply, UnixSocketClient,
};
use super::presenter::Presenter;

/// Client command failures
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// Bad arguments, detected before contacting the daemon
    #[error("{0}")]
    Usage(String),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("Failed to copy to {}: {source}", .path.display())]
    Copy {
        path: PathBuf,
        source: std::io::Error,
    },
}

fn client(socket: Option<PathBuf>) -> UnixSocketClient {
    UnixSocketClient::new(SocketPath::resolve(socket))
}

pub async fn handle_photo(
    socket: Option<PathBuf>,
    filename: Option<String>,
    presenter: &Presenter,
) -> Result<(), CommandError> {
    let reply: PhotoReply = client(socket)
        .request(&Request::Photo { filename })
        .await?;
    presenter.success(&format!("Photo captured ({})", reply.backend));
    presenter.output(&reply.file.display().to_string());
    Ok(())
}

pub async fn handle_record(
    socket: Option<PathBuf>,
    action: RecordAction,
    presenter: &mut Presenter,
) -> Result<(), CommandError> {
    let client = client(socket);
    match action {
        RecordAction::Start { name, duration } => {
            let duration = duration
                .map(|d| {
                    d.parse::<Duration>()
                        .map_err(|e| CommandError::Usage(format!("Invalid duration: {}", e)))
                })
                .transpose()?;
            let request = Request::Start {
                filename: name,
                duration: duration.map(|d| d.as_secs() as i64),
            };

            let reply: StartReply = client.request(&request).await?;
            match duration {
                Some(d) => presenter.success(&format!(
                    "Recording with {} (auto-stop after {})",
                    reply.backend, d
                )),
                None => presenter.success(&format!("Recording with {}", reply.backend)),
            }
            presenter.output(&reply.file.display().to_string());
        }
        RecordAction::Stop => {
            presenter.start_spinner("Stopping and finalizing...");
            let result: Result<StopReply, _> = client.request(&Request::Stop).await;
            match result {
                Ok(reply) => {
                    presenter.spinner_success(&format!("Recording stopped ({})", reply.backend));
                    if let Some(warning) = &reply.warning {
                        presenter.warn(warning);
                    }
                    presenter.output(&reply.file.display().to_string());
                }
                Err(e) => {
                    presenter.spinner_fail("Stop failed");
                    return Err(e.into());
                }
            }
        }
    }
    Ok(())
}

pub async fn handle_status(
    socket: Option<PathBuf>,
    json: bool,
    presenter: &Presenter,
) -> Result<(), CommandError> {
    let status: RecordingStatus = client(socket).request(&Request::Status).await?;
    if json {
        let text = serde_json::to_string_pretty(&status)
            .map_err(|e| ClientError::Protocol(e.to_string()))?;
        presenter.output(&text);
    } else {
        presenter.status(&status);
    }
    Ok(())
}

pub async fn handle_health(
    socket: Option<PathBuf>,
    presenter: &Presenter,
) -> Result<(), CommandError> {
    let report: HealthReport = client(socket).request(&Request::Health).await?;
    presenter.health(&report);
    Ok(())
}

/// Print where a stored file is, or copy it to `output`
pub async fn handle_media(
    socket: Option<PathBuf>,
    filename: String,
    output: Option<PathBuf>,
    presenter: &Presenter,
) -> Result<(), CommandError> {
    let media: MediaFile = client(socket)
        .request(&Request::Media { filename })
        .await?;

    match output {
        Some(dest) => {
            tokio::fs::copy(&media.file, &dest)
                .await
                .map_err(|source| CommandError::Copy {
                    path: dest.clone(),
                    source,
                })?;
            presenter.success(&format!(
                "Copied {} ({} bytes)",
                media.file.display(),
                media.size
            ));
            presenter.output(&dest.display().to_string());
        }
        None => presenter.output(&media.file.display().to_string()),
    }
    Ok(())
}

/// Print events until the daemon goes away or the user interrupts
pub async fn handle_watch(
    socket: Option<PathBuf>,
    presenter: &Presenter,
) -> Result<(), CommandError> {
    let mut events = client(socket).subscribe().await?;
    presenter.info("Watching recorder events (Ctrl+C to quit)");

    loop {
        tokio::select! {
            event = events.next_event() => match event? {
                Some(event) => presenter.event(&event),
                None => {
                    presenter.warn("Daemon closed the connection");
                    return Ok(());
                }
            },
            _ = tokio::signal::ctrl_c() => return Ok(()),
        }
    }
}
