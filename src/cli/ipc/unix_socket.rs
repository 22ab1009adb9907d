//! Unix Domain Socket transport for daemon control

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use super::protocol::{
    encode_line, ErrorReply, OkReply, PhotoReply, ReplyStatus, Request, StartReply, StopReply,
    SubscribeReply,
};
use crate::application::ports::RecorderEvent;
use crate::application::{CameraError, CameraService};
use crate::infrastructure::ChannelBroadcaster;

const SOCKET_NAME: &str = "skycam.sock";

/// Socket path resolver
#[derive(Debug, Clone)]
pub struct SocketPath {
    path: PathBuf,
}

impl SocketPath {
    /// Create socket path, preferring XDG_RUNTIME_DIR
    pub fn new() -> Self {
        let path = std::env::var("XDG_RUNTIME_DIR")
            .map(|dir| PathBuf::from(dir).join(SOCKET_NAME))
            .unwrap_or_else(|_| std::env::temp_dir().join(SOCKET_NAME));
        Self { path }
    }

    /// Use `path` when given, the default location otherwise
    pub fn resolve(path: Option<PathBuf>) -> Self {
        path.map(Self::from).unwrap_or_default()
    }

    /// Get the socket path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check if socket file exists
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Remove socket file if it exists
    pub fn cleanup(&self) -> io::Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}

impl Default for SocketPath {
    fn default() -> Self {
        Self::new()
    }
}

impl From<PathBuf> for SocketPath {
    fn from(path: PathBuf) -> Self {
        Self { path }
    }
}

/// Unix Domain Socket server for daemon requests
pub struct UnixSocketServer {
    socket_path: SocketPath,
    listener: Option<UnixListener>,
}

impl UnixSocketServer {
    /// Create a new socket server
    pub fn new(socket_path: SocketPath) -> Self {
        Self {
            socket_path,
            listener: None,
        }
    }

    pub fn path(&self) -> &Path {
        self.socket_path.path()
    }

    /// Bind the socket, replacing a stale file but never a live daemon
    pub async fn bind(&mut self) -> io::Result<()> {
        if self.socket_path.exists() {
            if UnixStream::connect(self.socket_path.path()).await.is_ok() {
                return Err(io::Error::new(
                    io::ErrorKind::AddrInUse,
                    format!("{} is served by another daemon", self.path().display()),
                ));
            }
            self.socket_path.cleanup()?;
        }
        if let Some(parent) = self.socket_path.path().parent() {
            std::fs::create_dir_all(parent)?;
        }

        self.listener = Some(UnixListener::bind(self.socket_path.path())?);
        Ok(())
    }

    /// Accept connections until the task is dropped
    pub async fn run(
        &self,
        service: Arc<CameraService>,
        events: ChannelBroadcaster,
    ) -> io::Result<()> {
        let listener = self
            .listener
            .as_ref()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "Socket not bound"))?;

        loop {
            match listener.accept().await {
                Ok((stream, _addr)) => {
                    let service = Arc::clone(&service);
                    let events = events.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, service, events).await {
                            debug!(error = %e, "socket connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    warn!(error = %e, "socket accept error");
                }
            }
        }
    }

    /// Cleanup socket file
    pub fn cleanup(&self) {
        let _ = self.socket_path.cleanup();
    }
}

impl Drop for UnixSocketServer {
    fn drop(&mut self) {
        if self.listener.is_some() {
            self.cleanup();
        }
    }
}

/// Serve one client: any number of requests, one per line
async fn handle_connection(
    stream: UnixStream,
    service: Arc<CameraService>,
    events: ChannelBroadcaster,
) -> io::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<Request>(line) {
            Ok(Request::Subscribe) => return stream_events(lines, writer, events).await,
            Ok(request) => dispatch(&service, request).await,
            Err(e) => {
                debug!(error = %e, "malformed request");
                encode_line(&ErrorReply::bad_request(e.to_string()))
            }
        };

        writer.write_all(response.as_bytes()).await?;
        writer.flush().await?;
    }
    Ok(())
}

fn reply<T: Serialize>(request: &'static str, result: Result<T, CameraError>) -> String {
    match result {
        Ok(body) => encode_line(&OkReply::new(body)),
        Err(e) => {
            if e.is_caller_error() {
                debug!(request, error = %e, "request refused");
            } else {
                warn!(request, error = %e, "request failed");
            }
            encode_line(&ErrorReply::from(&e))
        }
    }
}

async fn dispatch(service: &CameraService, request: Request) -> String {
    match request {
        Request::Photo { filename } => reply(
            "photo",
            service
                .capture_photo(filename.as_deref())
                .await
                .map(PhotoReply::from),
        ),
        Request::Start { filename, duration } => reply(
            "start",
            service
                .start_recording(filename.as_deref(), duration)
                .await
                .map(StartReply::from),
        ),
        Request::Stop => reply(
            "stop",
            service.stop_recording().await.map(StopReply::from),
        ),
        Request::Status => encode_line(&OkReply::new(service.status())),
        Request::Health => encode_line(&OkReply::new(service.health().await)),
        Request::Media { filename } => reply("media", service.locate_media(&filename).await),
        Request::Subscribe => encode_line(&ErrorReply::bad_request(
            "subscribe is only valid as a connection's first streaming request",
        )),
    }
}

/// Forward every event to the client until it hangs up
async fn stream_events(
    mut lines: Lines<BufReader<OwnedReadHalf>>,
    mut writer: OwnedWriteHalf,
    events: ChannelBroadcaster,
) -> io::Result<()> {
    let mut rx = events.subscribe();
    writer
        .write_all(encode_line(&OkReply::new(SubscribeReply { subscribed: true })).as_bytes())
        .await?;
    writer.flush().await?;
    info!(observers = events.observer_count(), "observer subscribed");

    loop {
        tokio::select! {
            event = rx.recv() => match event {
                Ok(event) => {
                    writer.write_all(encode_line(&event).as_bytes()).await?;
                    writer.flush().await?;
                }
                Err(RecvError::Lagged(missed)) => {
                    warn!(missed, "observer lagging, events dropped");
                }
                Err(RecvError::Closed) => return Ok(()),
            },
            line = lines.next_line() => {
                // Anything but EOF from a subscriber is ignored
                if line?.is_none() {
                    debug!("observer disconnected");
                    return Ok(());
                }
            }
        }
    }
}

/// Client-side failures
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("No daemon running at {0}. Start one with: skycam serve")]
    NotRunning(String),

    #[error("Failed to communicate with daemon: {0}")]
    Io(#[from] io::Error),

    #[error("Unexpected reply from daemon: {0}")]
    Protocol(String),

    #[error("{message}")]
    Daemon { code: String, message: String },
}

impl ClientError {
    /// The daemon's error code, if the daemon refused the request
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Daemon { code, .. } => Some(code),
            _ => None,
        }
    }
}

/// Decode one reply line into the expected payload
pub fn decode_reply<T: DeserializeOwned>(line: &str) -> Result<T, ClientError> {
    let value: serde_json::Value =
        serde_json::from_str(line.trim()).map_err(|e| ClientError::Protocol(e.to_string()))?;

    let status: ReplyStatus = value
        .get("status")
        .cloned()
        .ok_or_else(|| ClientError::Protocol("missing status".to_string()))
        .and_then(|s| {
            serde_json::from_value(s).map_err(|e| ClientError::Protocol(e.to_string()))
        })?;

    match status {
        ReplyStatus::Ok => {
            serde_json::from_value(value).map_err(|e| ClientError::Protocol(e.to_string()))
        }
        ReplyStatus::Error => {
            let reply: ErrorReply =
                serde_json::from_value(value).map_err(|e| ClientError::Protocol(e.to_string()))?;
            Err(ClientError::Daemon {
                code: reply.error,
                message: reply.message,
            })
        }
    }
}

/// Unix Domain Socket client for sending requests to the daemon
pub struct UnixSocketClient {
    socket_path: SocketPath,
}

impl UnixSocketClient {
    /// Create a new socket client
    pub fn new(socket_path: SocketPath) -> Self {
        Self { socket_path }
    }

    /// Check if daemon appears to be running (socket exists)
    pub fn is_daemon_running(&self) -> bool {
        self.socket_path.exists()
    }

    async fn connect(&self) -> Result<UnixStream, ClientError> {
        if !self.is_daemon_running() {
            return Err(ClientError::NotRunning(
                self.socket_path.path().display().to_string(),
            ));
        }
        UnixStream::connect(self.socket_path.path())
            .await
            .map_err(|e| match e.kind() {
                io::ErrorKind::ConnectionRefused | io::ErrorKind::NotFound => {
                    ClientError::NotRunning(self.socket_path.path().display().to_string())
                }
                _ => ClientError::Io(e),
            })
    }

    async fn send(writer: &mut OwnedWriteHalf, request: &Request) -> Result<(), ClientError> {
        let mut line =
            serde_json::to_string(request).map_err(|e| ClientError::Protocol(e.to_string()))?;
        line.push('\n');
        writer.write_all(line.as_bytes()).await?;
        writer.flush().await?;
        Ok(())
    }

    /// Send one request and decode its reply
    pub async fn request<T: DeserializeOwned>(&self, request: &Request) -> Result<T, ClientError> {
        let stream = self.connect().await?;
        let (reader, mut writer) = stream.into_split();
        Self::send(&mut writer, request).await?;

        let mut reader = BufReader::new(reader);
        let mut response = String::new();
        if reader.read_line(&mut response).await? == 0 {
            return Err(ClientError::Protocol("daemon closed the connection".to_string()));
        }
        decode_reply(&response)
    }

    /// Subscribe to recorder events
    pub async fn subscribe(&self) -> Result<EventStream, ClientError> {
        let stream = self.connect().await?;
        let (reader, mut writer) = stream.into_split();
        Self::send(&mut writer, &Request::Subscribe).await?;

        let mut lines = BufReader::new(reader).lines();
        let ack = lines
            .next_line()
            .await?
            .ok_or_else(|| ClientError::Protocol("daemon closed the connection".to_string()))?;
        let _: SubscribeReply = decode_reply(&ack)?;

        Ok(EventStream {
            lines,
            _writer: writer,
        })
    }
}

/// Events pushed by the daemon after a subscription
pub struct EventStream {
    lines: Lines<BufReader<OwnedReadHalf>>,
    // Dropping the write half would look like a disconnect
    _writer: OwnedWriteHalf,
}

impl EventStream {
    /// Next event, `None` once the daemon goes away
    pub async fn next_event(&mut self) -> Result<Option<RecorderEvent>, ClientError> {
        match self.lines.next_line().await? {
            Some(line) => serde_json::from_str(&line)
                .map(Some)
                .map_err(|e| ClientError::Protocol(e.to_string())),
            None => Ok(None),
        }
    }
}
