//! Recording controller: sole owner of the recording session.
//!
//! Session fields are only touched inside short critical sections, one per
//! transition. Backend teardown and finalize run outside of them, so a
//! status query never waits behind a slow stop.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration as StdDuration;

use chrono::Local;
use tokio::fs;
use tokio::sync::Notify;
use tokio::task::AbortHandle;
use tracing::{debug, error, info, warn};

use crate::domain::backend::BackendKind;
use crate::domain::media::{secure_join, timestamped_basename};
use crate::domain::recording::{
    CaptureRequest, Duration, LiveRecording, RecordingSession, RecordingState, RecordingStatus,
};

use super::error::CameraError;
use super::finalize::{finalize, FinalizeOutcome};
use super::ports::{
    CameraBackend, MediaStorage, RecorderEvent, RecordingHandle, Remuxer, StatusBroadcaster,
};

/// Bound on waiting for an in-flight start or stop at shutdown. Covers a
/// full teardown escalation plus the default transcode timeout.
pub const SHUTDOWN_SETTLE_TIMEOUT: StdDuration = StdDuration::from_secs(75);

/// A recording that went live
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartedRecording {
    pub backend: BackendKind,
    /// Path promised to the caller once the recording is finalized
    pub file: PathBuf,
    pub raw_file: PathBuf,
}

/// A recording that was torn down and finalized
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoppedRecording {
    pub backend: BackendKind,
    pub outcome: FinalizeOutcome,
}

impl StoppedRecording {
    pub fn file(&self) -> &Path {
        self.outcome.path()
    }
}

#[derive(Debug, Clone, Copy)]
enum StopOrigin {
    Client,
    AutoStop { generation: u64 },
}

struct Shared {
    session: RecordingSession,
    auto_stop: Option<AbortHandle>,
}

struct Inner {
    backends: Vec<Arc<dyn CameraBackend>>,
    storage: Arc<dyn MediaStorage>,
    remuxer: Arc<dyn Remuxer>,
    broadcaster: Arc<dyn StatusBroadcaster>,
    fps: u32,
    shared: Mutex<Shared>,
    handle: tokio::sync::Mutex<Option<Box<dyn RecordingHandle>>>,
    // Signalled whenever Starting or Stopping is left
    settled: Notify,
}

/// Owns zero or one active recording.
///
/// Cheap to clone; clones share the same session.
#[derive(Clone)]
pub struct RecordingController {
    inner: Arc<Inner>,
}

impl RecordingController {
    /// `backends` must already be in priority order
    pub fn new(
        backends: Vec<Arc<dyn CameraBackend>>,
        storage: Arc<dyn MediaStorage>,
        remuxer: Arc<dyn Remuxer>,
        broadcaster: Arc<dyn StatusBroadcaster>,
        fps: u32,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                backends,
                storage,
                remuxer,
                broadcaster,
                fps,
                shared: Mutex::new(Shared {
                    session: RecordingSession::new(),
                    auto_stop: None,
                }),
                handle: tokio::sync::Mutex::new(None),
                settled: Notify::new(),
            }),
        }
    }

    /// Start a recording on the first backend that comes up.
    ///
    /// Runs on its own task so a dropped caller cannot strand the session
    /// half-way through a transition.
    pub async fn start(&self, request: CaptureRequest) -> Result<StartedRecording, CameraError> {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move { inner.start(request).await })
            .await
            .map_err(|e| CameraError::RecordingUnavailable(format!("start task failed: {}", e)))?
    }

    /// Stop the active recording and finalize its file
    pub async fn stop(&self) -> Result<StoppedRecording, CameraError> {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move { inner.stop(StopOrigin::Client).await })
            .await
            .map_err(|e| CameraError::RecordingUnavailable(format!("stop task failed: {}", e)))?
    }

    /// Consistent snapshot; never blocks behind a stop in progress
    pub fn status(&self) -> RecordingStatus {
        let mut status = self.inner.shared().session.snapshot();
        if status.recording {
            if let Ok(mut guard) = self.inner.handle.try_lock() {
                status.backend_alive = guard.as_mut().map(|h| h.is_alive());
            }
        }
        status
    }

    pub fn is_idle(&self) -> bool {
        self.inner.shared().session.is_idle()
    }

    /// Stop whatever is recording, for process shutdown.
    ///
    /// A start or stop already in flight is waited for, so this only returns
    /// once the session is idle (or the wait timed out).
    pub async fn shutdown(&self) -> Option<StoppedRecording> {
        self.shutdown_within(SHUTDOWN_SETTLE_TIMEOUT).await
    }

    async fn shutdown_within(&self, limit: StdDuration) -> Option<StoppedRecording> {
        let deadline = tokio::time::Instant::now() + limit;
        loop {
            let settled = self.inner.settled.notified();
            tokio::pin!(settled);
            // Registered before reading the state so a transition in between is not missed
            settled.as_mut().enable();

            let state = self.inner.shared().session.state();
            match state {
                RecordingState::Idle => return None,
                RecordingState::Active => match self.stop().await {
                    Ok(stopped) => return Some(stopped),
                    // Someone else got to it first; wait for their stop
                    Err(CameraError::NoActiveRecording) => continue,
                    Err(e) => {
                        warn!(error = %e, "failed to stop recording during shutdown");
                        return None;
                    }
                },
                RecordingState::Starting | RecordingState::Stopping => {
                    info!(state = state.as_str(), "waiting for recording transition to finish");
                    if tokio::time::timeout_at(deadline, settled).await.is_err() {
                        warn!(
                            state = state.as_str(),
                            "recording transition still running at shutdown"
                        );
                        return None;
                    }
                }
            }
        }
    }
}

impl Inner {
    fn shared(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn publish(&self, event: RecorderEvent) {
        let name = event.name();
        if let Err(e) = self.broadcaster.publish(event) {
            debug!(event = name, error = %e, "event not delivered");
        }
    }

    async fn start(self: &Arc<Self>, request: CaptureRequest) -> Result<StartedRecording, CameraError> {
        let generation = {
            let mut shared = self.shared();
            let generation = shared
                .session
                .begin_start()
                .map_err(|_| CameraError::AlreadyRecording)?;
            // A timer from an earlier session must not outlive this transition
            if let Some(stale) = shared.auto_stop.take() {
                stale.abort();
            }
            generation
        };

        match self.launch(&request).await {
            Ok((handle, live)) => Ok(self.go_live(generation, handle, live, request.duration()).await),
            Err(e) => {
                let aborted = self.shared().session.abort_start();
                self.settled.notify_waiters();
                if let Err(t) = aborted {
                    error!(error = %t, "failed to roll back recording start");
                }
                warn!(error = %e, "recording start failed");
                Err(e)
            }
        }
    }

    /// Try each backend in priority order until one goes live
    async fn launch(
        &self,
        request: &CaptureRequest,
    ) -> Result<(Box<dyn RecordingHandle>, LiveRecording), CameraError> {
        if self.backends.is_empty() {
            return Err(CameraError::RecordingUnavailable(
                "no capture backend available".to_string(),
            ));
        }

        let root = self
            .storage
            .media_root()
            .await
            .map_err(|e| CameraError::RecordingUnavailable(e.to_string()))?;

        let basename = request
            .basename()
            .map(str::to_string)
            .unwrap_or_else(|| timestamped_basename("video", Local::now()));

        let mut failures = Vec::new();
        // Raw files a failed attempt could not clean up, possibly still held
        // by an abandoned capture thread
        let mut leftovers: Vec<PathBuf> = Vec::new();
        for backend in &self.backends {
            let kind = backend.kind();
            let raw_kind = kind.raw_output();
            let mut raw_path = secure_join(
                &root.videos,
                &format!("{}.{}", basename, raw_kind.extension()),
            )?;
            if leftovers.contains(&raw_path) {
                raw_path = secure_join(
                    &root.videos,
                    &format!("{}_{}.{}", basename, kind, raw_kind.extension()),
                )?;
            }
            let final_path = if raw_kind.needs_remux() && self.remuxer.is_available() {
                secure_join(
                    &root.videos,
                    &format!("{}.{}", basename, raw_kind.remux_target().extension()),
                )?
            } else {
                raw_path.clone()
            };

            debug!(backend = %kind, raw = %raw_path.display(), "starting recording backend");
            match backend.start_recording(&raw_path).await {
                Ok(handle) => {
                    return Ok((
                        handle,
                        LiveRecording {
                            backend: kind,
                            raw_path,
                            final_path,
                        },
                    ))
                }
                Err(e) => {
                    warn!(backend = %kind, error = %e, "backend failed to start, trying next");
                    discard_empty(&raw_path).await;
                    if fs::try_exists(&raw_path).await.unwrap_or(true) {
                        leftovers.push(raw_path);
                    }
                    failures.push(format!("{}: {}", kind, e));
                }
            }
        }

        Err(CameraError::RecordingUnavailable(failures.join("; ")))
    }

    async fn go_live(
        self: &Arc<Self>,
        generation: u64,
        handle: Box<dyn RecordingHandle>,
        live: LiveRecording,
        duration: Option<Duration>,
    ) -> StartedRecording {
        // Stored before ACTIVE so any stop that sees ACTIVE finds the handle
        *self.handle.lock().await = Some(handle);

        let started_at = {
            let mut shared = self.shared();
            if let Err(e) = shared.session.activate(live.clone()) {
                error!(error = %e, "failed to activate recording session");
            }
            if let Some(after) = duration {
                shared.auto_stop = Some(self.arm_auto_stop(generation, after));
            }
            shared.session.snapshot().started_at
        };
        self.settled.notify_waiters();

        info!(
            backend = %live.backend,
            file = %live.final_path.display(),
            duration = duration.map(|d| d.as_secs()),
            "recording started"
        );
        self.publish(RecorderEvent::RecordingStarted {
            backend: live.backend.to_string(),
            file: live.final_path.clone(),
            raw_file: live.raw_path.clone(),
            started_at: started_at.unwrap_or_else(Local::now),
        });

        StartedRecording {
            backend: live.backend,
            file: live.final_path,
            raw_file: live.raw_path,
        }
    }

    fn arm_auto_stop(self: &Arc<Self>, generation: u64, after: Duration) -> AbortHandle {
        let weak: Weak<Inner> = Arc::downgrade(self);
        let task = tokio::spawn(async move {
            tokio::time::sleep(after.as_std()).await;
            let Some(inner) = weak.upgrade() else {
                return;
            };
            info!(seconds = after.as_secs(), "recording duration elapsed");
            match inner.stop(StopOrigin::AutoStop { generation }).await {
                Ok(stopped) => debug!(file = %stopped.file().display(), "auto-stop complete"),
                Err(CameraError::NoActiveRecording) => {
                    debug!("auto-stop found the recording already stopped")
                }
                Err(e) => warn!(error = %e, "auto-stop failed"),
            }
        });
        task.abort_handle()
    }

    async fn stop(self: &Arc<Self>, origin: StopOrigin) -> Result<StoppedRecording, CameraError> {
        let live = {
            let mut shared = self.shared();
            if let StopOrigin::AutoStop { generation } = origin {
                if generation != shared.session.generation() {
                    return Err(CameraError::NoActiveRecording);
                }
            }
            let live = shared
                .session
                .begin_stop()
                .map_err(|_| CameraError::NoActiveRecording)?;
            // The auto-stop task is the caller itself when it fired
            if let Some(timer) = shared.auto_stop.take() {
                if matches!(origin, StopOrigin::Client) {
                    timer.abort();
                }
            }
            live
        };

        info!(backend = %live.backend, "stopping recording");
        self.publish(RecorderEvent::RecordingStopping {
            backend: live.backend.to_string(),
        });

        let handle = self.handle.lock().await.take();
        match handle {
            Some(mut handle) => {
                let report = handle.teardown().await;
                for warning in &report.warnings {
                    warn!(backend = %live.backend, %warning, "backend teardown warning");
                }
                debug!(backend = %live.backend, method = report.method.as_str(), "backend released");
            }
            None => warn!(backend = %live.backend, "no backend handle for the active recording"),
        }
        self.storage.sync().await;

        let outcome = finalize(
            self.remuxer.as_ref(),
            &live.raw_path,
            &live.final_path,
            self.fps,
        )
        .await;
        if let Some(warning) = outcome.warning() {
            warn!(raw = %live.raw_path.display(), %warning, "finalize warning");
            self.publish(RecorderEvent::FinalizeWarning {
                raw_file: live.raw_path.clone(),
                reason: warning.to_string(),
            });
        }
        if matches!(outcome, FinalizeOutcome::Remuxed(_)) {
            self.storage.sync().await;
        }

        {
            let mut shared = self.shared();
            if let Err(e) = shared.session.finish_stop(outcome.path().to_path_buf()) {
                error!(error = %e, "recording session left the stopping state early");
            }
        }
        self.settled.notify_waiters();

        info!(backend = %live.backend, file = %outcome.path().display(), "recording stopped");
        self.publish(RecorderEvent::RecordingStopped {
            backend: live.backend.to_string(),
            file: outcome.path().to_path_buf(),
            finalized: outcome.finalized(),
        });

        Ok(StoppedRecording {
            backend: live.backend,
            outcome,
        })
    }
}

/// Remove a zero-byte file a failed backend left behind
async fn discard_empty(path: &Path) {
    if let Ok(meta) = fs::metadata(path).await {
        if meta.len() == 0 {
            if let Err(e) = fs::remove_file(path).await {
                debug!(path = %path.display(), error = %e, "could not remove empty output");
            }
        }
    }
}
