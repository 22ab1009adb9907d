//! In-process capture worker: a dedicated thread that pulls frames from a
//! source and appends them to the raw file

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use tokio::sync::oneshot;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::application::ports::{
    BackendError, RecordingHandle, StopMethod, TeardownReport, TeardownWarning,
};
use crate::domain::backend::{BackendKind, BackendShape};

/// Bound on joining the capture thread at teardown
pub const JOIN_TIMEOUT: StdDuration = StdDuration::from_secs(5);

/// Bound on waiting for the first frame
pub const READY_TIMEOUT: StdDuration = StdDuration::from_secs(10);

/// A blocking frame producer owned by the capture thread
pub trait FrameSource {
    /// Block until the next encoded frame is available.
    ///
    /// Returns `Ok(None)` when nothing arrived within the source's poll
    /// interval, so the capture thread can look at its stop flag.
    fn next_frame(&mut self) -> Result<Option<Vec<u8>>, String>;

    /// End streaming
    fn stop(&mut self) -> Result<(), String> {
        Ok(())
    }

    /// Release the device. Attempted even when `stop` failed.
    fn close(&mut self) -> Result<(), String> {
        Ok(())
    }
}

/// What the capture thread reports when it ends
#[derive(Debug, Default)]
struct WorkerSummary {
    frames: u64,
    error: Option<String>,
    stop_error: Option<String>,
    close_error: Option<String>,
}

pub type SourceOpener = Box<dyn FnOnce() -> Result<Box<dyn FrameSource>, String> + Send>;

/// Handle to a running capture thread
pub struct FrameWorker {
    kind: BackendKind,
    stop: Arc<AtomicBool>,
    thread: Option<thread::JoinHandle<WorkerSummary>>,
}

impl FrameWorker {
    /// Spawn the capture thread and wait until the first frame is on disk.
    ///
    /// `open` runs on the capture thread, so the source never crosses threads.
    pub async fn start(
        kind: BackendKind,
        raw_path: &Path,
        open: SourceOpener,
    ) -> Result<Self, BackendError> {
        let stop = Arc::new(AtomicBool::new(false));
        let (ready_tx, ready_rx) = oneshot::channel();
        let path = raw_path.to_path_buf();
        let thread_stop = Arc::clone(&stop);

        let thread = thread::Builder::new()
            .name(format!("{}-capture", kind))
            .spawn(move || capture_loop(kind, path, open, thread_stop, ready_tx))
            .map_err(|e| BackendError::StartFailed(e.to_string()))?;

        let mut worker = Self {
            kind,
            stop,
            thread: Some(thread),
        };

        let failure = match timeout(READY_TIMEOUT, ready_rx).await {
            Ok(Ok(Ok(()))) => return Ok(worker),
            Ok(Ok(Err(reason))) => BackendError::Device(reason),
            Ok(Err(_)) => BackendError::StartFailed("capture thread ended early".to_string()),
            Err(_) => BackendError::Timeout(READY_TIMEOUT.as_secs()),
        };

        // Release whatever the thread managed to acquire
        let report = worker.teardown().await;
        for warning in report.warnings {
            debug!(backend = %kind, %warning, "cleanup after failed start");
        }
        Err(failure)
    }

    fn request_stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }
}

impl Drop for FrameWorker {
    fn drop(&mut self) {
        self.request_stop();
    }
}

fn capture_loop(
    kind: BackendKind,
    path: PathBuf,
    open: SourceOpener,
    stop: Arc<AtomicBool>,
    ready: oneshot::Sender<Result<(), String>>,
) -> WorkerSummary {
    let mut ready = Some(ready);
    let mut summary = WorkerSummary::default();

    let fail = |ready: &mut Option<oneshot::Sender<Result<(), String>>>, reason: String| {
        if let Some(tx) = ready.take() {
            let _ = tx.send(Err(reason.clone()));
        }
        reason
    };

    let mut source = match open() {
        Ok(source) => source,
        Err(e) => {
            summary.error = Some(fail(&mut ready, e));
            return summary;
        }
    };

    let mut out = match File::create(&path) {
        Ok(file) => BufWriter::new(file),
        Err(e) => {
            summary.error = Some(fail(&mut ready, format!("{}: {}", path.display(), e)));
            summary.close_error = source.close().err();
            return summary;
        }
    };

    while !stop.load(Ordering::SeqCst) {
        let frame = match source.next_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => continue,
            Err(e) => {
                summary.error = Some(fail(&mut ready, e));
                break;
            }
        };
        if let Err(e) = out.write_all(&frame) {
            summary.error = Some(fail(&mut ready, e.to_string()));
            break;
        }
        summary.frames += 1;

        if let Some(tx) = ready.take() {
            if let Err(e) = out.flush() {
                summary.error = Some(fail(&mut Some(tx), e.to_string()));
                break;
            }
            let _ = tx.send(Ok(()));
            info!(backend = %kind, path = %path.display(), "first frame written");
        }
    }

    if let Err(e) = out.flush().and_then(|_| out.get_ref().sync_all()) {
        warn!(backend = %kind, error = %e, "failed to flush capture file");
    }
    summary.stop_error = source.stop().err();
    summary.close_error = source.close().err();
    summary
}

#[async_trait]
impl RecordingHandle for FrameWorker {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    fn is_alive(&mut self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    async fn teardown(&mut self) -> TeardownReport {
        self.request_stop();
        let Some(thread) = self.thread.take() else {
            return TeardownReport::clean(StopMethod::AlreadyExited);
        };

        let joined = timeout(JOIN_TIMEOUT, tokio::task::spawn_blocking(move || thread.join())).await;
        let summary = match joined {
            Ok(Ok(Ok(summary))) => summary,
            Ok(Ok(Err(_))) => {
                return TeardownReport {
                    method: StopMethod::Abandoned,
                    warnings: vec![TeardownWarning::WorkerFailed(
                        "capture thread panicked".to_string(),
                    )],
                }
            }
            Ok(Err(e)) => {
                return TeardownReport {
                    method: StopMethod::Abandoned,
                    warnings: vec![TeardownWarning::WorkerFailed(e.to_string())],
                }
            }
            Err(_) => {
                return TeardownReport {
                    method: StopMethod::Abandoned,
                    warnings: vec![TeardownWarning::WorkerJoinTimedOut],
                }
            }
        };

        debug!(backend = %self.kind, frames = summary.frames, "capture thread finished");
        let mut warnings = Vec::new();
        if let Some(e) = summary.error {
            warnings.push(TeardownWarning::WorkerFailed(e));
        }
        if let Some(e) = summary.stop_error {
            warnings.push(TeardownWarning::StopFailed(e));
        }
        if let Some(e) = summary.close_error {
            warnings.push(TeardownWarning::CloseFailed(e));
        }

        let method = match self.kind.shape() {
            BackendShape::Native => StopMethod::Closed,
            _ => StopMethod::Joined,
        };
        TeardownReport { method, warnings }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    struct Counter {
        n: u8,
        fail_after: Option<u8>,
        fail_stop: bool,
    }

    impl FrameSource for Counter {
        fn next_frame(&mut self) -> Result<Option<Vec<u8>>, String> {
            if self.fail_after == Some(self.n) {
                return Err("sensor unplugged".to_string());
            }
            self.n = self.n.wrapping_add(1);
            thread::sleep(StdDuration::from_millis(10));
            Ok(Some(vec![self.n; 4]))
        }

        fn stop(&mut self) -> Result<(), String> {
            if self.fail_stop {
                Err("VIDIOC_STREAMOFF failed".to_string())
            } else {
                Ok(())
            }
        }
    }

    fn opener(fail_after: Option<u8>, fail_stop: bool) -> SourceOpener {
        Box::new(move || {
            Ok(Box::new(Counter {
                n: 0,
                fail_after,
                fail_stop,
            }) as Box<dyn FrameSource>)
        })
    }

    #[tokio::test]
    async fn writes_frames_until_stopped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.mjpeg");

        let mut worker = FrameWorker::start(BackendKind::Software, &path, opener(None, false))
            .await
            .unwrap();
        // Ready means the first frame is already on disk
        assert!(std::fs::metadata(&path).unwrap().len() >= 4);
        assert!(worker.is_alive());

        tokio::time::sleep(StdDuration::from_millis(50)).await;
        let report = worker.teardown().await;
        assert_eq!(report.method, StopMethod::Joined);
        assert!(report.warnings.is_empty());
        assert!(!worker.is_alive());
        assert!(std::fs::metadata(&path).unwrap().len() > 4);
    }

    #[tokio::test]
    async fn open_failure_is_start_failure() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.h264");
        let open: SourceOpener = Box::new(|| Err("no such device".to_string()));

        let err = FrameWorker::start(BackendKind::V4l2, &path, open)
            .await
            .err()
            .unwrap();
        assert!(matches!(err, BackendError::Device(ref r) if r == "no such device"));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn first_frame_failure_is_start_failure() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.h264");
        let err = FrameWorker::start(BackendKind::V4l2, &path, opener(Some(0), false))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, BackendError::Device(_)));
    }

    #[tokio::test]
    async fn native_teardown_reports_stop_failure_and_still_closes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.h264");
        let mut worker = FrameWorker::start(BackendKind::V4l2, &path, opener(None, true))
            .await
            .unwrap();

        let report = worker.teardown().await;
        assert_eq!(report.method, StopMethod::Closed);
        assert_eq!(
            report.warnings,
            vec![TeardownWarning::StopFailed("VIDIOC_STREAMOFF failed".to_string())]
        );

        let again = worker.teardown().await;
        assert_eq!(again.method, StopMethod::AlreadyExited);
    }

    /// Delivers one frame, then stalls like a sensor that stopped streaming
    struct Stalled {
        sent: bool,
    }

    impl FrameSource for Stalled {
        fn next_frame(&mut self) -> Result<Option<Vec<u8>>, String> {
            if !self.sent {
                self.sent = true;
                return Ok(Some(vec![0xff; 8]));
            }
            thread::sleep(StdDuration::from_millis(20));
            Ok(None)
        }
    }

    #[tokio::test]
    async fn stalled_source_still_joins() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.h264");
        let open: SourceOpener =
            Box::new(|| Ok(Box::new(Stalled { sent: false }) as Box<dyn FrameSource>));
        let mut worker = FrameWorker::start(BackendKind::V4l2, &path, open)
            .await
            .unwrap();

        tokio::time::sleep(StdDuration::from_millis(100)).await;
        let started = std::time::Instant::now();
        let report = worker.teardown().await;
        assert_eq!(report.method, StopMethod::Closed);
        assert!(report.warnings.is_empty());
        assert!(started.elapsed() < StdDuration::from_secs(1));
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 8);
    }
}
