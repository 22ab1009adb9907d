//! External capture process plumbing: startup grace, stderr drain,
//! escalating teardown and bounded one-shot commands

use std::path::Path;
use std::process::Stdio;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStderr, Command};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::application::ports::{
    BackendError, RecordingHandle, StopMethod, TeardownReport, TeardownWarning,
};
use crate::domain::backend::BackendKind;

/// How long a freshly spawned recorder must survive to count as started
pub const STARTUP_GRACE: StdDuration = StdDuration::from_millis(500);

/// Upper bound for a single still-capture command
pub const STILL_TIMEOUT: StdDuration = StdDuration::from_secs(30);

/// Bounded waits for each teardown step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TeardownPolicy {
    pub interrupt_wait: StdDuration,
    pub terminate_wait: StdDuration,
    pub kill_wait: StdDuration,
}

impl Default for TeardownPolicy {
    fn default() -> Self {
        Self {
            interrupt_wait: StdDuration::from_secs(2),
            terminate_wait: StdDuration::from_secs(2),
            kill_wait: StdDuration::from_secs(1),
        }
    }
}

fn spawn_error(program: &Path, e: std::io::Error) -> BackendError {
    if e.kind() == std::io::ErrorKind::NotFound {
        BackendError::ToolNotFound(program.display().to_string())
    } else {
        BackendError::StartFailed(e.to_string())
    }
}

/// Log every stderr line at debug level, keeping the last one as the
/// failure reason
async fn drain_stderr(kind: BackendKind, stderr: ChildStderr) -> Option<String> {
    let mut lines = BufReader::new(stderr).lines();
    let mut last = None;
    while let Ok(Some(line)) = lines.next_line().await {
        let line = line.trim().to_string();
        if line.is_empty() {
            continue;
        }
        debug!(backend = %kind, "{}", line);
        last = Some(line);
    }
    last
}

async fn last_stderr_line(task: Option<JoinHandle<Option<String>>>) -> Option<String> {
    let task = task?;
    match timeout(StdDuration::from_secs(1), task).await {
        Ok(Ok(line)) => line,
        _ => None,
    }
}

fn send_signal(child: &Child, sig: Signal) -> Result<(), TeardownWarning> {
    if let Some(id) = child.id() {
        signal::kill(Pid::from_raw(id as i32), sig).map_err(|e| TeardownWarning::SignalFailed {
            signal: sig.as_str(),
            reason: e.to_string(),
        })?;
    }
    Ok(())
}

/// Interrupt, then terminate, then kill, waiting a bounded time after each.
/// The first step after which the process exits ends the escalation.
pub async fn escalate(child: &mut Child, policy: &TeardownPolicy) -> TeardownReport {
    if let Ok(Some(_)) = child.try_wait() {
        return TeardownReport::clean(StopMethod::AlreadyExited);
    }

    let steps = [
        (Signal::SIGINT, policy.interrupt_wait, StopMethod::Interrupt),
        (Signal::SIGTERM, policy.terminate_wait, StopMethod::Terminate),
        (Signal::SIGKILL, policy.kill_wait, StopMethod::Kill),
    ];

    let mut warnings = Vec::new();
    for (sig, wait, method) in steps {
        if let Err(warning) = send_signal(child, sig) {
            warnings.push(warning);
        }
        match timeout(wait, child.wait()).await {
            Ok(Ok(status)) => {
                debug!(signal = sig.as_str(), %status, "capture process exited");
                return TeardownReport { method, warnings };
            }
            Ok(Err(e)) => {
                warnings.push(TeardownWarning::StopFailed(e.to_string()));
                return TeardownReport { method, warnings };
            }
            Err(_) => warnings.push(TeardownWarning::WaitTimedOut(sig.as_str())),
        }
    }

    TeardownReport {
        method: StopMethod::Abandoned,
        warnings,
    }
}

/// A recording driven by an external OS process
pub struct ProcessRecording {
    kind: BackendKind,
    child: Option<Child>,
    stderr: Option<JoinHandle<Option<String>>>,
    policy: TeardownPolicy,
}

impl ProcessRecording {
    /// Spawn `program` and wait out the startup grace. A process that is
    /// already gone by then is an initialization failure.
    pub async fn spawn(
        kind: BackendKind,
        program: &Path,
        args: &[String],
        grace: StdDuration,
        policy: TeardownPolicy,
    ) -> Result<Self, BackendError> {
        debug!(backend = %kind, program = %program.display(), ?args, "spawning capture process");
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| spawn_error(program, e))?;

        let stderr = child
            .stderr
            .take()
            .map(|s| tokio::spawn(drain_stderr(kind, s)));

        tokio::time::sleep(grace).await;

        match child.try_wait() {
            Ok(None) => Ok(Self {
                kind,
                child: Some(child),
                stderr,
                policy,
            }),
            Ok(Some(status)) => {
                let reason = last_stderr_line(stderr)
                    .await
                    .unwrap_or_else(|| format!("exited with {}", status));
                Err(BackendError::ExitedEarly(reason))
            }
            Err(e) => {
                let _ = child.start_kill();
                let _ = timeout(policy.kill_wait, child.wait()).await;
                Err(BackendError::StartFailed(e.to_string()))
            }
        }
    }
}

#[async_trait]
impl RecordingHandle for ProcessRecording {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    fn is_alive(&mut self) -> bool {
        self.child
            .as_mut()
            .map(|c| matches!(c.try_wait(), Ok(None)))
            .unwrap_or(false)
    }

    async fn teardown(&mut self) -> TeardownReport {
        let Some(mut child) = self.child.take() else {
            return TeardownReport::clean(StopMethod::AlreadyExited);
        };
        let report = escalate(&mut child, &self.policy).await;
        if let Some(line) = last_stderr_line(self.stderr.take()).await {
            debug!(backend = %self.kind, last = %line, "capture process stderr");
        }
        report
    }
}

/// Run a one-shot capture command, killing it if it outlives `limit`
pub async fn run_capture_command(
    program: &Path,
    args: &[String],
    limit: StdDuration,
) -> Result<(), BackendError> {
    debug!(program = %program.display(), ?args, "running capture command");
    let child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| spawn_error(program, e))?;

    let output = match timeout(limit, child.wait_with_output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => return Err(BackendError::CaptureFailed(e.to_string())),
        Err(_) => {
            warn!(program = %program.display(), "capture command timed out");
            return Err(BackendError::Timeout(limit.as_secs()));
        }
    };

    if output.status.success() {
        return Ok(());
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    let reason = stderr
        .lines()
        .rev()
        .find(|l| !l.trim().is_empty())
        .map(|l| l.trim().to_string())
        .unwrap_or_else(|| format!("exited with {}", output.status));
    Err(BackendError::CaptureFailed(reason))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn sh(script: &str) -> (PathBuf, Vec<String>) {
        (
            PathBuf::from("sh"),
            vec!["-c".to_string(), script.to_string()],
        )
    }

    fn quick_policy() -> TeardownPolicy {
        TeardownPolicy {
            interrupt_wait: StdDuration::from_millis(300),
            terminate_wait: StdDuration::from_millis(300),
            kill_wait: StdDuration::from_millis(300),
        }
    }

    async fn spawn(script: &str) -> Result<ProcessRecording, BackendError> {
        let (program, args) = sh(script);
        ProcessRecording::spawn(
            BackendKind::Ffmpeg,
            &program,
            &args,
            StdDuration::from_millis(100),
            quick_policy(),
        )
        .await
    }

    #[tokio::test]
    async fn interrupt_stops_cooperative_process() {
        let mut rec = spawn("exec sleep 10").await.unwrap();
        assert!(rec.is_alive());

        let report = rec.teardown().await;
        assert_eq!(report.method, StopMethod::Interrupt);
        assert!(report.warnings.is_empty());
        assert!(!rec.is_alive());
    }

    #[tokio::test]
    async fn escalates_to_terminate() {
        let mut rec = spawn("trap '' INT; exec sleep 10").await.unwrap();
        let report = rec.teardown().await;
        assert_eq!(report.method, StopMethod::Terminate);
        assert_eq!(report.warnings, vec![TeardownWarning::WaitTimedOut("SIGINT")]);
    }

    #[tokio::test]
    async fn escalates_to_kill() {
        let mut rec = spawn("trap '' INT TERM; exec sleep 10").await.unwrap();
        let report = rec.teardown().await;
        assert_eq!(report.method, StopMethod::Kill);
        assert_eq!(report.warnings.len(), 2);
    }

    #[tokio::test]
    async fn teardown_twice_is_noop() {
        let mut rec = spawn("exec sleep 10").await.unwrap();
        rec.teardown().await;
        let report = rec.teardown().await;
        assert_eq!(report.method, StopMethod::AlreadyExited);
    }

    #[tokio::test]
    async fn early_exit_is_start_failure() {
        let err = spawn("echo 'no cameras available' >&2; exit 1")
            .await
            .err()
            .unwrap();
        match err {
            BackendError::ExitedEarly(reason) => assert_eq!(reason, "no cameras available"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_program_is_tool_not_found() {
        let err = ProcessRecording::spawn(
            BackendKind::Libcamera,
            Path::new("/nonexistent/rpicam-vid"),
            &[],
            StdDuration::from_millis(10),
            quick_policy(),
        )
        .await
        .err()
        .unwrap();
        assert!(matches!(err, BackendError::ToolNotFound(_)));
    }

    #[tokio::test]
    async fn capture_command_success() {
        let (program, args) = sh("exit 0");
        run_capture_command(&program, &args, StdDuration::from_secs(5))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn capture_command_failure_reports_stderr() {
        let (program, args) = sh("echo 'device busy' >&2; exit 2");
        let err = run_capture_command(&program, &args, StdDuration::from_secs(5))
            .await
            .unwrap_err();
        match err {
            BackendError::CaptureFailed(reason) => assert_eq!(reason, "device busy"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn capture_command_times_out() {
        let (program, args) = sh("exec sleep 10");
        let err = run_capture_command(&program, &args, StdDuration::from_millis(200))
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Timeout(_)));
    }
}
