//! Shutdown signal handling for the daemon

use colored::Colorize;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;

/// Daemon signals
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaemonSignal {
    /// SIGINT
    Interrupt,
    /// SIGTERM
    Terminate,
}

impl DaemonSignal {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Interrupt => "SIGINT",
            Self::Terminate => "SIGTERM",
        }
    }
}

/// Daemon signal handler
///
/// Turns SIGINT/SIGTERM into messages on a channel so the daemon can shut
/// down in an orderly way.
pub struct DaemonSignalHandler {
    receiver: mpsc::Receiver<DaemonSignal>,
}

impl DaemonSignalHandler {
    /// Start listening for shutdown signals
    pub fn new() -> Result<Self, std::io::Error> {
        let (tx, rx) = mpsc::channel(4);

        for (kind, sig) in [
            (SignalKind::interrupt(), DaemonSignal::Interrupt),
            (SignalKind::terminate(), DaemonSignal::Terminate),
        ] {
            let mut stream = signal(kind)?;
            let tx = tx.clone();
            tokio::spawn(async move {
                while stream.recv().await.is_some() {
                    eprintln!("{} Received {} (shutdown)", "↓".cyan(), sig.name());
                    if tx.send(sig).await.is_err() {
                        break;
                    }
                }
            });
        }

        Ok(Self { receiver: rx })
    }

    /// Wait for the next signal
    pub async fn recv(&mut self) -> Option<DaemonSignal> {
        self.receiver.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signal_names() {
        assert_eq!(DaemonSignal::Interrupt.name(), "SIGINT");
        assert_eq!(DaemonSignal::Terminate.name(), "SIGTERM");
    }

    #[tokio::test]
    async fn handler_installs() {
        assert!(DaemonSignalHandler::new().is_ok());
    }
}
