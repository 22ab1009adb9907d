//! CLI presenter for output formatting

use colored::*;
use indicatif::{ProgressBar, ProgressStyle};

use crate::application::ports::RecorderEvent;
use crate::application::HealthReport;
use crate::domain::recording::RecordingStatus;

/// Presenter for CLI output formatting
pub struct Presenter {
    spinner: Option<ProgressBar>,
}

impl Presenter {
    /// Create a new presenter
    pub fn new() -> Self {
        Self { spinner: None }
    }

    /// Start a spinner with message
    pub fn start_spinner(&mut self, message: &str) {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::default_spinner()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        spinner.set_style(style);
        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        self.spinner = Some(spinner);
    }

    /// Mark spinner as success and finish
    pub fn spinner_success(&mut self, message: &str) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_with_message(format!("{} {}", "✓".green(), message));
        }
    }

    /// Mark spinner as failed and finish
    pub fn spinner_fail(&mut self, message: &str) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_with_message(format!("{} {}", "✗".red(), message));
        }
    }

    /// Print info message to stderr
    pub fn info(&self, message: &str) {
        eprintln!("{} {}", "ℹ".cyan(), message);
    }

    /// Print success message to stderr
    pub fn success(&self, message: &str) {
        eprintln!("{} {}", "✓".green(), message);
    }

    /// Print warning message to stderr
    pub fn warn(&self, message: &str) {
        eprintln!("{} {}", "⚠".yellow(), message);
    }

    /// Print error message to stderr
    pub fn error(&self, message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Output text to stdout (paths and machine-readable results)
    pub fn output(&self, text: &str) {
        println!("{}", text);
    }

    /// Print daemon status
    pub fn daemon_status(&self, state: &str) {
        eprintln!("{} Daemon: {}", "●".cyan(), state);
    }

    /// Print a key-value pair (for config list)
    pub fn key_value(&self, key: &str, value: &str) {
        println!("{}: {}", key.cyan(), value);
    }

    /// Human-readable recording status
    pub fn status(&self, status: &RecordingStatus) {
        if status.recording {
            let elapsed = status
                .elapsed_whole_secs()
                .map(format_elapsed)
                .unwrap_or_else(|| "--:--".to_string());
            println!(
                "{} Recording {} ({})",
                "●".red(),
                elapsed.bold(),
                status.backend
            );
        } else {
            println!("{} {}", "○".dimmed(), status.state.as_str().to_uppercase());
        }
        if let Some(file) = &status.file {
            self.key_value("file", &file.display().to_string());
        }
        if let Some(raw) = status.raw_file.as_ref().filter(|r| Some(*r) != status.file.as_ref()) {
            self.key_value("raw_file", &raw.display().to_string());
        }
        if let Some(started) = &status.started_at {
            self.key_value("started_at", &started.format("%Y-%m-%d %H:%M:%S").to_string());
        }
        if let Some(alive) = status.backend_alive {
            self.key_value("backend_alive", &alive.to_string());
        }
        if let Some(last) = &status.last_file {
            self.key_value("last_file", &last.display().to_string());
        }
    }

    /// Human-readable health report
    pub fn health(&self, report: &HealthReport) {
        self.key_value("state", report.state.as_str());
        for (name, available) in &report.backends {
            self.backend_line(name, *available);
        }
        let storage = &report.storage;
        if storage.available {
            let location = if storage.removable { "usb" } else { "local" };
            self.key_value("storage", location);
            if let Some(videos) = &storage.videos {
                self.key_value("videos", &videos.display().to_string());
            }
            if let Some(photos) = &storage.photos {
                self.key_value("photos", &photos.display().to_string());
            }
        } else {
            let reason = storage.error.as_deref().unwrap_or("unknown error");
            println!("{}: {} ({})", "storage".cyan(), "unavailable".red(), reason);
        }
    }

    /// One backend availability line
    pub fn backend_line(&self, name: &str, available: bool) {
        let mark = if available { "✓".green() } else { "✗".red() };
        println!("{} {}", mark, name);
    }

    /// One line per streamed event
    pub fn event(&self, event: &RecorderEvent) {
        let line = match event {
            RecorderEvent::RecordingStarted { backend, file, .. } => {
                format!("{} started ({}) {}", "●".red(), backend, file.display())
            }
            RecorderEvent::RecordingStopping { backend } => {
                format!("{} stopping ({})", "◐".yellow(), backend)
            }
            RecorderEvent::RecordingStopped {
                file, finalized, ..
            } => {
                let note = if *finalized { "" } else { " [raw kept]" };
                format!("{} stopped {}{}", "○".green(), file.display(), note)
            }
            RecorderEvent::FinalizeWarning { raw_file, reason } => {
                format!("{} {}: {}", "⚠".yellow(), raw_file.display(), reason)
            }
            RecorderEvent::PhotoCaptured { backend, file } => {
                format!("{} photo ({}) {}", "◆".cyan(), backend, file.display())
            }
        };
        println!("{}", line);
    }
}

impl Default for Presenter {
    fn default() -> Self {
        Self::new()
    }
}

/// `mm:ss`, or `h:mm:ss` past an hour
pub fn format_elapsed(secs: u64) -> String {
    let (h, m, s) = (secs / 3600, secs / 60 % 60, secs % 60);
    if h > 0 {
        format!("{}:{:02}:{:02}", h, m, s)
    } else {
        format!("{:02}:{:02}", m, s)
    }
}
