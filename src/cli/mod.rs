//! CLI layer - Command-line interface
//!
//! Contains argument parsing, output formatting, signal handling,
//! the daemon runner and the socket client commands.

pub mod app;
pub mod args;
pub mod client_cmd;
pub mod config_cmd;
pub mod daemon_app;
pub mod ipc;
pub mod pid_file;
pub mod presenter;
pub mod signals;

// Re-export commonly used types
pub use app::{load_merged_config, EXIT_ERROR, EXIT_SUCCESS, EXIT_USAGE_ERROR};
pub use args::{Cli, Commands, ConfigAction, RecordAction, ServeArgs};
pub use daemon_app::{run_daemon, DaemonOptions};
pub use presenter::Presenter;
