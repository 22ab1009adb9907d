//! CLI argument definitions using Clap

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// SkyCam - remote photo and video capture for camera payloads
#[derive(Parser, Debug)]
#[command(name = "skycam")]
#[command(version)]
#[command(about = "Remote photo and video capture controller for drone and rover cameras")]
#[command(long_about = None)]
pub struct Cli {
    /// Daemon control socket
    #[arg(long, global = true, env = "SKYCAM_SOCKET", value_name = "PATH")]
    pub socket: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the capture daemon
    Serve(ServeArgs),
    /// Take a photo
    Photo {
        /// Output file name (default: photo_<timestamp>.jpg)
        filename: Option<String>,
    },
    /// Start or stop a video recording
    Record {
        #[command(subcommand)]
        action: RecordAction,
    },
    /// Show recording status
    Status {
        /// Print the raw JSON status
        #[arg(long)]
        json: bool,
    },
    /// Show backend and storage health
    Health,
    /// Stream recorder events until interrupted
    Watch,
    /// Locate a stored photo or recording, optionally copying it out
    Media {
        /// File name relative to the media directory
        filename: String,
        /// Copy the file here instead of printing its path
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// Detect and list capture backends on this host
    Backends,
    /// Kill processes holding the camera device
    Release {
        /// Video device (default: from config)
        #[arg(long, value_name = "PATH")]
        device: Option<PathBuf>,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Record actions
#[derive(Subcommand, Debug)]
pub enum RecordAction {
    /// Start recording
    Start {
        /// Base file name, extension is chosen by the backend
        #[arg(short, long)]
        name: Option<String>,
        /// Stop automatically after this long (e.g., 10, 30s, 2m)
        #[arg(short, long, value_name = "TIME")]
        duration: Option<String>,
    },
    /// Stop the active recording
    Stop,
}

/// Daemon options given on the command line
#[derive(clap::Args, Debug, Default, Clone)]
pub struct ServeArgs {
    /// Video device
    #[arg(long, value_name = "PATH")]
    pub device: Option<String>,

    /// Frame width
    #[arg(long)]
    pub width: Option<u32>,

    /// Frame height
    #[arg(long)]
    pub height: Option<u32>,

    /// Frames per second
    #[arg(long)]
    pub fps: Option<u32>,

    /// Local media directory when no USB stick is mounted
    #[arg(long, value_name = "DIR")]
    pub media_dir: Option<String>,

    /// Disable the synthetic test-pattern backend
    #[arg(long)]
    pub no_software_fallback: bool,

    /// Kill processes holding the camera before starting
    #[arg(long)]
    pub release_camera: bool,

    /// PID file location
    #[arg(long, value_name = "PATH")]
    pub pid_file: Option<PathBuf>,
}

/// Config action subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Create config file with defaults
    Init,
    /// Set a config value
    Set {
        /// Config key
        key: String,
        /// Config value
        value: String,
    },
    /// Get a config value
    Get {
        /// Config key
        key: String,
    },
    /// List all config values
    List,
    /// Show config file path
    Path,
}

/// Valid config keys
pub const VALID_CONFIG_KEYS: &[&str] = &[
    "transcode_timeout",
    "software_fallback",
    "release_camera",
    "video.device",
    "video.width",
    "video.height",
    "video.fps",
    "storage.media_dir",
    "storage.usb_mount_point",
    "storage.usb_device",
    "storage.auto_mount",
];

/// Check if a config key is valid
pub fn is_valid_config_key(key: &str) -> bool {
    VALID_CONFIG_KEYS.contains(&key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn parses_serve_overrides() {
        let cli = Cli::parse_from([
            "skycam",
            "serve",
            "--device",
            "/dev/video2",
            "--fps",
            "15",
            "--no-software-fallback",
        ]);
        let Commands::Serve(args) = cli.command else {
            panic!("Expected Serve command");
        };
        assert_eq!(args.device, Some("/dev/video2".to_string()));
        assert_eq!(args.fps, Some(15));
        assert!(args.no_software_fallback);
        assert!(!args.release_camera);
    }

    #[test]
    fn parses_record_start() {
        let cli = Cli::parse_from(["skycam", "record", "start", "-n", "demo", "-d", "2"]);
        if let Commands::Record {
            action: RecordAction::Start { name, duration },
        } = cli.command
        {
            assert_eq!(name, Some("demo".to_string()));
            assert_eq!(duration, Some("2".to_string()));
        } else {
            panic!("Expected Record Start command");
        }
    }

    #[test]
    fn parses_photo_without_name() {
        let cli = Cli::parse_from(["skycam", "photo"]);
        assert!(matches!(cli.command, Commands::Photo { filename: None }));
    }

    #[test]
    fn parses_media_with_output() {
        let cli = Cli::parse_from(["skycam", "media", "demo.mp4", "-o", "/tmp/demo.mp4"]);
        let Commands::Media { filename, output } = cli.command else {
            panic!("Expected Media command");
        };
        assert_eq!(filename, "demo.mp4");
        assert_eq!(output, Some(PathBuf::from("/tmp/demo.mp4")));
    }

    #[test]
    fn socket_is_global() {
        let cli = Cli::parse_from(["skycam", "status", "--socket", "/tmp/x.sock"]);
        assert_eq!(cli.socket, Some(PathBuf::from("/tmp/x.sock")));
    }

    #[test]
    fn cli_parses_config_set() {
        let cli = Cli::parse_from(["skycam", "config", "set", "video.fps", "25"]);
        if let Commands::Config {
            action: ConfigAction::Set { key, value },
        } = cli.command
        {
            assert_eq!(key, "video.fps");
            assert_eq!(value, "25");
        } else {
            panic!("Expected Config Set command");
        }
    }

    #[test]
    fn valid_config_keys() {
        assert!(is_valid_config_key("transcode_timeout"));
        assert!(is_valid_config_key("storage.auto_mount"));
        assert!(!is_valid_config_key("video"));
        assert!(!is_valid_config_key("api_key"));
    }

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }
}
