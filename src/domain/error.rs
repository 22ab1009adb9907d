//! Domain error types

use thiserror::Error;

/// Error when parsing a duration string
#[derive(Debug, Clone, Error)]
#[error("Invalid duration: \"{input}\". Expected a positive number of seconds (e.g., 10, 30s, 1m, 2m30s)")]
pub struct DurationParseError {
    pub input: String,
}

/// Error when a requested file name cannot be turned into a safe media path
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("File name is empty")]
    Empty,

    #[error("Invalid file name: \"{0}\"")]
    InvalidName(String),

    #[error("File name is too long ({0} bytes)")]
    TooLong(usize),

    #[error("Path escapes the media root: \"{0}\"")]
    Traversal(String),
}

/// Error when configuration fails
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(String),

    #[error("Failed to parse config file: {0}")]
    ParseError(String),

    #[error("Failed to write config file: {0}")]
    WriteError(String),

    #[error("Invalid config value for '{key}': {message}")]
    ValidationError { key: String, message: String },

    #[error("Config file already exists at: {0}")]
    AlreadyExists(String),
}
