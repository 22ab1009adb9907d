//! Configuration port

use async_trait::async_trait;
use std::path::PathBuf;

use crate::domain::config::AppConfig;
use crate::domain::error::ConfigError;

/// Where the `[video]` and `[storage]` settings live between runs.
///
/// `skycam config` edits it; the daemon reads it once at startup and never
/// writes it.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Stored settings. Nothing on disk yet means every field is `None`.
    async fn load(&self) -> Result<AppConfig, ConfigError>;

    /// Replace the stored settings
    async fn save(&self, config: &AppConfig) -> Result<(), ConfigError>;

    fn path(&self) -> PathBuf;

    fn exists(&self) -> bool;

    /// Write the built-in camera and storage defaults; refuses to overwrite
    async fn init(&self) -> Result<(), ConfigError>;
}
