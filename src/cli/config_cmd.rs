//! Config command handler

use crate::application::ports::ConfigStore;
use crate::domain::config::AppConfig;
use crate::domain::error::ConfigError;
use crate::domain::recording::Duration;

use super::args::{is_valid_config_key, ConfigAction, VALID_CONFIG_KEYS};
use super::presenter::Presenter;

const NOT_SET: &str = "(not set)";

/// Handle config subcommand
pub async fn handle_config_command<S: ConfigStore>(
    action: ConfigAction,
    store: &S,
    presenter: &Presenter,
) -> Result<(), ConfigError> {
    match action {
        ConfigAction::Init => handle_init(store, presenter).await,
        ConfigAction::Set { key, value } => handle_set(store, presenter, &key, &value).await,
        ConfigAction::Get { key } => handle_get(store, presenter, &key).await,
        ConfigAction::List => handle_list(store, presenter).await,
        ConfigAction::Path => handle_path(store, presenter),
    }
}

async fn handle_init<S: ConfigStore>(store: &S, presenter: &Presenter) -> Result<(), ConfigError> {
    store.init().await?;
    presenter.success(&format!(
        "Config file created at: {}",
        store.path().display()
    ));
    Ok(())
}

fn check_key(key: &str) -> Result<(), ConfigError> {
    if is_valid_config_key(key) {
        Ok(())
    } else {
        Err(ConfigError::ValidationError {
            key: key.to_string(),
            message: format!("Unknown key. Valid keys: {}", VALID_CONFIG_KEYS.join(", ")),
        })
    }
}

async fn handle_set<S: ConfigStore>(
    store: &S,
    presenter: &Presenter,
    key: &str,
    value: &str,
) -> Result<(), ConfigError> {
    check_key(key)?;
    let mut config = store.load().await?;
    apply_value(&mut config, key, value)?;
    store.save(&config).await?;
    presenter.success(&format!("{} = {}", key, value));
    Ok(())
}

async fn handle_get<S: ConfigStore>(
    store: &S,
    presenter: &Presenter,
    key: &str,
) -> Result<(), ConfigError> {
    check_key(key)?;
    let config = store.load().await?;
    presenter.output(read_value(&config, key).as_deref().unwrap_or(NOT_SET));
    Ok(())
}

async fn handle_list<S: ConfigStore>(store: &S, presenter: &Presenter) -> Result<(), ConfigError> {
    let config = store.load().await?;
    for key in VALID_CONFIG_KEYS {
        presenter.key_value(key, read_value(&config, key).as_deref().unwrap_or(NOT_SET));
    }
    Ok(())
}

fn handle_path<S: ConfigStore>(store: &S, presenter: &Presenter) -> Result<(), ConfigError> {
    presenter.output(&store.path().to_string_lossy());
    Ok(())
}

/// Validate `value` for `key` and store it
fn apply_value(config: &mut AppConfig, key: &str, value: &str) -> Result<(), ConfigError> {
    match key {
        "transcode_timeout" => {
            value
                .parse::<Duration>()
                .map_err(|e| invalid(key, e.to_string()))?;
            config.transcode_timeout = Some(value.to_string());
        }
        "software_fallback" => config.software_fallback = Some(parse_bool_for(key, value)?),
        "release_camera" => config.release_camera = Some(parse_bool_for(key, value)?),
        "video.device" => config.video_mut().device = Some(parse_path_for(key, value)?),
        "video.width" => config.video_mut().width = Some(parse_positive(key, value)?),
        "video.height" => config.video_mut().height = Some(parse_positive(key, value)?),
        "video.fps" => config.video_mut().fps = Some(parse_positive(key, value)?),
        "storage.media_dir" => config.storage_mut().media_dir = Some(parse_path_for(key, value)?),
        "storage.usb_mount_point" => {
            config.storage_mut().usb_mount_point = Some(parse_path_for(key, value)?)
        }
        "storage.usb_device" => config.storage_mut().usb_device = Some(parse_path_for(key, value)?),
        "storage.auto_mount" => config.storage_mut().auto_mount = Some(parse_bool_for(key, value)?),
        _ => return Err(invalid(key, "Unknown key".to_string())),
    }
    Ok(())
}

fn read_value(config: &AppConfig, key: &str) -> Option<String> {
    let video = config.video.as_ref();
    let storage = config.storage.as_ref();
    match key {
        "transcode_timeout" => config.transcode_timeout.clone(),
        "software_fallback" => config.software_fallback.map(|b| b.to_string()),
        "release_camera" => config.release_camera.map(|b| b.to_string()),
        "video.device" => video.and_then(|v| v.device.clone()),
        "video.width" => video.and_then(|v| v.width).map(|n| n.to_string()),
        "video.height" => video.and_then(|v| v.height).map(|n| n.to_string()),
        "video.fps" => video.and_then(|v| v.fps).map(|n| n.to_string()),
        "storage.media_dir" => storage.and_then(|s| s.media_dir.clone()),
        "storage.usb_mount_point" => storage.and_then(|s| s.usb_mount_point.clone()),
        "storage.usb_device" => storage.and_then(|s| s.usb_device.clone()),
        "storage.auto_mount" => storage.and_then(|s| s.auto_mount).map(|b| b.to_string()),
        _ => None,
    }
}

fn invalid(key: &str, message: String) -> ConfigError {
    ConfigError::ValidationError {
        key: key.to_string(),
        message,
    }
}

fn parse_bool_for(key: &str, value: &str) -> Result<bool, ConfigError> {
    parse_bool(value).map_err(|_| invalid(key, "Value must be 'true' or 'false'".to_string()))
}

fn parse_positive(key: &str, value: &str) -> Result<u32, ConfigError> {
    match value.trim().parse::<u32>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(invalid(key, "Value must be a positive integer".to_string())),
    }
}

fn parse_path_for(key: &str, value: &str) -> Result<String, ConfigError> {
    let value = value.trim();
    if value.starts_with('/') {
        Ok(value.to_string())
    } else {
        Err(invalid(key, "Value must be an absolute path".to_string()))
    }
}

/// Parse a boolean value
fn parse_bool(value: &str) -> Result<bool, ()> {
    match value.to_lowercase().as_str() {
        "true" | "yes" | "1" => Ok(true),
        "false" | "no" | "0" => Ok(false),
        _ => Err(()),
    }
}
