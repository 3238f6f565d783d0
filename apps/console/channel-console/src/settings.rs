//! Where the console finds its configuration.
//!
//! Resolution order for the config directory:
//! 1. `CHANNEL_CONFIG_DIR`
//! 2. `<platform config dir>/channel-console`
//!
//! `CHANNEL_BASE_URL`, when set, overrides `base_url` from `channel.json`.

use crate::error::ConsoleError;

use channel_core::ChannelConfig;

use common::ErrorLocation;

use std::env;
use std::panic::Location;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

pub const CONFIG_DIR_ENV: &str = "CHANNEL_CONFIG_DIR";
pub const BASE_URL_ENV: &str = "CHANNEL_BASE_URL";

const APP_DIR_NAME: &str = "channel-console";
const LOG_DIR_NAME: &str = "logs";
const ENV_FILE_NAME: &str = ".env";

/// Resolve the config directory. Does not create it.
#[track_caller]
pub fn config_dir() -> Result<PathBuf, ConsoleError> {
    if let Some(dir) = non_empty_var(CONFIG_DIR_ENV) {
        return Ok(PathBuf::from(dir));
    }

    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR_NAME))
        .ok_or_else(|| ConsoleError::Config {
            message: format!("No platform config directory; set {CONFIG_DIR_ENV}"),
            location: ErrorLocation::from(Location::caller()),
        })
}

pub fn log_dir(config_dir: &Path) -> PathBuf {
    config_dir.join(LOG_DIR_NAME)
}

/// Load `channel.json` from `config_dir`, apply the environment override, validate.
#[track_caller]
pub fn load_config(config_dir: &Path) -> Result<ChannelConfig, ConsoleError> {
    let mut config = ChannelConfig::load(config_dir).map_err(|e| ConsoleError::Config {
        message: e.to_string(),
        location: ErrorLocation::from(Location::caller()),
    })?;

    if let Some(base_url) = non_empty_var(BASE_URL_ENV) {
        info!("Using {BASE_URL_ENV}={base_url}");
        config.base_url = base_url;
    }

    config.validate().map_err(|e| ConsoleError::Config {
        message: e.to_string(),
        location: ErrorLocation::from(Location::caller()),
    })?;

    Ok(config)
}

/// Load `.env` from the working directory, then from next to the executable.
///
/// Returns the file that was loaded, if any. Variables already set win.
pub fn load_env_file() -> Option<PathBuf> {
    if let Ok(path) = dotenvy::dotenv() {
        return Some(path);
    }

    let env_path = env::current_exe().ok()?.parent()?.join(ENV_FILE_NAME);
    if !env_path.exists() {
        debug!("No {ENV_FILE_NAME} found");
        return None;
    }

    match dotenvy::from_path(&env_path) {
        Ok(()) => Some(env_path),
        Err(e) => {
            warn!("Failed to parse {}: {e}", env_path.display());
            None
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
