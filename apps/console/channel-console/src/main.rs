use channel_console::error::ConsoleError;
use channel_console::logger::initialize as LoggerInitialize;
use channel_console::settings;
use channel_console::subscriptions::subscribe_logging;

use channel_core::ChannelManager;

use common::ErrorLocation;

use std::fs::create_dir_all;
use std::panic::Location;

use log::{info, warn};

#[tokio::main]
async fn main() -> Result<(), ConsoleError> {
    // Before anything reads the environment
    let env_file = settings::load_env_file();

    let config_dir = settings::config_dir()?;
    let log_dir = settings::log_dir(&config_dir);

    create_dir_all(&log_dir).map_err(|e| ConsoleError::Console {
        message: format!("Failed to create log directory: {e}"),
        location: ErrorLocation::from(Location::caller()),
    })?;

    LoggerInitialize(&log_dir)?;

    info!("Channel console starting");
    info!("Config directory: {}", config_dir.display());
    if let Some(path) = env_file {
        info!("Loaded .env from: {}", path.display());
    }

    let config = settings::load_config(&config_dir)?;
    info!("Service base URL: {}", config.base_url);

    let manager = ChannelManager::new(config).map_err(|e| ConsoleError::Channel {
        message: e.to_string(),
        location: ErrorLocation::from(Location::caller()),
    })?;
    info!("Duplex endpoint: {}", manager.duplex_url());

    subscribe_logging(&manager);

    manager.init().await;
    manager.fetch_interface_list(None).await;

    info!("Running, press Ctrl-C to exit");
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C, shutting down: {e}");
    }

    manager.disconnect().await;
    info!("Channel console stopped");

    Ok(())
}
