use common::ErrorLocation;

use thiserror::Error;

/// Errors that stop the console before or during startup.
#[derive(Debug, Error)]
pub enum ConsoleError {
    /// Error from this App
    #[error("Console Error: {message} {location}")]
    Console {
        message: String,
        location: ErrorLocation,
    },

    /// Configuration could not be resolved, loaded or validated
    #[error("Config Error: {message} {location}")]
    Config {
        message: String,
        location: ErrorLocation,
    },

    /// The channel manager could not be built
    #[error("Channel Error: {message} {location}")]
    Channel {
        message: String,
        location: ErrorLocation,
    },
}
