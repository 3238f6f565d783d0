use common::ErrorLocation;

use std::panic::Location;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum DuplexError {
    #[error("Duplex URL Error: {message} {location}")]
    Url {
        message: String,
        location: ErrorLocation,
    },

    #[error("Handshake Error: {message} {location}")]
    Handshake {
        message: String,
        location: ErrorLocation,
    },

    #[error("Send Error: {message} {location}")]
    Send {
        message: String,
        location: ErrorLocation,
    },

    #[error("Frame Encode Error: {message} {location}")]
    Encode {
        message: String,
        location: ErrorLocation,
    },

    #[error("Frame Decode Error: {message} {location}")]
    Decode {
        message: String,
        location: ErrorLocation,
    },
}

impl From<url::ParseError> for DuplexError {
    #[track_caller]
    fn from(error: url::ParseError) -> Self {
        DuplexError::Url {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}
