//! Errors raised by the HTTP (secondary) transport.
//!
//! These never escape the channel manager: probe failures collapse to `false`
//! and fallback failures become `error` events. They exist so the log line for
//! a failed call carries a category and the location it was raised at.

use common::{ErrorLocation, HttpStatusCode};

use std::panic::Location;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum TransportError {
    #[error("HTTP Error: {message} {location}")]
    Http {
        message: String,
        is_timeout: bool,
        is_connection: bool,
        location: ErrorLocation,
    },

    #[error("Server Error: HTTP {status_code} - {message} {location}")]
    Server {
        status_code: HttpStatusCode,
        message: String,
        location: ErrorLocation,
    },

    #[error("JSON Error: {message} {location}")]
    Json {
        message: String,
        location: ErrorLocation,
    },

    #[error("URL Parse Error: {message} {location}")]
    UrlParse {
        message: String,
        location: ErrorLocation,
    },
}

impl TransportError {
    /// Create from a non-success HTTP response.
    #[track_caller]
    pub fn from_status(status_code: u16, body: impl Into<String>) -> Self {
        TransportError::Server {
            status_code: HttpStatusCode(status_code),
            message: body.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    /// Get error category for log lines.
    pub fn error_category(&self) -> &'static str {
        match self {
            TransportError::Http { is_timeout: true, .. } => "timeout",
            TransportError::Http { is_connection: true, .. } => "connection",
            TransportError::Http { .. } => "http",
            TransportError::Server { status_code, .. } if status_code.is_client_error() => {
                "client_error"
            }
            TransportError::Server { status_code, .. } if status_code.is_server_error() => {
                "server_error"
            }
            TransportError::Server { .. } => "unexpected_status",
            TransportError::Json { .. } => "json",
            TransportError::UrlParse { .. } => "url",
        }
    }

    /// Get HTTP status code if applicable.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            TransportError::Server { status_code, .. } => Some(status_code.0),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for TransportError {
    #[track_caller]
    fn from(error: reqwest::Error) -> Self {
        // Categorize before the error is flattened into a string
        if let Some(status) = error.status() {
            return TransportError::Server {
                status_code: HttpStatusCode(status.as_u16()),
                message: error.to_string(),
                location: ErrorLocation::from(Location::caller()),
            };
        }

        TransportError::Http {
            is_timeout: error.is_timeout(),
            is_connection: error.is_connect(),
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<serde_json::Error> for TransportError {
    #[track_caller]
    fn from(error: serde_json::Error) -> Self {
        TransportError::Json {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<url::ParseError> for TransportError {
    #[track_caller]
    fn from(error: url::ParseError) -> Self {
        TransportError::UrlParse {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}
