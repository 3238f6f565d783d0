//! JSON envelope carried in WebSocket text frames.

use crate::error::duplex::DuplexError;
use crate::events::ChannelEvent;
use crate::transport::OutboundRequest;

use common::ErrorLocation;

use std::panic::Location;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

pub const GET_INTERFACES_EVENT: &str = "get_interfaces";
pub const DYNAMIC_INTERFACE_EVENT: &str = "dynamic_interface";

const INTERFACES_RESPONSE_EVENT: &str = "interfaces_response";
const DYNAMIC_RESPONSE_EVENT: &str = "dynamic_response";
const CONNECTION_RESPONSE_EVENT: &str = "connection_response";
const ERROR_EVENT: &str = "error";
const ERROR_MESSAGE_KEY: &str = "message";
const UNSPECIFIED_SERVER_ERROR: &str = "Server reported an error";

/// `{"event": <name>, "data": <payload>}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplexFrame {
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

impl DuplexFrame {
    pub fn new(event: impl Into<String>, data: Value) -> Self {
        Self {
            event: event.into(),
            data,
        }
    }

    #[track_caller]
    pub fn encode(&self) -> Result<String, DuplexError> {
        serde_json::to_string(self).map_err(|e| DuplexError::Encode {
            message: format!("Failed to encode '{}' frame: {e}", self.event),
            location: ErrorLocation::from(Location::caller()),
        })
    }

    #[track_caller]
    pub fn decode(text: &str) -> Result<Self, DuplexError> {
        serde_json::from_str(text).map_err(|e| DuplexError::Decode {
            message: format!("Invalid duplex frame: {e}"),
            location: ErrorLocation::from(Location::caller()),
        })
    }

    /// Map an inbound frame onto the event vocabulary.
    ///
    /// Returns `None` for names the client does not consume.
    pub fn into_event(self) -> Option<ChannelEvent> {
        match self.event.as_str() {
            INTERFACES_RESPONSE_EVENT => Some(ChannelEvent::InterfacesResponse(self.data)),
            DYNAMIC_RESPONSE_EVENT => Some(ChannelEvent::DynamicResponse(self.data)),
            CONNECTION_RESPONSE_EVENT => Some(ChannelEvent::ConnectionResponse(self.data)),
            ERROR_EVENT => {
                let message = self
                    .data
                    .get(ERROR_MESSAGE_KEY)
                    .and_then(Value::as_str)
                    .unwrap_or(UNSPECIFIED_SERVER_ERROR)
                    .to_string();
                Some(ChannelEvent::Error {
                    message,
                    payload: Some(self.data),
                })
            }
            _ => None,
        }
    }
}

pub fn get_interfaces_payload(file_id: Option<i64>) -> Value {
    json!({ "file_id": file_id })
}

pub fn dynamic_interface_payload(request: &OutboundRequest) -> Value {
    json!({
        "path": request.path,
        "method": request.method.as_str(),
        "params": request.params,
    })
}
