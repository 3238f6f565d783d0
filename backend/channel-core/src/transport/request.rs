use reqwest::Method;
use serde_json::{Map, Value};

/// A dynamic-endpoint call: target path, HTTP method and parameters.
///
/// Built per call and consumed by the router.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundRequest {
    pub path: String,
    pub method: Method,
    pub params: Value,
}

impl OutboundRequest {
    /// `GET` with empty parameters.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method: Method::GET,
            params: Value::Object(Map::new()),
        }
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn with_params(mut self, params: Value) -> Self {
        self.params = params;
        self
    }
}
