use crate::config::ChannelConfig;
use crate::transport::{HttpTransport, OutboundRequest};

use reqwest::Method;
use serde_json::json;

#[test]
fn given_paths_with_and_without_slash_when_building_dynamic_url_then_single_separator() {
    // GIVEN
    let transport = HttpTransport::new(&ChannelConfig::with_base_url("http://127.0.0.1:5000")).unwrap();

    // WHEN / THEN
    assert_eq!(
        transport.dynamic_url("/users/1").unwrap().as_str(),
        "http://127.0.0.1:5000/api/dynamic/users/1"
    );
    assert_eq!(
        transport.dynamic_url("users/1").unwrap().as_str(),
        "http://127.0.0.1:5000/api/dynamic/users/1"
    );
}

#[test]
fn given_new_request_when_defaults_used_then_get_with_empty_params() {
    let request = OutboundRequest::new("/ping");

    assert_eq!(request.method, Method::GET);
    assert_eq!(request.params, json!({}));
}

#[test]
fn given_invalid_base_url_when_transport_created_then_url_error() {
    let mut config = ChannelConfig::default();
    config.base_url = "http://".to_string();

    let err = HttpTransport::new(&config).unwrap_err();

    assert_eq!(err.error_category(), "url");
}
