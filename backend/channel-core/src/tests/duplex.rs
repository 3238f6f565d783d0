use crate::config::ChannelConfig;
use crate::duplex::DuplexFrame;
use crate::duplex::duplex_url;
use crate::duplex::frame::{dynamic_interface_payload, get_interfaces_payload};
use crate::events::ChannelEvent;
use crate::transport::OutboundRequest;

use reqwest::Method;
use serde_json::json;

/// **VALUE**: Verifies the duplex URL upgrades the origin scheme and replaces the path.
///
/// **WHY THIS MATTERS**: The WebSocket endpoint is not configured separately in
/// production; a wrong derivation means the duplex path never connects.
///
/// **BUG THIS CATCHES**: Would catch `https` mapping to `ws` (mixed content) or the
/// origin path leaking into the socket path.
#[test]
fn given_http_and_https_origins_when_deriving_duplex_url_then_scheme_upgraded() {
    // GIVEN: Plain and secure origins
    let plain = ChannelConfig::with_base_url("http://127.0.0.1:5000/app?x=1");
    let secure = ChannelConfig::with_base_url("https://example.com");

    // WHEN: Deriving the duplex URLs
    let plain_url = duplex_url(&plain).unwrap();
    let secure_url = duplex_url(&secure).unwrap();

    // THEN: Schemes are upgraded and the duplex path is used
    assert_eq!(plain_url.as_str(), "ws://127.0.0.1:5000/socket.io");
    assert_eq!(secure_url.as_str(), "wss://example.com/socket.io");
}

#[test]
fn given_explicit_duplex_url_when_deriving_then_explicit_wins() {
    // GIVEN
    let config = ChannelConfig {
        duplex_url: Some("ws://10.0.0.2:9000/live".to_string()),
        ..ChannelConfig::default()
    };

    // WHEN / THEN
    assert_eq!(duplex_url(&config).unwrap().as_str(), "ws://10.0.0.2:9000/live");
}

/// **VALUE**: Verifies inbound frames map onto the typed event vocabulary.
///
/// **WHY THIS MATTERS**: Subscribers never see raw frames; a missed mapping means a
/// response silently disappears.
///
/// **BUG THIS CATCHES**: Would catch a typo in one of the consumed event names.
#[test]
fn given_inbound_frames_when_converted_then_map_to_events() {
    // GIVEN / WHEN / THEN
    let interfaces = DuplexFrame::decode(r#"{"event":"interfaces_response","data":{"interfaces":[1]}}"#)
        .unwrap()
        .into_event();
    assert_eq!(
        interfaces,
        Some(ChannelEvent::InterfacesResponse(json!({"interfaces": [1]})))
    );

    let dynamic = DuplexFrame::decode(r#"{"event":"dynamic_response","data":{"status":"success"}}"#)
        .unwrap()
        .into_event();
    assert_eq!(
        dynamic,
        Some(ChannelEvent::DynamicResponse(json!({"status": "success"})))
    );

    let connection = DuplexFrame::decode(r#"{"event":"connection_response","data":{"sid":"a"}}"#)
        .unwrap()
        .into_event();
    assert_eq!(
        connection,
        Some(ChannelEvent::ConnectionResponse(json!({"sid": "a"})))
    );
}

#[test]
fn given_error_frame_when_converted_then_message_extracted_and_payload_kept() {
    // GIVEN
    let with_message = DuplexFrame::new("error", json!({"message": "no such path"}));
    let without_message = DuplexFrame::new("error", json!({"code": 7}));

    // WHEN / THEN
    assert_eq!(
        with_message.into_event(),
        Some(ChannelEvent::Error {
            message: "no such path".to_string(),
            payload: Some(json!({"message": "no such path"})),
        })
    );
    match without_message.into_event() {
        Some(ChannelEvent::Error { message, payload }) => {
            assert!(!message.is_empty());
            assert_eq!(payload, Some(json!({"code": 7})));
        }
        other => panic!("Expected error event, got {other:?}"),
    }
}

#[test]
fn given_unknown_or_malformed_frames_when_decoded_then_ignored_or_rejected() {
    // GIVEN / WHEN / THEN: unknown names produce no event
    let unknown = DuplexFrame::decode(r#"{"event":"server_stats","data":1}"#).unwrap();
    assert_eq!(unknown.into_event(), None);

    // AND: missing data defaults to null
    let bare = DuplexFrame::decode(r#"{"event":"connection_response"}"#).unwrap();
    assert_eq!(bare.data, serde_json::Value::Null);

    // AND: non-envelope text is a decode error
    let err = DuplexFrame::decode("not json").unwrap_err();
    assert!(err.to_string().contains("Frame Decode Error"));
}

/// **VALUE**: Verifies the outbound payload shapes.
///
/// **WHY THIS MATTERS**: The server matches on these exact keys; `file_id` must be an
/// explicit `null` when no file is selected.
///
/// **BUG THIS CATCHES**: Would catch `skip_serializing_if` creeping in or the method
/// being sent in a non-canonical form.
#[test]
fn given_outbound_requests_when_building_payloads_then_shapes_match_protocol() {
    assert_eq!(get_interfaces_payload(Some(42)), json!({"file_id": 42}));
    assert_eq!(get_interfaces_payload(None), json!({"file_id": null}));

    let request = OutboundRequest::new("/users/list")
        .with_method(Method::POST)
        .with_params(json!({"page": 2}));
    assert_eq!(
        dynamic_interface_payload(&request),
        json!({"path": "/users/list", "method": "POST", "params": {"page": 2}})
    );

    let encoded = DuplexFrame::new("get_interfaces", get_interfaces_payload(None))
        .encode()
        .unwrap();
    assert_eq!(
        serde_json::from_str::<serde_json::Value>(&encoded).unwrap(),
        json!({"event": "get_interfaces", "data": {"file_id": null}})
    );
}
