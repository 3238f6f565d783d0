use crate::helpers::{
    DuplexPeer, INTERFACES_PATH, STATUS_PATH, connected_manager, fallback_manager,
};

use channel_core::{ChannelEvent, OutboundRequest};

use std::time::Duration;

use reqwest::Method;
use serde_json::json;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_interfaces_unreachable(http: &MockServer) {
    Mock::given(path(INTERFACES_PATH))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(http)
        .await;
}

// ============================================
// DUPLEX ROUTE
// ============================================

/// **VALUE**: Verifies requests go over the socket when connected.
///
/// **WHY THIS MATTERS**: The duplex path exists to avoid HTTP round-trips; a
/// request that hits both transports gets answered twice.
///
/// **BUG THIS CATCHES**: Would catch the status check being skipped and the
/// HTTP fallback always running.
#[tokio::test]
async fn given_connected_when_fetch_interface_list_then_frame_sent_without_http() {
    // GIVEN: A connected manager and an interfaces route that must stay idle
    let http = MockServer::start().await;
    mount_interfaces_unreachable(&http).await;
    let mut peer = DuplexPeer::start().await;
    let (manager, _recorder) = connected_manager(&http, &peer).await;

    // WHEN: The list is requested for file 42
    manager.fetch_interface_list(Some(42)).await;

    // THEN: The peer receives exactly the get_interfaces frame
    assert_eq!(
        peer.next_frame().await,
        json!({ "event": "get_interfaces", "data": { "file_id": 42 } })
    );
}

/// **VALUE**: Verifies the unfiltered request carries an explicit null.
///
/// **BUG THIS CATCHES**: Would catch `file_id` being omitted from the frame,
/// which the server reads as a malformed request.
#[tokio::test]
async fn given_connected_when_fetch_without_file_then_file_id_is_null() {
    // GIVEN: A connected manager
    let http = MockServer::start().await;
    let mut peer = DuplexPeer::start().await;
    let (manager, _recorder) = connected_manager(&http, &peer).await;

    // WHEN: send_raw is used directly, as the scenario in the docs does
    manager.send_raw("get_interfaces", json!({ "file_id": null }));
    manager.fetch_interface_list(None).await;

    // THEN: Both frames are identical
    let expected = json!({ "event": "get_interfaces", "data": { "file_id": null } });
    assert_eq!(peer.next_frame().await, expected);
    assert_eq!(peer.next_frame().await, expected);
}

/// **VALUE**: Verifies the dynamic request shape over the socket.
#[tokio::test]
async fn given_connected_when_invoke_dynamic_endpoint_then_dynamic_interface_frame_sent() {
    // GIVEN: A connected manager and a dynamic route that must stay idle
    let http = MockServer::start().await;
    Mock::given(path("/api/dynamic/users/list"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&http)
        .await;
    let mut peer = DuplexPeer::start().await;
    let (manager, _recorder) = connected_manager(&http, &peer).await;

    // WHEN: A POST is invoked
    manager
        .invoke_dynamic_endpoint(
            OutboundRequest::new("/users/list")
                .with_method(Method::POST)
                .with_params(json!({ "page": 2 })),
        )
        .await;

    // THEN: The frame names path, method and params
    assert_eq!(
        peer.next_frame().await,
        json!({
            "event": "dynamic_interface",
            "data": { "path": "/users/list", "method": "POST", "params": { "page": 2 } }
        })
    );
}

/// **VALUE**: Verifies server frames become events.
///
/// **WHY THIS MATTERS**: Over the socket, responses arrive asynchronously; the
/// event table is the only way callers see them.
///
/// **BUG THIS CATCHES**: Would catch wrong event mapping or unknown frames
/// leaking through as errors.
#[tokio::test]
async fn given_connected_when_server_pushes_frames_then_events_dispatched_in_order() {
    // GIVEN: A connected manager
    let http = MockServer::start().await;
    let peer = DuplexPeer::start().await;
    let (_manager, mut recorder) = connected_manager(&http, &peer).await;

    // WHEN: The server pushes known and unknown frames
    peer.push("interfaces_response", json!({ "interfaces": [{ "id": 1 }] }));
    peer.push("something_else", json!({}));
    peer.push("dynamic_response", json!({ "ok": true }));
    peer.push("connection_response", json!({ "clients": 3 }));
    peer.push("error", json!({ "message": "bad file" }));

    // THEN: Known frames arrive in order, the unknown one is dropped
    assert_eq!(
        recorder.next().await,
        ChannelEvent::InterfacesResponse(json!({ "interfaces": [{ "id": 1 }] }))
    );
    assert_eq!(
        recorder.next().await,
        ChannelEvent::DynamicResponse(json!({ "ok": true }))
    );
    assert_eq!(
        recorder.next().await,
        ChannelEvent::ConnectionResponse(json!({ "clients": 3 }))
    );
    assert_eq!(
        recorder.next().await,
        ChannelEvent::Error {
            message: "bad file".to_string(),
            payload: Some(json!({ "message": "bad file" })),
        }
    );
}

// ============================================
// HTTP FALLBACK
// ============================================

/// **VALUE**: Verifies the HTTP fallback for the interface list.
///
/// **WHY THIS MATTERS**: Subscribers handle one `interfaces_response` shape;
/// the fallback must wrap the body the same way the server does over the socket.
///
/// **BUG THIS CATCHES**: Would catch the raw body being emitted unwrapped, or a
/// `file_id` query being sent when none was given.
#[tokio::test]
async fn given_fallback_when_fetch_interface_list_then_http_body_wrapped() {
    // GIVEN: A manager in fallback mode
    let http = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(INTERFACES_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": "a" }])))
        .expect(1)
        .mount(&http)
        .await;
    let (manager, mut recorder) = fallback_manager(&http).await;

    // WHEN: The unfiltered list is requested
    manager.fetch_interface_list(None).await;

    // THEN: Wrapped body, no query string
    assert_eq!(
        recorder.next().await,
        ChannelEvent::InterfacesResponse(json!({ "interfaces": [{ "id": "a" }] }))
    );
    let requests = http.received_requests().await.unwrap();
    let fetch = requests
        .iter()
        .find(|request| request.url.path() == INTERFACES_PATH)
        .unwrap();
    assert_eq!(fetch.url.query(), None);
}

/// **VALUE**: Verifies the file filter becomes a query parameter.
#[tokio::test]
async fn given_fallback_when_fetch_for_file_then_file_id_query_sent() {
    // GIVEN: A manager in fallback mode and a route that requires file_id=7
    let http = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(INTERFACES_PATH))
        .and(query_param("file_id", "7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&http)
        .await;
    let (manager, mut recorder) = fallback_manager(&http).await;

    // WHEN: The list is requested for file 7
    manager.fetch_interface_list(Some(7)).await;

    // THEN: The filtered route answered
    assert_eq!(
        recorder.next().await,
        ChannelEvent::InterfacesResponse(json!({ "interfaces": [] }))
    );
}

/// **VALUE**: Verifies HTTP failures surface as `error` events.
///
/// **BUG THIS CATCHES**: Would catch fallback failures being swallowed, leaving
/// the caller waiting forever.
#[tokio::test]
async fn given_fallback_when_interfaces_route_fails_then_error_event() {
    // GIVEN: An interfaces route returning 500
    let http = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(INTERFACES_PATH))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&http)
        .await;
    let (manager, mut recorder) = fallback_manager(&http).await;

    // WHEN: The list is requested
    manager.fetch_interface_list(None).await;

    // THEN: One error event with the fixed message
    assert_eq!(
        recorder.next().await,
        ChannelEvent::error("Failed to fetch interface list")
    );
}

/// **VALUE**: Verifies the dynamic fallback request and response.
///
/// **BUG THIS CATCHES**: Would catch the method being ignored or the params
/// sent bare instead of under `params`.
#[tokio::test]
async fn given_fallback_when_invoke_dynamic_endpoint_then_proxy_route_called() {
    // GIVEN: A proxy route expecting a POST with wrapped params
    let http = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/dynamic/users/list"))
        .and(body_json(json!({ "params": { "page": 2 } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "users": [] })))
        .expect(1)
        .mount(&http)
        .await;
    let (manager, mut recorder) = fallback_manager(&http).await;

    // WHEN: The endpoint is invoked
    manager
        .invoke_dynamic_endpoint(
            OutboundRequest::new("/users/list")
                .with_method(Method::POST)
                .with_params(json!({ "page": 2 })),
        )
        .await;

    // THEN: The body comes back as dynamic_response
    assert_eq!(
        recorder.next().await,
        ChannelEvent::DynamicResponse(json!({ "users": [] }))
    );
}

/// **VALUE**: Verifies defaults (GET, empty params) reach the proxy route.
#[tokio::test]
async fn given_fallback_when_invoke_with_defaults_then_get_with_empty_params() {
    // GIVEN: A proxy route expecting a GET
    let http = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/dynamic/health"))
        .and(body_json(json!({ "params": {} })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!("ok")))
        .expect(1)
        .mount(&http)
        .await;
    let (manager, mut recorder) = fallback_manager(&http).await;

    // WHEN: A bare request is invoked
    manager
        .invoke_dynamic_endpoint(OutboundRequest::new("health"))
        .await;

    // THEN: dynamic_response
    assert_eq!(recorder.next().await, ChannelEvent::DynamicResponse(json!("ok")));
}

/// **VALUE**: Verifies dynamic fallback failures surface as `error` events.
#[tokio::test]
async fn given_fallback_when_proxy_route_missing_then_error_event() {
    // GIVEN: No dynamic route mounted (wiremock answers 404)
    let http = MockServer::start().await;
    let (manager, mut recorder) = fallback_manager(&http).await;

    // WHEN: The endpoint is invoked
    manager
        .invoke_dynamic_endpoint(OutboundRequest::new("/missing"))
        .await;

    // THEN: One error event with the fixed message
    assert_eq!(
        recorder.next().await,
        ChannelEvent::error("Failed to call interface")
    );
}

// ============================================
// RAW SEND
// ============================================

/// **VALUE**: Verifies send_raw never falls back to HTTP.
///
/// **WHY THIS MATTERS**: Raw events have no HTTP equivalent; the caller must be
/// told the message was dropped.
///
/// **BUG THIS CATCHES**: Would catch send_raw silently dropping the frame, or
/// emitting a generic `error` without the original event and data.
#[tokio::test]
async fn given_fallback_when_send_raw_then_send_error_with_original_frame() {
    // GIVEN: A manager in fallback mode
    let http = MockServer::start().await;
    let (manager, mut recorder) = fallback_manager(&http).await;

    // WHEN: A raw event is sent
    manager.send_raw("custom_event", json!({ "a": 1 }));

    // THEN: send_error carries what was not delivered
    assert_eq!(
        recorder.next().await,
        ChannelEvent::SendError {
            event: "custom_event".to_string(),
            data: json!({ "a": 1 }),
            message: "Duplex channel not connected, message not sent".to_string(),
        }
    );

    // AND: Only the probe reached the HTTP server
    let requests = http.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].url.path(), STATUS_PATH);
    assert!(recorder.collect_for(Duration::from_millis(50)).await.is_empty());
}
