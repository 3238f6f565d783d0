use channel_core::ChannelConfig;
use channel_core::error::CoreError;
use channel_core::error::transport::TransportError;
use channel_core::transport::HttpTransport;

use common::{ErrorLocation, HttpStatusCode};

use std::panic::Location;
use std::time::Duration;

use tokio::net::TcpListener;
use wiremock::matchers::path;
use wiremock::{Mock, MockServer, ResponseTemplate};

/// **VALUE**: Verifies that `TransportError::Server` includes status and location.
///
/// **WHY THIS MATTERS**: Fallback failures are only visible in the log. The
/// line has to say which status came back and where it was raised.
///
/// **BUG THIS CATCHES**: Would catch the Display format dropping the status code
/// or the location suffix.
#[test]
#[track_caller]
fn given_server_error_when_formatted_then_includes_status_and_location() {
    // GIVEN: A Server error with location
    let err = TransportError::Server {
        status_code: HttpStatusCode(503),
        message: "maintenance".to_string(),
        location: ErrorLocation::from(Location::caller()),
    };

    // WHEN: Formatting the error as string
    let error_string = err.to_string();

    // THEN: Should include type, status, message, and file location
    assert!(error_string.contains("Server Error"));
    assert!(error_string.contains("503"));
    assert!(error_string.contains("maintenance"));
    assert!(error_string.contains("transport.rs"));
}

/// **VALUE**: Verifies status codes map onto categories.
///
/// **BUG THIS CATCHES**: Would catch 4xx and 5xx being lumped together, which
/// hides whether the client or the server is at fault.
#[test]
fn given_status_codes_when_categorized_then_client_server_and_unexpected_differ() {
    // GIVEN/WHEN: Errors built from several statuses
    let not_found = TransportError::from_status(404, "missing");
    let unavailable = TransportError::from_status(503, "");
    let redirect = TransportError::from_status(302, "");

    // THEN: Each lands in its own bucket
    assert_eq!(not_found.error_category(), "client_error");
    assert_eq!(not_found.status_code(), Some(404));
    assert_eq!(unavailable.error_category(), "server_error");
    assert_eq!(redirect.error_category(), "unexpected_status");
}

/// **VALUE**: Verifies transport errors pass through `CoreError` unchanged.
#[test]
fn given_transport_error_when_wrapped_in_core_error_then_display_is_transparent() {
    // GIVEN: A transport error
    let err = TransportError::from_status(500, "boom");
    let expected = err.to_string();

    // WHEN: Converted with `?`-style From
    let core: CoreError = err.into();

    // THEN: Same text
    assert_eq!(core.to_string(), expected);
}

/// **VALUE**: Verifies a refused connection is categorized as "connection".
///
/// **WHY THIS MATTERS**: "server is down" and "server is slow" call for
/// different operator action; the category tells them apart.
///
/// **BUG THIS CATCHES**: Would catch the reqwest conversion losing the connect
/// flag.
#[tokio::test]
async fn given_nothing_listening_when_fetching_then_connection_category() {
    // GIVEN: A base URL on a port that was just released
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let transport =
        HttpTransport::new(&ChannelConfig::with_base_url(format!("http://{addr}"))).unwrap();

    // WHEN: Fetching interfaces
    let err = transport.fetch_interfaces(None).await.unwrap_err();

    // THEN: Connection failure
    assert_eq!(err.error_category(), "connection");
    assert_eq!(err.status_code(), None);
}

/// **VALUE**: Verifies a slow server is categorized as "timeout".
#[tokio::test]
async fn given_slow_server_when_fetching_then_timeout_category() {
    // GIVEN: A route slower than the request timeout
    let http = MockServer::start().await;
    Mock::given(path("/api/interfaces"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&http)
        .await;
    let mut config = ChannelConfig::with_base_url(http.uri());
    config.request_timeout_ms = 200;
    let transport = HttpTransport::new(&config).unwrap();

    // WHEN: Fetching interfaces
    let err = transport.fetch_interfaces(None).await.unwrap_err();

    // THEN: Timeout
    assert_eq!(err.error_category(), "timeout");
}

/// **VALUE**: Verifies a non-JSON success body is a JSON error, not a panic.
#[tokio::test]
async fn given_html_body_when_fetching_then_json_category() {
    // GIVEN: A route answering HTML
    let http = MockServer::start().await;
    Mock::given(path("/api/interfaces"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
        .mount(&http)
        .await;
    let transport = HttpTransport::new(&ChannelConfig::with_base_url(http.uri())).unwrap();

    // WHEN: Fetching interfaces
    let err = transport.fetch_interfaces(None).await.unwrap_err();

    // THEN: JSON error
    assert_eq!(err.error_category(), "json");
}

/// **VALUE**: Verifies every 2xx counts as success and other statuses keep their code.
///
/// **WHY THIS MATTERS**: Proxy routes answer 201 or 202 for writes; treating
/// those as failures would turn a successful fallback call into an `error` event.
///
/// **BUG THIS CATCHES**: Would catch a success check narrowed to 200, or the
/// status code being lost when a non-2xx answer is converted.
#[tokio::test]
async fn given_created_and_forbidden_answers_when_fetching_then_classified_by_status() {
    // GIVEN: A dynamic route answering 201 and an interfaces route answering 403
    let http = MockServer::start().await;
    Mock::given(path("/api/dynamic/items"))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({ "id": 9 })))
        .mount(&http)
        .await;
    Mock::given(path("/api/interfaces"))
        .respond_with(ResponseTemplate::new(403).set_body_string("denied"))
        .mount(&http)
        .await;
    let transport = HttpTransport::new(&ChannelConfig::with_base_url(http.uri())).unwrap();

    // WHEN: Calling both
    let created = transport
        .call_dynamic(&channel_core::OutboundRequest::new("/items"))
        .await;
    let forbidden = transport.fetch_interfaces(None).await.unwrap_err();

    // THEN: 201 parses, 403 is a client error carrying its code and body
    assert_eq!(created.unwrap(), serde_json::json!({ "id": 9 }));
    assert_eq!(forbidden.status_code(), Some(403));
    assert_eq!(forbidden.error_category(), "client_error");
    assert!(forbidden.to_string().contains("denied"));
}
