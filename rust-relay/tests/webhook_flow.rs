//! End-to-end webhook flow: signed Zoom request in, Serviceware call out.

use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tower::ServiceExt;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use callhook::web::{compute_signature, encrypt_plain_token};
use callhook::{mock, web, AppState, Config, Forwarder};

const CONNECT_ENDPOINT: &str = "/PhoneBox/TelephonyHook/OnCallConnected";
const DISCONNECT_ENDPOINT: &str = "/PhoneBox/TelephonyHook/OnCallDisconnected";
const TIMESTAMP: &str = "1700000000000";

fn config_for(base_url: &str) -> Config {
    Config {
        serviceware_api_url: base_url.to_string(),
        forward_timeout_ms: 2_000,
        ..Config::default()
    }
}

fn app(config: Config) -> Router {
    let forwarder = Forwarder::new(&config).unwrap();
    web::router(AppState::new(config, forwarder))
}

fn call_event(event: &str) -> Value {
    json!({
        "event": event,
        "event_ts": 1700000000000i64,
        "payload": {
            "account_id": "account123",
            "object": {
                "call_id": "call123",
                "callee": { "phone_number": "+49123456789" },
                "caller": { "phone_number": "+4987654321" },
                "ringing_start_time": "2023-01-01T12:00:00Z",
                "connected_start_time": "2023-01-01T12:00:05Z"
            }
        }
    })
}

fn expected_forward_body() -> Value {
    json!({ "toNumber": "+49123456789", "fromNumber": "+4987654321" })
}

fn webhook_request(config: &Config, raw_body: Vec<u8>, signature: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(&config.webhook_path)
        .header("content-type", "application/json")
        .header(config.timestamp_header.as_str(), TIMESTAMP);
    if let Some(signature) = signature {
        builder = builder.header(config.signature_header.as_str(), signature);
    }
    builder.body(Body::from(raw_body)).unwrap()
}

fn signed_request(config: &Config, body: &Value) -> Request<Body> {
    let raw = serde_json::to_vec(body).unwrap();
    let signature = compute_signature(&config.zoom_secret_token, TIMESTAMP, &raw);
    webhook_request(config, raw, Some(&signature))
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

/// Poll until the mock server has seen `expected` requests or time runs out.
async fn wait_for_requests(server: &MockServer, expected: usize) -> Vec<wiremock::Request> {
    for _ in 0..100 {
        let received = server.received_requests().await.unwrap_or_default();
        if received.len() >= expected {
            return received;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    server.received_requests().await.unwrap_or_default()
}

/// Give any stray background forward time to arrive, then count requests.
async fn settled_request_count(server: &MockServer) -> usize {
    tokio::time::sleep(Duration::from_millis(200)).await;
    server.received_requests().await.unwrap_or_default().len()
}

#[tokio::test]
async fn health_needs_no_auth() {
    let app = app(Config::default());

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"OK");
}

#[tokio::test]
async fn url_validation_is_answered() {
    let server = MockServer::start().await;
    let config = config_for(&server.uri());

    let body = json!({
        "event": "endpoint.url_validation",
        "payload": { "plainToken": "some_plain_token" }
    });
    let (status, reply) = send(app(config.clone()), signed_request(&config, &body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        reply,
        json!({
            "plainToken": "some_plain_token",
            "encryptedToken": encrypt_plain_token(&config.zoom_secret_token, "some_plain_token")
        })
    );
    assert_eq!(settled_request_count(&server).await, 0);
}

#[tokio::test]
async fn url_validation_uses_verification_token() {
    let server = MockServer::start().await;
    let config = Config {
        zoom_verification_token: "S".to_string(),
        ..config_for(&server.uri())
    };

    let body = json!({ "event": "endpoint.url_validation", "payload": { "plainToken": "T" } });
    let (status, reply) = send(app(config.clone()), signed_request(&config, &body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(reply["plainToken"], "T");
    assert_eq!(reply["encryptedToken"], encrypt_plain_token("S", "T"));
}

#[tokio::test]
async fn lifecycle_events_are_forwarded() {
    let cases = [
        ("phone.caller_connected", CONNECT_ENDPOINT),
        ("phone.callee_answered", CONNECT_ENDPOINT),
        ("phone.caller_ended", DISCONNECT_ENDPOINT),
        ("phone.callee_ended", DISCONNECT_ENDPOINT),
    ];

    for (event, endpoint) in cases {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(endpoint))
            .and(header("authorization", "Bearer test"))
            .and(header("content-type", "application/json"))
            .and(body_json(expected_forward_body()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "success" })))
            .expect(1)
            .mount(&server)
            .await;

        let config = config_for(&server.uri());
        let (status, reply) = send(app(config.clone()), signed_request(&config, &call_event(event))).await;

        assert_eq!(status, StatusCode::OK, "{}", event);
        assert_eq!(reply, json!({ "message": "Authorized" }), "{}", event);

        let received = wait_for_requests(&server, 1).await;
        assert_eq!(received.len(), 1, "{}", event);
        assert_eq!(received[0].url.path(), endpoint, "{}", event);
    }
}

#[tokio::test]
async fn legacy_flat_payload_is_forwarded() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(DISCONNECT_ENDPOINT))
        .and(body_json(expected_forward_body()))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let config = config_for(&server.uri());
    let body = json!({
        "event": "phone.caller_ended",
        "payload": {
            "call_id": "call123",
            "callee": { "phone_number": "+49123456789" },
            "caller": { "phone_number": "+4987654321" },
            "call_end_time": "2023-01-01T12:05:00Z",
            "handup_result": "Call connected"
        }
    });
    let (status, _) = send(app(config.clone()), signed_request(&config, &body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(wait_for_requests(&server, 1).await.len(), 1);
}

#[tokio::test]
async fn numeric_metadata_is_still_forwarded() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(CONNECT_ENDPOINT))
        .and(body_json(expected_forward_body()))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let config = config_for(&server.uri());
    let body = json!({
        "event": "phone.callee_answered",
        "payload": {
            "account_id": "account123",
            "object": {
                "call_id": 12345,
                "callee": { "phone_number": "+49123456789", "extension_number": 1001 },
                "caller": { "phone_number": "+4987654321" }
            }
        }
    });
    let (status, reply) = send(app(config.clone()), signed_request(&config, &body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(reply, json!({ "message": "Authorized" }));
    assert_eq!(wait_for_requests(&server, 1).await.len(), 1);
}

#[tokio::test]
async fn invalid_signature_is_rejected_without_forwarding() {
    let server = MockServer::start().await;
    let config = config_for(&server.uri());

    for event in ["phone.caller_connected", "endpoint.url_validation", "phone.unknown"] {
        let raw = serde_json::to_vec(&call_event(event)).unwrap();
        let request = webhook_request(&config, raw, Some("v0=invalid_signature"));
        let (status, reply) = send(app(config.clone()), request).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED, "{}", event);
        assert_eq!(reply, json!({ "message": "Unauthorized" }), "{}", event);
    }

    assert_eq!(settled_request_count(&server).await, 0);
}

#[tokio::test]
async fn missing_signature_is_rejected() {
    let server = MockServer::start().await;
    let config = config_for(&server.uri());

    let raw = serde_json::to_vec(&call_event("phone.caller_connected")).unwrap();
    let (status, reply) = send(app(config.clone()), webhook_request(&config, raw, None)).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply["message"], "Unauthorized");
    assert_eq!(settled_request_count(&server).await, 0);
}

#[tokio::test]
async fn signature_from_another_secret_is_rejected() {
    let server = MockServer::start().await;
    let config = config_for(&server.uri());

    let raw = serde_json::to_vec(&call_event("phone.caller_connected")).unwrap();
    let signature = compute_signature("some_other_secret", TIMESTAMP, &raw);
    let (status, _) = send(
        app(config.clone()),
        webhook_request(&config, raw, Some(&signature)),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn signature_covers_raw_bytes() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(CONNECT_ENDPOINT))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    let config = config_for(&server.uri());

    // Whitespace and key order that a re-serialization would not reproduce.
    let raw = br#"{ "payload" : { "object" : { "caller" : { "phone_number" : "+4987654321" },
        "callee" : { "phone_number" : "+49123456789" } } }, "event" : "phone.caller_connected" }"#
        .to_vec();
    let signature = compute_signature(&config.zoom_secret_token, TIMESTAMP, &raw);
    let (status, reply) = send(
        app(config.clone()),
        webhook_request(&config, raw, Some(&signature)),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(reply["message"], "Authorized");
    assert_eq!(wait_for_requests(&server, 1).await.len(), 1);
}

#[tokio::test]
async fn unsupported_event_is_acknowledged_without_forwarding() {
    let server = MockServer::start().await;
    let config = config_for(&server.uri());

    let body = call_event("phone.some_unsupported_event");
    let (status, reply) = send(app(config.clone()), signed_request(&config, &body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(reply, json!({ "message": "Authorized" }));
    assert_eq!(settled_request_count(&server).await, 0);
}

#[tokio::test]
async fn lifecycle_event_without_parties_is_acknowledged_without_forwarding() {
    let server = MockServer::start().await;
    let config = config_for(&server.uri());

    let body = json!({ "event": "phone.caller_connected", "payload": { "object": {} } });
    let (status, reply) = send(app(config.clone()), signed_request(&config, &body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(reply["message"], "Authorized");
    assert_eq!(settled_request_count(&server).await, 0);
}

#[tokio::test]
async fn verified_body_that_is_not_an_event_is_a_bad_request() {
    let config = Config::default();

    let raw = b"not json".to_vec();
    let signature = compute_signature(&config.zoom_secret_token, TIMESTAMP, &raw);
    let (status, reply) = send(
        app(config.clone()),
        webhook_request(&config, raw, Some(&signature)),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(reply["message"], "Bad Request");
}

#[tokio::test]
async fn downstream_error_does_not_change_acknowledgment() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(CONNECT_ENDPOINT))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "status": "error" })))
        .expect(1)
        .mount(&server)
        .await;

    let config = config_for(&server.uri());
    let body = call_event("phone.caller_connected");
    let (status, reply) = send(app(config.clone()), signed_request(&config, &body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(reply, json!({ "message": "Authorized" }));

    // Exactly one attempt, no retry.
    wait_for_requests(&server, 1).await;
    assert_eq!(settled_request_count(&server).await, 1);
}

#[tokio::test]
async fn unreachable_downstream_does_not_change_acknowledgment() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let config = config_for(&format!("http://{}", addr));
    let body = call_event("phone.callee_ended");
    let (status, reply) = send(app(config.clone()), signed_request(&config, &body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(reply, json!({ "message": "Authorized" }));
}

#[tokio::test]
async fn relay_reaches_mock_downstream() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let config = config_for(&format!("http://{}", addr));

    let downstream = mock::router(&config);
    tokio::spawn(async move { axum::serve(listener, downstream).await });

    // Post straight through the forwarder so the outcome can be observed.
    let forwarder = Forwarder::new(&config).unwrap();
    forwarder
        .post(
            callhook::ForwardInstruction::Connect,
            &callhook::ForwardRequest::new("+49123456789".to_string(), "+4987654321".to_string()),
        )
        .await
        .unwrap();

    // A forwarder with the wrong secret is turned away by the mock.
    let wrong = Forwarder::new(&Config {
        serviceware_shared_secret: "wrong".to_string(),
        ..config.clone()
    })
    .unwrap();
    let result = wrong
        .post(
            callhook::ForwardInstruction::Disconnect,
            &callhook::ForwardRequest::new("+49123456789".to_string(), "+4987654321".to_string()),
        )
        .await;
    assert!(matches!(
        result,
        Err(callhook::ForwardError::Status { status: 401, .. })
    ));
}

#[tokio::test]
async fn requests_over_the_rate_limit_are_rejected() {
    let config = Config {
        rate_limit_per_minute: 3,
        ..Config::default()
    };
    let app = app(config);

    for _ in 0..3 {
        let response = app
            .clone()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let (status, reply) = send(
        app,
        Request::builder().uri("/health").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(reply, json!({ "message": "Too Many Requests" }));
}
