//! Minimal stand-in for the Serviceware telephony hooks.
//!
//! Used for local end-to-end runs of the relay. Every request must carry the
//! shared bearer secret; the two hook endpoints log the body and echo which
//! hook was hit.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::Serialize;
use serde_json::Value;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::web::{route_path, MessageResponse};
use crate::Config;

#[derive(Clone)]
struct MockState {
    expected_auth: Arc<str>,
}

/// Body returned by both hooks.
#[derive(Debug, Serialize)]
pub struct ReceivedResponse {
    pub status: &'static str,
    pub event: &'static str,
}

/// Build the mock router from the Serviceware settings in `config`.
pub fn router(config: &Config) -> Router {
    let state = MockState {
        expected_auth: format!("Bearer {}", config.serviceware_shared_secret).into(),
    };

    Router::new()
        .route(&route_path(&config.connect_endpoint), post(on_call_connected))
        .route(&route_path(&config.disconnect_endpoint), post(on_call_disconnected))
        .layer(middleware::from_fn_with_state(state.clone(), require_bearer))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn require_bearer(State(state): State<MockState>, request: Request, next: Next) -> Response {
    let authorized = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(|v| v == &*state.expected_auth)
        .unwrap_or(false);

    if !authorized {
        warn!(path = %request.uri().path(), "mock_downstream_unauthorized");
        return (
            StatusCode::UNAUTHORIZED,
            Json(MessageResponse {
                message: "Unauthorized",
            }),
        )
            .into_response();
    }

    next.run(request).await
}

async fn on_call_connected(Json(body): Json<Value>) -> Json<ReceivedResponse> {
    info!(body = %body, "mock_on_call_connected_received");
    Json(ReceivedResponse {
        status: "received",
        event: "OnCallConnected",
    })
}

async fn on_call_disconnected(Json(body): Json<Value>) -> Json<ReceivedResponse> {
    info!(body = %body, "mock_on_call_disconnected_received");
    Json(ReceivedResponse {
        status: "received",
        event: "OnCallDisconnected",
    })
}
