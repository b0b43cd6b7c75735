//! Webhook endpoint handlers.
//!
//! The Zoom handler only:
//! 1. Verifies the request signature against the raw body
//! 2. Dispatches the event
//! 3. Starts the Serviceware forward without waiting for it
//! 4. Returns the reply

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{info, warn};

use crate::event::{dispatch, Dispatch, InboundEvent, PendingForward, WebhookReply};
use crate::forward::Forwarder;
use crate::web::signature::verify_signature;
use crate::Config;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub forwarder: Forwarder,
}

impl AppState {
    pub fn new(config: Config, forwarder: Forwarder) -> Self {
        Self {
            config: Arc::new(config),
            forwarder,
        }
    }
}

// =============================================================================
// Health Check
// =============================================================================

/// Health check endpoint.
pub async fn health() -> &'static str {
    "OK"
}

// =============================================================================
// Zoom Webhook
// =============================================================================

/// Plain message body used for acknowledgments and rejections.
#[derive(Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

impl IntoResponse for WebhookReply {
    fn into_response(self) -> Response {
        match self {
            WebhookReply::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                Json(MessageResponse {
                    message: "Unauthorized",
                }),
            )
                .into_response(),
            WebhookReply::Authorized => (
                StatusCode::OK,
                Json(MessageResponse {
                    message: "Authorized",
                }),
            )
                .into_response(),
            WebhookReply::Validation(body) => (StatusCode::OK, Json(body)).into_response(),
            WebhookReply::BadRequest => (
                StatusCode::BAD_REQUEST,
                Json(MessageResponse {
                    message: "Bad Request",
                }),
            )
                .into_response(),
        }
    }
}

/// Zoom Phone webhook endpoint.
///
/// The body is taken as raw bytes so the signature is checked against
/// exactly what Zoom sent.
pub async fn zoom_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> WebhookReply {
    let config = &state.config;
    let signature = header_value(&headers, &config.signature_header);
    let timestamp = header_value(&headers, &config.timestamp_header);

    info!(
        body_length = body.len(),
        has_signature = signature.is_some(),
        has_timestamp = timestamp.is_some(),
        "zoom_webhook_received"
    );

    let verified = match (signature, timestamp) {
        (Some(signature), Some(timestamp)) => {
            verify_signature(&config.zoom_secret_token, timestamp, &body, signature)
        }
        _ => false,
    };

    if !verified {
        warn!("zoom_webhook_unauthorized");
        return WebhookReply::Unauthorized;
    }

    let event: InboundEvent = match serde_json::from_slice(&body) {
        Ok(event) => event,
        Err(e) => {
            warn!(error = %e, "zoom_webhook_invalid_body");
            return WebhookReply::BadRequest;
        }
    };

    let Dispatch { reply, forward } = dispatch(&event, verified, &config.zoom_verification_token);

    if let Some(PendingForward {
        instruction,
        request,
    }) = forward
    {
        // Detached; the reply below never waits on Serviceware.
        state.forwarder.spawn(instruction, request);
    }

    reply
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
}
