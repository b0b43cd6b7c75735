//! Web server module for the Zoom webhook.
//!
//! This module provides a thin web server that:
//! - Receives Zoom Phone webhooks and verifies their signatures
//! - Answers URL validation challenges
//! - Acknowledges call events immediately and forwards them in the background
//! - Serves an unauthenticated health check
//! - Limits how many requests each client may send per minute

pub mod handlers;
pub mod rate_limit;
pub mod signature;

use axum::{
    http::{header, HeaderValue},
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, set_header::SetResponseHeaderLayer, trace::TraceLayer};

pub use handlers::{health, zoom_webhook, AppState, MessageResponse};
pub use rate_limit::{limit_by_client, RateLimitState};
pub use signature::{compute_signature, encrypt_plain_token, verify_signature};

/// Build the relay router.
pub fn router(state: AppState) -> Router {
    let webhook_path = route_path(&state.config.webhook_path);
    let rate_limit = RateLimitState::per_minute(state.config.rate_limit_per_minute);

    Router::new()
        .route("/health", get(health))
        .route(&webhook_path, post(zoom_webhook))
        .layer(middleware::from_fn_with_state(rate_limit, limit_by_client))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("SAMEORIGIN"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::REFERRER_POLICY,
            HeaderValue::from_static("no-referrer"),
        ))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Routes must start with `/`.
pub(crate) fn route_path(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    }
}
