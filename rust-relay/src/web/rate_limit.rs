//! Per-client request rate limiting.
//!
//! Every route shares one keyed limiter. Clients are keyed by the connection
//! address, falling back to proxy headers when the server was not started
//! with connect info.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::num::NonZeroU32;
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use governor::{
    clock::{Clock, DefaultClock},
    DefaultKeyedRateLimiter, Quota, RateLimiter,
};
use tracing::warn;

use super::handlers::MessageResponse;

/// Tracked clients above which idle limiter entries are pruned.
const PRUNE_THRESHOLD: usize = 10_000;

/// State for the rate limiting middleware.
#[derive(Clone)]
pub struct RateLimitState {
    /// `None` when rate limiting is disabled
    limiter: Option<Arc<DefaultKeyedRateLimiter<IpAddr>>>,
}

impl RateLimitState {
    /// Allow `per_minute` requests per client; `0` disables the limit.
    pub fn per_minute(per_minute: u32) -> Self {
        let limiter = NonZeroU32::new(per_minute)
            .map(|quota| Arc::new(RateLimiter::keyed(Quota::per_minute(quota))));
        Self { limiter }
    }

    pub fn is_enabled(&self) -> bool {
        self.limiter.is_some()
    }
}

/// Rejection returned once a client has used up its quota.
pub struct RateLimited {
    /// Seconds until the next request would be allowed
    pub retry_after: u64,
}

impl IntoResponse for RateLimited {
    fn into_response(self) -> Response {
        let mut response = (
            StatusCode::TOO_MANY_REQUESTS,
            Json(MessageResponse {
                message: "Too Many Requests",
            }),
        )
            .into_response();

        response.headers_mut().insert(
            header::RETRY_AFTER,
            HeaderValue::from_str(&self.retry_after.to_string())
                .unwrap_or_else(|_| HeaderValue::from_static("60")),
        );
        response
    }
}

/// Rate limiting middleware.
pub async fn limit_by_client(
    State(state): State<RateLimitState>,
    request: Request,
    next: Next,
) -> Result<Response, RateLimited> {
    let Some(limiter) = &state.limiter else {
        return Ok(next.run(request).await);
    };

    let client_ip = client_ip(&request);
    if let Err(not_until) = limiter.check_key(&client_ip) {
        let retry_after = not_until
            .wait_time_from(DefaultClock::default().now())
            .as_secs()
            .max(1);
        warn!(
            client_ip = %client_ip,
            retry_after,
            path = %request.uri().path(),
            "rate_limit_exceeded"
        );
        return Err(RateLimited { retry_after });
    }

    if limiter.len() > PRUNE_THRESHOLD {
        limiter.retain_recent();
    }

    Ok(next.run(request).await)
}

/// Client address used as the limiter key.
fn client_ip(request: &Request) -> IpAddr {
    if let Some(ConnectInfo(addr)) = request.extensions().get::<ConnectInfo<SocketAddr>>() {
        return addr.ip();
    }

    let forwarded = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(|ip| ip.trim().parse().ok());
    if let Some(ip) = forwarded {
        return ip;
    }

    request
        .headers()
        .get("x-real-ip")
        .and_then(|h| h.to_str().ok())
        .and_then(|ip| ip.trim().parse().ok())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}
