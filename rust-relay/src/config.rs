//! Configuration module for environment variable parsing.
//!
//! All settings are read once at startup. Request handling only ever sees the
//! resulting [`Config`], never the process environment.

use std::env;
use std::str::FromStr;

use tracing::warn;

/// Default request-signing secret for local runs and tests.
pub const DEFAULT_ZOOM_SECRET_TOKEN: &str = "zoom_secret";

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port for the relay to listen on
    pub port: u16,

    /// Requests allowed per client per minute, `0` disables the limit
    pub rate_limit_per_minute: u32,

    // =========================================================================
    // Inbound (Zoom) Configuration
    // =========================================================================

    /// Secret used to sign inbound webhook requests
    pub zoom_secret_token: String,

    /// Secret used to answer `endpoint.url_validation` challenges
    pub zoom_verification_token: String,

    /// Path the webhook endpoint is mounted on
    pub webhook_path: String,

    /// Header carrying the `v0=<hex>` request signature
    pub signature_header: String,

    /// Header carrying the timestamp bound into the signature
    pub timestamp_header: String,

    // =========================================================================
    // Outbound (Serviceware) Configuration
    // =========================================================================

    /// Base URL of the call-management service
    pub serviceware_api_url: String,

    /// Bearer token sent with every forwarded request
    pub serviceware_shared_secret: String,

    /// Endpoint path for connect notifications
    pub connect_endpoint: String,

    /// Endpoint path for disconnect notifications
    pub disconnect_endpoint: String,

    /// Timeout for a single forwarded request in milliseconds
    pub forward_timeout_ms: u64,

    // =========================================================================
    // Logging Configuration
    // =========================================================================

    /// Default log filter when `RUST_LOG` is not set
    pub log_level: String,

    /// Directory for `combined.log` and `error.log`
    pub log_dir: String,
}

impl Default for Config {
    fn default() -> Self {
        let zoom_secret_token = DEFAULT_ZOOM_SECRET_TOKEN.to_string();
        Config {
            port: 3000,
            rate_limit_per_minute: 60,
            zoom_verification_token: zoom_secret_token.clone(),
            zoom_secret_token,
            webhook_path: "/zoom-phone-call-event".to_string(),
            signature_header: "x-zm-signature".to_string(),
            timestamp_header: "x-zm-request-timestamp".to_string(),
            serviceware_api_url: "http://127.0.0.1:4000".to_string(),
            serviceware_shared_secret: "test".to_string(),
            connect_endpoint: "/PhoneBox/TelephonyHook/OnCallConnected".to_string(),
            disconnect_endpoint: "/PhoneBox/TelephonyHook/OnCallDisconnected".to_string(),
            forward_timeout_ms: 10_000,
            log_level: "info".to_string(),
            log_dir: "logs".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let defaults = Config::default();

        let zoom_secret_token = string_or("ZOOM_SECRET_TOKEN", defaults.zoom_secret_token);

        // The handshake secret may differ from the signing secret, but falls back to it.
        let zoom_verification_token =
            string_or("ZOOM_VERIFICATION_TOKEN", zoom_secret_token.clone());

        let log_dir = env::var("LOG_DIR").ok().filter(|v| !v.trim().is_empty()).unwrap_or_else(|| {
            match env::var("APP_ENV").as_deref() {
                Ok("production") => "/tmp/logs".to_string(),
                _ => defaults.log_dir.clone(),
            }
        });

        Config {
            port: parse_or("PORT", defaults.port),
            rate_limit_per_minute: parse_or(
                "RATE_LIMIT_PER_MINUTE",
                defaults.rate_limit_per_minute,
            ),

            zoom_secret_token,
            zoom_verification_token,
            webhook_path: string_or("ZOOM_EVENT_SUBSCRIBER_ENDPOINT", defaults.webhook_path),
            signature_header: string_or("ZOOM_SIGNATURE_HEADER", defaults.signature_header),
            timestamp_header: string_or("ZOOM_TIMESTAMP_HEADER", defaults.timestamp_header),

            serviceware_api_url: string_or("SERVICEWARE_API_URL", defaults.serviceware_api_url),
            serviceware_shared_secret: string_or(
                "SERVICEWARE_SHARED_SECRET",
                defaults.serviceware_shared_secret,
            ),
            connect_endpoint: string_or(
                "SERVICEWARE_WH_ENDPOINT_ON_CALL_CONNECTED",
                defaults.connect_endpoint,
            ),
            disconnect_endpoint: string_or(
                "SERVICEWARE_WH_ENDPOINT_ON_CALL_ENDED",
                defaults.disconnect_endpoint,
            ),
            forward_timeout_ms: parse_or("FORWARD_TIMEOUT_MS", defaults.forward_timeout_ms),

            log_level: string_or("LOG_LEVEL", defaults.log_level),
            log_dir,
        }
    }

    /// Whether the handshake uses a secret distinct from the signing secret.
    pub fn has_distinct_verification_token(&self) -> bool {
        self.zoom_verification_token != self.zoom_secret_token
    }
}

/// Read a non-empty string variable, falling back to `default`.
fn string_or(name: &str, default: String) -> String {
    env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or(default)
}

/// Parse a variable into `T`, falling back to `default` when unset or invalid.
fn parse_or<T: FromStr + Copy>(name: &str, default: T) -> T {
    let raw = match env::var(name) {
        Ok(v) => v,
        Err(_) => return default,
    };

    match raw.trim().parse::<T>() {
        Ok(v) => v,
        Err(_) => {
            warn!(env_var = name, value = %raw, "Invalid numeric value, using default");
            default
        }
    }
}
