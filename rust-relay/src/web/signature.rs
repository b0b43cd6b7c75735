//! Zoom webhook signature verification.
//!
//! Zoom signs every webhook request with HMAC-SHA256 over
//! `v0:<timestamp>:<raw body>` and sends the result as `v0=<hex>`.
//! Reference: https://developers.zoom.us/docs/api/webhooks/#verify-webhook-events

use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::warn;

type HmacSha256 = Hmac<Sha256>;

/// Version prefix of the signature scheme.
const SIGNATURE_VERSION: &str = "v0";

/// Compute the signature Zoom would send for this request.
///
/// The body must be the exact bytes received on the wire. Re-serializing a
/// parsed payload changes key order and whitespace and breaks the match.
pub fn compute_signature(secret: &str, timestamp: &str, raw_body: &[u8]) -> String {
    let mut mac = hmac_sha256(secret);
    mac.update(format!("{}:{}:", SIGNATURE_VERSION, timestamp).as_bytes());
    mac.update(raw_body);

    format!(
        "{}={}",
        SIGNATURE_VERSION,
        hex::encode(mac.finalize().into_bytes())
    )
}

/// Verify a Zoom webhook signature.
///
/// # Arguments
///
/// * `secret` - The webhook secret token of the Zoom app
/// * `timestamp` - The `x-zm-request-timestamp` header value
/// * `raw_body` - The request body exactly as received
/// * `signature` - The `x-zm-signature` header value
///
/// # Returns
///
/// `true` only if `signature` matches the computed signature byte for byte.
pub fn verify_signature(secret: &str, timestamp: &str, raw_body: &[u8], signature: &str) -> bool {
    if signature.is_empty() {
        warn!(has_timestamp = !timestamp.is_empty(), "zoom_signature_missing");
        return false;
    }

    let expected_signature = compute_signature(secret, timestamp, raw_body);

    // Constant-time comparison to prevent timing attacks
    let valid = constant_time_compare(&expected_signature, signature);

    if !valid {
        warn!(
            expected_length = expected_signature.len(),
            actual_length = signature.len(),
            "zoom_signature_mismatch"
        );
    }

    valid
}

/// Answer an `endpoint.url_validation` challenge.
///
/// Returns the hex HMAC-SHA256 of `plain_token` under the verification secret.
pub fn encrypt_plain_token(verification_secret: &str, plain_token: &str) -> String {
    let mut mac = hmac_sha256(verification_secret);
    mac.update(plain_token.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

fn hmac_sha256(secret: &str) -> HmacSha256 {
    HmacSha256::new_from_slice(secret.as_bytes())
        .unwrap_or_else(|_| unreachable!("HMAC accepts keys of any length"))
}

/// Constant-time string comparison to prevent timing attacks.
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}
