//! Zoom Phone webhook wire types.
//!
//! This module defines:
//! - The inbound envelope every Zoom webhook shares
//! - The closed set of event kinds the relay understands
//! - Call payloads in both observed protocol shapes

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::forward::ForwardRequest;

/// Challenge-response handshake sent when the endpoint is registered.
pub const URL_VALIDATION: &str = "endpoint.url_validation";
pub const CALLER_CONNECTED: &str = "phone.caller_connected";
pub const CALLER_ENDED: &str = "phone.caller_ended";
pub const CALLEE_ANSWERED: &str = "phone.callee_answered";
pub const CALLEE_ENDED: &str = "phone.callee_ended";

/// Errors raised while reading an event payload.
#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("url validation payload has no plainToken")]
    MissingPlainToken,

    #[error("call payload has no usable caller/callee data ({shape}): {source}")]
    InvalidCall {
        shape: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// Read an optional metadata field, treating a value of the wrong type as absent.
///
/// Only the phone numbers decide whether a call can be forwarded.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

// =============================================================================
// Envelope
// =============================================================================

/// Inbound Zoom webhook body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundEvent {
    /// Event type, e.g. `phone.caller_connected`
    pub event: String,
    /// Event specific payload, interpreted according to `event`
    #[serde(default)]
    pub payload: Value,
    /// Event timestamp in epoch milliseconds
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub event_ts: Option<i64>,
}

impl InboundEvent {
    pub fn kind(&self) -> EventKind {
        EventKind::from_wire(&self.event)
    }
}

/// Event types the relay distinguishes.
///
/// Anything Zoom adds later lands in `Unrecognized` and is acknowledged
/// without being forwarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    UrlValidation,
    CallerConnected,
    CallerEnded,
    CalleeAnswered,
    CalleeEnded,
    Unrecognized(String),
}

impl EventKind {
    pub fn from_wire(event: &str) -> Self {
        match event {
            URL_VALIDATION => EventKind::UrlValidation,
            CALLER_CONNECTED => EventKind::CallerConnected,
            CALLER_ENDED => EventKind::CallerEnded,
            CALLEE_ANSWERED => EventKind::CalleeAnswered,
            CALLEE_ENDED => EventKind::CalleeEnded,
            other => EventKind::Unrecognized(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            EventKind::UrlValidation => URL_VALIDATION,
            EventKind::CallerConnected => CALLER_CONNECTED,
            EventKind::CallerEnded => CALLER_ENDED,
            EventKind::CalleeAnswered => CALLEE_ANSWERED,
            EventKind::CalleeEnded => CALLEE_ENDED,
            EventKind::Unrecognized(name) => name,
        }
    }
}

// =============================================================================
// URL Validation
// =============================================================================

/// Payload of an `endpoint.url_validation` event.
#[derive(Debug, Clone, Deserialize)]
pub struct UrlValidationPayload {
    #[serde(rename = "plainToken")]
    pub plain_token: String,
}

impl UrlValidationPayload {
    pub fn from_value(payload: &Value) -> Result<Self, PayloadError> {
        Self::deserialize(payload).map_err(|_| PayloadError::MissingPlainToken)
    }
}

/// Body returned to Zoom for a validation challenge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationResponse {
    #[serde(rename = "plainToken")]
    pub plain_token: String,
    #[serde(rename = "encryptedToken")]
    pub encrypted_token: String,
}

// =============================================================================
// Call Payloads
// =============================================================================

/// One side of a call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallParty {
    pub phone_number: String,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub extension_id: Option<String>,
    /// e.g. `user`, `callQueue`, `autoReceptionist`, `pstn`
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub extension_type: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub extension_number: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub device_type: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    /// e.g. `pstn_off_net`, `voip`, `pstn_on_net`
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub connection_type: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Outcome reported with `*_ended` events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HangupResult {
    #[serde(rename = "Call connected")]
    CallConnected,
    #[serde(rename = "Call Cancel")]
    CallCancel,
    Voicemail,
    #[serde(other)]
    Other,
}

/// Call details shared by connect and disconnect events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallObject {
    #[serde(default, deserialize_with = "lenient")]
    pub call_id: Option<String>,
    pub caller: CallParty,
    pub callee: CallParty,
    #[serde(default, deserialize_with = "lenient")]
    pub ringing_start_time: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub connected_start_time: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub answer_start_time: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub call_end_time: Option<String>,
    /// Zoom spells this field `handup_result` on the wire.
    #[serde(default, deserialize_with = "lenient", rename = "handup_result")]
    pub hangup_result: Option<HangupResult>,
}

/// A call payload in one of the two protocol shapes Zoom has used.
#[derive(Debug, Clone)]
pub enum CallPayload {
    /// Current shape: `payload.object.{caller,callee}`
    Enveloped {
        account_id: Option<String>,
        object: CallObject,
    },
    /// Legacy shape: `payload.{caller,callee}`
    Flat(CallObject),
}

impl CallPayload {
    /// Parse a call payload, picking the shape by the presence of `object`.
    pub fn from_value(payload: &Value) -> Result<Self, PayloadError> {
        match payload.get("object") {
            Some(object) => {
                let object = CallObject::deserialize(object).map_err(|source| {
                    PayloadError::InvalidCall {
                        shape: "enveloped",
                        source,
                    }
                })?;
                let account_id = payload
                    .get("account_id")
                    .and_then(Value::as_str)
                    .map(str::to_string);
                Ok(CallPayload::Enveloped { account_id, object })
            }
            None => CallObject::deserialize(payload)
                .map(CallPayload::Flat)
                .map_err(|source| PayloadError::InvalidCall {
                    shape: "flat",
                    source,
                }),
        }
    }

    pub fn call(&self) -> &CallObject {
        match self {
            CallPayload::Enveloped { object, .. } => object,
            CallPayload::Flat(object) => object,
        }
    }

    pub fn shape(&self) -> &'static str {
        match self {
            CallPayload::Enveloped { .. } => "enveloped",
            CallPayload::Flat(_) => "flat",
        }
    }
}

impl From<&CallObject> for ForwardRequest {
    fn from(call: &CallObject) -> Self {
        ForwardRequest::new(
            call.callee.phone_number.clone(),
            call.caller.phone_number.clone(),
        )
    }
}
