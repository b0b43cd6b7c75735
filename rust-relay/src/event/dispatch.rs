//! Event dispatch.
//!
//! Turns an inbound event into the reply for Zoom and, for call lifecycle
//! events, the forward to perform afterwards.
//!
//! ```text
//! unverified            → Unauthorized (401)
//! endpoint.url_validation → Validation (200, challenge answer)
//! phone.* lifecycle     → Authorized (200) + Connect/Disconnect forward
//! anything else         → Authorized (200), nothing forwarded
//! ```

use tracing::{debug, info, warn};

use super::types::{
    CallPayload, EventKind, InboundEvent, UrlValidationPayload, ValidationResponse,
};
use crate::forward::{ForwardInstruction, ForwardRequest};
use crate::web::signature::encrypt_plain_token;

/// Reply sent back to Zoom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookReply {
    /// 401 `{"message":"Unauthorized"}`
    Unauthorized,
    /// 200 `{"message":"Authorized"}`
    Authorized,
    /// 200 `{"plainToken":..,"encryptedToken":..}`
    Validation(ValidationResponse),
    /// 400 `{"message":"Bad Request"}`
    BadRequest,
}

/// A forward to run once the reply has been handed back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingForward {
    pub instruction: ForwardInstruction,
    pub request: ForwardRequest,
}

/// Result of dispatching one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatch {
    pub reply: WebhookReply,
    pub forward: Option<PendingForward>,
}

impl Dispatch {
    fn reply(reply: WebhookReply) -> Self {
        Self {
            reply,
            forward: None,
        }
    }
}

/// Dispatch an inbound event.
///
/// `verification_secret` is only used to answer URL validation challenges
/// and is not the secret the request signature was checked against.
pub fn dispatch(event: &InboundEvent, verified: bool, verification_secret: &str) -> Dispatch {
    if !verified {
        warn!(event = %event.event, "zoom_event_unauthorized");
        return Dispatch::reply(WebhookReply::Unauthorized);
    }

    debug!(event = %event.event, event_ts = ?event.event_ts, "zoom_event_verified");

    let kind = event.kind();
    let instruction = match &kind {
        EventKind::UrlValidation => return answer_url_validation(event, verification_secret),
        EventKind::Unrecognized(name) => {
            warn!(event = %name, "zoom_event_unhandled");
            return Dispatch::reply(WebhookReply::Authorized);
        }
        EventKind::CallerConnected | EventKind::CalleeAnswered => ForwardInstruction::Connect,
        EventKind::CallerEnded | EventKind::CalleeEnded => ForwardInstruction::Disconnect,
    };

    // The acknowledgment stands even when the payload cannot be forwarded.
    let payload = match CallPayload::from_value(&event.payload) {
        Ok(payload) => payload,
        Err(e) => {
            warn!(event = %kind.as_str(), error = %e, "zoom_call_payload_invalid");
            return Dispatch::reply(WebhookReply::Authorized);
        }
    };

    let call = payload.call();
    info!(
        event = %kind.as_str(),
        action = instruction.as_str(),
        shape = payload.shape(),
        call_id = ?call.call_id,
        hangup_result = ?call.hangup_result,
        "zoom_call_event_accepted"
    );

    Dispatch {
        reply: WebhookReply::Authorized,
        forward: Some(PendingForward {
            instruction,
            request: ForwardRequest::from(call),
        }),
    }
}

fn answer_url_validation(event: &InboundEvent, verification_secret: &str) -> Dispatch {
    match UrlValidationPayload::from_value(&event.payload) {
        Ok(payload) => {
            let encrypted_token = encrypt_plain_token(verification_secret, &payload.plain_token);
            info!("zoom_url_validation_answered");
            Dispatch::reply(WebhookReply::Validation(ValidationResponse {
                plain_token: payload.plain_token,
                encrypted_token,
            }))
        }
        Err(e) => {
            warn!(error = %e, "zoom_url_validation_invalid");
            Dispatch::reply(WebhookReply::BadRequest)
        }
    }
}
