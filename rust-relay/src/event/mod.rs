//! Zoom Phone event handling.
//!
//! This module provides:
//! - Wire types for the inbound webhook envelope and call payloads
//! - The dispatcher deciding the reply and the forward for each event
//!
//! ## Flow
//!
//! ```text
//! InboundEvent → dispatch() → WebhookReply + Option<PendingForward>
//! ```

pub mod dispatch;
pub mod types;

pub use dispatch::{dispatch, Dispatch, PendingForward, WebhookReply};
pub use types::{
    CallObject, CallParty, CallPayload, EventKind, HangupResult, InboundEvent, PayloadError,
    UrlValidationPayload, ValidationResponse,
};
