//! Callhook - Zoom Phone to Serviceware webhook relay.
//!
//! This library provides the modules behind two binaries:
//! - `callhook-relay`: Receives Zoom Phone webhooks and forwards call events
//! - `callhook-mock-downstream`: Local stand-in for the Serviceware hooks
//!
//! ## Architecture
//!
//! ```text
//! Zoom → signature check → dispatch → reply to Zoom
//!                                  └→ detached forward → Serviceware
//! ```

pub mod config;
pub mod event;
pub mod forward;
pub mod logging;
pub mod mock;
pub mod web;

// Re-export commonly used types
pub use config::Config;
pub use event::{dispatch, Dispatch, EventKind, InboundEvent, WebhookReply};
pub use forward::{ForwardError, ForwardInstruction, ForwardRequest, Forwarder};
pub use web::AppState;
