//! Forwarding of call events to Serviceware.
//!
//! This module provides:
//! - The connect/disconnect instruction and request body types
//! - A shared HTTP client that posts each instruction exactly once
//!
//! ## Delivery
//!
//! ```text
//! Webhook handler → Forwarder::spawn → POST <base><endpoint> (single attempt, logged)
//! ```

pub mod client;
pub mod types;

pub use client::{ForwardError, Forwarder};
pub use types::{ForwardInstruction, ForwardRequest};
