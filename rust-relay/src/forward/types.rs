//! Message types sent to the Serviceware telephony hooks.

use serde::{Deserialize, Serialize};

/// Which Serviceware hook a call event maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForwardInstruction {
    /// `phone.caller_connected` and `phone.callee_answered`
    Connect,
    /// `phone.caller_ended` and `phone.callee_ended`
    Disconnect,
}

impl ForwardInstruction {
    /// Name used in log events.
    pub fn as_str(&self) -> &'static str {
        match self {
            ForwardInstruction::Connect => "OnCallConnect",
            ForwardInstruction::Disconnect => "OnCallDisconnect",
        }
    }
}

/// Body posted to Serviceware.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForwardRequest {
    /// Callee phone number
    pub to_number: String,
    /// Caller phone number
    pub from_number: String,
}

impl ForwardRequest {
    pub fn new(to_number: String, from_number: String) -> Self {
        Self {
            to_number,
            from_number,
        }
    }
}
