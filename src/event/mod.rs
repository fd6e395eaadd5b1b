//! Inbound liveness events pushed by the server.

mod reason;

pub use reason::LogoutReason;

use serde::{Deserialize, Serialize};
use snafu::prelude::*;

/// Error when parse a payload as event
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)), module(error), context(suffix(false)))]
pub enum ParseEventError {
    /// payload is invalid json, or not an object with a string `type` field
    #[snafu(display("parse event json {data:?} failed: {source}"))]
    ParseJSONFailed {
        /// payload for decode
        data: String,
        /// source error
        source: serde_json::Error,
    },
}

/// Server -> client event, one json object per delivered payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum InboundEvent {
    /// stream is established
    Connected,
    /// current session is invalidated by the server
    ForceLogout {
        /// why, absent when server does not tell
        #[serde(
            default,
            deserialize_with = "reason::lenient",
            skip_serializing_if = "Option::is_none"
        )]
        reason: Option<LogoutReason>,
    },
    /// current session expired
    SessionExpired,
    /// keep alive, nothing else
    Heartbeat,
    /// any type this client does not know
    #[serde(other)]
    Unknown,
}

impl InboundEvent {
    /// Decode payload to an event
    pub fn decode(data: &str) -> Result<Self, ParseEventError> {
        serde_json::from_str(data).context(error::ParseJSONFailed { data })
    }

    /// get type name
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Connected => "connected",
            Self::ForceLogout { .. } => "force-logout",
            Self::SessionExpired => "session-expired",
            Self::Heartbeat => "heartbeat",
            Self::Unknown => "unknown",
        }
    }

    /// true if this event ends the session
    pub fn invalidates_session(&self) -> bool {
        matches!(self, Self::ForceLogout { .. } | Self::SessionExpired)
    }
}
