//! Control-channel messages.
//!
//! Every frame is a JSON object tagged by `"type"`. Negotiation payloads
//! travel through the server as opaque JSON values; only clients interpret
//! them (see [`crate::signal`]).

use crate::error::PairResult;
use crate::signal::SignalPayload;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Messages sent from a client to the matchmaking server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientMessage {
    /// Enter matchmaking.
    Join,
    /// Exit the current pair or the waiting slot.
    Leave,
    /// Leave and rejoin in one step. `ack` requests an acknowledgement.
    Next {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        ack: Option<u64>,
    },
    /// Relay a negotiation payload to another session.
    Signal {
        #[serde(rename = "peerId")]
        peer_id: String,
        signal: Value,
    },
}

impl ClientMessage {
    /// Build a `signal` message carrying a validated payload.
    pub fn signal(peer_id: impl Into<String>, payload: &SignalPayload) -> PairResult<Self> {
        Ok(Self::Signal {
            peer_id: peer_id.into(),
            signal: payload.to_value()?,
        })
    }

    /// Short name used in log output.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Join => "join",
            Self::Leave => "leave",
            Self::Next { .. } => "next",
            Self::Signal { .. } => "signal",
        }
    }
}

/// Messages sent from the matchmaking server to a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerMessage {
    /// First message on every connection: the server-assigned identity.
    Welcome {
        #[serde(rename = "sessionId")]
        session_id: String,
    },
    /// Queued, no partner yet.
    Waiting,
    /// A pair was established.
    Paired {
        #[serde(rename = "peerId")]
        peer_id: String,
        initiator: bool,
    },
    /// A relayed negotiation payload; `peer_id` is the origin session.
    Signal {
        #[serde(rename = "peerId")]
        peer_id: String,
        signal: Value,
    },
    /// The partner left or disconnected.
    PartnerDisconnected { from: String },
    /// Acknowledges a `next` that carried an ack id.
    Ack { id: u64 },
    /// Diagnostic for a rejected request.
    Error { message: String },
}

impl ServerMessage {
    /// Short name used in log output.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Welcome { .. } => "welcome",
            Self::Waiting => "waiting",
            Self::Paired { .. } => "paired",
            Self::Signal { .. } => "signal",
            Self::PartnerDisconnected { .. } => "partner-disconnected",
            Self::Ack { .. } => "ack",
            Self::Error { .. } => "error",
        }
    }
}
