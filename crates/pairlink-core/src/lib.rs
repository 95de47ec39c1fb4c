//! pairlink-core: Shared protocol library for pairlink.
//!
//! Provides the control-channel message types exchanged between the
//! matchmaking server and its clients, validation of relayed negotiation
//! payloads, the JSON text codec, and the common error type.

pub mod codec;
pub mod error;
pub mod messages;
pub mod signal;

// Re-export commonly used items at crate root.
pub use codec::{decode, encode, MAX_FRAME_SIZE};
pub use error::{PairError, PairResult};
pub use messages::{ClientMessage, ServerMessage};
pub use signal::{validate_signal, IceCandidate, SdpType, SessionDescription, SignalPayload};

/// Shorten a session identifier for log output.
pub fn short_id(id: &str) -> &str {
    &id[..8.min(id.len())]
}
