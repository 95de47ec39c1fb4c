//! JSON text framing for the pairlink control channel.
//!
//! Wire format: one JSON object per WebSocket text frame.

use crate::error::{PairError, PairResult};

/// Default upper bound for a single control frame (64 KiB).
pub const MAX_FRAME_SIZE: usize = 64 * 1024;

/// Encode a serializable value into a text frame.
pub fn encode<T: serde::Serialize>(value: &T) -> PairResult<String> {
    Ok(serde_json::to_string(value)?)
}

/// Decode a text frame into a typed value.
pub fn decode<T: serde::de::DeserializeOwned>(text: &str) -> PairResult<T> {
    decode_bounded(text, MAX_FRAME_SIZE)
}

/// Decode a text frame, rejecting frames larger than `max_len` bytes.
pub fn decode_bounded<T: serde::de::DeserializeOwned>(text: &str, max_len: usize) -> PairResult<T> {
    if text.len() > max_len {
        return Err(PairError::InvalidMessage(format!(
            "frame too large: {} bytes (max {max_len})",
            text.len()
        )));
    }
    Ok(serde_json::from_str(text)?)
}
