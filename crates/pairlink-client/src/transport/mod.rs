//! Control-channel transport for pairlink clients.
//!
//! The control channel is a single WebSocket carrying JSON text frames. It is
//! reopened with exponential backoff whenever it drops.

pub mod reconnect;
pub mod websocket;

pub use reconnect::Backoff;

use pairlink_core::{PairError, PairResult};

/// Check that `url` names a WebSocket endpoint.
pub fn check_url(url: &str) -> PairResult<()> {
    let lower = url.to_lowercase();
    if lower.starts_with("ws://") || lower.starts_with("wss://") {
        Ok(())
    } else {
        Err(PairError::Config(format!(
            "unsupported server URL scheme: {url} (expected ws:// or wss://)"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_websocket_urls() {
        assert!(check_url("ws://localhost:4000").is_ok());
        assert!(check_url("WSS://pair.example.com").is_ok());
    }

    #[test]
    fn rejects_other_schemes() {
        assert!(check_url("https://pair.example.com").is_err());
        assert!(check_url("localhost:4000").is_err());
    }
}
