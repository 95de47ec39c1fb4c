//! Client configuration.
//!
//! All timings are milliseconds in the TOML file and exposed as [`Duration`]s.

use pairlink_core::{PairError, PairResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Configuration for a [`crate::PairClient`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Signaling server URL (`ws://` or `wss://`).
    pub server_url: String,
    /// ICE discovery endpoint. Derived from `server_url` when unset.
    pub ice_url: Option<String>,
    /// How long a `next` waits for the server's acknowledgement.
    pub ack_timeout_ms: u64,
    /// Delay between the fallback `leave` and `join`.
    pub rejoin_delay_ms: u64,
    /// Bound on each negotiation-object operation.
    pub negotiation_timeout_ms: u64,
    /// How long a pairing may take to reach a connected transport.
    pub completion_timeout_ms: u64,
    /// Bound on local media acquisition.
    pub media_timeout_ms: u64,
    /// Bound on the ICE discovery request.
    pub ice_timeout_ms: u64,
    pub stats_interval_ms: u64,
    /// How long a `disconnected` transport may take to recover.
    pub disconnect_grace_ms: u64,
    pub reconnect_delay_ms: u64,
    pub reconnect_delay_max_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: "ws://localhost:4000".to_string(),
            ice_url: None,
            ack_timeout_ms: 500,
            rejoin_delay_ms: 250,
            negotiation_timeout_ms: 10_000,
            completion_timeout_ms: 30_000,
            media_timeout_ms: 15_000,
            ice_timeout_ms: 5_000,
            stats_interval_ms: 2_000,
            disconnect_grace_ms: 5_000,
            reconnect_delay_ms: 1_000,
            reconnect_delay_max_ms: 5_000,
        }
    }
}

impl ClientConfig {
    /// Load from a TOML file. A missing file yields the defaults.
    pub fn load(path: &Path) -> PairResult<Self> {
        if !path.exists() {
            info!(path = %path.display(), "client config not found, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| PairError::Config(format!("config parse error: {e}")))
    }

    /// `~/.pairlink/client.toml`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".pairlink").join("client.toml"))
    }

    pub fn ack_timeout(&self) -> Duration {
        Duration::from_millis(self.ack_timeout_ms)
    }

    pub fn rejoin_delay(&self) -> Duration {
        Duration::from_millis(self.rejoin_delay_ms)
    }

    pub fn negotiation_timeout(&self) -> Duration {
        Duration::from_millis(self.negotiation_timeout_ms)
    }

    pub fn completion_timeout(&self) -> Duration {
        Duration::from_millis(self.completion_timeout_ms)
    }

    pub fn media_timeout(&self) -> Duration {
        Duration::from_millis(self.media_timeout_ms)
    }

    pub fn ice_timeout(&self) -> Duration {
        Duration::from_millis(self.ice_timeout_ms)
    }

    pub fn stats_interval(&self) -> Duration {
        Duration::from_millis(self.stats_interval_ms.max(1))
    }

    pub fn disconnect_grace(&self) -> Duration {
        Duration::from_millis(self.disconnect_grace_ms)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn reconnect_delay_max(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_max_ms.max(self.reconnect_delay_ms))
    }
}
