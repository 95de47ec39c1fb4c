//! ICE server discovery.
//!
//! Fetches `{"iceServers": [...]}` from the discovery endpoint. Any failure
//! falls back to a public STUN-only configuration, so discovery never blocks a
//! session.

use pairlink_core::{PairError, PairResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Public STUN server used when discovery fails.
pub const FALLBACK_STUN_URL: &str = "stun:stun.l.google.com:19302";

/// One URL or a list of URLs, as browsers accept both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IceUrls {
    One(String),
    Many(Vec<String>),
}

impl IceUrls {
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        let urls: &[String] = match self {
            IceUrls::One(url) => std::slice::from_ref(url),
            IceUrls::Many(urls) => urls,
        };
        urls.iter().map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceServer {
    pub urls: IceUrls,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential: Option<String>,
}

/// Configuration handed to [`crate::PeerFactory::create`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IceConfig {
    pub ice_servers: Vec<IceServer>,
}

impl Default for IceConfig {
    fn default() -> Self {
        Self {
            ice_servers: vec![IceServer {
                urls: IceUrls::One(FALLBACK_STUN_URL.to_string()),
                username: None,
                credential: None,
            }],
        }
    }
}

/// Derive the discovery endpoint from the signaling URL:
/// `ws://` → `http://`, `wss://` → `https://`, then `/ice`.
pub fn discovery_url(server_url: &str) -> PairResult<String> {
    let base = if let Some(rest) = server_url.strip_prefix("wss://") {
        format!("https://{rest}")
    } else if let Some(rest) = server_url.strip_prefix("ws://") {
        format!("http://{rest}")
    } else if server_url.starts_with("https://") || server_url.starts_with("http://") {
        server_url.to_string()
    } else {
        return Err(PairError::Config(format!(
            "unsupported server URL scheme: {server_url} (expected ws:// or wss://)"
        )));
    };
    Ok(format!("{}/ice", base.trim_end_matches('/')))
}

/// Fetch the ICE configuration, falling back to [`IceConfig::default`].
pub async fn discover(url: &str, timeout: Duration) -> IceConfig {
    match fetch(url, timeout).await {
        Ok(config) => {
            debug!(url, servers = config.ice_servers.len(), "loaded ICE configuration");
            config
        }
        Err(e) => {
            warn!(url, error = %e, "ICE discovery failed, using public STUN");
            IceConfig::default()
        }
    }
}

async fn fetch(url: &str, timeout: Duration) -> PairResult<IceConfig> {
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| PairError::Transport(format!("http client: {e}")))?;

    let response = client
        .get(url)
        .header(reqwest::header::CACHE_CONTROL, "no-store")
        .send()
        .await
        .map_err(|e| PairError::Transport(format!("ICE request failed: {e}")))?
        .error_for_status()
        .map_err(|e| PairError::Transport(format!("ICE request rejected: {e}")))?;

    response
        .json::<IceConfig>()
        .await
        .map_err(|e| PairError::InvalidMessage(format!("malformed ICE configuration: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve exactly one HTTP response and return the endpoint URL.
    async fn one_shot(status: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 2048];
            let _ = socket.read(&mut buf).await;
            let response = format!(
                "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        });
        format!("http://{addr}/ice")
    }

    #[test]
    fn derives_discovery_url() {
        assert_eq!(discovery_url("ws://localhost:4000").unwrap(), "http://localhost:4000/ice");
        assert_eq!(discovery_url("wss://pair.example.com/").unwrap(), "https://pair.example.com/ice");
        assert!(discovery_url("ftp://x").is_err());
    }

    #[test]
    fn urls_accept_string_or_list() {
        let cfg: IceConfig = serde_json::from_str(
            r#"{"iceServers":[{"urls":"stun:a"},{"urls":["turn:b","turn:c"],"username":"u","credential":"p"}]}"#,
        )
        .unwrap();
        assert_eq!(cfg.ice_servers[0].urls.iter().collect::<Vec<_>>(), ["stun:a"]);
        assert_eq!(cfg.ice_servers[1].urls.iter().count(), 2);
        assert_eq!(cfg.ice_servers[1].username.as_deref(), Some("u"));
    }

    #[tokio::test]
    async fn loads_served_configuration() {
        let url = one_shot("200 OK", r#"{"iceServers":[{"urls":"turn:relay.example.com"}]}"#).await;
        let cfg = discover(&url, Duration::from_secs(5)).await;
        assert_eq!(
            cfg.ice_servers[0].urls,
            IceUrls::One("turn:relay.example.com".into())
        );
    }

    #[tokio::test]
    async fn falls_back_on_error_status() {
        let url = one_shot("500 Internal Server Error", "{}").await;
        assert_eq!(discover(&url, Duration::from_secs(5)).await, IceConfig::default());
    }

    #[tokio::test]
    async fn falls_back_on_malformed_body() {
        let url = one_shot("200 OK", r#"{"servers":"nope"}"#).await;
        assert_eq!(discover(&url, Duration::from_secs(5)).await, IceConfig::default());
    }

    #[tokio::test]
    async fn falls_back_when_unreachable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let cfg = discover(&format!("http://{addr}/ice"), Duration::from_secs(2)).await;
        assert_eq!(cfg.ice_servers[0].urls, IceUrls::One(FALLBACK_STUN_URL.into()));
    }
}
