//! Server configuration: TOML file + CLI overrides.

use pairlink_core::{PairError, PairResult};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

/// Top-level config file structure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub relay: RelaySection,
}

/// `[server]` section of the config TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub cert: Option<String>,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
    #[serde(default = "default_max_frame_size")]
    pub max_frame_size: usize,
    #[serde(default = "default_outbound_queue")]
    pub outbound_queue: usize,
    #[serde(default = "default_ping_interval")]
    pub ping_interval: u64,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cert: None,
            key: None,
            max_sessions: default_max_sessions(),
            max_frame_size: default_max_frame_size(),
            outbound_queue: default_outbound_queue(),
            ping_interval: default_ping_interval(),
        }
    }
}

/// `[relay]` section of the config TOML.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RelaySection {
    /// Only relay signals to the sender's current partner.
    #[serde(default)]
    pub verify_partner: bool,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    4000
}
fn default_max_sessions() -> usize {
    10_000
}
fn default_max_frame_size() -> usize {
    pairlink_core::MAX_FRAME_SIZE
}
fn default_outbound_queue() -> usize {
    64
}
fn default_ping_interval() -> u64 {
    25
}

/// Values given on the command line. `None` / `false` keeps the file value.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub cert: Option<String>,
    pub key: Option<String>,
    pub max_sessions: Option<usize>,
    pub verify_partner: bool,
}

/// Resolved server configuration (paths expanded, CLI overrides applied).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cert_path: Option<PathBuf>,
    pub key_path: Option<PathBuf>,
    pub max_sessions: usize,
    pub max_frame_size: usize,
    pub outbound_queue: usize,
    pub ping_interval: u64,
    pub verify_partner: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::merge(ConfigFile::default(), CliOverrides::default())
    }
}

impl ServerConfig {
    /// Load config from TOML file, then apply CLI overrides.
    pub fn load(config_path: Option<&Path>, cli: CliOverrides) -> PairResult<Self> {
        let file_config = match config_path {
            Some(path) => {
                let expanded = expand_tilde(path);
                if expanded.exists() {
                    info!(path = %expanded.display(), "loading config file");
                    let content = std::fs::read_to_string(&expanded)?;
                    toml::from_str::<ConfigFile>(&content)
                        .map_err(|e| PairError::Config(format!("config parse error: {e}")))?
                } else {
                    info!(path = %expanded.display(), "config file not found, using defaults");
                    ConfigFile::default()
                }
            }
            None => ConfigFile::default(),
        };

        let config = Self::merge(file_config, cli);
        if config.cert_path.is_some() != config.key_path.is_some() {
            return Err(PairError::Config(
                "TLS needs both a certificate and a private key".into(),
            ));
        }
        Ok(config)
    }

    fn merge(file: ConfigFile, cli: CliOverrides) -> Self {
        let server = file.server;
        let cert = cli.cert.or(server.cert);
        let key = cli.key.or(server.key);

        Self {
            host: cli.host.unwrap_or(server.host),
            port: cli.port.unwrap_or(server.port),
            cert_path: cert.as_deref().map(expand_tilde_str),
            key_path: key.as_deref().map(expand_tilde_str),
            max_sessions: cli.max_sessions.unwrap_or(server.max_sessions),
            max_frame_size: server.max_frame_size,
            outbound_queue: server.outbound_queue,
            ping_interval: server.ping_interval,
            verify_partner: cli.verify_partner || file.relay.verify_partner,
        }
    }

    /// `host:port` string the listener binds to.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Whether the listener should terminate TLS itself.
    pub fn tls_enabled(&self) -> bool {
        self.cert_path.is_some() && self.key_path.is_some()
    }
}

/// Expand `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
    let s = path.to_string_lossy();
    expand_tilde_str(&s)
}

fn expand_tilde_str(s: &str) -> PathBuf {
    if let Some(rest) = s.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.host, "0.0.0.0");
        assert_eq!(cfg.port, 4000);
        assert_eq!(cfg.max_sessions, 10_000);
        assert_eq!(cfg.max_frame_size, 64 * 1024);
        assert_eq!(cfg.outbound_queue, 64);
        assert_eq!(cfg.ping_interval, 25);
        assert!(!cfg.verify_partner);
        assert!(!cfg.tls_enabled());
        assert_eq!(cfg.bind_addr(), "0.0.0.0:4000");
    }

    #[test]
    fn parse_partial_toml_config() {
        let file: ConfigFile = toml::from_str(
            r#"
[server]
port = 5000

[relay]
verify_partner = true
"#,
        )
        .unwrap();
        let cfg = ServerConfig::merge(file, CliOverrides::default());
        assert_eq!(cfg.port, 5000);
        assert_eq!(cfg.host, "0.0.0.0");
        assert!(cfg.verify_partner);
    }

    #[test]
    fn cli_overrides_file() {
        let file: ConfigFile = toml::from_str(
            r#"
[server]
host = "127.0.0.1"
port = 5000
max_sessions = 10
"#,
        )
        .unwrap();
        let cfg = ServerConfig::merge(
            file,
            CliOverrides {
                port: Some(6000),
                max_sessions: Some(2),
                ..Default::default()
            },
        );
        assert_eq!(cfg.host, "127.0.0.1");
        assert_eq!(cfg.port, 6000);
        assert_eq!(cfg.max_sessions, 2);
    }

    #[test]
    fn missing_file_uses_defaults() {
        let cfg = ServerConfig::load(
            Some(Path::new("/nonexistent/pairlink/server.toml")),
            CliOverrides::default(),
        )
        .unwrap();
        assert_eq!(cfg.port, 4000);
    }

    #[test]
    fn cert_without_key_rejected() {
        let result = ServerConfig::load(
            None,
            CliOverrides {
                cert: Some("/tmp/cert.pem".into()),
                ..Default::default()
            },
        );
        assert!(matches!(result, Err(PairError::Config(_))));
    }

    #[test]
    fn tilde_expands_to_home() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_tilde_str("~/x.pem"), home.join("x.pem"));
        }
        assert_eq!(expand_tilde_str("/abs/x.pem"), PathBuf::from("/abs/x.pem"));
    }
}
