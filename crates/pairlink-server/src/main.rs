//! pairlink-server: anonymous pairing and signaling server.
//!
//! Accepts WebSocket control channels, pairs waiting sessions two at a time
//! and relays negotiation payloads between partners.

mod config;
mod matchmaking;
mod registry;
mod server;
mod tls;
mod transport;

use clap::Parser;
use config::{CliOverrides, ServerConfig};
use pairlink_core::PairResult;
use server::PairServer;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Command-line options. Anything set here wins over the config file.
#[derive(Parser, Debug)]
#[command(name = "pairlink-server", version, about = "Pairing and signaling server")]
struct Cli {
    /// Listen port
    #[arg(short, long)]
    port: Option<u16>,

    /// Listen address
    #[arg(long)]
    host: Option<String>,

    /// TLS certificate (PEM)
    #[arg(long)]
    cert: Option<String>,

    /// TLS private key (PEM)
    #[arg(long)]
    key: Option<String>,

    /// Config file path
    #[arg(long, default_value = "~/.pairlink/server.toml")]
    config: String,

    /// Generate self-signed certificate for development
    #[arg(long)]
    generate_cert: bool,

    /// Maximum concurrent sessions
    #[arg(long)]
    max_sessions: Option<usize>,

    /// Only relay signals to the sender's current partner
    #[arg(long)]
    verify_partner: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();

    if let Err(e) = run(cli).await {
        error!(error = %e, "pairlink-server failed");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> PairResult<()> {
    info!(version = env!("CARGO_PKG_VERSION"), "starting pairlink-server");

    let (cert, key) = if cli.generate_cert {
        let dir = dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join(".pairlink");
        let (cert, key) = tls::generate_dev_cert(&dir)?;
        info!(cert = %cert.display(), key = %key.display(), "generated self-signed certificate");
        (
            Some(cert.to_string_lossy().into_owned()),
            Some(key.to_string_lossy().into_owned()),
        )
    } else {
        (cli.cert, cli.key)
    };

    let overrides = CliOverrides {
        host: cli.host,
        port: cli.port,
        cert,
        key,
        max_sessions: cli.max_sessions,
        verify_partner: cli.verify_partner,
    };
    let config = ServerConfig::load(Some(Path::new(&cli.config)), overrides)?;

    let acceptor = match (&config.cert_path, &config.key_path) {
        (Some(cert), Some(key)) => Some(tls::acceptor(cert, key)?),
        _ => None,
    };
    info!(
        bind = %config.bind_addr(),
        tls = config.tls_enabled(),
        max_sessions = config.max_sessions,
        verify_partner = config.verify_partner,
        "configuration loaded"
    );

    PairServer::new(config).run(acceptor, shutdown_signal()).await?;
    info!("pairlink-server stopped");
    Ok(())
}

/// Wait for SIGTERM or SIGINT (Ctrl+C).
async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(e) => {
                warn!(error = %e, "cannot install SIGTERM handler, waiting for Ctrl+C");
                ctrl_c.await.ok();
            }
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
    }
}
