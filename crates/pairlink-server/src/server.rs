//! Core server: accepts connections and runs one session loop per client.
//!
//! Owns the connection registry and the matchmaker. Each connection is
//! registered, greeted with its identity, then served until the client goes
//! away or the server shuts down. Leaving the loop for any reason runs the
//! matchmaking disconnect path so a partner is never left dangling.

use crate::config::ServerConfig;
use crate::matchmaking::{Matchmaker, SignalRelay};
use crate::registry::ConnectionRegistry;
use crate::transport::websocket::{self, WebSocketConnection, WsStream};
use pairlink_core::codec::decode_bounded;
use pairlink_core::{
    encode, short_id, ClientMessage, PairError, PairResult, ServerMessage,
};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{broadcast, mpsc};
use tokio_rustls::TlsAcceptor;
use tokio_tungstenite::WebSocketStream;
use tracing::{debug, info, warn};

/// The pairlink server instance.
pub struct PairServer {
    config: ServerConfig,
    registry: Arc<ConnectionRegistry>,
    matchmaker: Arc<Matchmaker>,
    /// Broadcast sender for server shutdown notification.
    shutdown_tx: broadcast::Sender<()>,
}

impl PairServer {
    /// Create a new server instance.
    pub fn new(config: ServerConfig) -> Self {
        let registry = Arc::new(ConnectionRegistry::new(
            config.outbound_queue,
            config.max_sessions,
        ));
        let relay = SignalRelay::new(config.verify_partner);
        let matchmaker = Arc::new(Matchmaker::new(registry.clone(), relay));

        Self {
            config,
            registry,
            matchmaker,
            shutdown_tx: broadcast::channel(1).0,
        }
    }

    /// Bind the configured address and serve until `shutdown` resolves.
    pub async fn run<F>(self, tls: Option<TlsAcceptor>, shutdown: F) -> PairResult<()>
    where
        F: Future<Output = ()>,
    {
        let (local_addr, conns) =
            websocket::start_listener(&self.config.bind_addr(), tls).await?;
        self.serve(local_addr, conns, shutdown).await
    }

    /// Serve connections from an already-started listener.
    pub async fn serve<F>(
        self,
        local_addr: SocketAddr,
        mut conns: mpsc::Receiver<WebSocketConnection>,
        shutdown: F,
    ) -> PairResult<()>
    where
        F: Future<Output = ()>,
    {
        let server = Arc::new(self);

        info!(
            addr = %local_addr,
            max_sessions = server.config.max_sessions,
            verify_partner = server.config.verify_partner,
            "pairlink-server ready"
        );

        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                maybe_conn = conns.recv() => {
                    let Some(conn) = maybe_conn else {
                        info!("listener closed, shutting down");
                        break;
                    };
                    let srv = server.clone();
                    tokio::spawn(async move {
                        if let Err(e) = srv.handle_connection(conn).await {
                            warn!(error = %e, "WebSocket connection error");
                        }
                    });
                }
                _ = &mut shutdown => {
                    info!("shutdown requested");
                    break;
                }
            }
        }

        let (waiting, pairs) = server.matchmaker.snapshot().await;
        let sessions = server.registry.count().await;
        info!(
            sessions,
            pairs,
            waiting = waiting.is_some(),
            "closing connected sessions"
        );
        let _ = server.shutdown_tx.send(());

        Ok(())
    }

    async fn handle_connection(&self, conn: WebSocketConnection) -> PairResult<()> {
        let remote = conn.remote_addr;
        match conn.stream {
            WsStream::Plain(mut ws) => self.handle_websocket(&mut ws, remote).await,
            WsStream::Tls(mut ws) => self.handle_websocket(&mut *ws, remote).await,
        }
    }

    async fn handle_websocket<S>(
        &self,
        ws: &mut WebSocketStream<S>,
        remote: SocketAddr,
    ) -> PairResult<()>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let Some((session_id, outbound)) = self.registry.register(remote).await else {
            warn!(remote = %remote, max = self.config.max_sessions, "session limit reached, rejecting");
            let full = ServerMessage::Error {
                message: "server full".into(),
            };
            let _ = websocket::ws_send_text(ws, encode(&full)?).await;
            websocket::ws_close(ws).await;
            return Ok(());
        };
        let welcome = ServerMessage::Welcome {
            session_id: session_id.clone(),
        };

        let result = match websocket::ws_send_text(ws, encode(&welcome)?).await {
            Ok(()) => self.session_loop(ws, &session_id, outbound).await,
            Err(e) => Err(e),
        };

        self.matchmaker.disconnect(&session_id).await;
        info!(session_id = %short_id(&session_id), remote = %remote, "session closed");
        result
    }

    /// Message loop: pushes queued notifications and dispatches client frames.
    async fn session_loop<S>(
        &self,
        ws: &mut WebSocketStream<S>,
        session_id: &str,
        mut outbound: mpsc::Receiver<ServerMessage>,
    ) -> PairResult<()>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let ping_secs = self.config.ping_interval;
        let mut ping = tokio::time::interval(Duration::from_secs(ping_secs.max(1)));
        ping.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        ping.tick().await;

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    debug!(session_id = %short_id(session_id), "shutdown signal received, closing session");
                    websocket::ws_close(ws).await;
                    break;
                }

                Some(message) = outbound.recv() => {
                    websocket::ws_send_text(ws, encode(&message)?).await?;
                }

                _ = ping.tick(), if ping_secs > 0 => {
                    websocket::ws_send_ping(ws).await?;
                }

                ws_result = websocket::ws_recv_text(ws, self.config.max_frame_size) => {
                    match ws_result {
                        Ok(Some(text)) => {
                            if let Some(reply) = self.handle_frame(session_id, &text).await {
                                websocket::ws_send_text(ws, encode(&reply)?).await?;
                            }
                        }
                        Ok(None) => {
                            debug!(session_id = %short_id(session_id), "session ended (peer closed)");
                            break;
                        }
                        Err(PairError::InvalidMessage(reason)) => {
                            warn!(session_id = %short_id(session_id), reason = %reason, "dropping frame");
                            let reply = ServerMessage::Error { message: reason };
                            websocket::ws_send_text(ws, encode(&reply)?).await?;
                        }
                        Err(e) => {
                            debug!(session_id = %short_id(session_id), error = %e, "session ended");
                            break;
                        }
                    }
                }
            }
        }

        Ok(())
    }

    /// Decode one client frame and dispatch it. Returns an error reply for
    /// frames that cannot be processed.
    async fn handle_frame(&self, session_id: &str, text: &str) -> Option<ServerMessage> {
        let message: ClientMessage = match decode_bounded(text, self.config.max_frame_size) {
            Ok(m) => m,
            Err(e) => {
                warn!(session_id = %short_id(session_id), error = %e, "undecodable client frame");
                return Some(ServerMessage::Error {
                    message: format!("bad message: {e}"),
                });
            }
        };

        self.dispatch_message(session_id, message).await
    }

    async fn dispatch_message(
        &self,
        session_id: &str,
        message: ClientMessage,
    ) -> Option<ServerMessage> {
        match message {
            ClientMessage::Join => self.matchmaker.join(session_id).await,
            ClientMessage::Leave => self.matchmaker.leave(session_id).await,
            ClientMessage::Next { ack } => self.matchmaker.next(session_id, ack).await,
            ClientMessage::Signal { peer_id, signal } => {
                self.matchmaker.relay(session_id, &peer_id, signal).await;
            }
        }
        None
    }
}
