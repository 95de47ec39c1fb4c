//! WebSocket listener using tokio-tungstenite.
//!
//! Accepts plain TCP or, when a TLS acceptor is configured, TLS connections,
//! performs the WebSocket handshake and hands accepted connections to the
//! server over a channel. Control frames are JSON text.

use futures_util::{SinkExt, StreamExt};
use pairlink_core::{PairError, PairResult};
use std::net::SocketAddr;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_rustls::server::TlsStream;
use tokio_rustls::TlsAcceptor;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;
use tracing::{debug, error, info, warn};

/// An accepted WebSocket, over plain TCP or TLS.
pub enum WsStream {
    Plain(WebSocketStream<TcpStream>),
    Tls(Box<WebSocketStream<TlsStream<TcpStream>>>),
}

/// A handle to an accepted WebSocket connection.
pub struct WebSocketConnection {
    pub stream: WsStream,
    /// Remote address.
    pub remote_addr: SocketAddr,
}

/// Start the WebSocket listener on `bind` (`host:port`).
///
/// Returns the bound address and a receiver that yields accepted connections.
pub async fn start_listener(
    bind: &str,
    tls: Option<TlsAcceptor>,
) -> PairResult<(SocketAddr, mpsc::Receiver<WebSocketConnection>)> {
    let tcp_listener = TcpListener::bind(bind)
        .await
        .map_err(|e| PairError::Transport(format!("WS bind failed on {bind}: {e}")))?;
    let local_addr = tcp_listener.local_addr()?;

    info!(addr = %local_addr, tls = tls.is_some(), "WebSocket listener started");

    let (tx, rx) = mpsc::channel::<WebSocketConnection>(64);

    tokio::spawn(async move {
        loop {
            match tcp_listener.accept().await {
                Ok((stream, addr)) => {
                    let tx = tx.clone();
                    let tls = tls.clone();
                    tokio::spawn(async move {
                        let accepted = match tls {
                            Some(acceptor) => accept_tls(acceptor, stream).await,
                            None => tokio_tungstenite::accept_async(stream)
                                .await
                                .map(WsStream::Plain)
                                .map_err(|e| PairError::Transport(e.to_string())),
                        };
                        match accepted {
                            Ok(stream) => {
                                debug!(remote = %addr, "WebSocket connection accepted");
                                let conn = WebSocketConnection {
                                    stream,
                                    remote_addr: addr,
                                };
                                if tx.send(conn).await.is_err() {
                                    warn!("WebSocket connection channel closed");
                                }
                            }
                            Err(e) => {
                                warn!(remote = %addr, error = %e, "WebSocket handshake failed");
                            }
                        }
                    });
                }
                Err(e) => {
                    error!(error = %e, "TCP accept failed");
                }
            }
        }
    });

    Ok((local_addr, rx))
}

async fn accept_tls(acceptor: TlsAcceptor, stream: TcpStream) -> PairResult<WsStream> {
    let tls_stream = acceptor
        .accept(stream)
        .await
        .map_err(|e| PairError::Transport(format!("TLS accept failed: {e}")))?;
    let ws = tokio_tungstenite::accept_async(tls_stream)
        .await
        .map_err(|e| PairError::Transport(e.to_string()))?;
    Ok(WsStream::Tls(Box::new(ws)))
}

/// Helper: send a text frame over a WebSocket.
pub async fn ws_send_text<S>(ws: &mut WebSocketStream<S>, text: String) -> PairResult<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    ws.send(Message::Text(text.into()))
        .await
        .map_err(|e| PairError::Transport(format!("WS send failed: {e}")))
}

/// Helper: receive the next text frame from a WebSocket.
///
/// Returns `None` if the connection is closed. Binary frames are ignored and
/// pings are answered. Frames larger than `max_frame_size` are rejected.
pub async fn ws_recv_text<S>(
    ws: &mut WebSocketStream<S>,
    max_frame_size: usize,
) -> PairResult<Option<String>>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    loop {
        match ws.next().await {
            Some(Ok(Message::Text(text))) => {
                if text.len() > max_frame_size {
                    return Err(PairError::InvalidMessage(format!(
                        "WS frame too large: {} bytes (max {max_frame_size})",
                        text.len()
                    )));
                }
                return Ok(Some(text.to_string()));
            }
            Some(Ok(Message::Close(_))) => return Ok(None),
            Some(Ok(Message::Ping(payload))) => {
                let _ = ws.send(Message::Pong(payload)).await;
            }
            Some(Ok(_)) => continue,
            Some(Err(e)) => {
                return Err(PairError::Transport(format!("WS recv failed: {e}")));
            }
            None => return Ok(None),
        }
    }
}

/// Helper: send a keepalive ping.
pub async fn ws_send_ping<S>(ws: &mut WebSocketStream<S>) -> PairResult<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    ws.send(Message::Ping(Vec::new().into()))
        .await
        .map_err(|e| PairError::Transport(format!("WS ping failed: {e}")))
}

/// Helper: close the WebSocket, ignoring errors from an already-dead peer.
pub async fn ws_close<S>(ws: &mut WebSocketStream<S>)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let _ = ws.close(None).await;
}
