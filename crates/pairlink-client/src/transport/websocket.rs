//! WebSocket control channel.
//!
//! One task owns the socket. It forwards outbound messages from the session
//! driver, posts decoded server messages back as inputs, and reconnects with
//! backoff when the socket drops. Messages queued while no socket is open are
//! discarded: after a reconnect the driver re-establishes its state itself.

use super::reconnect::Backoff;
use crate::machine::{Input, InputSender};
use futures_util::{SinkExt, StreamExt};
use pairlink_core::codec::decode_bounded;
use pairlink_core::{encode, short_id, ClientMessage, PairError, PairResult, ServerMessage, MAX_FRAME_SIZE};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

type ClientWs = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// How a connected socket stopped being served.
enum Served {
    /// The socket dropped; reconnect.
    Dropped,
    /// The driver went away; stop for good.
    Finished,
}

/// Keep a control channel to `url` open until the outbound sender is dropped.
pub(crate) async fn run_control_channel(
    url: String,
    mut outbound: mpsc::UnboundedReceiver<ClientMessage>,
    inputs: InputSender,
    mut backoff: Backoff,
    connect_timeout: Duration,
) {
    loop {
        let attempt = tokio::time::timeout(connect_timeout, connect(&url))
            .await
            .map_err(|_| PairError::Timeout)
            .and_then(|result| result);

        match attempt {
            Ok((ws, session_id)) => {
                info!(url = %url, session_id = %short_id(&session_id), "control channel connected");
                backoff.reset();
                let mut stale = 0usize;
                while outbound.try_recv().is_ok() {
                    stale += 1;
                }
                if stale > 0 {
                    debug!(count = stale, "discarded messages queued while disconnected");
                }
                if inputs.send(Input::ChannelUp { session_id }).is_err() {
                    return;
                }
                match serve(ws, &mut outbound, &inputs).await {
                    Served::Finished => return,
                    Served::Dropped => {
                        if inputs.send(Input::ChannelDown).is_err() {
                            return;
                        }
                    }
                }
            }
            Err(e) => {
                warn!(url = %url, attempt = backoff.attempts() + 1, error = %e, "control channel connect failed");
                let error = e.to_string();
                if inputs.send(Input::ConnectFailed { error }).is_err() {
                    return;
                }
            }
        }

        let delay = backoff.next_delay();
        debug!(delay_ms = delay.as_millis() as u64, "reconnecting after delay");
        let sleep = tokio::time::sleep(delay);
        tokio::pin!(sleep);
        loop {
            tokio::select! {
                _ = &mut sleep => break,
                message = outbound.recv() => match message {
                    Some(message) => debug!(kind = message.kind(), "control channel down, dropping"),
                    None => return,
                },
            }
        }
    }
}

/// Open the socket and wait for the server-assigned identity.
async fn connect(url: &str) -> PairResult<(ClientWs, String)> {
    let (mut ws, _response) = connect_async(url)
        .await
        .map_err(|e| PairError::Transport(format!("WebSocket connect error: {e}")))?;

    loop {
        match ws.next().await {
            Some(Ok(Message::Text(text))) => {
                return match decode_bounded::<ServerMessage>(&text, MAX_FRAME_SIZE)? {
                    ServerMessage::Welcome { session_id } => Ok((ws, session_id)),
                    ServerMessage::Error { message } => Err(PairError::Transport(format!(
                        "server rejected connection: {message}"
                    ))),
                    other => Err(PairError::InvalidMessage(format!(
                        "expected welcome, got {}",
                        other.kind()
                    ))),
                };
            }
            Some(Ok(Message::Close(_))) | None => {
                return Err(PairError::Transport("closed before welcome".into()));
            }
            Some(Ok(_)) => continue,
            Some(Err(e)) => return Err(PairError::Transport(format!("WS read error: {e}"))),
        }
    }
}

async fn serve(
    mut ws: ClientWs,
    outbound: &mut mpsc::UnboundedReceiver<ClientMessage>,
    inputs: &InputSender,
) -> Served {
    loop {
        tokio::select! {
            message = outbound.recv() => {
                let Some(message) = message else {
                    let _ = ws.close(None).await;
                    return Served::Finished;
                };
                let text = match encode(&message) {
                    Ok(text) => text,
                    Err(e) => {
                        warn!(kind = message.kind(), error = %e, "failed to encode message");
                        continue;
                    }
                };
                if let Err(e) = ws.send(Message::Text(text.into())).await {
                    warn!(error = %e, "control channel write failed");
                    return Served::Dropped;
                }
            }
            frame = ws.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    match decode_bounded::<ServerMessage>(&text, MAX_FRAME_SIZE) {
                        Ok(message) => {
                            if inputs.send(Input::Server(message)).is_err() {
                                let _ = ws.close(None).await;
                                return Served::Finished;
                            }
                        }
                        Err(e) => warn!(error = %e, "ignoring undecodable server frame"),
                    }
                }
                Some(Ok(Message::Close(_))) | None => {
                    info!("control channel closed by server");
                    return Served::Dropped;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(error = %e, "control channel read failed");
                    return Served::Dropped;
                }
            },
        }
    }
}
