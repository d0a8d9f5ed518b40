//! Shared per-connection session behavior: authentication gating, frame
//! decoding, event dispatch, broadcast relay, and the close handshake.
//!
//! Each connection runs `CONNECTING → AUTH_CHECK → (REJECTED | ACTIVE) →
//! CLOSED`. While active, the loop below is the only consumer of the
//! socket, so event handling within a connection is strictly sequential.

use std::sync::Arc;

use axum::extract::ws::{CloseFrame, Message, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast;

use crate::auth::Identity;
use crate::error::ChatError;
use crate::models::User;

use super::envelope::{Envelope, Frame};
use super::fanout::Publication;

/// All server-initiated closes use the normal-closure code, regardless of
/// cause.
pub const CLOSE_NORMAL: u16 = 1000;

/// Outcome of handling one inbound frame.
pub enum Reply {
    /// Send this envelope back to the connection.
    Envelope(Envelope),
    /// The handler delegated the response to a group broadcast.
    Broadcast,
}

/// Event dispatch implemented by each session type. Recoverable errors are
/// converted into error envelopes by the driver; they never terminate the
/// connection.
pub trait EventSession: Send {
    fn dispatch(
        &mut self,
        frame: &Frame,
    ) -> impl std::future::Future<Output = Result<Reply, ChatError>> + Send;
}

/// Serialize and send one envelope.
pub async fn send_envelope(
    ws_tx: &mut SplitSink<WebSocket, Message>,
    envelope: &Envelope,
) -> Result<(), axum::Error> {
    let json = serde_json::to_string(envelope).unwrap();
    ws_tx.send(Message::Text(json.into())).await
}

/// Send a close frame with code 1000.
pub async fn send_close(
    ws_tx: &mut SplitSink<WebSocket, Message>,
    reason: &str,
) -> Result<(), axum::Error> {
    ws_tx
        .send(Message::Close(Some(CloseFrame {
            code: CLOSE_NORMAL,
            reason: reason.to_string().into(),
        })))
        .await
}

/// Reject anonymous identities: error envelope, then close 1000. Returns
/// the authenticated user otherwise.
pub async fn gate_authenticated(
    ws_tx: &mut SplitSink<WebSocket, Message>,
    identity: Identity,
) -> Option<User> {
    match identity {
        Identity::User(user) => Some(user),
        Identity::Anonymous => {
            let envelope = ChatError::AuthenticationFailed.into_envelope();
            let _ = send_envelope(ws_tx, &envelope).await;
            let _ = send_close(ws_tx, "Authorization failed").await;
            None
        }
    }
}

/// Terminal connect-time failure: error envelope, then close 1000.
pub async fn reject(ws_tx: &mut SplitSink<WebSocket, Message>, detail: &'static str) {
    let envelope = Envelope::error(None, serde_json::json!({ "detail": detail }));
    let _ = send_envelope(ws_tx, &envelope).await;
    let _ = send_close(ws_tx, detail).await;
}

/// Main session loop: decode inbound frames, dispatch them, and relay
/// publications from the session's broadcast group. Returns when the
/// connection closes for any reason; the caller then leaves its groups.
pub async fn drive<S: EventSession>(
    session: &mut S,
    ws_tx: &mut SplitSink<WebSocket, Message>,
    ws_rx: &mut SplitStream<WebSocket>,
    group_rx: &mut broadcast::Receiver<Arc<Publication>>,
) {
    loop {
        tokio::select! {
            inbound = ws_rx.next() => {
                match inbound {
                    Some(Ok(Message::Text(text))) => {
                        let reply = match Frame::parse(&text) {
                            None => Some(Envelope::invalid_input()),
                            Some(frame) => match session.dispatch(&frame).await {
                                Ok(Reply::Envelope(envelope)) => Some(envelope),
                                Ok(Reply::Broadcast) => None,
                                Err(err) => Some(err.into_envelope()),
                            },
                        };
                        if let Some(envelope) = reply {
                            if send_envelope(ws_tx, &envelope).await.is_err() {
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => continue,
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(err)) => {
                        tracing::debug!(?err, "ws read error");
                        break;
                    }
                    _ => continue,
                }
            }

            publication = group_rx.recv() => {
                match publication {
                    Ok(publication) => {
                        let envelope = Envelope::ok(
                            Some(publication.kind.clone()),
                            publication.payload.clone(),
                        );
                        if send_envelope(ws_tx, &envelope).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "session lagged behind group broadcast");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }
}
