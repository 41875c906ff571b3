//! Transport task for a single feed connection.
//!
//! Performs the handshake, then reads frames one at a time and hands each
//! payload to the client core for decoding and dispatch. Every transport
//! event is funnelled into one lifecycle transition.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde::de::DeserializeOwned;
use tokio::sync::oneshot;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Error as TungsteniteError;
use url::Url;

use super::client::ClientCore;
use super::messages::{FrameKind, classify};
use crate::domain::{ConnectionId, ConnectionState};
use crate::error::FeedError;

/// Runs the handshake and read loop for one transport.
///
/// Returns when the peer closes, the transport fails, or `shutdown`
/// resolves (sent by `close` or dropped along with the client).
pub(crate) async fn run_connection<T>(
    core: Arc<ClientCore<T>>,
    id: ConnectionId,
    endpoint: Url,
    connect_timeout: Duration,
    mut shutdown: oneshot::Receiver<()>,
) where
    T: DeserializeOwned + Send + Sync + 'static,
{
    let handshake = tokio::time::timeout(connect_timeout, connect_async(endpoint.as_str()));

    let stream = tokio::select! {
        _ = &mut shutdown => {
            tracing::debug!(connection_id = %id, "shutdown requested during handshake");
            core.transition(id, ConnectionState::Closed);
            return;
        }
        outcome = handshake => match outcome {
            Ok(Ok((stream, response))) => {
                tracing::debug!(
                    connection_id = %id,
                    status = %response.status(),
                    "websocket handshake completed"
                );
                stream
            }
            Ok(Err(err)) => {
                let err = FeedError::from(err);
                tracing::warn!(
                    connection_id = %id,
                    endpoint = %endpoint,
                    kind = err.kind(),
                    error = %err,
                    "websocket handshake failed"
                );
                core.transition(id, ConnectionState::Errored(err.to_string()));
                return;
            }
            Err(_) => {
                tracing::warn!(
                    connection_id = %id,
                    endpoint = %endpoint,
                    timeout = ?connect_timeout,
                    "websocket handshake timed out"
                );
                core.transition(
                    id,
                    ConnectionState::Errored(format!(
                        "handshake timed out after {}ms",
                        connect_timeout.as_millis()
                    )),
                );
                return;
            }
        }
    };

    // close() may have retired this transport while the handshake finished
    if !core.transition(id, ConnectionState::Open) {
        return;
    }

    let (mut ws_tx, mut ws_rx) = stream.split();

    let final_state = loop {
        tokio::select! {
            _ = &mut shutdown => break ConnectionState::Closed,
            frame = ws_rx.next() => match frame {
                Some(Ok(message)) => match classify(&message) {
                    FrameKind::Payload(payload) => {
                        core.deliver(id, payload);
                    }
                    FrameKind::NotUtf8 => {
                        tracing::error!(connection_id = %id, "dropping binary frame that is not UTF-8");
                    }
                    FrameKind::Close => {
                        tracing::debug!(connection_id = %id, "peer closed the feed");
                        break ConnectionState::Closed;
                    }
                    FrameKind::Control => {}
                },
                Some(Err(TungsteniteError::ConnectionClosed | TungsteniteError::AlreadyClosed))
                | None => break ConnectionState::Closed,
                Some(Err(err)) => {
                    let err = FeedError::from(err);
                    tracing::warn!(
                        connection_id = %id,
                        kind = err.kind(),
                        error = %err,
                        "feed transport failed"
                    );
                    break ConnectionState::Errored(err.to_string());
                }
            }
        }
    };

    let closed_cleanly = final_state == ConnectionState::Closed;
    core.transition(id, final_state);

    if closed_cleanly && let Err(err) = ws_tx.close().await {
        tracing::debug!(connection_id = %id, error = %err, "close handshake incomplete");
    }
    tracing::debug!(connection_id = %id, "feed transport finished");
}
