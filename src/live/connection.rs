use super::{ConnectionId, ConnectionKey, ConnectionRegistry, LiveChannel, RefreshHandle, RefreshScheduler};
use crate::ports;
use crate::types::live::ServerMessage;
use crate::types::users::UserId;

use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Drive one authenticated live connection until it closes.
///
/// The connection gets its own registry entry, receives its first snapshot,
/// and is refreshed by its own scheduler task. Whatever ends the connection
/// (client close, transport error, failed write), the scheduler is stopped
/// and the registry entry released exactly once.
pub async fn run_connection<S, T>(
    socket: WebSocket,
    scheduler: RefreshScheduler<S, T>,
    registry: Arc<ConnectionRegistry>,
    session_id: String,
    user_id: UserId,
) where
    S: ports::TimerSource,
    T: ports::TimeProvider,
{
    let (ws_sender, mut ws_receiver) = socket.split();
    let (tx, rx) = mpsc::unbounded_channel::<ServerMessage>();
    let channel = LiveChannel::new(tx);
    let connection_id = channel.id();
    let key = ConnectionKey::for_channel(session_id, user_id, &channel);

    let mut writer = tokio::spawn(writer_task(ws_sender, rx));

    registry.register(key.clone(), channel.clone());
    let mut guard = ConnectionGuard {
        registry,
        key: key.clone(),
        connection_id,
        refresh: None,
    };

    match scheduler.start(key.clone(), channel).await {
        Ok(handle) => guard.refresh = Some(handle),
        Err(err) => {
            tracing::debug!(
                user_id = key.user_id,
                connection_id,
                error = %err,
                "live connection closed before first snapshot"
            );
            writer.abort();
            return;
        }
    }

    tracing::info!(
        user_id = key.user_id,
        connection_id,
        interval = ?scheduler.interval(),
        "live connection active"
    );

    loop {
        tokio::select! {
            incoming = ws_receiver.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    tracing::debug!(
                        user_id = key.user_id,
                        connection_id,
                        "ignoring client message: {}",
                        text.chars().take(100).collect::<String>()
                    );
                }
                Some(Ok(Message::Close(frame))) => {
                    tracing::debug!(
                        user_id = key.user_id,
                        connection_id,
                        reason = ?frame,
                        "client closed live connection"
                    );
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    tracing::warn!(
                        user_id = key.user_id,
                        connection_id,
                        error = %err,
                        "live connection receive error"
                    );
                    break;
                }
                None => break,
            },
            _ = &mut writer => {
                tracing::debug!(
                    user_id = key.user_id,
                    connection_id,
                    "live connection writer stopped"
                );
                break;
            }
        }
    }

    writer.abort();
    drop(guard);
}

/// Cleanup that runs on every exit path, including the connection future
/// being dropped.
struct ConnectionGuard {
    registry: Arc<ConnectionRegistry>,
    key: ConnectionKey,
    connection_id: ConnectionId,
    refresh: Option<RefreshHandle>,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        if let Some(refresh) = self.refresh.take() {
            refresh.stop();
        }
        let released = self.registry.release(&self.key, self.connection_id);
        tracing::info!(
            user_id = self.key.user_id,
            connection_id = self.connection_id,
            released,
            "live connection closed"
        );
    }
}

async fn writer_task(
    mut ws_sender: SplitSink<WebSocket, Message>,
    mut rx: mpsc::UnboundedReceiver<ServerMessage>,
) {
    while let Some(message) = rx.recv().await {
        let payload = match serde_json::to_string(&message) {
            Ok(payload) => payload,
            Err(err) => {
                tracing::warn!(error = %err, "failed to encode live message");
                continue;
            }
        };
        if ws_sender.send(Message::Text(payload.into())).await.is_err() {
            break;
        }
    }
    let _ = ws_sender.close().await;
}
