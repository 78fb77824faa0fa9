//! Per-connection gateway: frame decoding and event dispatch.
//!
//! Each accepted connection gets its own Tokio task running this
//! gateway. The flow is:
//!   1. Spawn a writer task draining this connection's outbound event
//!      channel into encoded text frames.
//!   2. Loop: receive frames → decode [`ClientEvent`] → dispatch into
//!      the registry.
//!   3. On close or error, a drop guard routes the disconnect into the
//!      registry: leave the room, purge pending requests this
//!      connection originated.
//!
//! Malformed traffic never propagates: an undecodable frame, or an
//! event whose ids are empty after normalization, is dropped with a
//! debug log and no state is touched.

use std::sync::Arc;

use anteroom_protocol::{
    ClientEvent, Codec, GuestId, RoomId, ServerEvent,
};
use anteroom_transport::{
    Connection, ConnectionId, WebSocketConnection,
};
use tokio::sync::mpsc;

use crate::AnteroomError;
use crate::server::ServerState;

/// Drop guard that cleans a connection out of the registry when its
/// gateway task exits — including on panic. `Drop` is synchronous, so
/// the async cleanup runs in a fire-and-forget task.
struct DisconnectGuard {
    conn_id: ConnectionId,
    state: Arc<ServerState>,
}

impl Drop for DisconnectGuard {
    fn drop(&mut self) {
        let conn_id = self.conn_id;
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            state.registry.lock().await.leave(conn_id).await;
            tracing::info!(%conn_id, "connection cleaned up");
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection(
    conn: WebSocketConnection,
    state: Arc<ServerState>,
) -> Result<(), AnteroomError> {
    let conn_id = conn.id();
    tracing::debug!(%conn_id, "handling new connection");

    let conn = Arc::new(conn);

    // Writer task: everything the rooms want delivered to this
    // connection funnels through one channel, so per-room actors never
    // block on this socket.
    let (event_tx, mut event_rx) =
        mpsc::unbounded_channel::<ServerEvent>();
    let writer_conn = Arc::clone(&conn);
    let codec = state.codec;
    let writer = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            let frame = match codec.encode(&event) {
                Ok(frame) => frame,
                Err(e) => {
                    tracing::debug!(error = %e, "failed to encode event");
                    continue;
                }
            };
            if writer_conn.send(&frame).await.is_err() {
                break;
            }
        }
    });

    let _guard = DisconnectGuard {
        conn_id,
        state: Arc::clone(&state),
    };

    loop {
        let frame = match conn.recv().await {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                tracing::info!(%conn_id, "connection closed cleanly");
                break;
            }
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "recv error");
                break;
            }
        };

        let event: ClientEvent = match state.codec.decode(&frame) {
            Ok(event) => event,
            Err(e) => {
                tracing::debug!(
                    %conn_id, error = %e, "dropping malformed frame"
                );
                continue;
            }
        };

        dispatch(&state, conn_id, &event_tx, event).await;
    }

    writer.abort();
    // _guard drops here → registry leave + pending cleanup fire.
    Ok(())
}

/// Routes one decoded client event into the registry.
async fn dispatch(
    state: &Arc<ServerState>,
    conn_id: ConnectionId,
    event_tx: &mpsc::UnboundedSender<ServerEvent>,
    event: ClientEvent,
) {
    match event {
        ClientEvent::JoinRoom { room_id, role } => {
            let Some(room_id) = valid_room(conn_id, &room_id) else {
                return;
            };
            let mut registry = state.registry.lock().await;
            match registry
                .join(room_id.clone(), conn_id, role, event_tx.clone())
                .await
            {
                Ok(count) => {
                    tracing::info!(
                        %conn_id, %room_id, %role, members = count,
                        "joined room"
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        %conn_id, %room_id, error = %e, "join failed"
                    );
                }
            }
        }

        ClientEvent::JoinRequest {
            room_id,
            guest_id,
            guest_name,
        } => {
            let Some(room_id) = valid_room(conn_id, &room_id) else {
                return;
            };
            let Some(guest_id) = valid_guest(conn_id, &guest_id) else {
                return;
            };
            let mut registry = state.registry.lock().await;
            if let Err(e) = registry
                .submit_request(room_id, guest_id, guest_name, conn_id)
                .await
            {
                tracing::warn!(%conn_id, error = %e, "submit failed");
            }
        }

        ClientEvent::AdmissionDecision {
            room_id,
            guest_id,
            admitted,
        } => {
            let Some(room_id) = valid_room(conn_id, &room_id) else {
                return;
            };
            let Some(guest_id) = valid_guest(conn_id, &guest_id) else {
                return;
            };
            let registry = state.registry.lock().await;
            if let Err(e) =
                registry.decide(&room_id, guest_id, admitted).await
            {
                tracing::warn!(%conn_id, error = %e, "decide failed");
            }
        }

        ClientEvent::LockRoom { room_id, locked } => {
            let Some(room_id) = valid_room(conn_id, &room_id) else {
                return;
            };
            let mut registry = state.registry.lock().await;
            if let Err(e) = registry.set_locked(room_id, locked).await {
                tracing::warn!(%conn_id, error = %e, "lock failed");
            }
        }

        ClientEvent::ChatMessage { room_id, body } => {
            let Some(room_id) = valid_room(conn_id, &room_id) else {
                return;
            };
            let registry = state.registry.lock().await;
            let _ = registry
                .broadcast(
                    &room_id,
                    ServerEvent::ChatMessage {
                        room_id: room_id.clone(),
                        body,
                    },
                )
                .await;
        }

        ClientEvent::EmojiReaction { room_id, body } => {
            let Some(room_id) = valid_room(conn_id, &room_id) else {
                return;
            };
            let registry = state.registry.lock().await;
            let _ = registry
                .broadcast(
                    &room_id,
                    ServerEvent::EmojiReaction {
                        room_id: room_id.clone(),
                        body,
                    },
                )
                .await;
        }
    }
}

fn valid_room(conn_id: ConnectionId, raw: &str) -> Option<RoomId> {
    match RoomId::new(raw) {
        Ok(room_id) => Some(room_id),
        Err(e) => {
            tracing::debug!(%conn_id, error = %e, "dropping event");
            None
        }
    }
}

fn valid_guest(conn_id: ConnectionId, raw: &str) -> Option<GuestId> {
    match GuestId::new(raw) {
        Ok(guest_id) => Some(guest_id),
        Err(e) => {
            tracing::debug!(%conn_id, error = %e, "dropping event");
            None
        }
    }
}
