//! Room registry: lazily creates rooms and routes operations to them.
//!
//! The registry is an explicitly constructed, owned object with a
//! defined lifecycle — instantiated at process start, injected into the
//! gateway — never ambient global state. It is NOT thread-safe by
//! itself (plain `HashMap`s); the server wraps it in a mutex at a
//! higher level and each room's own mutations are serialized by that
//! room's actor task.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use anteroom_protocol::{GuestId, Role, RoomId, ServerEvent};
use anteroom_transport::ConnectionId;

use crate::room::spawn_room;
use crate::{MemberSender, RoomConfig, RoomError, RoomHandle, RoomInfo};

/// Process-wide mapping from room id to room actor, plus the two
/// connection indexes the admission protocol needs:
///
/// - which room a connection is currently joined to (at most one)
/// - which rooms a connection has submitted admission requests to,
///   so disconnect cleanup can be routed without scanning every room.
pub struct RoomRegistry {
    /// Active rooms, keyed by normalized id.
    rooms: HashMap<RoomId, RoomHandle>,

    /// Maps each connection to the room it has joined.
    /// A connection is in at most ONE room at a time (key invariant).
    conn_rooms: HashMap<ConnectionId, RoomId>,

    /// Rooms each connection has ever submitted a request to. A guest
    /// may submit to a room it never joins, so this is tracked
    /// separately from membership. Conservative: entries persist until
    /// disconnect; a stale room in the set just means a no-op cleanup.
    origin_index: HashMap<ConnectionId, HashSet<RoomId>>,

    config: RoomConfig,
}

impl RoomRegistry {
    /// Creates a new, empty registry.
    pub fn new(config: RoomConfig) -> Self {
        Self {
            rooms: HashMap::new(),
            conn_rooms: HashMap::new(),
            origin_index: HashMap::new(),
            config,
        }
    }

    /// Returns the room's handle, spawning its actor on first
    /// reference. Idempotent: ids are normalized at construction, so
    /// `" Abc "` and `"abc"` resolve to the same room.
    pub fn get_or_create(&mut self, room_id: &RoomId) -> RoomHandle {
        if let Some(handle) = self.rooms.get(room_id) {
            return handle.clone();
        }
        let handle = spawn_room(room_id.clone(), self.config.clone());
        self.rooms.insert(room_id.clone(), handle.clone());
        tracing::info!(%room_id, "room created");
        handle
    }

    /// Joins a connection to a room and returns the new member count.
    ///
    /// Creates the room if needed. The room actor resyncs every pending
    /// admission request to this connection as part of the join. If the
    /// connection was in a different room, it leaves that room first —
    /// the one-room-per-connection invariant holds by construction.
    pub async fn join(
        &mut self,
        room_id: RoomId,
        conn_id: ConnectionId,
        role: Role,
        sender: MemberSender,
    ) -> Result<usize, RoomError> {
        if let Some(current) = self.conn_rooms.get(&conn_id) {
            if *current != room_id {
                let previous = current.clone();
                tracing::debug!(
                    %conn_id,
                    from = %previous,
                    to = %room_id,
                    "connection switching rooms"
                );
                if let Some(handle) = self.rooms.get(&previous) {
                    let _ = handle.leave(conn_id).await;
                }
                self.conn_rooms.remove(&conn_id);
            }
        }

        let handle = self.get_or_create(&room_id);
        let count = handle.join(conn_id, role, sender).await?;
        self.conn_rooms.insert(conn_id, room_id);
        Ok(count)
    }

    /// Removes a connection entirely: leaves its room (if any) and
    /// purges every pending admission request it originated, wherever
    /// it submitted them. Called on transport disconnect; safe to call
    /// for connections the registry has never seen.
    pub async fn leave(&mut self, conn_id: ConnectionId) {
        if let Some(room_id) = self.conn_rooms.remove(&conn_id) {
            if let Some(handle) = self.rooms.get(&room_id) {
                let _ = handle.leave(conn_id).await;
            }
        }

        if let Some(submitted_to) = self.origin_index.remove(&conn_id) {
            for room_id in submitted_to {
                if let Some(handle) = self.rooms.get(&room_id) {
                    let _ = handle.cleanup_disconnect(conn_id).await;
                }
            }
        }
    }

    /// Submits (or resubmits) an admission request. Creates the room on
    /// first reference and records the origin for disconnect cleanup.
    pub async fn submit_request(
        &mut self,
        room_id: RoomId,
        guest_id: GuestId,
        guest_name: String,
        origin: ConnectionId,
    ) -> Result<(), RoomError> {
        let handle = self.get_or_create(&room_id);
        handle.submit(guest_id, guest_name, origin).await?;
        self.origin_index
            .entry(origin)
            .or_default()
            .insert(room_id);
        Ok(())
    }

    /// Resolves a pending admission request. Deciding in a room nobody
    /// ever referenced is a no-op, not an error — the decision may be a
    /// client retransmit that outlived the room.
    pub async fn decide(
        &self,
        room_id: &RoomId,
        guest_id: GuestId,
        admitted: bool,
    ) -> Result<(), RoomError> {
        match self.rooms.get(room_id) {
            Some(handle) => handle.decide(guest_id, admitted).await,
            None => {
                tracing::debug!(
                    %room_id, %guest_id, "decision for unknown room, ignoring"
                );
                Ok(())
            }
        }
    }

    /// Toggles a room's lock, creating the room if needed (locking a
    /// room before anyone arrives is legitimate).
    pub async fn set_locked(
        &mut self,
        room_id: RoomId,
        locked: bool,
    ) -> Result<(), RoomError> {
        let handle = self.get_or_create(&room_id);
        handle.set_locked(locked).await
    }

    /// Broadcasts a pass-through event (chat, reaction) to a room's
    /// members. Events for rooms nobody ever referenced are dropped —
    /// pass-throughs never create rooms.
    pub async fn broadcast(
        &self,
        room_id: &RoomId,
        event: ServerEvent,
    ) -> Result<(), RoomError> {
        match self.rooms.get(room_id) {
            Some(handle) => handle.broadcast(event).await,
            None => {
                tracing::debug!(
                    %room_id, "broadcast to unknown room, dropping"
                );
                Ok(())
            }
        }
    }

    /// Returns info for one room.
    pub async fn room_info(
        &self,
        room_id: &RoomId,
    ) -> Result<RoomInfo, RoomError> {
        let handle = self
            .rooms
            .get(room_id)
            .ok_or_else(|| RoomError::NotFound(room_id.clone()))?;
        handle.get_info().await
    }

    /// Destroys rooms that have had no members and no pending requests
    /// for at least `grace`. Returns the reaped room ids.
    ///
    /// Call periodically; rooms are otherwise never reclaimed and a
    /// long-running process would leak every id ever referenced.
    pub async fn reap_idle(&mut self, grace: Duration) -> Vec<RoomId> {
        let mut reaped = Vec::new();

        for (room_id, handle) in &self.rooms {
            // Rooms that fail to respond are already dead; reap them.
            match handle.get_info().await {
                Ok(info) => {
                    if info.member_count == 0
                        && info.pending_count == 0
                        && info.idle_for.is_some_and(|d| d >= grace)
                    {
                        let _ = handle.shutdown().await;
                        reaped.push(room_id.clone());
                    }
                }
                Err(_) => reaped.push(room_id.clone()),
            }
        }

        for room_id in &reaped {
            self.rooms.remove(room_id);
            for submitted_to in self.origin_index.values_mut() {
                submitted_to.remove(room_id);
            }
            tracing::info!(%room_id, "idle room reaped");
        }
        reaped
    }

    /// Returns the number of active rooms.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Returns the room a connection is currently joined to, if any.
    pub fn connection_room(
        &self,
        conn_id: &ConnectionId,
    ) -> Option<&RoomId> {
        self.conn_rooms.get(conn_id)
    }
}
