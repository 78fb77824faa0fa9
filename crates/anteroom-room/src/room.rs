//! Room actor: an isolated Tokio task that owns one room's state.
//!
//! Each room runs in its own task, communicating with the outside world
//! through an mpsc channel. All mutations of a single room's state —
//! membership, the pending admission list, the lock flag — are
//! serialized by that channel; rooms never share state, so operations
//! on different rooms proceed fully in parallel.
//!
//! The actor is also where admission correctness lives:
//!
//! - at most one pending entry per guest id (resubmission supersedes)
//! - decisions broadcast room-wide, keyed on the durable guest id
//! - every (re)joining connection is resynced with the pending list
//! - disconnect cleanup keys strictly on the submitting connection id

use std::collections::HashMap;
use std::time::{Duration, Instant};

use anteroom_protocol::{GuestId, Role, RoomId, ServerEvent};
use anteroom_transport::ConnectionId;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{self, Instant as TokioInstant};

use crate::{RoomConfig, RoomError};

/// Channel sender for delivering outbound events to a room member.
pub type MemberSender = mpsc::UnboundedSender<ServerEvent>;

/// A connection currently joined to the room.
struct Member {
    role: Role,
    sender: MemberSender,
}

/// A queued, not-yet-resolved admission request.
///
/// `origin` is the connection that most recently submitted it — the
/// only thing disconnect cleanup may key on. The guest itself is
/// identified by `guest_id`, which outlives any particular connection.
struct PendingGuest {
    guest_id: GuestId,
    guest_name: String,
    origin: ConnectionId,
    submitted_at: Instant,
}

/// Commands sent to a room actor through its channel.
pub(crate) enum RoomCommand {
    /// Add (or refresh) a member and resync pending requests to it.
    Join {
        conn_id: ConnectionId,
        role: Role,
        sender: MemberSender,
        reply: oneshot::Sender<usize>,
    },

    /// Remove a member. Replies whether it was actually a member.
    Leave {
        conn_id: ConnectionId,
        reply: oneshot::Sender<bool>,
    },

    /// Submit or resubmit an admission request.
    Submit {
        guest_id: GuestId,
        guest_name: String,
        origin: ConnectionId,
    },

    /// Resolve a pending admission request.
    Decide { guest_id: GuestId, admitted: bool },

    /// Toggle the room lock.
    SetLocked { locked: bool },

    /// Remove pending requests submitted by a disconnected connection.
    CleanupDisconnect { origin: ConnectionId },

    /// Broadcast a pass-through event to all members.
    Broadcast { event: ServerEvent },

    /// Request a snapshot of room metadata.
    GetInfo { reply: oneshot::Sender<RoomInfo> },

    /// Shut down the room.
    Shutdown,
}

/// A snapshot of room metadata.
#[derive(Debug, Clone)]
pub struct RoomInfo {
    /// The room's normalized id.
    pub room_id: RoomId,
    /// Number of connections currently joined.
    pub member_count: usize,
    /// Number of pending admission requests.
    pub pending_count: usize,
    /// Whether the room is locked.
    pub locked: bool,
    /// How long the room has had no members and no pending requests,
    /// if it is currently in that state.
    pub idle_for: Option<Duration>,
}

/// Handle to a running room actor. Used to send commands to it.
///
/// Cheap to clone — just an `mpsc::Sender` wrapper. The `RoomRegistry`
/// holds one of these per room.
#[derive(Clone)]
pub struct RoomHandle {
    room_id: RoomId,
    sender: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    /// Returns the room's normalized id.
    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    /// Joins a connection to the room. Returns the new member count.
    ///
    /// Idempotent for a connection already in the room: the outbound
    /// sender is refreshed and the pending list is replayed again.
    pub async fn join(
        &self,
        conn_id: ConnectionId,
        role: Role,
        sender: MemberSender,
    ) -> Result<usize, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(RoomCommand::Join {
            conn_id,
            role,
            sender,
            reply: reply_tx,
        })
        .await?;
        reply_rx
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id.clone()))
    }

    /// Removes a connection from the room. Returns whether it was a
    /// member.
    pub async fn leave(
        &self,
        conn_id: ConnectionId,
    ) -> Result<bool, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(RoomCommand::Leave {
            conn_id,
            reply: reply_tx,
        })
        .await?;
        reply_rx
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id.clone()))
    }

    /// Submits (or resubmits) an admission request.
    pub async fn submit(
        &self,
        guest_id: GuestId,
        guest_name: String,
        origin: ConnectionId,
    ) -> Result<(), RoomError> {
        self.send(RoomCommand::Submit {
            guest_id,
            guest_name,
            origin,
        })
        .await
    }

    /// Resolves a pending admission request.
    pub async fn decide(
        &self,
        guest_id: GuestId,
        admitted: bool,
    ) -> Result<(), RoomError> {
        self.send(RoomCommand::Decide { guest_id, admitted }).await
    }

    /// Toggles the room lock.
    pub async fn set_locked(&self, locked: bool) -> Result<(), RoomError> {
        self.send(RoomCommand::SetLocked { locked }).await
    }

    /// Removes pending requests whose origin is the given connection.
    pub async fn cleanup_disconnect(
        &self,
        origin: ConnectionId,
    ) -> Result<(), RoomError> {
        self.send(RoomCommand::CleanupDisconnect { origin }).await
    }

    /// Broadcasts a pass-through event to all members.
    pub async fn broadcast(
        &self,
        event: ServerEvent,
    ) -> Result<(), RoomError> {
        self.send(RoomCommand::Broadcast { event }).await
    }

    /// Requests the current room info.
    pub async fn get_info(&self) -> Result<RoomInfo, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(RoomCommand::GetInfo { reply: reply_tx }).await?;
        reply_rx
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id.clone()))
    }

    /// Tells the room to shut down.
    pub async fn shutdown(&self) -> Result<(), RoomError> {
        self.send(RoomCommand::Shutdown).await
    }

    async fn send(&self, cmd: RoomCommand) -> Result<(), RoomError> {
        self.sender
            .send(cmd)
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id.clone()))
    }
}

/// The internal room actor state. Runs inside a Tokio task.
struct RoomActor {
    room_id: RoomId,
    config: RoomConfig,
    members: HashMap<ConnectionId, Member>,
    /// Pending admission requests in submission order. Invariant: at
    /// most one entry per guest id.
    pending: Vec<PendingGuest>,
    locked: bool,
    /// Deadline of a scheduled occupancy broadcast, if one is due.
    occupancy_due: Option<TokioInstant>,
    /// When the room became empty of members and pending requests.
    empty_since: Option<Instant>,
    receiver: mpsc::Receiver<RoomCommand>,
}

impl RoomActor {
    /// Runs the actor loop, processing commands until shutdown.
    ///
    /// The extra `select!` branch drives the occupancy debounce: the
    /// timer only participates while a broadcast is due.
    async fn run(mut self) {
        tracing::info!(room_id = %self.room_id, "room actor started");

        loop {
            let due = self.occupancy_due;
            tokio::select! {
                cmd = self.receiver.recv() => {
                    match cmd {
                        Some(RoomCommand::Shutdown) | None => break,
                        Some(cmd) => self.handle(cmd),
                    }
                }
                _ = time::sleep_until(
                    due.unwrap_or_else(TokioInstant::now)
                ), if due.is_some() => {
                    self.occupancy_due = None;
                    self.broadcast(ServerEvent::RoomOccupancy {
                        count: self.members.len(),
                    });
                    tracing::debug!(
                        room_id = %self.room_id,
                        count = self.members.len(),
                        "occupancy broadcast"
                    );
                }
            }
        }

        tracing::info!(room_id = %self.room_id, "room actor stopped");
    }

    fn handle(&mut self, cmd: RoomCommand) {
        match cmd {
            RoomCommand::Join {
                conn_id,
                role,
                sender,
                reply,
            } => {
                let count = self.handle_join(conn_id, role, sender);
                let _ = reply.send(count);
            }
            RoomCommand::Leave { conn_id, reply } => {
                let was_member = self.handle_leave(conn_id);
                let _ = reply.send(was_member);
            }
            RoomCommand::Submit {
                guest_id,
                guest_name,
                origin,
            } => self.handle_submit(guest_id, guest_name, origin),
            RoomCommand::Decide { guest_id, admitted } => {
                self.handle_decide(guest_id, admitted);
            }
            RoomCommand::SetLocked { locked } => {
                self.locked = locked;
                tracing::info!(
                    room_id = %self.room_id, locked, "room lock changed"
                );
            }
            RoomCommand::CleanupDisconnect { origin } => {
                self.handle_cleanup(origin);
            }
            RoomCommand::Broadcast { event } => self.broadcast(event),
            RoomCommand::GetInfo { reply } => {
                let _ = reply.send(self.info());
            }
            RoomCommand::Shutdown => unreachable!("handled in run loop"),
        }
    }

    /// Adds or refreshes a member, then replays every pending request
    /// to it in original submission order. Replaying on *every* join
    /// is what lets a reconnected host — under a brand-new connection
    /// id — observe exactly the outstanding requests it missed.
    fn handle_join(
        &mut self,
        conn_id: ConnectionId,
        role: Role,
        sender: MemberSender,
    ) -> usize {
        for entry in &self.pending {
            let _ = sender.send(Self::join_request_event(
                &self.room_id,
                entry,
            ));
        }

        let rejoin = self
            .members
            .insert(conn_id, Member { role, sender })
            .is_some();
        tracing::info!(
            room_id = %self.room_id,
            %conn_id,
            %role,
            members = self.members.len(),
            rejoin,
            "connection joined"
        );

        self.schedule_occupancy();
        self.touch_idle();
        self.members.len()
    }

    fn handle_leave(&mut self, conn_id: ConnectionId) -> bool {
        if self.members.remove(&conn_id).is_none() {
            return false;
        }
        tracing::info!(
            room_id = %self.room_id,
            %conn_id,
            members = self.members.len(),
            "connection left"
        );
        self.schedule_occupancy();
        self.touch_idle();
        true
    }

    /// Queues an admission request, superseding any pending entry for
    /// the same guest id, and announces it to every current member.
    ///
    /// The actor deliberately does not know which member is the host:
    /// role is self-asserted client state and a host's connection id
    /// may itself be stale after reconnection. Each recipient filters
    /// by its own role.
    fn handle_submit(
        &mut self,
        guest_id: GuestId,
        guest_name: String,
        origin: ConnectionId,
    ) {
        if self.locked {
            // Locked rooms don't queue: drop any pending entry for
            // this guest and deny on the spot.
            self.pending.retain(|p| p.guest_id != guest_id);
            tracing::info!(
                room_id = %self.room_id,
                %guest_id,
                "room locked, denying admission request"
            );
            self.broadcast(ServerEvent::AdmissionDecision {
                room_id: self.room_id.clone(),
                guest_id,
                admitted: false,
            });
            self.touch_idle();
            return;
        }

        let existing = self
            .pending
            .iter()
            .position(|p| p.guest_id == guest_id);
        match existing {
            Some(i) => {
                // Supersede: the retry loop resubmits the same guest
                // id; exactly one entry survives, bearing the latest
                // name and origin connection.
                self.pending.remove(i);
            }
            None => {
                if self.pending.len() >= self.config.max_pending {
                    tracing::warn!(
                        room_id = %self.room_id,
                        %guest_id,
                        cap = self.config.max_pending,
                        "pending list full, dropping admission request"
                    );
                    return;
                }
            }
        }

        let entry = PendingGuest {
            guest_id,
            guest_name,
            origin,
            submitted_at: Instant::now(),
        };
        tracing::info!(
            room_id = %self.room_id,
            guest_id = %entry.guest_id,
            guest_name = %entry.guest_name,
            origin = %entry.origin,
            pending = self.pending.len() + 1,
            "admission request queued"
        );
        self.broadcast(Self::join_request_event(&self.room_id, &entry));
        self.pending.push(entry);
        self.touch_idle();
    }

    /// Resolves a request. The decision is broadcast to the whole room
    /// — never unicast to a recorded connection id, because the guest
    /// may have reconnected under a new one since submitting. The
    /// guest recognizes it by matching `guest_id` against its own.
    fn handle_decide(&mut self, guest_id: GuestId, admitted: bool) {
        let removed = self
            .pending
            .iter()
            .position(|p| p.guest_id == guest_id)
            .map(|i| self.pending.remove(i));

        tracing::info!(
            room_id = %self.room_id,
            %guest_id,
            admitted,
            was_pending = removed.is_some(),
            waited_ms = removed
                .as_ref()
                .map(|e| e.submitted_at.elapsed().as_millis() as u64),
            "admission decision"
        );

        // Unconditional: a decision for an unknown or already-resolved
        // guest is a no-op on state, but re-broadcasting it is harmless
        // and lets a retransmitted decision still reach its guest.
        self.broadcast(ServerEvent::AdmissionDecision {
            room_id: self.room_id.clone(),
            guest_id: guest_id.clone(),
            admitted,
        });

        // At most one announcement per resolved entry, with the name
        // from the entry itself.
        if admitted {
            if let Some(entry) = removed {
                self.broadcast(ServerEvent::ParticipantJoined {
                    guest_id: entry.guest_id,
                    guest_name: entry.guest_name,
                });
            }
        }
        self.touch_idle();
    }

    /// Purges requests submitted by a connection that is now gone.
    ///
    /// Keys strictly on the origin connection id, never the guest id:
    /// a guest that reconnected keeps its request pending under the old
    /// submission until it resubmits or a decision lands.
    fn handle_cleanup(&mut self, origin: ConnectionId) {
        let before = self.pending.len();
        self.pending.retain(|p| p.origin != origin);
        let dropped = before - self.pending.len();
        if dropped > 0 {
            tracing::info!(
                room_id = %self.room_id,
                %origin,
                dropped,
                "purged pending requests from disconnected origin"
            );
            self.touch_idle();
        }
    }

    fn join_request_event(
        room_id: &RoomId,
        entry: &PendingGuest,
    ) -> ServerEvent {
        ServerEvent::JoinRequest {
            guest_id: entry.guest_id.clone(),
            guest_name: entry.guest_name.clone(),
            origin_connection_id: entry.origin,
            room_id: room_id.clone(),
        }
    }

    /// Sends an event to every member. Silently drops members whose
    /// receiver is gone (their connection handler already exited).
    fn broadcast(&self, event: ServerEvent) {
        for member in self.members.values() {
            let _ = member.sender.send(event.clone());
        }
    }

    /// Schedules an occupancy broadcast if none is already due. Keeping
    /// the earlier deadline coalesces a leave-then-join reconnect into
    /// one event.
    fn schedule_occupancy(&mut self) {
        if self.occupancy_due.is_none() {
            self.occupancy_due = Some(
                TokioInstant::now() + self.config.occupancy_debounce,
            );
        }
    }

    /// Tracks when the room last became completely idle, for reaping.
    fn touch_idle(&mut self) {
        if self.members.is_empty() && self.pending.is_empty() {
            if self.empty_since.is_none() {
                self.empty_since = Some(Instant::now());
            }
        } else {
            self.empty_since = None;
        }
    }

    fn info(&self) -> RoomInfo {
        RoomInfo {
            room_id: self.room_id.clone(),
            member_count: self.members.len(),
            pending_count: self.pending.len(),
            locked: self.locked,
            idle_for: self.empty_since.map(|t| t.elapsed()),
        }
    }
}

/// Spawns a new room actor task and returns a handle to communicate
/// with it.
pub(crate) fn spawn_room(
    room_id: RoomId,
    config: RoomConfig,
) -> RoomHandle {
    let (tx, rx) = mpsc::channel(config.channel_size);

    let actor = RoomActor {
        room_id: room_id.clone(),
        config,
        members: HashMap::new(),
        pending: Vec::new(),
        locked: false,
        occupancy_due: None,
        empty_since: Some(Instant::now()),
        receiver: rx,
    };

    tokio::spawn(actor.run());

    RoomHandle {
        room_id,
        sender: tx,
    }
}
