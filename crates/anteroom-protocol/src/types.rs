//! Core protocol types for anteroom's wire format.
//!
//! Every event is a single JSON object with an `"event"` tag naming the
//! event (kebab-case) and camelCase payload keys, e.g.:
//!
//! ```json
//! { "event": "join-request", "roomId": "abc-defg-hij",
//!   "guestId": "g_17_x4k2p", "guestName": "Alice" }
//! ```
//!
//! Inbound ([`ClientEvent`]) and outbound ([`ServerEvent`]) events are
//! separate enums because they are trusted differently: client payloads
//! carry raw `String` ids that the server must validate and normalize
//! ([`RoomId::new`], [`GuestId::new`]) before touching any room state,
//! while server payloads carry the already-validated newtypes.

use std::fmt;

use anteroom_transport::ConnectionId;
use serde::{Deserialize, Serialize};

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A normalized room identifier.
///
/// Construction is the single normalization point: the raw id is
/// trimmed and ASCII-lowercased, so `" Abc-DEFG "` and `"abc-defg"`
/// name the same room. An id that normalizes to the empty string is
/// rejected — it could never be matched again.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    /// Normalizes and validates a raw room id from the wire.
    pub fn new(raw: &str) -> Result<Self, ProtocolError> {
        let normalized = raw.trim().to_ascii_lowercase();
        if normalized.is_empty() {
            return Err(ProtocolError::EmptyRoomId);
        }
        Ok(Self(normalized))
    }

    /// Returns the normalized id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A durable, client-generated guest identity.
///
/// Unlike `ConnectionId`, this survives reconnection: the client picks
/// it once and repeats it on every submission, and every admission
/// event carries it so the guest can recognize decisions meant for it
/// no matter which connection it currently holds.
///
/// The value is opaque to the server — never verified, never parsed.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct GuestId(String);

impl GuestId {
    /// Validates a raw guest id from the wire. Only emptiness is
    /// checked; the content is the client's business.
    pub fn new(raw: &str) -> Result<Self, ProtocolError> {
        if raw.trim().is_empty() {
            return Err(ProtocolError::EmptyGuestId);
        }
        Ok(Self(raw.to_string()))
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GuestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The role a participant asserts when joining a room.
///
/// Self-asserted and never verified — the server records it as a
/// capability flag and otherwise treats all members identically
/// (admission events are broadcast to everyone; each client filters by
/// its own role). That is a known security gap of the protocol, not an
/// oversight of this implementation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Can approve or deny guest admission.
    Host,
    /// Must wait for host approval before full entry.
    #[default]
    Guest,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Host => f.write_str("host"),
            Self::Guest => f.write_str("guest"),
        }
    }
}

/// Opaque pass-through payload for chat and reaction events.
///
/// The server never inspects these beyond the routing `roomId`; the
/// remaining keys are sender-defined and broadcast verbatim.
pub type EventBody = serde_json::Map<String, serde_json::Value>;

// ---------------------------------------------------------------------------
// Client → server events
// ---------------------------------------------------------------------------

/// Events a client sends to the server.
///
/// Ids arrive as raw strings; the gateway validates them before any
/// room state is touched, and drops the event (logged, no mutation) if
/// validation fails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum ClientEvent {
    /// Join a room channel. Sent on first entry and re-sent by the
    /// client on every reconnection; the server treats it idempotently
    /// and replays pending admission requests each time.
    #[serde(rename_all = "camelCase")]
    JoinRoom {
        room_id: String,
        /// Defaults to `guest` when absent.
        #[serde(default)]
        role: Role,
    },

    /// Submit (or re-submit) an admission request. Retried by waiting
    /// guests on a fixed period; the server coalesces by `guestId`.
    #[serde(rename_all = "camelCase")]
    JoinRequest {
        room_id: String,
        guest_id: String,
        guest_name: String,
    },

    /// Resolve a pending admission request. Sent by a host.
    #[serde(rename_all = "camelCase")]
    AdmissionDecision {
        room_id: String,
        guest_id: String,
        admitted: bool,
    },

    /// Toggle the room lock. While locked, new admission requests are
    /// denied immediately instead of queued.
    #[serde(rename_all = "camelCase")]
    LockRoom { room_id: String, locked: bool },

    /// Chat text, broadcast verbatim to the room.
    #[serde(rename_all = "camelCase")]
    ChatMessage {
        room_id: String,
        #[serde(flatten)]
        body: EventBody,
    },

    /// Emoji reaction, broadcast verbatim to the room.
    #[serde(rename_all = "camelCase")]
    EmojiReaction {
        room_id: String,
        #[serde(flatten)]
        body: EventBody,
    },
}

// ---------------------------------------------------------------------------
// Server → client events
// ---------------------------------------------------------------------------

/// Events the server broadcasts or unicasts to room members.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum ServerEvent {
    /// A pending admission request — either freshly submitted
    /// (broadcast to the whole room) or replayed to one (re)joining
    /// connection during resync. Recipients filter by their own role.
    #[serde(rename_all = "camelCase")]
    JoinRequest {
        guest_id: GuestId,
        guest_name: String,
        origin_connection_id: ConnectionId,
        room_id: RoomId,
    },

    /// A resolved admission request, broadcast to the whole room. The
    /// intended guest matches `guestId` against its own durable id —
    /// never against a connection id, which may have changed since the
    /// request was submitted.
    #[serde(rename_all = "camelCase")]
    AdmissionDecision {
        room_id: RoomId,
        guest_id: GuestId,
        admitted: bool,
    },

    /// Announces a newly admitted participant to the room.
    #[serde(rename_all = "camelCase")]
    ParticipantJoined {
        guest_id: GuestId,
        guest_name: String,
    },

    /// Current member count of the room.
    #[serde(rename_all = "camelCase")]
    RoomOccupancy { count: usize },

    /// Chat pass-through, echoed to the room.
    #[serde(rename_all = "camelCase")]
    ChatMessage {
        room_id: RoomId,
        #[serde(flatten)]
        body: EventBody,
    },

    /// Reaction pass-through, echoed to the room.
    #[serde(rename_all = "camelCase")]
    EmojiReaction {
        room_id: RoomId,
        #[serde(flatten)]
        body: EventBody,
    },
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! Wire-shape tests. The event vocabulary is shared with a web
    //! client, so the exact JSON spelling (kebab-case tags, camelCase
    //! keys) is load-bearing: a mismatch means the client silently
    //! ignores the event.

    use super::*;

    fn rid(s: &str) -> RoomId {
        RoomId::new(s).unwrap()
    }

    fn gid(s: &str) -> GuestId {
        GuestId::new(s).unwrap()
    }

    // =====================================================================
    // RoomId normalization
    // =====================================================================

    #[test]
    fn test_room_id_new_trims_and_lowercases() {
        let id = rid("  Abc-DEFG-hij  ");
        assert_eq!(id.as_str(), "abc-defg-hij");
    }

    #[test]
    fn test_room_id_new_idempotent_for_normalized_input() {
        assert_eq!(rid("abc-defg-hij"), rid("ABC-defg-HIJ "));
    }

    #[test]
    fn test_room_id_new_rejects_empty() {
        assert!(matches!(
            RoomId::new("   "),
            Err(ProtocolError::EmptyRoomId)
        ));
        assert!(matches!(RoomId::new(""), Err(ProtocolError::EmptyRoomId)));
    }

    #[test]
    fn test_room_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&rid("abc")).unwrap();
        assert_eq!(json, "\"abc\"");
    }

    #[test]
    fn test_room_id_display() {
        assert_eq!(rid("Meet-1").to_string(), "meet-1");
    }

    // =====================================================================
    // GuestId
    // =====================================================================

    #[test]
    fn test_guest_id_preserves_raw_value() {
        // Guest ids are opaque — no case folding, no trimming.
        let id = gid("g_17_X4k2P");
        assert_eq!(id.as_str(), "g_17_X4k2P");
    }

    #[test]
    fn test_guest_id_rejects_empty() {
        assert!(matches!(
            GuestId::new("  "),
            Err(ProtocolError::EmptyGuestId)
        ));
    }

    #[test]
    fn test_guest_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&gid("g1")).unwrap();
        assert_eq!(json, "\"g1\"");
    }

    // =====================================================================
    // Role
    // =====================================================================

    #[test]
    fn test_role_default_is_guest() {
        assert_eq!(Role::default(), Role::Guest);
    }

    #[test]
    fn test_role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Host).unwrap(), "\"host\"");
        assert_eq!(
            serde_json::to_string(&Role::Guest).unwrap(),
            "\"guest\""
        );
    }

    // =====================================================================
    // ClientEvent — one shape test per variant
    // =====================================================================

    #[test]
    fn test_client_join_room_json_format() {
        let json = r#"{"event":"join-room","roomId":"Abc","role":"host"}"#;
        let ev: ClientEvent = serde_json::from_str(json).unwrap();
        assert_eq!(
            ev,
            ClientEvent::JoinRoom {
                room_id: "Abc".into(),
                role: Role::Host,
            }
        );
    }

    #[test]
    fn test_client_join_room_role_defaults_to_guest() {
        // Older clients don't send a role at all.
        let json = r#"{"event":"join-room","roomId":"abc"}"#;
        let ev: ClientEvent = serde_json::from_str(json).unwrap();
        assert_eq!(
            ev,
            ClientEvent::JoinRoom {
                room_id: "abc".into(),
                role: Role::Guest,
            }
        );
    }

    #[test]
    fn test_client_join_request_json_format() {
        let json = r#"{
            "event": "join-request",
            "roomId": "abc-defg-hij",
            "guestId": "g1",
            "guestName": "Alice"
        }"#;
        let ev: ClientEvent = serde_json::from_str(json).unwrap();
        assert_eq!(
            ev,
            ClientEvent::JoinRequest {
                room_id: "abc-defg-hij".into(),
                guest_id: "g1".into(),
                guest_name: "Alice".into(),
            }
        );
    }

    #[test]
    fn test_client_join_request_missing_guest_id_is_rejected() {
        let json = r#"{"event":"join-request","roomId":"abc","guestName":"Alice"}"#;
        let result: Result<ClientEvent, _> = serde_json::from_str(json);
        assert!(result.is_err(), "missing guestId must fail to decode");
    }

    #[test]
    fn test_client_admission_decision_json_format() {
        let json = r#"{
            "event": "admission-decision",
            "roomId": "abc",
            "guestId": "g1",
            "admitted": true
        }"#;
        let ev: ClientEvent = serde_json::from_str(json).unwrap();
        assert_eq!(
            ev,
            ClientEvent::AdmissionDecision {
                room_id: "abc".into(),
                guest_id: "g1".into(),
                admitted: true,
            }
        );
    }

    #[test]
    fn test_client_lock_room_round_trip() {
        let ev = ClientEvent::LockRoom {
            room_id: "abc".into(),
            locked: true,
        };
        let frame = serde_json::to_string(&ev).unwrap();
        let decoded: ClientEvent = serde_json::from_str(&frame).unwrap();
        assert_eq!(ev, decoded);
    }

    #[test]
    fn test_client_chat_message_preserves_extra_keys() {
        // Pass-through events carry sender-defined keys untouched.
        let json = r#"{
            "event": "chat-message",
            "roomId": "abc",
            "sender": "Alice",
            "text": "hi there"
        }"#;
        let ev: ClientEvent = serde_json::from_str(json).unwrap();
        match ev {
            ClientEvent::ChatMessage { room_id, body } => {
                assert_eq!(room_id, "abc");
                assert_eq!(body["sender"], "Alice");
                assert_eq!(body["text"], "hi there");
            }
            other => panic!("wrong variant: {other:?}"),
        }
    }

    #[test]
    fn test_client_emoji_reaction_round_trip() {
        let mut body = EventBody::new();
        body.insert("emoji".into(), serde_json::json!("🎉"));
        let ev = ClientEvent::EmojiReaction {
            room_id: "abc".into(),
            body,
        };
        let frame = serde_json::to_string(&ev).unwrap();
        let decoded: ClientEvent = serde_json::from_str(&frame).unwrap();
        assert_eq!(ev, decoded);
    }

    // =====================================================================
    // ServerEvent
    // =====================================================================

    #[test]
    fn test_server_join_request_json_format() {
        let ev = ServerEvent::JoinRequest {
            guest_id: gid("g1"),
            guest_name: "Alice".into(),
            origin_connection_id: ConnectionId::new(42),
            room_id: rid("abc"),
        };
        let json: serde_json::Value = serde_json::to_value(&ev).unwrap();

        assert_eq!(json["event"], "join-request");
        assert_eq!(json["guestId"], "g1");
        assert_eq!(json["guestName"], "Alice");
        assert_eq!(json["originConnectionId"], 42);
        assert_eq!(json["roomId"], "abc");
    }

    #[test]
    fn test_server_admission_decision_json_format() {
        let ev = ServerEvent::AdmissionDecision {
            room_id: rid("abc"),
            guest_id: gid("g1"),
            admitted: false,
        };
        let json: serde_json::Value = serde_json::to_value(&ev).unwrap();

        assert_eq!(json["event"], "admission-decision");
        assert_eq!(json["roomId"], "abc");
        assert_eq!(json["guestId"], "g1");
        assert_eq!(json["admitted"], false);
    }

    #[test]
    fn test_server_participant_joined_json_format() {
        let ev = ServerEvent::ParticipantJoined {
            guest_id: gid("g1"),
            guest_name: "Alice".into(),
        };
        let json: serde_json::Value = serde_json::to_value(&ev).unwrap();

        assert_eq!(json["event"], "participant-joined");
        assert_eq!(json["guestId"], "g1");
        assert_eq!(json["guestName"], "Alice");
    }

    #[test]
    fn test_server_room_occupancy_json_format() {
        let ev = ServerEvent::RoomOccupancy { count: 3 };
        let json: serde_json::Value = serde_json::to_value(&ev).unwrap();

        assert_eq!(json["event"], "room-occupancy");
        assert_eq!(json["count"], 3);
    }

    #[test]
    fn test_server_event_round_trip() {
        let ev = ServerEvent::AdmissionDecision {
            room_id: rid("abc"),
            guest_id: gid("g2"),
            admitted: true,
        };
        let frame = serde_json::to_string(&ev).unwrap();
        let decoded: ServerEvent = serde_json::from_str(&frame).unwrap();
        assert_eq!(ev, decoded);
    }

    // =====================================================================
    // Error cases — malformed input
    // =====================================================================

    #[test]
    fn test_decode_garbage_returns_error() {
        let result: Result<ClientEvent, _> =
            serde_json::from_str("not json at all");
        assert!(result.is_err());
    }

    #[test]
    fn test_decode_unknown_event_tag_returns_error() {
        let json = r#"{"event":"start-karaoke","roomId":"abc"}"#;
        let result: Result<ClientEvent, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }

    #[test]
    fn test_decode_missing_event_tag_returns_error() {
        let json = r#"{"roomId":"abc"}"#;
        let result: Result<ClientEvent, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }
}
