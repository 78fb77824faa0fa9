//! Unified error type for the anteroom server.

use anteroom_protocol::ProtocolError;
use anteroom_room::RoomError;
use anteroom_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `anteroom` meta-crate, you deal with this single
/// error type instead of importing errors from each sub-crate. The
/// `#[from]` attribute on each variant auto-generates `From` impls,
/// so the `?` operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum AnteroomError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, invalid id).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A room-level error (room gone, actor unavailable).
    #[error(transparent)]
    Room(#[from] RoomError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::ConnectionClosed("gone".into());
        let wrapped: AnteroomError = err.into();
        assert!(matches!(wrapped, AnteroomError::Transport(_)));
        assert!(wrapped.to_string().contains("gone"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::EmptyRoomId;
        let wrapped: AnteroomError = err.into();
        assert!(matches!(wrapped, AnteroomError::Protocol(_)));
    }

    #[test]
    fn test_from_room_error() {
        let room_id = anteroom_protocol::RoomId::new("abc").unwrap();
        let err = RoomError::NotFound(room_id);
        let wrapped: AnteroomError = err.into();
        assert!(matches!(wrapped, AnteroomError::Room(_)));
    }
}
