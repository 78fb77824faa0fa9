//! Error types for the room layer.

use anteroom_protocol::RoomId;

/// Errors that can occur during room operations.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// The room does not exist.
    #[error("room {0} not found")]
    NotFound(RoomId),

    /// The room's command channel is closed — its actor is gone.
    #[error("room {0} is unavailable")]
    Unavailable(RoomId),
}
