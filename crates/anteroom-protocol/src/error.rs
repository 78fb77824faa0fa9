//! Error types for the protocol layer.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning an event into a JSON frame).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning a JSON frame into an event).
    ///
    /// Common causes: malformed JSON, missing required fields (e.g. a
    /// `join-request` without a `guestId`), or an unknown event tag.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// A room id that is empty after trimming.
    ///
    /// Room ids are normalized (trim + lowercase) before any lookup;
    /// an id that normalizes to nothing can never name a room.
    #[error("empty room id")]
    EmptyRoomId,

    /// A guest id that is empty.
    ///
    /// The guest id is the durable identity an admission request is
    /// keyed on; an empty one cannot be matched by any decision.
    #[error("empty guest id")]
    EmptyGuestId,
}
