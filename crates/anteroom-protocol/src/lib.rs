//! Wire protocol for anteroom.
//!
//! This crate defines the "language" that clients and the signaling
//! server speak:
//!
//! - **Types** ([`ClientEvent`], [`ServerEvent`], [`RoomId`],
//!   [`GuestId`], [`Role`]) — the event structures that travel on the
//!   wire, plus the identity newtypes the rest of the system keys on.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — how events are
//!   converted to/from JSON text frames.
//! - **Errors** ([`ProtocolError`]) — what can go wrong during
//!   encoding/decoding/validation.
//!
//! # Identity
//!
//! Two identities coexist and must never be conflated:
//!
//! - `ConnectionId` (from `anteroom-transport`) — assigned per accepted
//!   socket, changes on every reconnect.
//! - [`GuestId`] — chosen by the client once, stable across reconnects.
//!
//! Every admission event carries the `GuestId` explicitly so that a
//! decision reaches its guest no matter how many times the transport
//! identity has churned in between.

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    ClientEvent, EventBody, GuestId, Role, RoomId, ServerEvent,
};
