//! Room registry and admission coordination for anteroom.
//!
//! Each room runs as an isolated Tokio task (actor model) owning its
//! membership set, its ordered pending-admission list, and its lock
//! flag. Mutations of a single room are serialized by the actor's
//! command channel; different rooms are fully independent.
//!
//! # Key types
//!
//! - [`RoomRegistry`] — lazily creates rooms, routes joins/leaves and
//!   admission operations, reaps idle rooms
//! - [`RoomHandle`] — send commands to a running room actor
//! - [`RoomInfo`] — metadata snapshot (counts, lock, idleness)
//! - [`RoomConfig`] — per-room settings (debounce, pending cap)

mod config;
mod error;
mod registry;
mod room;

pub use config::RoomConfig;
pub use error::RoomError;
pub use registry::RoomRegistry;
pub use room::{MemberSender, RoomHandle, RoomInfo};
