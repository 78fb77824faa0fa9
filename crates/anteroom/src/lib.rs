//! # anteroom
//!
//! Meeting-room admission and signaling server.
//!
//! Participants join a named room over WebSocket; guests queue an
//! admission request that a host approves or denies. The coordinator
//! survives the ugly parts of real transports: connection ids that
//! change across reconnects (identity rides on a durable client-chosen
//! guest id), client retry loops (resubmissions coalesce into one
//! pending entry), and late joiners (every (re)join replays the full
//! pending list to exactly that connection).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use anteroom::prelude::*;
//!
//! # async fn run() -> Result<(), AnteroomError> {
//! let server = AnteroomServer::builder()
//!     .bind("0.0.0.0:3000")
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod error;
mod gateway;
mod server;

pub use error::AnteroomError;
pub use server::{AnteroomServer, AnteroomServerBuilder};

/// Commonly used types, importable in one line.
pub mod prelude {
    pub use anteroom_guest::{
        AdmissionRequest, AdmissionWait, RetrySchedule, WaitOutcome,
        generate_guest_id,
    };
    pub use anteroom_protocol::{
        ClientEvent, Codec, GuestId, JsonCodec, Role, RoomId,
        ServerEvent,
    };
    pub use anteroom_room::{RoomConfig, RoomRegistry};
    pub use anteroom_transport::ConnectionId;

    pub use crate::{AnteroomError, AnteroomServer, AnteroomServerBuilder};
}
