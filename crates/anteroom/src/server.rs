//! `AnteroomServer` builder and accept loop.
//!
//! This is the entry point for running an anteroom signaling server.
//! It ties together the layers: transport → protocol → rooms.

use std::sync::Arc;
use std::time::Duration;

use anteroom_protocol::JsonCodec;
use anteroom_room::{RoomConfig, RoomRegistry};
use anteroom_transport::{Transport, WebSocketTransport};
use tokio::sync::Mutex;

use crate::AnteroomError;
use crate::gateway::handle_connection;

/// Shared server state passed to each connection handler task.
///
/// Wrapped in `Arc` so it can be cheaply cloned across tasks. The
/// registry mutex only guards the room *maps*; each room's own state is
/// serialized by its actor task, so the lock is held briefly per event.
pub(crate) struct ServerState {
    pub(crate) registry: Mutex<RoomRegistry>,
    pub(crate) codec: JsonCodec,
}

/// Builder for configuring and starting an anteroom server.
///
/// # Example
///
/// ```rust,no_run
/// use anteroom::prelude::*;
///
/// # async fn run() -> Result<(), AnteroomError> {
/// let server = AnteroomServer::builder()
///     .bind("0.0.0.0:3000")
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct AnteroomServerBuilder {
    bind_addr: String,
    room_config: RoomConfig,
    reap_grace: Option<Duration>,
    reap_interval: Duration,
}

impl AnteroomServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:3000".to_string(),
            room_config: RoomConfig::default(),
            reap_grace: Some(Duration::from_secs(300)),
            reap_interval: Duration::from_secs(60),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets the per-room configuration.
    pub fn room_config(mut self, config: RoomConfig) -> Self {
        self.room_config = config;
        self
    }

    /// Sets how long a room must stay empty (no members, no pending
    /// requests) before it is destroyed.
    pub fn reap_grace(mut self, grace: Duration) -> Self {
        self.reap_grace = Some(grace);
        self
    }

    /// Disables idle-room reaping entirely. Rooms then live for the
    /// life of the process.
    pub fn no_reaping(mut self) -> Self {
        self.reap_grace = None;
        self
    }

    /// Builds the server, binding the WebSocket listener.
    pub async fn build(self) -> Result<AnteroomServer, AnteroomError> {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;

        let state = Arc::new(ServerState {
            registry: Mutex::new(RoomRegistry::new(self.room_config)),
            codec: JsonCodec,
        });

        Ok(AnteroomServer {
            transport,
            state,
            reap_grace: self.reap_grace,
            reap_interval: self.reap_interval,
        })
    }
}

impl Default for AnteroomServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A running anteroom signaling server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct AnteroomServer {
    transport: WebSocketTransport,
    state: Arc<ServerState>,
    reap_grace: Option<Duration>,
    reap_interval: Duration,
}

impl AnteroomServer {
    /// Creates a new builder.
    pub fn builder() -> AnteroomServerBuilder {
        AnteroomServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// Runs the server accept loop.
    ///
    /// Accepts incoming connections and spawns a gateway task for each.
    /// If reaping is enabled, a background sweep destroys idle rooms on
    /// the configured interval. Runs until the process is terminated.
    pub async fn run(mut self) -> Result<(), AnteroomError> {
        tracing::info!("anteroom server running");

        if let Some(grace) = self.reap_grace {
            let state = Arc::clone(&self.state);
            let interval = self.reap_interval;
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(interval);
                ticker.tick().await; // first tick is immediate; skip it
                loop {
                    ticker.tick().await;
                    let reaped = state
                        .registry
                        .lock()
                        .await
                        .reap_idle(grace)
                        .await;
                    if !reaped.is_empty() {
                        tracing::info!(
                            count = reaped.len(),
                            "reaped idle rooms"
                        );
                    }
                }
            });
        }

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) =
                            handle_connection(conn, state).await
                        {
                            tracing::debug!(
                                error = %e,
                                "connection ended with error"
                            );
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
