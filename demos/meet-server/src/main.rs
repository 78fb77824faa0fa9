//! Runnable anteroom signaling server.
//!
//! Binds a WebSocket listener and coordinates room admission for any
//! client speaking the anteroom event protocol. The address comes from
//! `ANTEROOM_ADDR` (default `0.0.0.0:3000`); log verbosity from
//! `RUST_LOG` (default `info`).

use anteroom::prelude::*;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let addr = std::env::var("ANTEROOM_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:3000".to_string());

    let server = AnteroomServer::builder().bind(&addr).build().await?;
    tracing::info!(addr = %server.local_addr()?, "meet server ready");

    server.run().await?;
    Ok(())
}
