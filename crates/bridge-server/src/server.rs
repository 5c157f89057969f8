//! Server startup and graceful shutdown.

use std::net::SocketAddr;

use bridge_core::{BridgeError, BridgeResult};
use tracing::info;

use crate::routes::create_router;
use crate::state::AppState;

/// Bind and serve until a shutdown signal arrives.
///
/// # Errors
/// Returns an error when the listener cannot bind or the server fails.
pub async fn serve(state: AppState, addr: SocketAddr) -> BridgeResult<()> {
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| BridgeError::config(format!("failed to bind {addr}: {e}")))?;

    info!(addr = %addr, "Bridge listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| BridgeError::internal(format!("server error: {e}")))
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received");
    }
}
