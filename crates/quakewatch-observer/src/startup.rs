//! Observer server startup helper for embedding in the engine binary.
//!
//! Provides [`spawn_observer`] which binds the listener eagerly, so that a
//! port conflict is reported to the caller, then runs the server on a
//! background Tokio task.
//!
//! # Usage
//!
//! ```rust,ignore
//! use quakewatch_observer::startup::spawn_observer;
//! use quakewatch_observer::{AppState, ServerConfig};
//! use std::sync::Arc;
//!
//! let state = Arc::new(AppState::default());
//! let observer = spawn_observer(&ServerConfig::default(), state).await?;
//! // Cancel `state.shutdown`, then await `observer.handle`.
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::server::{self, ServerConfig, ServerError};
use crate::state::AppState;

/// Errors that can occur when spawning the Observer server.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    /// The server failed to bind or start.
    #[error("server start error: {0}")]
    Server(#[from] ServerError),
}

/// A running Observer server.
#[derive(Debug)]
pub struct ObserverHandle {
    /// The address actually bound (useful when the configured port is 0).
    pub addr: SocketAddr,
    /// The background serve task. Completes after graceful shutdown.
    pub handle: JoinHandle<()>,
}

/// Spawn the Observer HTTP server on a background Tokio task.
///
/// # Errors
///
/// Returns [`StartupError::Server`] if the listener cannot be bound.
pub async fn spawn_observer(
    config: &ServerConfig,
    state: Arc<AppState>,
) -> Result<ObserverHandle, StartupError> {
    let listener = server::bind(config).await?;
    let addr = listener
        .local_addr()
        .map_err(|e| ServerError::Bind(format!("no local address: {e}")))?;

    let handle = tokio::spawn(async move {
        if let Err(e) = server::serve(listener, state).await {
            tracing::error!(error = %e, "Observer server exited with error");
        }
    });

    tracing::info!(%addr, "Observer server spawned on background task");

    Ok(ObserverHandle { addr, handle })
}
