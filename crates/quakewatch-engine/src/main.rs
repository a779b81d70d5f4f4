//! QuakeWatch engine binary.
//!
//! Wires the feed poller and the Observer API together around a shared
//! snapshot store, then runs until Ctrl-C or SIGTERM.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `quakewatch-config.yaml` (or defaults)
//! 2. Initialize structured logging (tracing)
//! 3. Create the snapshot store and feed fetcher
//! 4. Start the Observer API server
//! 5. Start the poller on a background task
//! 6. Wait for a termination signal (or the server dying), then shut
//!    everything down

mod error;

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use quakewatch_core::config::QuakeWatchConfig;
use quakewatch_core::feed::FeedFetcher;
use quakewatch_core::poller::{Poller, PollerSummary};
use quakewatch_core::snapshot::SnapshotStore;
use quakewatch_observer::{AppState, ObserverSettings, ServerConfig};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;

/// Config file used when `QUAKEWATCH_CONFIG` is unset.
const DEFAULT_CONFIG_PATH: &str = "quakewatch-config.yaml";

/// How long open HTTP and `WebSocket` connections get to drain on shutdown.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Why the engine stopped running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StopReason {
    /// A termination signal arrived.
    Signal,
    /// The observer server task ended on its own.
    ObserverExited,
}

/// Application entry point for the engine.
///
/// # Errors
///
/// Returns an error if configuration, the feed client, or the server
/// cannot be initialized.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration.
    let config_path = std::env::var("QUAKEWATCH_CONFIG")
        .map_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
    let (config, from_file) = load_config(&config_path)?;

    // 2. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with_target(true)
        .init();

    info!("quakewatch-engine starting");
    if !from_file {
        info!(path = %config_path.display(), "Config file not found, using defaults");
    }
    info!(
        feed_url = config.feed.url,
        poll_interval_secs = config.poller.interval_secs,
        alert_radius_km = config.alerts.radius_km,
        push_interval_ms = config.observer.push_interval_ms,
        "Configuration loaded"
    );

    // 3. Shared state.
    let shutdown = CancellationToken::new();
    let store = SnapshotStore::new();
    let fetcher = FeedFetcher::new(&config.feed).map_err(EngineError::from)?;

    // 4. Observer API.
    let app_state = Arc::new(
        AppState::new(store.clone(), ObserverSettings::from(&config))
            .with_shutdown(shutdown.clone()),
    );
    let observer = quakewatch_observer::spawn_observer(
        &ServerConfig::from(&config.observer),
        Arc::clone(&app_state),
    )
    .await
    .map_err(EngineError::from)?;
    info!(addr = %observer.addr, "Observer API server started");

    // 5. Poller.
    let poller = Poller::new(fetcher, store, config.poller.interval());
    let poller_handle = tokio::spawn(poller.run(shutdown.clone()));

    // 6. Run until signalled or the server dies.
    let reason = supervise(
        shutdown_signal(),
        observer.handle,
        poller_handle,
        &shutdown,
        SHUTDOWN_GRACE,
    )
    .await;

    if reason == StopReason::ObserverExited {
        return Err(EngineError::ObserverStopped.into());
    }
    info!("quakewatch-engine shutdown complete");
    Ok(())
}

/// Wait for `stop` or for the observer task to end, then cancel
/// `shutdown` and wind down both tasks.
///
/// The observer gets at most `grace` to drain open connections before it
/// is aborted.
async fn supervise<F>(
    stop: F,
    mut observer: JoinHandle<()>,
    poller: JoinHandle<PollerSummary>,
    shutdown: &CancellationToken,
    grace: Duration,
) -> StopReason
where
    F: Future<Output = ()>,
{
    let reason = tokio::select! {
        () = stop => {
            info!("Shutdown signal received");
            StopReason::Signal
        }
        joined = &mut observer => {
            match joined {
                Ok(()) => error!("Observer server stopped unexpectedly"),
                Err(e) => error!(error = %e, "Observer task failed"),
            }
            StopReason::ObserverExited
        }
    };
    shutdown.cancel();

    match poller.await {
        Ok(summary) => info!(cycles = summary.cycles, "Poller finished"),
        Err(e) => warn!(error = %e, "Poller task failed"),
    }

    if reason == StopReason::Signal {
        match tokio::time::timeout(grace, &mut observer).await {
            Ok(Ok(())) => info!("Observer server stopped"),
            Ok(Err(e)) => warn!(error = %e, "Observer task failed"),
            Err(_) => {
                warn!(
                    grace_secs = grace.as_secs(),
                    "Observer did not drain in time, aborting"
                );
                observer.abort();
            }
        }
    }
    reason
}

/// Load configuration from `path` if it exists, otherwise from defaults.
///
/// Environment overrides apply in both cases. The returned flag reports
/// whether the file was used.
fn load_config(path: &Path) -> Result<(QuakeWatchConfig, bool), EngineError> {
    if path.exists() {
        Ok((QuakeWatchConfig::from_file(path)?, true))
    } else {
        Ok((QuakeWatchConfig::from_env()?, false))
    }
}

/// Resolve when the process receives Ctrl-C or (on Unix) SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
