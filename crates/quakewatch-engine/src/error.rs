//! Error types for the QuakeWatch engine binary.
//!
//! [`EngineError`] is the top-level error type that wraps all possible
//! failure modes during startup. Once running, the poller absorbs its own
//! failures; only a signal or the server exiting ends the process.

/// Top-level error for the engine binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: quakewatch_core::config::ConfigError,
    },

    /// The feed HTTP client could not be built.
    #[error("feed client error: {source}")]
    Feed {
        /// The underlying fetch error.
        #[from]
        source: quakewatch_core::feed::FetchError,
    },

    /// Observer API server failed to start.
    #[error("observer error: {source}")]
    Observer {
        /// The underlying startup error.
        #[from]
        source: quakewatch_observer::StartupError,
    },

    /// The Observer API server exited while the engine was running.
    #[error("observer server stopped unexpectedly")]
    ObserverStopped,
}
