//! Error types for the debugger agent bridge

use thiserror::Error;

/// Main error type for the debugger agent bridge
#[derive(Error, Debug)]
pub enum AgentError {
    /// Submission while the handoff queue is not accepting work
    #[error("Error: handoff queue is not running")]
    NotRunning,

    /// The queue stopped before the command was picked up.
    ///
    /// Carries the drain text verbatim so callers can print it unchanged.
    #[error("{0}")]
    Stopped(String),

    /// Agent handle construction or initialization failed
    #[error("{0}")]
    AgentInit(String),

    /// Provider round trip failed
    #[error("Provider error: {0}")]
    Provider(String),

    /// Settings could not be loaded or saved
    #[error("Settings error: {0}")]
    Settings(String),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Frontend failed to bind or serve
    #[error("Frontend error: {0}")]
    Frontend(String),

    /// HTTP client error (CLI)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON encode/decode error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for bridge operations
pub type Result<T> = std::result::Result<T, AgentError>;

impl AgentError {
    /// Create a stopped error carrying the drain text
    pub fn stopped(msg: impl Into<String>) -> Self {
        Self::Stopped(msg.into())
    }

    /// Create an agent initialization error
    pub fn agent_init(msg: impl Into<String>) -> Self {
        Self::AgentInit(msg.into())
    }

    /// Create a provider error
    pub fn provider(msg: impl Into<String>) -> Self {
        Self::Provider(msg.into())
    }

    /// Create a settings error
    pub fn settings(msg: impl Into<String>) -> Self {
        Self::Settings(msg.into())
    }

    /// Create an invalid configuration error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a frontend error
    pub fn frontend(msg: impl Into<String>) -> Self {
        Self::Frontend(msg.into())
    }

    /// Whether this error originates from the handoff queue itself
    /// (as opposed to a handler or configuration failure).
    #[must_use]
    pub fn is_queue_failure(&self) -> bool {
        matches!(self, Self::NotRunning | Self::Stopped(_))
    }
}
