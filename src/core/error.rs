//! Error types for dispatch operations.

use thiserror::Error;

/// Errors produced by engine components.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Priority outside the accepted `1..=5` range.
    #[error("invalid priority {0}: expected a value in 1..=5")]
    InvalidPriority(u8),
    /// Resource unit id not known to the pool.
    #[error("unknown resource unit {0}")]
    UnknownUnit(u32),
    /// The engine's worker threads are already running.
    #[error("engine already started")]
    AlreadyStarted,
    /// Configuration validation failed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// A worker thread could not be spawned.
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
