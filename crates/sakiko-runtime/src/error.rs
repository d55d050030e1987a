//! Runtime error types.

use sakiko_core::{AdapterError, SnowflakeError};
use sakiko_framework::PluginError;
use thiserror::Error;

use crate::config::ConfigError;

/// Errors that can occur during runtime operations.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// An `adapters.<name>` section did not match the adapter's config type.
    #[error("failed to deserialize config for adapter '{adapter}': {reason}")]
    AdapterConfigDeserialize { adapter: String, reason: String },

    #[error("adapter error: {0}")]
    Adapter(#[from] AdapterError),

    #[error("plugin error: {0}")]
    Plugin(#[from] PluginError),

    /// The configured snowflake layout was rejected.
    #[error("snowflake error: {0}")]
    Snowflake(#[from] SnowflakeError),

    /// `start` was called on a running runtime.
    #[error("runtime is already running")]
    AlreadyRunning,

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Installing the shutdown signal handlers failed.
    #[error("failed to listen for shutdown signals: {0}")]
    Signal(#[source] std::io::Error),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
