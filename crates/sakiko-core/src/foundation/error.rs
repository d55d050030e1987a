//! Unified error types for the Sakiko core.
//!
//! Plugin and filter errors live in `sakiko-framework`; runtime and config
//! errors live in `sakiko-runtime`.

use thiserror::Error;

// =============================================================================
// Handler Errors
// =============================================================================

/// Error type returned by middlewares and actions.
///
/// Handlers are user code, so anything implementing `std::error::Error` is
/// accepted. The bus only logs it and reports the invocation as failed.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type for middlewares and actions.
pub type HandlerResult<T> = Result<T, HandlerError>;

// =============================================================================
// Builder Errors
// =============================================================================

/// Errors raised while turning a [`MatcherBuilder`](crate::MatcherBuilder)
/// into a [`Matcher`](crate::Matcher).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    /// `handle` was never called.
    #[error("matcher '{name}' has no action")]
    MissingAction {
        /// Name (or selector list) of the matcher being built.
        name: String,
    },

    /// `handle` was called more than once.
    #[error("matcher '{name}' already has an action")]
    ActionAlreadySet {
        /// Name (or selector list) of the matcher being built.
        name: String,
    },
}

// =============================================================================
// Snowflake Errors
// =============================================================================

/// Errors raised when configuring a snowflake generator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SnowflakeError {
    /// Worker and sequence bits leave no room for the timestamp.
    #[error("worker bits ({worker_bits}) + sequence bits ({sequence_bits}) must not exceed 22")]
    BitBudget {
        /// Requested worker id width.
        worker_bits: u8,
        /// Requested sequence width.
        sequence_bits: u8,
    },

    /// The worker id does not fit in its bit width.
    #[error("worker id {worker_id} exceeds the maximum of {max}")]
    WorkerIdOutOfRange {
        /// Requested worker id.
        worker_id: u64,
        /// Largest id representable with the configured width.
        max: u64,
    },

    /// The process-wide generator was already initialized.
    #[error("the global snowflake generator is already installed")]
    AlreadyInstalled,
}

// =============================================================================
// Adapter Errors
// =============================================================================

/// Errors that can occur in adapter operations.
#[derive(Debug, Clone, Error)]
pub enum AdapterError {
    /// Event parsing failed.
    #[error("failed to parse event: {reason}")]
    ParseError {
        /// Reason for failure.
        reason: String,
    },

    /// Adapter configuration was rejected.
    #[error("invalid adapter configuration: {0}")]
    InvalidConfig(String),

    /// Connection could not be established or was lost.
    #[error("connection to {target} failed: {reason}")]
    Connection {
        /// URL or socket address.
        target: String,
        /// Reason for failure.
        reason: String,
    },

    /// Internal adapter error.
    #[error("adapter error: {0}")]
    Internal(String),
}

impl AdapterError {
    /// Creates an internal adapter error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Creates a parse error.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::ParseError { reason: msg.into() }
    }

    /// Creates a connection error.
    pub fn connection(target: impl Into<String>, reason: impl ToString) -> Self {
        Self::Connection {
            target: target.into(),
            reason: reason.to_string(),
        }
    }
}

impl From<std::io::Error> for AdapterError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for adapter operations.
pub type AdapterResult<T> = Result<T, AdapterError>;

/// Result type for snowflake configuration.
pub type SnowflakeResult<T> = Result<T, SnowflakeError>;
