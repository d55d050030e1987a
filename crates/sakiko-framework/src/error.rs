//! Error types for the Sakiko framework.

use sakiko_core::HandlerError;
use thiserror::Error;

/// Errors raised while constructing a filter.
#[derive(Debug, Error)]
pub enum FilterError {
    /// The regular expression did not compile.
    #[error("invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Errors from plugin loading and lifecycle hooks.
#[derive(Debug, Error)]
pub enum PluginError {
    /// A plugin with the same name is already loaded.
    #[error("plugin '{name}' is already loaded")]
    Duplicate { name: String },

    /// No plugin with this name is loaded.
    #[error("plugin '{name}' is not loaded")]
    NotLoaded { name: String },

    /// The plugin's config section has the wrong shape.
    #[error("invalid config for plugin '{plugin}': {source}")]
    Config {
        plugin: String,
        #[source]
        source: serde_json::Error,
    },

    /// A lifecycle hook failed.
    #[error("plugin '{plugin}' failed in {hook}: {source}")]
    Hook {
        plugin: String,
        hook: &'static str,
        #[source]
        source: HandlerError,
    },

    /// Free-form failure raised by plugin code.
    #[error("{0}")]
    Other(HandlerError),
}

impl PluginError {
    /// Wraps any error raised inside a plugin hook.
    pub fn other(err: impl Into<HandlerError>) -> Self {
        Self::Other(err.into())
    }
}

/// Result type for plugin operations.
pub type PluginResult<T> = Result<T, PluginError>;

/// Result type for filter construction.
pub type FilterResult<T> = Result<T, FilterError>;
