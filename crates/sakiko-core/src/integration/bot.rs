//! Bot trait and related types.
//!
//! A [`Bot`] is one live account on one adapter connection. Adapters create
//! bots when a connection identifies itself, hand them to the
//! [`BotRegistry`](super::registry::BotRegistry), and pass them to
//! [`EventBus::publish`](crate::EventBus::publish) alongside every event.

use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Result type for API calls.
pub type ApiResult<T> = Result<T, ApiError>;

/// Error type for API calls.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// The bot is not connected.
    #[error("bot is not connected")]
    NotConnected,

    /// The API call timed out.
    #[error("api call '{action}' timed out (echo {echo})")]
    Timeout {
        /// Action name.
        action: String,
        /// Correlation token of the request.
        echo: String,
    },

    /// The protocol implementation reported a failure.
    #[error("api call failed with retcode {retcode} ({status}): {message}")]
    Failed {
        /// Protocol return code.
        retcode: i64,
        /// Protocol status string.
        status: String,
        /// Error message, if any.
        message: String,
    },

    /// The response did not have the expected shape.
    #[error("invalid api response: {0}")]
    InvalidResponse(String),

    /// Failed to serialize/deserialize.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Transport error.
    #[error("transport error: {0}")]
    Transport(String),

    /// The bot cannot perform this operation for the given input.
    #[error("not supported: {0}")]
    NotSupported(String),
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// The core Bot trait.
///
/// The bus only needs a stable identifier and a display name; everything
/// else is for handler code. Concrete implementations (e.g. `OneBotBot`)
/// provide strongly-typed API methods on top of [`call_api`](Bot::call_api).
#[async_trait]
pub trait Bot: Send + Sync {
    /// Returns the bot's account id on its platform.
    fn self_id(&self) -> &str;

    /// Returns the bot's display name (may be empty).
    fn nickname(&self) -> &str;

    /// Returns the adapter name this bot uses.
    fn adapter_name(&self) -> &str;

    /// Calls a raw API with the given action name and JSON parameters.
    ///
    /// Returns the `data` part of the response once the adapter has validated
    /// it.
    async fn call_api(&self, action: &str, params: Value) -> ApiResult<Value>;

    /// Returns self as an `Arc<dyn Any>` for safe downcasting.
    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

/// A shared Bot trait object.
pub type BoxedBot = Arc<dyn Bot>;

/// Attempts to downcast a BoxedBot to a specific concrete type.
///
/// ```rust,ignore
/// if let Some(onebot) = downcast_bot::<OneBotBot>(ctx.bot().clone()) {
///     onebot.send_private_msg(12345, "Hello!").await.ok();
/// }
/// ```
pub fn downcast_bot<T: Bot + 'static>(bot: BoxedBot) -> Option<Arc<T>> {
    Arc::downcast::<T>(bot.as_any()).ok()
}
