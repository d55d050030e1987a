//! Sakiko Runtime - orchestration layer for the Sakiko bot framework.
//!
//! This crate provides:
//! - Layered configuration loading (`config`)
//! - Logging setup over `tracing-subscriber` (`logging`)
//! - The [`Sakiko`] runtime, which owns the event bus, the bot registry, the
//!   plugin manager and the registered adapters
//!
//! ```rust,ignore
//! use sakiko_runtime::Sakiko;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let sakiko = Sakiko::builder().build()?;
//!     sakiko.register_adapter::<OneBotAdapter>().await?;
//!     sakiko.load_plugin(Echo).await?;
//!     sakiko.run().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;

pub use config::{ConfigError, ConfigLoader, ConfigResult, SakikoConfig};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::{LoggingBuilder, SpanEvents};
pub use runtime::{RuntimeBuilder, Sakiko};

// Re-export tracing for use by other crates
pub use tracing;
pub use tracing_subscriber;

/// Logging macros and span helpers.
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
