//! Adapter trait and the context adapters run with.
//!
//! An adapter owns its connections. For every decoded event it looks up (or
//! creates) the [`Bot`](super::bot::Bot) for that connection and hands both to
//! [`AdapterContext::dispatch`], which publishes on the bus without waiting
//! for handlers to finish.
//!
//! ```rust,ignore
//! #[async_trait]
//! impl Adapter for MyAdapter {
//!     fn name() -> &'static str { "my-platform" }
//!
//!     async fn on_start(&self, ctx: AdapterContext) -> AdapterResult<()> {
//!         let listener = TcpListener::bind(&self.config.addr).await?;
//!         tokio::spawn(accept_loop(listener, ctx));
//!         Ok(())
//!     }
//! }
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::foundation::error::AdapterResult;
use crate::foundation::event::BoxedEvent;
use crate::framework::bus::EventBus;
use crate::integration::bot::BoxedBot;
use crate::integration::registry::BotRegistry;

/// Context provided to adapters when they start.
///
/// Provides access to:
/// - The event bus for publishing events
/// - The bot registry for tracking connected bots
/// - A cancellation token that fires when the runtime shuts down
#[derive(Clone)]
pub struct AdapterContext {
    bus: EventBus,
    bots: BotRegistry,
    shutdown: CancellationToken,
}

impl AdapterContext {
    /// Creates a new adapter context.
    pub fn new(bus: EventBus, bots: BotRegistry, shutdown: CancellationToken) -> Self {
        Self {
            bus,
            bots,
            shutdown,
        }
    }

    /// Returns the event bus.
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Returns the bot registry.
    pub fn bots(&self) -> &BotRegistry {
        &self.bots
    }

    /// Returns the shutdown token. Connection loops should select on
    /// `shutdown().cancelled()`.
    pub fn shutdown(&self) -> &CancellationToken {
        &self.shutdown
    }

    /// Publishes an event on a background task.
    ///
    /// Adapters must keep reading frames while handlers run, so they never
    /// await the publish themselves.
    pub fn dispatch(&self, bot: BoxedBot, event: BoxedEvent) {
        let bus = self.bus.clone();
        let span = tracing::debug_span!("dispatch", bot_id = %bot.self_id());
        tokio::spawn(
            async move {
                bus.publish(bot, event).await;
            }
            .instrument(span),
        );
    }
}

/// The core adapter trait.
///
/// Adapters bridge a chat protocol with the Sakiko event bus. They are
/// responsible for:
///
/// - Establishing (or accepting) connections
/// - Decoding wire frames into typed events
/// - Registering a [`Bot`](super::bot::Bot) per connected account
/// - Publishing events through [`AdapterContext::dispatch`]
#[async_trait]
pub trait Adapter: Send + Sync {
    /// Returns the adapter name (e.g., "onebot").
    ///
    /// The runtime looks up this adapter's configuration under
    /// `adapters.<name>`.
    fn name() -> &'static str
    where
        Self: Sized;

    /// Called when the runtime starts.
    ///
    /// Long-running connection loops must be spawned; this method should return
    /// once they are set up.
    async fn on_start(&self, ctx: AdapterContext) -> AdapterResult<()>;

    /// Called when the runtime is shutting down, after the shutdown token has
    /// been cancelled.
    async fn on_shutdown(&self) -> AdapterResult<()> {
        Ok(())
    }
}

/// A shared adapter trait object.
pub type BoxedAdapter = Arc<dyn Adapter>;

/// Trait for adapters that can be created from configuration.
///
/// This is a separate trait to avoid the associated type problem with trait objects.
/// Adapters implement both `Adapter` and `ConfigurableAdapter`.
pub trait ConfigurableAdapter: Adapter {
    /// The configuration type for this adapter.
    type Config: serde::de::DeserializeOwned + Default;

    /// Creates an adapter from its configuration.
    fn from_config(config: Self::Config) -> AdapterResult<Arc<Self>>
    where
        Self: Sized;
}
