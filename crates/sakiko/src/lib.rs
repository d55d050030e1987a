//! # Sakiko
//!
//! An event-bus driven, type-safe chatbot framework for Rust.
//!
//! ## Architecture
//!
//! Adapters turn protocol frames into typed events and publish them on a
//! priority-tiered [`EventBus`](sakiko_core::EventBus). Matchers in the same
//! priority tier run concurrently; a blocking matcher stops lower tiers.
//!
//! ```text
//! ┌─────────────┐     ┌──────────────────────────────┐
//! │   Runtime   │────▶│           EventBus           │
//! │  (Adapter)  │     │ prio 10: [m1, m2] concurrent │──▶ blocked? stop
//! └─────────────┘     │ prio  0: [m3, m4] concurrent │
//!                     └──────────────────────────────┘
//! ```
//!
//! - **Runtime**: configuration, logging, adapters and plugin lifecycle
//! - **Adapters**: protocol implementations (OneBot v11 behind `onebot`)
//! - **Plugins**: named groups of matchers that load and unload together
//! - **Matchers**: event selector, priority, middlewares and one action
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use sakiko::prelude::*;
//! use sakiko::onebot::{MessageEvent, OneBotAdapter};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let sakiko = Sakiko::builder().build()?;
//!     sakiko.register_adapter::<OneBotAdapter>().await?;
//!
//!     on::<MessageEvent>()
//!         .with(starts_with(["/echo "], true))
//!         .handle(|ctx: Context| async move {
//!             println!("{:?}", ctx.plain_text());
//!         })
//!         .commit(sakiko.bus())?;
//!
//!     sakiko.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `toml-config` (default): read `sakiko.toml`
//! - `yaml-config`: read `sakiko.yaml`
//! - `json-log`: JSON log output
//! - `onebot`: OneBot v11 adapter, re-exported as [`onebot`]
//! - `milky`: Milky event model, re-exported as [`milky`]

pub use sakiko_core as core;
pub use sakiko_framework as framework;
pub use sakiko_runtime as runtime;

#[cfg(feature = "onebot")]
pub use sakiko_adapter_onebot as onebot;

#[cfg(feature = "milky")]
pub use sakiko_adapter_milky as milky;

pub use sakiko_macros::BotEvent;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use sakiko::prelude::*;
/// ```
pub mod prelude {
    // Runtime - main entry point
    pub use sakiko_runtime::{RuntimeError, RuntimeResult, Sakiko, SakikoConfig};

    // Matchers and dispatch
    pub use sakiko_core::prelude::*;
    pub use sakiko_core::{MatcherBuilder, downcast_bot};

    // Plugins
    pub use sakiko_framework::{
        Plugin, PluginContext, PluginError, PluginMetadata, PluginResult,
    };

    // Filters
    pub use sakiko_framework::{
        contains, ends_with, event_type, from_bot, full_match, fuzzy_contains, regex, starts_with,
    };

    pub use async_trait::async_trait;
    pub use sakiko_macros::BotEvent;
}
