//! # Sakiko Core
//!
//! The core engine of the Sakiko bot framework.
//!
//! ## Architecture Layers
//!
//! ### Foundation Layer
//!
//! Core abstractions and type system:
//! - **Event System**: Typed events with is-a hierarchies ([`Event`], [`BoxedEvent`])
//! - **Context**: Per-invocation state with typed extensions ([`Context`])
//! - **Identity**: Snowflake ids for events and invocations ([`Snowflake`])
//!
//! ### Framework Layer
//!
//! Event processing and routing:
//! - **Matchers**: Selectors, priority, blocking, timeout, middleware, action ([`Matcher`])
//! - **Builder**: Fluent matcher construction ([`on`], [`MatcherBuilder`])
//! - **Event Bus**: Priority-tiered concurrent dispatch ([`EventBus`])
//!
//! ### Integration Layer
//!
//! External system interfaces:
//! - **Adapter System**: Protocol implementations ([`Adapter`])
//! - **Bot Management**: Connected accounts ([`Bot`], [`BotRegistry`])
//!
//! ## Dispatch
//!
//! ```text
//! ┌─────────────┐     ┌──────────────────────────────┐
//! │   Adapter   │────▶│           EventBus           │
//! │  (OneBot)   │     │ prio 10: [m1, m2] concurrent │──▶ blocked?
//! └─────────────┘     │ prio  0: [m3]                │
//!                     └──────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use sakiko_core::prelude::*;
//!
//! let bus = EventBus::new();
//!
//! on::<MessageEvent>()
//!     .priority(10)
//!     .handle(|ctx| async move {
//!         println!("{:?}", ctx.plain_text());
//!     })
//!     .commit(&bus)?;
//!
//! bus.start();
//! bus.publish(bot, BoxedEvent::new(event)).await;
//! ```

// Generated `BotEvent` impls name `::sakiko_core`, including inside this crate.
extern crate self as sakiko_core;

// Architectural layers
pub mod foundation;
pub mod framework;
pub mod integration;

#[cfg(test)]
pub(crate) mod testing;

// Re-export foundation types
pub use foundation::{
    AdapterError, AdapterResult, BoxedEvent, BuildError, Context, Event, EventMeta, EventType,
    HandlerError, HandlerResult, Messageable, Snowflake, SnowflakeError, SnowflakeOptions,
    SnowflakeParts, SnowflakeResult, snowflake,
};

// Re-export framework types
pub use framework::{
    Action, ActionFn, BoxedAction, BoxedMiddleware, EventBus, EventSelector, IntoOutcome,
    InvocationReport, InvocationStatus, Matcher, MatcherBuilder, MatcherId, Middleware,
    MiddlewareFn, Outcome, PublishReport, Registration, action_fn, middleware_fn, on, on_any,
};

// Re-export integration types
pub use integration::{
    Adapter, AdapterContext, ApiError, ApiResult, Bot, BotRegistry, BoxedAdapter, BoxedBot,
    ConfigurableAdapter, downcast_bot,
};

/// Prelude for common imports.
pub mod prelude {
    pub use super::foundation::{
        BoxedEvent, Context, Event, EventMeta, EventType, HandlerError, HandlerResult,
        Messageable,
    };
    pub use super::framework::{
        EventBus, Matcher, Middleware, Outcome, Registration, middleware_fn, on, on_any,
    };
    pub use super::integration::{Bot, BoxedBot};
}
