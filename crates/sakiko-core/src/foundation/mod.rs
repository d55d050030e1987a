//! Foundation layer - Core abstractions and type system.
//!
//! This module contains the fundamental building blocks of the Sakiko framework:
//! - Event system with is-a hierarchies for polymorphic dispatch
//! - Per-invocation context with typed extensions
//! - Snowflake id generation
//! - Error types shared by every layer

pub mod context;
pub mod error;
pub mod event;
pub mod message;
pub mod snowflake;

pub use context::Context;
pub use error::{
    AdapterError, AdapterResult, BuildError, HandlerError, HandlerResult, SnowflakeError,
    SnowflakeResult,
};
pub use event::{BoxedEvent, Event, EventMeta, EventType};
pub use message::Messageable;
pub use snowflake::{Snowflake, SnowflakeOptions, SnowflakeParts};
