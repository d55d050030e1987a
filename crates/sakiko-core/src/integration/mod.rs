//! Integration layer - External system interfaces.
//!
//! This module contains interfaces for integrating with chat platforms:
//! - Adapter system for protocol implementations
//! - Bot trait and the registry of connected bots

pub mod adapter;
pub mod bot;
pub mod registry;

pub use adapter::{Adapter, AdapterContext, BoxedAdapter, ConfigurableAdapter};
pub use bot::{ApiError, ApiResult, Bot, BoxedBot, downcast_bot};
pub use registry::BotRegistry;
