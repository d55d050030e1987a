//! # Sakiko Framework
//!
//! High-level components built on the core event bus.
//!
//! This layer provides:
//! - Filter middlewares for message text (prefix, suffix, exact, keyword,
//!   regex) and for event type or receiving bot
//! - A fuzzy keyword filter with weighted, typo-tolerant scoring
//! - The [`Plugin`] trait and a [`PluginManager`] that ties matchers to a
//!   plugin's lifetime

pub mod error;
pub mod filter;
pub mod fuzzy;
pub mod plugin;

#[cfg(test)]
mod testing;

pub use error::{FilterError, FilterResult, PluginError, PluginResult};
pub use filter::{
    ContainsMatch, EndsWithMatch, EventTypeFilter, FromBotFilter, FullMatch, RegexFilter,
    RegexMatch, StartsWithMatch, TextFilter, contains, ends_with, event_type, from_bot,
    full_match, regex, starts_with,
};
pub use fuzzy::{FuzzyContainsMatch, FuzzyFilter, FuzzyHit, WeightedKeyword, fuzzy_contains};
pub use plugin::{BoxedPlugin, Plugin, PluginContext, PluginManager, PluginMetadata};
