//! Event system for the Sakiko framework.
//!
//! This module provides the core event infrastructure:
//!
//! - [`Event`] - Base trait for all events
//! - [`EventType`] - Event type classification (message, notice, request, meta)
//! - [`EventMeta`] - Identity stamped on every event at ingestion
//! - [`BoxedEvent`] - Cheap-to-clone, immutable type-erased event
//!
//! # Event Hierarchies
//!
//! Events form an is-a hierarchy by embedding their parent as a field
//! (`GroupMessageEvent` contains a `MessageEvent`, which contains the
//! platform's root event). [`Event::lineage`] lists the concrete type followed
//! by every ancestor, and [`Event::ancestor`] borrows the event as any of them:
//!
//! ```rust,ignore
//! let event: BoxedEvent = parse_event(frame)?;
//!
//! if event.is_a::<MessageEvent>() {
//!     let msg = event.view::<MessageEvent>().unwrap();
//!     println!("{} says {}", msg.user_id, msg.raw_message);
//! }
//! ```
//!
//! The `#[derive(BotEvent)]` macro generates both methods from a field marked
//! `#[event(parent)]`.

use std::any::{Any, TypeId};
use std::fmt;
use std::ops::Deref;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::message::Messageable;
use super::snowflake;

// ============================================================================
// Event Type Classification
// ============================================================================

/// Classification of event types.
///
/// This enum represents the high-level category of an event, which is useful
/// for filtering events in middlewares without knowing the specific event type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// Message events (private messages, group messages, etc.)
    Message,
    /// Notice events (group changes, recalls, friend adds, etc.)
    Notice,
    /// Request events (friend requests, group join requests, etc.)
    Request,
    /// Meta events (lifecycle, heartbeat, etc.)
    Meta,
    /// Other/unknown event types
    Other,
}

impl FromStr for EventType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_str() {
            "message" => EventType::Message,
            "notice" => EventType::Notice,
            "request" => EventType::Request,
            "meta" | "meta_event" => EventType::Meta,
            _ => EventType::Other,
        })
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EventType::Message => "message",
            EventType::Notice => "notice",
            EventType::Request => "request",
            EventType::Meta => "meta",
            EventType::Other => "other",
        };
        f.write_str(s)
    }
}

// ============================================================================
// Event Metadata
// ============================================================================

/// Identity assigned to an event when an adapter constructs it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMeta {
    /// Snowflake id from the process-wide generator.
    pub id: u64,
    /// Creation time in ms since the Unix epoch.
    pub created_at: u64,
}

impl EventMeta {
    /// Stamps a fresh id and the current time.
    pub fn stamp() -> Self {
        Self {
            id: snowflake::global().next_id(),
            created_at: snowflake::current_millis(),
        }
    }
}

impl Default for EventMeta {
    /// Same as [`EventMeta::stamp`], so `#[serde(skip)]` fields get a real id.
    fn default() -> Self {
        Self::stamp()
    }
}

// ============================================================================
// Core Event Trait
// ============================================================================

/// The base trait for all events in the Sakiko framework.
///
/// Events are immutable once constructed and are shared between concurrently
/// running handlers through [`BoxedEvent`].
///
/// Only `event_name`, `platform`, `meta` and `as_any` are required. The
/// hierarchy methods default to a single-level event with no ancestors.
///
/// # Derive Macro
///
/// ```rust,ignore
/// #[derive(Debug, Clone, Deserialize, BotEvent)]
/// #[event(name = "message", type = "message")]
/// pub struct MessageEvent {
///     #[serde(flatten)]
///     #[event(parent)]
///     pub base: OneBotEvent,
///     pub user_id: i64,
/// }
/// ```
pub trait Event: Any + Send + Sync {
    /// Returns the dotted name of this event type (e.g. `onebot.message.group`).
    fn event_name(&self) -> &'static str;

    /// Returns the platform/adapter name (e.g., "onebot").
    fn platform(&self) -> &'static str;

    /// Returns the high-level event type classification.
    fn event_type(&self) -> EventType {
        EventType::Other
    }

    /// Returns the id and timestamp stamped at ingestion.
    fn meta(&self) -> &EventMeta;

    /// Returns the account id of the bot that received this event.
    fn self_id(&self) -> Option<String> {
        None
    }

    /// Returns a reference to self as `Any` for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Borrows this event as the ancestor identified by `type_id`.
    ///
    /// Returns `Some` for the concrete type itself and for every type above it
    /// in the hierarchy.
    fn ancestor(&self, type_id: TypeId) -> Option<&dyn Any> {
        let this = self.as_any();
        (this.type_id() == type_id).then_some(this)
    }

    /// Returns the concrete type id followed by every ancestor's, root last.
    fn lineage(&self) -> Vec<TypeId> {
        vec![self.as_any().type_id()]
    }

    /// Returns the raw JSON representation of this event, if available.
    fn raw_json(&self) -> Option<&str> {
        None
    }

    /// Returns the message carried by this event, if any.
    fn message(&self) -> Option<&dyn Messageable> {
        None
    }
}

impl dyn Event {
    /// Returns `true` if this event is a `T` or a subtype of `T`.
    pub fn is_a<T: Event>(&self) -> bool {
        self.ancestor(TypeId::of::<T>()).is_some()
    }

    /// Borrows this event as `T`, which may be the concrete type or an ancestor.
    pub fn view<T: Event>(&self) -> Option<&T> {
        self.ancestor(TypeId::of::<T>())?.downcast_ref::<T>()
    }

    /// Returns `true` if the concrete type is exactly `T`.
    pub fn is<T: Event>(&self) -> bool {
        self.as_any().is::<T>()
    }

    /// Convenience accessor for the event's snowflake id.
    pub fn id(&self) -> u64 {
        self.meta().id
    }
}

// ============================================================================
// Boxed Event
// ============================================================================

/// A type-erased, reference-counted event.
///
/// Cloning only bumps a reference count, so the same event can be handed to
/// every matcher invocation of a publish call.
#[derive(Clone)]
pub struct BoxedEvent(Arc<dyn Event>);

impl BoxedEvent {
    /// Wraps a concrete event.
    pub fn new<E: Event>(event: E) -> Self {
        Self(Arc::new(event))
    }

    /// Returns the inner `Arc`.
    pub fn inner(&self) -> &Arc<dyn Event> {
        &self.0
    }
}

impl Deref for BoxedEvent {
    type Target = dyn Event;

    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}

impl From<Arc<dyn Event>> for BoxedEvent {
    fn from(inner: Arc<dyn Event>) -> Self {
        Self(inner)
    }
}

impl fmt::Debug for BoxedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoxedEvent")
            .field("name", &self.event_name())
            .field("id", &self.meta().id)
            .finish()
    }
}
