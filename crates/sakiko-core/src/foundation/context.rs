//! Per-invocation context threaded through a matcher's middleware chain.
//!
//! A fresh [`Context`] is built for every (event, matcher) pair, so two
//! matchers handling the same event never see each other's extensions.
//! Extensions are added with [`Context::with`], which leaves the original
//! context untouched and returns an extended copy.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::foundation::event::{BoxedEvent, Event};
use crate::foundation::snowflake;
use crate::integration::bot::BoxedBot;

type Extensions = HashMap<TypeId, Arc<dyn Any + Send + Sync>>;

/// The context object passed to middlewares and actions.
///
/// Cloning is cheap: the event, the bot and the extension map are all
/// reference-counted, and the map is only copied when a clone is extended.
///
/// # Example
///
/// ```rust,ignore
/// struct Command(String);
///
/// let ctx = ctx.with(Command("echo".into()));
/// if let Some(cmd) = ctx.get::<Command>() {
///     ctx.bot().call_api("send_msg", json!({ "message": cmd.0 })).await?;
/// }
/// ```
#[derive(Clone)]
pub struct Context {
    event: BoxedEvent,
    bot: BoxedBot,
    invocation_id: u64,
    extensions: Arc<Extensions>,
}

impl Context {
    /// Creates a context seeded with the event and the bot that received it.
    pub fn new(event: BoxedEvent, bot: BoxedBot) -> Self {
        Self {
            event,
            bot,
            invocation_id: snowflake::global().next_id_unsafe(),
            extensions: Arc::new(HashMap::new()),
        }
    }

    /// Returns the event being handled.
    pub fn event(&self) -> &BoxedEvent {
        &self.event
    }

    /// Returns the bot that received the event.
    pub fn bot(&self) -> &BoxedBot {
        &self.bot
    }

    /// Identifier of this invocation, for log correlation.
    pub fn invocation_id(&self) -> u64 {
        self.invocation_id
    }

    /// Borrows the event as `E` (the concrete type or any ancestor).
    pub fn view<E: Event>(&self) -> Option<&E> {
        self.event.view::<E>()
    }

    /// Plain text of the event's message, if it carries one.
    pub fn plain_text(&self) -> Option<String> {
        self.event.message().map(|m| m.plain_text())
    }

    /// Returns a copy of this context extended with `value`.
    ///
    /// A value of the same type already present is shadowed in the copy only.
    pub fn with<T: Any + Send + Sync>(&self, value: T) -> Self {
        self.clone().extend(value)
    }

    /// Consuming form of [`with`](Self::with).
    pub fn extend<T: Any + Send + Sync>(mut self, value: T) -> Self {
        Arc::make_mut(&mut self.extensions).insert(TypeId::of::<T>(), Arc::new(value));
        self
    }

    /// Returns the extension of type `T`, if present.
    pub fn get<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.extensions
            .get(&TypeId::of::<T>())
            .and_then(|v| v.downcast_ref::<T>())
    }

    /// Returns `true` if an extension of type `T` is present.
    pub fn contains<T: Any + Send + Sync>(&self) -> bool {
        self.extensions.contains_key(&TypeId::of::<T>())
    }

    /// Number of extensions attached so far.
    pub fn extension_count(&self) -> usize {
        self.extensions.len()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("event", &self.event)
            .field("bot", &self.bot.self_id())
            .field("invocation_id", &self.invocation_id)
            .field("extensions", &self.extensions.len())
            .finish()
    }
}
