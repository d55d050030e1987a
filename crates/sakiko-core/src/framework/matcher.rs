//! Matcher: the unit of event handling.
//!
//! A [`Matcher`] bundles:
//! - one or more [`EventSelector`]s (an OR: an event matches if it is an
//!   instance of, or a subtype of, any selector)
//! - a priority (higher runs first, ties share a tier)
//! - a blocking flag
//! - an optional timeout
//! - an ordered middleware chain
//! - a single action
//!
//! Matchers are immutable and can only be produced by
//! [`MatcherBuilder`](super::builder::MatcherBuilder). Cloning is cheap and
//! keeps the same [`MatcherId`], which is what the bus uses as identity.

use std::any::TypeId;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tracing::trace;

use crate::foundation::context::Context;
use crate::foundation::error::HandlerResult;
use crate::foundation::event::Event;
use crate::framework::middleware::{BoxedAction, BoxedMiddleware, Outcome};

static NEXT_MATCHER_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a matcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MatcherId(u64);

impl MatcherId {
    fn next() -> Self {
        Self(NEXT_MATCHER_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw numeric id.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for MatcherId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ============================================================================
// Event Selector
// ============================================================================

/// Marker type behind [`EventSelector::any`].
struct AnyEvent;

/// A reference to an event type, used at registration time.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventSelector {
    type_id: TypeId,
    name: &'static str,
}

impl EventSelector {
    /// Selects events of type `E` and all of its subtypes.
    pub fn of<E: Event>() -> Self {
        Self {
            type_id: TypeId::of::<E>(),
            name: std::any::type_name::<E>(),
        }
    }

    /// Selects every event.
    pub fn any() -> Self {
        Self {
            type_id: TypeId::of::<AnyEvent>(),
            name: "*",
        }
    }

    /// Type id of the catch-all selector.
    pub(crate) fn any_type_id() -> TypeId {
        TypeId::of::<AnyEvent>()
    }

    /// The selected type's id.
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// The selected type's name, `*` for [`EventSelector::any`].
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns `true` if `event` is an instance of the selected type.
    pub fn matches(&self, event: &dyn Event) -> bool {
        self.type_id == Self::any_type_id() || event.ancestor(self.type_id).is_some()
    }
}

impl fmt::Debug for EventSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

// ============================================================================
// Matcher
// ============================================================================

/// A registered handler. See the [module docs](self).
#[derive(Clone)]
pub struct Matcher {
    inner: Arc<MatcherInner>,
}

struct MatcherInner {
    id: MatcherId,
    name: Option<String>,
    selectors: Vec<EventSelector>,
    priority: i32,
    blocking: bool,
    timeout: Option<Duration>,
    middlewares: Vec<BoxedMiddleware>,
    action: BoxedAction,
}

pub(crate) struct MatcherParts {
    pub name: Option<String>,
    pub selectors: Vec<EventSelector>,
    pub priority: i32,
    pub blocking: bool,
    pub timeout: Option<Duration>,
    pub middlewares: Vec<BoxedMiddleware>,
    pub action: BoxedAction,
}

impl Matcher {
    pub(crate) fn from_parts(parts: MatcherParts) -> Self {
        let mut selectors = parts.selectors;
        let mut seen = Vec::with_capacity(selectors.len());
        selectors.retain(|s| {
            if seen.contains(&s.type_id) {
                false
            } else {
                seen.push(s.type_id);
                true
            }
        });

        Self {
            inner: Arc::new(MatcherInner {
                id: MatcherId::next(),
                name: parts.name,
                selectors,
                priority: parts.priority,
                blocking: parts.blocking,
                timeout: parts.timeout,
                middlewares: parts.middlewares,
                action: parts.action,
            }),
        }
    }

    /// Returns this matcher's identity.
    pub fn id(&self) -> MatcherId {
        self.inner.id
    }

    /// Returns the name given at build time, if any.
    pub fn name(&self) -> Option<&str> {
        self.inner.name.as_deref()
    }

    /// Name for log lines: the configured name, or the id.
    pub fn label(&self) -> String {
        match &self.inner.name {
            Some(name) => name.clone(),
            None => format!("matcher{}", self.inner.id),
        }
    }

    /// Event type selectors, deduplicated, in declaration order.
    pub fn selectors(&self) -> &[EventSelector] {
        &self.inner.selectors
    }

    pub fn priority(&self) -> i32 {
        self.inner.priority
    }

    /// Whether a `Block` outcome from this matcher stops lower tiers.
    pub fn is_blocking(&self) -> bool {
        self.inner.blocking
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.inner.timeout
    }

    pub fn middleware_count(&self) -> usize {
        self.inner.middlewares.len()
    }

    /// Returns `true` if any selector matches `event`.
    pub fn matches(&self, event: &dyn Event) -> bool {
        self.inner.selectors.iter().any(|s| s.matches(event))
    }

    /// Runs the middleware chain and, if every step passes, the action.
    ///
    /// Returns `Ok(None)` when a middleware short-circuited the invocation.
    pub async fn run(&self, ctx: Context) -> HandlerResult<Option<Outcome>> {
        let mut ctx = ctx;
        for (step, middleware) in self.inner.middlewares.iter().enumerate() {
            let (next, proceed) = middleware.process(ctx).await?;
            if !proceed {
                trace!(matcher = %self.label(), step, "Middleware stopped the chain");
                return Ok(None);
            }
            ctx = next;
        }
        self.inner.action.call(ctx).await.map(Some)
    }
}

impl fmt::Debug for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Matcher")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .field("selectors", &self.inner.selectors)
            .field("priority", &self.inner.priority)
            .field("blocking", &self.inner.blocking)
            .field("timeout", &self.inner.timeout)
            .field("middlewares", &self.inner.middlewares.len())
            .finish()
    }
}
