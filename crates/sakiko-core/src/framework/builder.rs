//! Fluent construction of matchers.
//!
//! The builder is the only way to create a [`Matcher`]. It is consumed by
//! [`build`](MatcherBuilder::build) or [`commit`](MatcherBuilder::commit), so it
//! cannot drift from what was registered.
//!
//! # Example
//!
//! ```rust,ignore
//! use sakiko_core::prelude::*;
//!
//! let registration = on::<GroupMessageEvent>()
//!     .or::<PrivateMessageEvent>()
//!     .name("echo")
//!     .priority(10)
//!     .block(true)
//!     .timeout(Duration::from_secs(5))
//!     .with(starts_with(["/echo "], true))
//!     .handle(|ctx| async move {
//!         let rest = &ctx.get::<StartsWithMatch>().unwrap().rest;
//!         reply(&ctx, rest).await?;
//!         Ok::<_, HandlerError>(false)
//!     })
//!     .commit(&bus)?;
//!
//! // Later:
//! registration.unregister();
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::foundation::context::Context;
use crate::foundation::error::BuildError;
use crate::foundation::event::Event;
use crate::framework::bus::{EventBus, Registration};
use crate::framework::matcher::{EventSelector, Matcher, MatcherParts};
use crate::framework::middleware::{Action, BoxedAction, BoxedMiddleware, IntoOutcome, Middleware, action_fn};

/// Starts a matcher for events of type `E` (and its subtypes).
pub fn on<E: Event>() -> MatcherBuilder {
    MatcherBuilder::new(EventSelector::of::<E>())
}

/// Starts a matcher that receives every event.
pub fn on_any() -> MatcherBuilder {
    MatcherBuilder::new(EventSelector::any())
}

/// Builder for [`Matcher`]. Created by [`on`] or [`on_any`].
#[must_use = "a matcher builder does nothing until built or committed"]
pub struct MatcherBuilder {
    name: Option<String>,
    selectors: Vec<EventSelector>,
    priority: i32,
    blocking: bool,
    timeout: Option<Duration>,
    middlewares: Vec<BoxedMiddleware>,
    action: Option<BoxedAction>,
    duplicate_action: bool,
}

impl MatcherBuilder {
    fn new(selector: EventSelector) -> Self {
        Self {
            name: None,
            selectors: vec![selector],
            priority: 0,
            blocking: false,
            timeout: None,
            middlewares: Vec::new(),
            action: None,
            duplicate_action: false,
        }
    }

    /// Also match events of type `E`.
    pub fn or<E: Event>(mut self) -> Self {
        self.selectors.push(EventSelector::of::<E>());
        self
    }

    /// Sets a name used in logs and reports.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the priority. Higher runs first; the default is `0`.
    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Allows this matcher to stop lower tiers by returning
    /// [`Outcome::Block`](crate::Outcome::Block) (or `false`).
    pub fn block(mut self, blocking: bool) -> Self {
        self.blocking = blocking;
        self
    }

    /// Bounds each invocation to `timeout`.
    ///
    /// The bus stops waiting when it expires; the action itself is not
    /// preempted.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Appends a middleware. Middlewares run in the order they were added.
    pub fn with<M: Middleware>(mut self, middleware: M) -> Self {
        self.middlewares.push(Arc::new(middleware));
        self
    }

    /// Appends an already shared middleware.
    pub fn with_shared(mut self, middleware: BoxedMiddleware) -> Self {
        self.middlewares.push(middleware);
        self
    }

    /// Sets the action from an async closure.
    ///
    /// The closure's output may be `()`, `bool`, [`Outcome`](crate::Outcome),
    /// or a `Result` of those.
    pub fn handle<F, Fut, R>(self, f: F) -> Self
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoOutcome + Send + 'static,
    {
        self.handle_action(action_fn(f))
    }

    /// Sets the action from an [`Action`] implementation.
    ///
    /// A matcher has exactly one action; setting it twice makes
    /// [`build`](Self::build) fail with [`BuildError::ActionAlreadySet`].
    pub fn handle_action<A: Action>(mut self, action: A) -> Self {
        if self.action.is_some() {
            self.duplicate_action = true;
        } else {
            self.action = Some(Arc::new(action));
        }
        self
    }

    /// Finishes the matcher without registering it.
    pub fn build(self) -> Result<Matcher, BuildError> {
        let name = self.display_name();
        if self.duplicate_action {
            return Err(BuildError::ActionAlreadySet { name });
        }
        let action = self.action.ok_or(BuildError::MissingAction { name })?;

        Ok(Matcher::from_parts(MatcherParts {
            name: self.name,
            selectors: self.selectors,
            priority: self.priority,
            blocking: self.blocking,
            timeout: self.timeout,
            middlewares: self.middlewares,
            action,
        }))
    }

    /// Builds the matcher and registers it on `bus`.
    pub fn commit(self, bus: &EventBus) -> Result<Registration, BuildError> {
        let matcher = self.build()?;
        Ok(bus.register(&matcher))
    }

    fn display_name(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => {
                let names: Vec<_> = self.selectors.iter().map(|s| s.name()).collect();
                format!("on<{}>", names.join(" | "))
            }
        }
    }
}
