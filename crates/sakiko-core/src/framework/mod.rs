//! Framework layer - Event routing.
//!
//! This module contains the event processing pipeline:
//! - Middleware and action contracts
//! - Matchers and their builder
//! - The priority-tiered event bus

pub mod builder;
pub mod bus;
pub mod matcher;
pub mod middleware;

pub use builder::{MatcherBuilder, on, on_any};
pub use bus::{EventBus, InvocationReport, InvocationStatus, PublishReport, Registration};
pub use matcher::{EventSelector, Matcher, MatcherId};
pub use middleware::{
    Action, ActionFn, BoxedAction, BoxedMiddleware, IntoOutcome, Middleware, MiddlewareFn,
    Outcome, action_fn, middleware_fn,
};
