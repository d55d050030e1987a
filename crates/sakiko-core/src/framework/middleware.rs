//! Middleware and action contracts.
//!
//! A matcher runs its middlewares strictly in declared order. Each one receives
//! the current [`Context`] and returns the (possibly extended) context together
//! with a `continue` flag:
//!
//! ```text
//! Context ──▶ mw₁ ──(ctx', true)──▶ mw₂ ──(ctx'', true)──▶ action ──▶ Outcome
//!                                    │
//!                                    └──(_, false)──▶ invocation skipped
//! ```
//!
//! Returning `false` only abandons the current matcher's invocation. Other
//! matchers in the same tier are unaffected.
//!
//! Closures are adapted with [`middleware_fn`] and [`action_fn`]:
//!
//! ```rust,ignore
//! let only_groups = middleware_fn(|ctx: Context| async move {
//!     let ok = ctx.event().is_a::<GroupMessageEvent>();
//!     Ok((ctx, ok))
//! });
//! ```

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::foundation::context::Context;
use crate::foundation::error::{HandlerError, HandlerResult};

// ============================================================================
// Outcome
// ============================================================================

/// What an action asks the bus to do after it returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Outcome {
    /// Let lower-priority tiers run.
    #[default]
    Continue,
    /// Stop lower-priority tiers. Only honored for blocking matchers.
    Block,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Continue => f.write_str("continue"),
            Outcome::Block => f.write_str("block"),
        }
    }
}

/// Conversion from an action's return value into an [`Outcome`].
///
/// | Return type | Outcome |
/// |-------------|---------|
/// | `()` | `Continue` |
/// | `true` | `Continue` |
/// | `false` | `Block` |
/// | `Outcome` | itself |
/// | `Result<T, E>` | `T`'s outcome, or a failed invocation |
pub trait IntoOutcome {
    /// Converts `self` into an outcome or a handler error.
    fn into_outcome(self) -> HandlerResult<Outcome>;
}

impl IntoOutcome for () {
    fn into_outcome(self) -> HandlerResult<Outcome> {
        Ok(Outcome::Continue)
    }
}

impl IntoOutcome for bool {
    fn into_outcome(self) -> HandlerResult<Outcome> {
        Ok(if self {
            Outcome::Continue
        } else {
            Outcome::Block
        })
    }
}

impl IntoOutcome for Outcome {
    fn into_outcome(self) -> HandlerResult<Outcome> {
        Ok(self)
    }
}

impl<T, E> IntoOutcome for Result<T, E>
where
    T: IntoOutcome,
    E: Into<HandlerError>,
{
    fn into_outcome(self) -> HandlerResult<Outcome> {
        self.map_err(Into::into)?.into_outcome()
    }
}

// ============================================================================
// Middleware
// ============================================================================

/// A step in a matcher's middleware chain.
#[async_trait]
pub trait Middleware: Send + Sync + 'static {
    /// Processes the context.
    ///
    /// Returns the context to hand to the next step and whether to continue.
    /// An error aborts this matcher's invocation and is logged by the bus.
    async fn process(&self, ctx: Context) -> HandlerResult<(Context, bool)>;
}

/// A shared middleware trait object.
pub type BoxedMiddleware = Arc<dyn Middleware>;

/// Middleware backed by an async closure. Created by [`middleware_fn`].
#[derive(Clone)]
pub struct MiddlewareFn<F> {
    f: F,
}

/// Wraps an async closure `Fn(Context) -> Result<(Context, bool), _>` as a
/// [`Middleware`].
pub fn middleware_fn<F, Fut>(f: F) -> MiddlewareFn<F>
where
    F: Fn(Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult<(Context, bool)>> + Send + 'static,
{
    MiddlewareFn { f }
}

#[async_trait]
impl<F, Fut> Middleware for MiddlewareFn<F>
where
    F: Fn(Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult<(Context, bool)>> + Send + 'static,
{
    async fn process(&self, ctx: Context) -> HandlerResult<(Context, bool)> {
        (self.f)(ctx).await
    }
}

// ============================================================================
// Action
// ============================================================================

/// The body of a matcher, run after the whole middleware chain passed.
#[async_trait]
pub trait Action: Send + Sync + 'static {
    /// Runs the action with the final context.
    async fn call(&self, ctx: Context) -> HandlerResult<Outcome>;
}

/// A shared action trait object.
pub type BoxedAction = Arc<dyn Action>;

/// Action backed by an async closure. Created by [`action_fn`].
#[derive(Clone)]
pub struct ActionFn<F> {
    f: F,
}

/// Wraps an async closure whose output implements [`IntoOutcome`] as an
/// [`Action`].
pub fn action_fn<F, Fut, R>(f: F) -> ActionFn<F>
where
    F: Fn(Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoOutcome + Send + 'static,
{
    ActionFn { f }
}

#[async_trait]
impl<F, Fut, R> Action for ActionFn<F>
where
    F: Fn(Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoOutcome + Send + 'static,
{
    async fn call(&self, ctx: Context) -> HandlerResult<Outcome> {
        (self.f)(ctx).await.into_outcome()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Oops;

    impl fmt::Display for Oops {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("oops")
        }
    }

    impl std::error::Error for Oops {}

    #[test]
    fn test_into_outcome() {
        assert_eq!(().into_outcome().unwrap(), Outcome::Continue);
        assert_eq!(true.into_outcome().unwrap(), Outcome::Continue);
        assert_eq!(false.into_outcome().unwrap(), Outcome::Block);
        assert_eq!(Outcome::Block.into_outcome().unwrap(), Outcome::Block);

        let ok: Result<bool, Oops> = Ok(false);
        assert_eq!(ok.into_outcome().unwrap(), Outcome::Block);

        let err: Result<(), Oops> = Err(Oops);
        assert_eq!(err.into_outcome().unwrap_err().to_string(), "oops");
    }
}
