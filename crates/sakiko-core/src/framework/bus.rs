//! The event bus: priority-tiered, concurrent dispatch.
//!
//! # Index
//!
//! ```text
//! priority (desc) ──▶ selector type ──▶ { matcher id ──▶ matcher }
//!     10          ──▶ GroupMessageEvent ──▶ { #3 }
//!                 ──▶ MessageEvent      ──▶ { #1, #3 }
//!      0          ──▶ *                 ──▶ { #2 }
//! ```
//!
//! A matcher is inserted under every one of its selectors at its priority.
//! Empty selector entries and empty tiers are pruned as soon as the last
//! matcher leaves them, so publishing only ever walks live registrations.
//!
//! # Publishing
//!
//! For each tier, highest priority first:
//!
//! 1. Collect the tier's matchers whose selector is the event's type or one of
//!    its ancestors (or the catch-all selector), each at most once.
//! 2. Spawn one task per matcher. Each task gets a fresh [`Context`], runs the
//!    middleware chain, then the action, racing the matcher's timeout if any.
//! 3. Wait for every task of the tier.
//! 4. If a blocking matcher returned [`Outcome::Block`], stop; otherwise move
//!    on to the next tier.
//!
//! Failures (errors, panics and timeouts) are logged and reported per
//! invocation. They never affect sibling matchers and never block.
//!
//! # Timeouts
//!
//! Timeouts use [`tokio::time::timeout`]: when the limit expires the
//! invocation's future is dropped at its next suspension point. An action that
//! runs synchronous code without yielding cannot be interrupted; the bus still
//! reports it as timed out, but only once it yields or finishes.

use std::any::{Any, TypeId};
use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use futures::future::join_all;
use parking_lot::RwLock;
use tracing::{Instrument, debug, error, info, trace, warn};

use crate::foundation::context::Context;
use crate::foundation::event::BoxedEvent;
use crate::framework::matcher::{EventSelector, Matcher, MatcherId};
use crate::framework::middleware::Outcome;
use crate::integration::bot::BoxedBot;

// ============================================================================
// Index
// ============================================================================

type Tier = HashMap<TypeId, BTreeMap<MatcherId, Matcher>>;

struct Entry {
    matcher: Matcher,
    token: u64,
}

#[derive(Default)]
struct BusIndex {
    tiers: BTreeMap<Reverse<i32>, Tier>,
    registered: HashMap<MatcherId, Entry>,
    /// Number of live (tier, selector) slots per selector type.
    type_counts: HashMap<TypeId, usize>,
}

impl BusIndex {
    fn insert(&mut self, matcher: &Matcher, token: u64) -> bool {
        let id = matcher.id();
        if self.registered.contains_key(&id) {
            return false;
        }

        let tier = self.tiers.entry(Reverse(matcher.priority())).or_default();
        for selector in matcher.selectors() {
            let slot = tier.entry(selector.type_id()).or_default();
            if slot.insert(id, matcher.clone()).is_none() {
                *self.type_counts.entry(selector.type_id()).or_insert(0) += 1;
            }
        }
        self.registered.insert(
            id,
            Entry {
                matcher: matcher.clone(),
                token,
            },
        );
        true
    }

    fn remove(&mut self, id: MatcherId, token: Option<u64>) -> bool {
        match self.registered.get(&id) {
            Some(entry) if token.is_none_or(|t| t == entry.token) => {}
            _ => return false,
        }
        let Some(entry) = self.registered.remove(&id) else {
            return false;
        };
        let matcher = entry.matcher;
        let key = Reverse(matcher.priority());

        if let Some(tier) = self.tiers.get_mut(&key) {
            for selector in matcher.selectors() {
                let type_id = selector.type_id();
                let Some(slot) = tier.get_mut(&type_id) else {
                    continue;
                };
                if slot.remove(&id).is_some()
                    && let Some(count) = self.type_counts.get_mut(&type_id)
                {
                    *count -= 1;
                    if *count == 0 {
                        self.type_counts.remove(&type_id);
                    }
                }
                if slot.is_empty() {
                    tier.remove(&type_id);
                }
            }
            if tier.is_empty() {
                self.tiers.remove(&key);
            }
        }
        true
    }

    /// Matchers at `priority` selected by any of `keys`, deduplicated.
    fn resolve(&self, priority: i32, keys: &[TypeId]) -> Vec<Matcher> {
        let Some(tier) = self.tiers.get(&Reverse(priority)) else {
            return Vec::new();
        };
        let mut seen = HashSet::new();
        let mut resolved = Vec::new();
        for key in keys {
            if let Some(slot) = tier.get(key) {
                for (id, matcher) in slot {
                    if seen.insert(*id) {
                        resolved.push(matcher.clone());
                    }
                }
            }
        }
        resolved
    }
}

// ============================================================================
// Reports
// ============================================================================

/// How a single matcher invocation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvocationStatus {
    /// The action ran and returned this outcome.
    Completed(Outcome),
    /// A middleware stopped the chain before the action.
    Skipped,
    /// A middleware or the action returned an error.
    Failed(String),
    /// The matcher's timeout expired first.
    TimedOut,
    /// The invocation panicked, with the panic message when it had one.
    Panicked(String),
}

impl InvocationStatus {
    /// Returns `true` for the failure variants.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            InvocationStatus::Failed(_) | InvocationStatus::TimedOut | InvocationStatus::Panicked(_)
        )
    }
}

/// One matcher invocation within a publish call.
#[derive(Debug, Clone)]
pub struct InvocationReport {
    pub matcher: MatcherId,
    pub label: String,
    pub priority: i32,
    pub status: InvocationStatus,
}

/// Summary of a publish call.
///
/// Adapters ignore it; it exists for tests and diagnostics.
#[derive(Debug, Clone, Default)]
pub struct PublishReport {
    /// `false` if the bus was stopped and nothing ran.
    pub dispatched: bool,
    /// Every invocation, tier by tier.
    pub invocations: Vec<InvocationReport>,
    /// Number of tiers in which at least one matcher ran.
    pub tiers_run: usize,
    /// Priority of the tier that blocked lower tiers, if any.
    pub blocked_at: Option<i32>,
}

impl PublishReport {
    /// Status of `matcher`'s invocation, if it ran.
    pub fn status_of(&self, matcher: MatcherId) -> Option<&InvocationStatus> {
        self.invocations
            .iter()
            .find(|r| r.matcher == matcher)
            .map(|r| &r.status)
    }

    /// Returns `true` if a blocking matcher stopped dispatch.
    pub fn is_blocked(&self) -> bool {
        self.blocked_at.is_some()
    }

    /// Number of invocations that failed, timed out or panicked.
    pub fn failure_count(&self) -> usize {
        self.invocations
            .iter()
            .filter(|r| r.status.is_failure())
            .count()
    }
}

// ============================================================================
// Registration
// ============================================================================

/// Handle returned by [`EventBus::register`].
///
/// Dropping the handle does not unregister; call
/// [`unregister`](Self::unregister) explicitly.
#[derive(Clone)]
pub struct Registration {
    bus: Weak<BusInner>,
    matcher: MatcherId,
    token: u64,
}

impl Registration {
    /// The registered matcher's id.
    pub fn matcher_id(&self) -> MatcherId {
        self.matcher
    }

    /// Removes the matcher from the bus.
    ///
    /// Idempotent: returns `true` only on the call that actually removed it.
    /// A handle from an earlier registration of the same matcher does not
    /// affect a later one.
    pub fn unregister(&self) -> bool {
        match self.bus.upgrade() {
            Some(inner) => EventBus { inner }.remove(self.matcher, Some(self.token)),
            None => false,
        }
    }

    /// Returns `true` while this registration is live.
    pub fn is_active(&self) -> bool {
        self.bus.upgrade().is_some_and(|inner| {
            inner
                .index
                .read()
                .registered
                .get(&self.matcher)
                .is_some_and(|e| e.token == self.token)
        })
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("matcher", &self.matcher)
            .field("token", &self.token)
            .finish()
    }
}

// ============================================================================
// EventBus
// ============================================================================

struct BusInner {
    index: RwLock<BusIndex>,
    started: AtomicBool,
    next_token: AtomicU64,
    default_timeout: Option<Duration>,
}

/// The event bus. Cloning shares the same bus.
///
/// A new bus is stopped; [`publish`](Self::publish) does nothing until
/// [`start`](Self::start) is called.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    /// Creates an empty, stopped bus.
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Creates a bus that applies `timeout` to matchers that declare none.
    pub fn with_default_timeout(timeout: Duration) -> Self {
        Self::build(Some(timeout))
    }

    fn build(default_timeout: Option<Duration>) -> Self {
        Self {
            inner: Arc::new(BusInner {
                index: RwLock::new(BusIndex::default()),
                started: AtomicBool::new(false),
                next_token: AtomicU64::new(1),
                default_timeout,
            }),
        }
    }

    // ------------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------------

    /// Enables dispatch.
    pub fn start(&self) {
        if !self.inner.started.swap(true, Ordering::AcqRel) {
            info!(matchers = self.matcher_count(), "Event bus started");
        }
    }

    /// Disables dispatch. Publish calls already running finish normally.
    pub fn stop(&self) {
        if self.inner.started.swap(false, Ordering::AcqRel) {
            info!("Event bus stopped");
        }
    }

    pub fn is_started(&self) -> bool {
        self.inner.started.load(Ordering::Acquire)
    }

    // ------------------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------------------

    /// Registers `matcher` under each of its selectors at its priority.
    ///
    /// Registering a matcher that is already registered does nothing and
    /// returns a handle to the existing registration.
    pub fn register(&self, matcher: &Matcher) -> Registration {
        let mut index = self.inner.index.write();

        let token = match index.registered.get(&matcher.id()) {
            Some(existing) => {
                trace!(matcher = %matcher.label(), "Matcher already registered");
                existing.token
            }
            None => {
                let token = self.inner.next_token.fetch_add(1, Ordering::Relaxed);
                index.insert(matcher, token);
                debug!(
                    matcher = %matcher.label(),
                    priority = matcher.priority(),
                    selectors = ?matcher.selectors(),
                    "Matcher registered"
                );
                token
            }
        };

        Registration {
            bus: Arc::downgrade(&self.inner),
            matcher: matcher.id(),
            token,
        }
    }

    /// Removes `matcher` from every tier and selector it was registered under.
    ///
    /// Returns `false` if it was not registered.
    pub fn unregister(&self, matcher: &Matcher) -> bool {
        self.remove(matcher.id(), None)
    }

    fn remove(&self, id: MatcherId, token: Option<u64>) -> bool {
        let removed = self.inner.index.write().remove(id, token);
        if removed {
            debug!(matcher = %id, "Matcher unregistered");
        }
        removed
    }

    // ------------------------------------------------------------------------
    // Introspection
    // ------------------------------------------------------------------------

    /// Number of registered matchers.
    pub fn matcher_count(&self) -> usize {
        self.inner.index.read().registered.len()
    }

    /// Number of distinct priorities with at least one matcher.
    pub fn priority_count(&self) -> usize {
        self.inner.index.read().tiers.len()
    }

    /// Registered priorities, highest first.
    pub fn priorities(&self) -> Vec<i32> {
        self.inner
            .index
            .read()
            .tiers
            .keys()
            .map(|Reverse(p)| *p)
            .collect()
    }

    /// Number of distinct selector types with at least one matcher.
    pub fn event_type_count(&self) -> usize {
        self.inner.index.read().type_counts.len()
    }

    /// Returns `true` if `matcher` is currently registered.
    pub fn contains(&self, matcher: &Matcher) -> bool {
        self.inner
            .index
            .read()
            .registered
            .contains_key(&matcher.id())
    }

    pub fn is_empty(&self) -> bool {
        self.inner.index.read().registered.is_empty()
    }

    /// Returns `true` if at least one matcher is registered.
    pub fn has_matchers(&self) -> bool {
        !self.is_empty()
    }

    // ------------------------------------------------------------------------
    // Publish
    // ------------------------------------------------------------------------

    /// Dispatches `event`, received by `bot`, to every matching matcher.
    ///
    /// Resolves once the last permitted tier has drained. Does nothing if the
    /// bus is stopped.
    pub async fn publish(&self, bot: BoxedBot, event: BoxedEvent) -> PublishReport {
        if !self.is_started() {
            trace!(event = event.event_name(), "Bus not started, dropping event");
            return PublishReport::default();
        }

        let span = tracing::debug_span!(
            "publish",
            event = event.event_name(),
            event_id = event.id(),
            bot_id = %bot.self_id(),
        );
        self.dispatch(bot, event).instrument(span).await
    }

    async fn dispatch(&self, bot: BoxedBot, event: BoxedEvent) -> PublishReport {
        let mut keys = event.lineage();
        keys.push(EventSelector::any_type_id());

        let mut report = PublishReport {
            dispatched: true,
            ..Default::default()
        };

        for priority in self.priorities() {
            let matchers = self.inner.index.read().resolve(priority, &keys);
            if matchers.is_empty() {
                continue;
            }

            report.tiers_run += 1;
            debug!(priority, matchers = matchers.len(), "Running tier");

            let tasks = matchers.iter().map(|matcher| {
                let matcher = matcher.clone();
                let ctx = Context::new(event.clone(), bot.clone());
                let timeout = matcher.timeout().or(self.inner.default_timeout);
                tokio::spawn(invoke(matcher, ctx, timeout).in_current_span())
            });
            let results = join_all(tasks).await;

            let mut blocked = false;
            for (matcher, joined) in matchers.iter().zip(results) {
                let status = match joined {
                    Ok(status) => status,
                    Err(err) if err.is_panic() => {
                        let message = panic_message(err.into_panic());
                        error!(matcher = %matcher.label(), panic = %message, "Matcher panicked");
                        InvocationStatus::Panicked(message)
                    }
                    Err(err) => {
                        error!(matcher = %matcher.label(), error = %err, "Matcher task aborted");
                        InvocationStatus::Failed(err.to_string())
                    }
                };

                if matcher.is_blocking() && status == InvocationStatus::Completed(Outcome::Block) {
                    blocked = true;
                }

                report.invocations.push(InvocationReport {
                    matcher: matcher.id(),
                    label: matcher.label(),
                    priority,
                    status,
                });
            }

            if blocked {
                debug!(priority, "Lower tiers blocked");
                report.blocked_at = Some(priority);
                break;
            }
        }

        report
    }
}

/// Runs one matcher invocation to a status. Errors are logged here.
async fn invoke(matcher: Matcher, ctx: Context, timeout: Option<Duration>) -> InvocationStatus {
    let invocation = ctx.invocation_id();
    let run = matcher.run(ctx);

    let result = match timeout {
        Some(limit) => match tokio::time::timeout(limit, run).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    matcher = %matcher.label(),
                    invocation,
                    timeout_ms = limit.as_millis() as u64,
                    "Matcher timed out"
                );
                return InvocationStatus::TimedOut;
            }
        },
        None => run.await,
    };

    match result {
        Ok(Some(outcome)) => {
            trace!(matcher = %matcher.label(), invocation, %outcome, "Matcher completed");
            InvocationStatus::Completed(outcome)
        }
        Ok(None) => InvocationStatus::Skipped,
        Err(err) => {
            error!(matcher = %matcher.label(), invocation, error = %err, "Matcher failed");
            InvocationStatus::Failed(err.to_string())
        }
    }
}

/// Text of a panic payload; `panic!` produces `&str` or `String`.
fn panic_message(payload: Box<dyn Any + Send>) -> String {
    match payload.downcast::<String>() {
        Ok(message) => *message,
        Err(payload) => match payload.downcast_ref::<&'static str>() {
            Some(message) => (*message).to_string(),
            None => "non-string panic payload".to_string(),
        },
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let index = self.inner.index.read();
        f.debug_struct("EventBus")
            .field("started", &self.is_started())
            .field("matchers", &index.registered.len())
            .field("priorities", &index.tiers.len())
            .field("event_types", &index.type_counts.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framework::builder::{on, on_any};
    use crate::framework::middleware::middleware_fn;
    use crate::testing::{
        GroupMessageEvent, MessageEvent, MockBot, NoticeEvent, PrivateMessageEvent, TestEvent,
        boxed_group_message, boxed_notice, boxed_private_message,
    };
    use std::sync::Mutex;
    use std::sync::atomic::AtomicUsize;

    fn started_bus() -> EventBus {
        let bus = EventBus::new();
        bus.start();
        bus
    }

    fn counter() -> Arc<AtomicUsize> {
        Arc::new(AtomicUsize::new(0))
    }

    fn counting(priority: i32, hits: &Arc<AtomicUsize>) -> Matcher {
        let hits = Arc::clone(hits);
        on::<MessageEvent>()
            .priority(priority)
            .handle(move |_| {
                let hits = Arc::clone(&hits);
                async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                }
            })
            .build()
            .unwrap()
    }

    fn returning(priority: i32, blocking: bool, result: bool, hits: &Arc<AtomicUsize>) -> Matcher {
        let hits = Arc::clone(hits);
        on::<MessageEvent>()
            .priority(priority)
            .block(blocking)
            .handle(move |_| {
                let hits = Arc::clone(&hits);
                async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    result
                }
            })
            .build()
            .unwrap()
    }

    // ------------------------------------------------------------------------
    // Registration & introspection
    // ------------------------------------------------------------------------

    #[test]
    fn test_register_is_idempotent() {
        let bus = EventBus::new();
        let hits = counter();
        let m = counting(0, &hits);

        let first = bus.register(&m);
        let second = bus.register(&m);

        assert_eq!(bus.matcher_count(), 1);
        assert_eq!(first.matcher_id(), second.matcher_id());
        assert!(bus.contains(&m));
    }

    #[test]
    fn test_unregister_twice_is_noop() {
        let bus = EventBus::new();
        let hits = counter();
        let keep = counting(1, &hits);
        let drop_me = counting(2, &hits);
        bus.register(&keep);
        let registration = bus.register(&drop_me);

        assert!(registration.unregister());
        let after_once = (
            bus.matcher_count(),
            bus.priorities(),
            bus.event_type_count(),
        );
        assert!(!registration.unregister());
        let after_twice = (
            bus.matcher_count(),
            bus.priorities(),
            bus.event_type_count(),
        );

        assert_eq!(after_once, after_twice);
        assert_eq!(after_once, (1, vec![1], 1));
        assert!(!bus.unregister(&drop_me));
    }

    #[test]
    fn test_stale_registration_does_not_remove_new_one() {
        let bus = EventBus::new();
        let m = counting(0, &counter());

        let old = bus.register(&m);
        assert!(old.unregister());
        let new = bus.register(&m);

        assert!(!old.unregister());
        assert!(new.is_active());
        assert_eq!(bus.matcher_count(), 1);
    }

    #[test]
    fn test_empty_tier_is_pruned() {
        let bus = EventBus::new();
        let hits = counter();
        bus.register(&counting(3, &hits));
        let seven = counting(7, &hits);
        let registration = bus.register(&seven);

        assert_eq!(bus.priorities(), vec![7, 3]);
        registration.unregister();

        assert_eq!(bus.priorities(), vec![3]);
        assert_eq!(bus.priority_count(), 1);
    }

    #[test]
    fn test_event_type_count_tracks_selectors() {
        let bus = EventBus::new();
        let multi = on::<GroupMessageEvent>()
            .or::<PrivateMessageEvent>()
            .handle(|_| async {})
            .build()
            .unwrap();
        let notice = on::<NoticeEvent>()
            .priority(5)
            .handle(|_| async {})
            .build()
            .unwrap();
        let also_group = on::<GroupMessageEvent>()
            .priority(5)
            .handle(|_| async {})
            .build()
            .unwrap();

        bus.register(&multi);
        bus.register(&notice);
        bus.register(&also_group);
        assert_eq!(bus.event_type_count(), 3);
        assert_eq!(bus.matcher_count(), 3);

        bus.unregister(&multi);
        assert_eq!(bus.event_type_count(), 2);

        bus.unregister(&also_group);
        bus.unregister(&notice);
        assert_eq!(bus.event_type_count(), 0);
        assert_eq!(bus.priority_count(), 0);
        assert!(bus.is_empty());
    }

    #[test]
    fn test_registration_outliving_bus() {
        let registration = {
            let bus = EventBus::new();
            bus.register(&counting(0, &counter()))
        };
        assert!(!registration.unregister());
        assert!(!registration.is_active());
    }

    // ------------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_publish_before_start_is_noop() {
        let bus = EventBus::new();
        let hits = counter();
        bus.register(&counting(0, &hits));

        let report = bus
            .publish(MockBot::boxed("1"), boxed_group_message("hi"))
            .await;

        assert!(!report.dispatched);
        assert_eq!(hits.load(Ordering::SeqCst), 0);

        bus.start();
        bus.publish(MockBot::boxed("1"), boxed_group_message("hi"))
            .await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        bus.stop();
        bus.publish(MockBot::boxed("1"), boxed_group_message("hi"))
            .await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    // ------------------------------------------------------------------------
    // Priority & blocking
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_blocking_false_stops_lower_tiers() {
        let bus = started_bus();
        let high = counter();
        let low = counter();
        bus.register(&returning(10, true, false, &high));
        bus.register(&counting(5, &low));

        let report = bus
            .publish(MockBot::boxed("1"), boxed_group_message("hi"))
            .await;

        assert_eq!(high.load(Ordering::SeqCst), 1);
        assert_eq!(low.load(Ordering::SeqCst), 0);
        assert_eq!(report.blocked_at, Some(10));
        assert_eq!(report.tiers_run, 1);
    }

    #[tokio::test]
    async fn test_blocking_true_or_unit_lets_lower_tiers_run() {
        let bus = started_bus();
        let high = counter();
        let low = counter();
        bus.register(&returning(10, true, true, &high));
        bus.register(&counting(9, &high));
        bus.register(&counting(5, &low));

        let report = bus
            .publish(MockBot::boxed("1"), boxed_group_message("hi"))
            .await;

        assert_eq!(high.load(Ordering::SeqCst), 2);
        assert_eq!(low.load(Ordering::SeqCst), 1);
        assert!(!report.is_blocked());
        assert_eq!(report.tiers_run, 3);
    }

    #[tokio::test]
    async fn test_false_without_block_flag_does_not_block() {
        let bus = started_bus();
        let high = counter();
        let low = counter();
        bus.register(&returning(10, false, false, &high));
        bus.register(&counting(5, &low));

        let report = bus
            .publish(MockBot::boxed("1"), boxed_group_message("hi"))
            .await;

        assert_eq!(high.load(Ordering::SeqCst), 1);
        assert_eq!(low.load(Ordering::SeqCst), 1);
        assert!(!report.is_blocked());
    }

    #[tokio::test]
    async fn test_block_finishes_its_own_tier() {
        let bus = started_bus();
        let same_tier = counter();
        let lower = counter();
        bus.register(&returning(10, true, false, &counter()));
        bus.register(&counting(10, &same_tier));
        bus.register(&counting(1, &lower));

        bus.publish(MockBot::boxed("1"), boxed_group_message("hi"))
            .await;

        assert_eq!(same_tier.load(Ordering::SeqCst), 1);
        assert_eq!(lower.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_tiers_run_in_descending_order() {
        let bus = started_bus();
        let order = Arc::new(Mutex::new(Vec::new()));

        for priority in [0, 20, -5, 7] {
            let order = Arc::clone(&order);
            on::<MessageEvent>()
                .priority(priority)
                .handle(move |_| {
                    let order = Arc::clone(&order);
                    async move {
                        order.lock().unwrap().push(priority);
                    }
                })
                .commit(&bus)
                .unwrap();
        }

        bus.publish(MockBot::boxed("1"), boxed_group_message("hi"))
            .await;

        assert_eq!(*order.lock().unwrap(), vec![20, 7, 0, -5]);
    }

    #[tokio::test]
    async fn test_skipped_blocking_matcher_does_not_block() {
        let bus = started_bus();
        let low = counter();
        on::<MessageEvent>()
            .priority(10)
            .block(true)
            .with(middleware_fn(|ctx: Context| async move { Ok((ctx, false)) }))
            .handle(|_| async { false })
            .commit(&bus)
            .unwrap();
        bus.register(&counting(0, &low));

        let report = bus
            .publish(MockBot::boxed("1"), boxed_group_message("hi"))
            .await;

        assert_eq!(low.load(Ordering::SeqCst), 1);
        assert_eq!(report.invocations[0].status, InvocationStatus::Skipped);
    }

    // ------------------------------------------------------------------------
    // Polymorphic dispatch
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_supertype_receives_subtypes() {
        let bus = started_bus();
        let message = counter();
        let group = counter();
        let private = counter();

        for (hits, matcher) in [
            (&message, on::<MessageEvent>()),
            (&group, on::<GroupMessageEvent>()),
            (&private, on::<PrivateMessageEvent>()),
        ] {
            let hits = Arc::clone(hits);
            matcher
                .handle(move |_| {
                    let hits = Arc::clone(&hits);
                    async move {
                        hits.fetch_add(1, Ordering::SeqCst);
                    }
                })
                .commit(&bus)
                .unwrap();
        }

        bus.publish(MockBot::boxed("1"), boxed_group_message("a"))
            .await;
        bus.publish(MockBot::boxed("1"), boxed_private_message("b"))
            .await;
        bus.publish(MockBot::boxed("1"), boxed_notice()).await;

        assert_eq!(message.load(Ordering::SeqCst), 2);
        assert_eq!(group.load(Ordering::SeqCst), 1);
        assert_eq!(private.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_multi_selector_matcher_runs_once() {
        let bus = started_bus();
        let hits = counter();
        let hits_in = Arc::clone(&hits);
        on::<MessageEvent>()
            .or::<GroupMessageEvent>()
            .handle(move |_| {
                let hits = Arc::clone(&hits_in);
                async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                }
            })
            .commit(&bus)
            .unwrap();

        let report = bus
            .publish(MockBot::boxed("1"), boxed_group_message("hi"))
            .await;

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(report.invocations.len(), 1);
    }

    #[tokio::test]
    async fn test_any_selector_receives_everything() {
        let bus = started_bus();
        let hits = counter();
        let hits_in = Arc::clone(&hits);
        on_any()
            .handle(move |_| {
                let hits = Arc::clone(&hits_in);
                async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                }
            })
            .commit(&bus)
            .unwrap();

        bus.publish(MockBot::boxed("1"), boxed_group_message("a"))
            .await;
        bus.publish(MockBot::boxed("1"), boxed_notice()).await;
        bus.publish(MockBot::boxed("1"), TestEvent::boxed("c"))
            .await;

        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    // ------------------------------------------------------------------------
    // Isolation
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_contexts_are_isolated() {
        #[derive(Debug, Clone, PartialEq)]
        struct Mark(&'static str);

        let bus = started_bus();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for label in ["left", "right"] {
            let seen = Arc::clone(&seen);
            on::<MessageEvent>()
                .with(middleware_fn(move |ctx: Context| async move {
                    tokio::task::yield_now().await;
                    Ok((ctx.with(Mark(label)), true))
                }))
                .handle(move |ctx| {
                    let seen = Arc::clone(&seen);
                    async move {
                        seen.lock()
                            .unwrap()
                            .push((label, ctx.get::<Mark>().cloned(), ctx.extension_count()));
                    }
                })
                .commit(&bus)
                .unwrap();
        }

        bus.publish(MockBot::boxed("1"), boxed_group_message("hi"))
            .await;

        let mut seen = seen.lock().unwrap().clone();
        seen.sort_by_key(|(label, _, _)| *label);
        assert_eq!(
            seen,
            vec![
                ("left", Some(Mark("left")), 1),
                ("right", Some(Mark("right")), 1),
            ]
        );
    }

    #[tokio::test]
    async fn test_tier_runs_concurrently() {
        let bus = started_bus();
        for _ in 0..4 {
            on::<MessageEvent>()
                .handle(|_| async {
                    tokio::time::sleep(Duration::from_millis(100)).await;
                })
                .commit(&bus)
                .unwrap();
        }

        let started = std::time::Instant::now();
        bus.publish(MockBot::boxed("1"), boxed_group_message("hi"))
            .await;

        assert!(started.elapsed() < Duration::from_millis(350));
    }

    // ------------------------------------------------------------------------
    // Failures
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_timeout_is_isolated() {
        let bus = started_bus();
        let slow = on::<MessageEvent>()
            .timeout(Duration::from_millis(10))
            .handle(|_| async {
                tokio::time::sleep(Duration::from_millis(100)).await;
                false
            })
            .build()
            .unwrap();
        let quick_hits = counter();
        let quick_in = Arc::clone(&quick_hits);
        let quick = on::<MessageEvent>()
            .handle(move |_| {
                let hits = Arc::clone(&quick_in);
                async move {
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    hits.fetch_add(1, Ordering::SeqCst);
                }
            })
            .build()
            .unwrap();
        bus.register(&slow);
        bus.register(&quick);

        let report = bus
            .publish(MockBot::boxed("1"), boxed_group_message("hi"))
            .await;

        assert_eq!(report.status_of(slow.id()), Some(&InvocationStatus::TimedOut));
        assert_eq!(
            report.status_of(quick.id()),
            Some(&InvocationStatus::Completed(Outcome::Continue))
        );
        assert_eq!(quick_hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_timeout_does_not_block() {
        let bus = started_bus();
        let low = counter();
        on::<MessageEvent>()
            .priority(10)
            .block(true)
            .timeout(Duration::from_millis(10))
            .handle(|_| async {
                tokio::time::sleep(Duration::from_millis(100)).await;
                false
            })
            .commit(&bus)
            .unwrap();
        bus.register(&counting(0, &low));

        let report = bus
            .publish(MockBot::boxed("1"), boxed_group_message("hi"))
            .await;

        assert_eq!(low.load(Ordering::SeqCst), 1);
        assert!(!report.is_blocked());
    }

    #[tokio::test]
    async fn test_default_timeout_applies() {
        let bus = EventBus::with_default_timeout(Duration::from_millis(10));
        bus.start();
        let m = on::<MessageEvent>()
            .handle(|_| async {
                tokio::time::sleep(Duration::from_millis(100)).await;
            })
            .build()
            .unwrap();
        bus.register(&m);

        let report = bus
            .publish(MockBot::boxed("1"), boxed_group_message("hi"))
            .await;
        assert_eq!(report.status_of(m.id()), Some(&InvocationStatus::TimedOut));
    }

    #[tokio::test]
    async fn test_errors_and_panics_are_contained() {
        let bus = started_bus();
        let failing = on::<MessageEvent>()
            .handle(|_| async { Err::<(), _>("boom") })
            .build()
            .unwrap();
        let panicking = on::<MessageEvent>()
            .handle(|ctx| async move {
                if ctx.plain_text().is_some() {
                    panic!("handler bug");
                }
            })
            .build()
            .unwrap();
        let healthy_hits = counter();
        let healthy = counting(0, &healthy_hits);
        let lower_hits = counter();

        bus.register(&failing);
        bus.register(&panicking);
        bus.register(&healthy);
        bus.register(&counting(-1, &lower_hits));

        let report = bus
            .publish(MockBot::boxed("1"), boxed_group_message("hi"))
            .await;

        assert_eq!(
            report.status_of(failing.id()),
            Some(&InvocationStatus::Failed("boom".into()))
        );
        assert_eq!(
            report.status_of(panicking.id()),
            Some(&InvocationStatus::Panicked("handler bug".into()))
        );
        assert_eq!(healthy_hits.load(Ordering::SeqCst), 1);
        assert_eq!(lower_hits.load(Ordering::SeqCst), 1);
        assert_eq!(report.failure_count(), 2);
    }

    #[tokio::test]
    async fn test_panic_report_carries_message() {
        let bus = started_bus();
        let formatted = on::<MessageEvent>()
            .handle(|ctx| async move {
                if let Some(text) = ctx.plain_text() {
                    panic!("cannot handle {text:?}");
                }
            })
            .build()
            .unwrap();
        bus.register(&formatted);

        let report = bus
            .publish(MockBot::boxed("1"), boxed_group_message("hi"))
            .await;
        assert_eq!(
            report.status_of(formatted.id()),
            Some(&InvocationStatus::Panicked("cannot handle \"hi\"".into()))
        );
        assert!(report.status_of(formatted.id()).unwrap().is_failure());
    }

    #[test]
    fn test_panic_message_payloads() {
        assert_eq!(panic_message(Box::new("static")), "static");
        assert_eq!(panic_message(Box::new(String::from("owned"))), "owned");
        assert_eq!(panic_message(Box::new(7_u8)), "non-string panic payload");
    }

    // ------------------------------------------------------------------------
    // End-to-end
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_claiming_matcher_suppresses_logger() {
        let bus = started_bus();
        let m1_hits = counter();
        let m2_hits = counter();
        let m1 = returning(5, true, false, &m1_hits);
        let m2 = counting(1, &m2_hits);
        bus.register(&m1);
        bus.register(&m2);

        bus.publish(MockBot::boxed("1"), boxed_private_message("/cmd"))
            .await;

        assert_eq!(m1_hits.load(Ordering::SeqCst), 1);
        assert_eq!(m2_hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_subtype_and_supertype_in_same_tier() {
        let bus = started_bus();
        let m3_hits = counter();
        let m4_hits = counter();

        let m3_in = Arc::clone(&m3_hits);
        on::<GroupMessageEvent>()
            .handle(move |_| {
                let hits = Arc::clone(&m3_in);
                async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                }
            })
            .commit(&bus)
            .unwrap();
        bus.register(&counting(0, &m4_hits));

        bus.publish(MockBot::boxed("1"), boxed_group_message("hi"))
            .await;

        assert_eq!(m3_hits.load(Ordering::SeqCst), 1);
        assert_eq!(m4_hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_concurrent_register_and_publish() {
        let bus = started_bus();
        let hits = counter();

        let publishers: Vec<_> = (0..8)
            .map(|_| {
                let bus = bus.clone();
                tokio::spawn(async move {
                    for _ in 0..20 {
                        bus.publish(MockBot::boxed("1"), boxed_group_message("hi"))
                            .await;
                    }
                })
            })
            .collect();

        let registrations: Vec<_> = (0..50)
            .map(|i| bus.register(&counting(i % 5, &hits)))
            .collect();
        for registration in &registrations {
            registration.unregister();
        }
        for publisher in publishers {
            publisher.await.unwrap();
        }

        assert!(bus.is_empty());
        assert_eq!(bus.priority_count(), 0);
        assert_eq!(bus.event_type_count(), 0);
    }
}
