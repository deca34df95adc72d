//! Event bus.
//!
//! The bus is a routing table of subscriber lists keyed by `EventKind`. It
//! owns no battle state: handlers receive the `World` by mutable reference
//! for the duration of each call.
//!
//! ## Dispatch rules
//!
//! - `publish` dispatches over a snapshot of the subscriber list taken when
//!   the call begins. Handlers may subscribe, unsubscribe (themselves
//!   included) and publish again while dispatch is running; changes apply to
//!   the next publish.
//! - Subscribers run by priority band (higher first), then in subscription
//!   order. Most subscribers use band 0.
//! - A handler returning `Err` or panicking is logged; the remaining handlers
//!   still run and the publisher never sees the failure.
//! - A context missing a field its kind requires is logged and dropped.
//!
//! `EventBus` is a cheap handle: clones share the same routing table.
//!
//! ```
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! use bifronte::core::{MatchConfig, World};
//! use bifronte::events::{handler_fn, EventBus, EventContext, EventKind};
//!
//! let bus = EventBus::new();
//! let mut world = World::from_config(&MatchConfig::default());
//!
//! let seen = Rc::new(Cell::new(0));
//! let counter = Rc::clone(&seen);
//! bus.subscribe(EventKind::Info, handler_fn(move |_, _, _, _| {
//!     counter.set(counter.get() + 1);
//!     Ok(())
//! }));
//!
//! bus.publish(&mut world, EventKind::Info, &EventContext::new().with_phase("hello"));
//! assert_eq!(seen.get(), 1);
//! ```

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::panic::{self, AssertUnwindSafe};
use std::rc::{Rc, Weak};

use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use tracing::{error, info, warn};

use super::event::{EventContext, EventKind};
use super::journal::EventLine;
use crate::core::error::HandlerError;
use crate::core::state::World;

/// `tracing` target every published event is mirrored to.
pub const EVENT_LOG_TARGET: &str = "bifronte::events";

/// Deepest allowed chain of publishes made from inside handlers.
pub const MAX_DISPATCH_DEPTH: usize = 32;

/// A subscriber callback.
pub trait EventHandler {
    fn handle(
        &self,
        bus: &EventBus,
        world: &mut World,
        kind: EventKind,
        ctx: &EventContext,
    ) -> Result<(), HandlerError>;
}

impl<F> EventHandler for F
where
    F: Fn(&EventBus, &mut World, EventKind, &EventContext) -> Result<(), HandlerError>,
{
    fn handle(
        &self,
        bus: &EventBus,
        world: &mut World,
        kind: EventKind,
        ctx: &EventContext,
    ) -> Result<(), HandlerError> {
        self(bus, world, kind, ctx)
    }
}

/// Wrap a closure as a shareable handler.
pub fn handler_fn<F>(f: F) -> Rc<dyn EventHandler>
where
    F: Fn(&EventBus, &mut World, EventKind, &EventContext) -> Result<(), HandlerError> + 'static,
{
    Rc::new(f)
}

fn same_handler(a: &Rc<dyn EventHandler>, b: &Rc<dyn EventHandler>) -> bool {
    Rc::as_ptr(a) as *const () == Rc::as_ptr(b) as *const ()
}

#[derive(Clone)]
struct Subscriber {
    priority: i32,
    handler: Rc<dyn EventHandler>,
}

#[derive(Default)]
struct Routes {
    by_kind: RefCell<FxHashMap<EventKind, Vec<Subscriber>>>,
    depth: Cell<usize>,
}

/// Restores the dispatch depth even if something unwinds past `publish`.
struct DepthGuard<'a> {
    depth: &'a Cell<usize>,
    restore: usize,
}

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        self.depth.set(self.restore);
    }
}

/// Synchronous publish/subscribe dispatcher.
#[derive(Clone, Default)]
pub struct EventBus {
    routes: Rc<Routes>,
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe `handler` to `kind` in the default band.
    ///
    /// Returns `false` if the handler was already subscribed to `kind`.
    pub fn subscribe(&self, kind: EventKind, handler: Rc<dyn EventHandler>) -> bool {
        self.subscribe_with_priority(kind, 0, handler)
    }

    /// Subscribe `handler` to `kind` in the given priority band.
    ///
    /// Within a band, earlier subscribers run first. Idempotent per handler
    /// and kind: a second subscription is ignored and keeps the first band.
    pub fn subscribe_with_priority(
        &self,
        kind: EventKind,
        priority: i32,
        handler: Rc<dyn EventHandler>,
    ) -> bool {
        let mut by_kind = self.routes.by_kind.borrow_mut();
        let list = by_kind.entry(kind).or_default();
        if list.iter().any(|s| same_handler(&s.handler, &handler)) {
            return false;
        }
        let at = list
            .iter()
            .position(|s| s.priority < priority)
            .unwrap_or(list.len());
        list.insert(at, Subscriber { priority, handler });
        true
    }

    /// Remove `handler` from `kind`. Returns `false` if it was not subscribed.
    pub fn unsubscribe(&self, kind: EventKind, handler: &Rc<dyn EventHandler>) -> bool {
        // The removed entry is dropped after the borrow ends, so a handler
        // whose drop touches the bus cannot re-enter a live borrow.
        let removed = {
            let mut by_kind = self.routes.by_kind.borrow_mut();
            let Some(list) = by_kind.get_mut(&kind) else {
                return false;
            };
            list.iter()
                .position(|s| same_handler(&s.handler, handler))
                .map(|at| list.remove(at))
        };
        removed.is_some()
    }

    /// Subscribe `handler` to every kind in `kinds` and return a guard that
    /// unsubscribes it when dropped.
    pub fn scoped(
        &self,
        kinds: &[EventKind],
        priority: i32,
        handler: Rc<dyn EventHandler>,
    ) -> Subscription {
        let mut subscribed = SmallVec::new();
        for &kind in kinds {
            if self.subscribe_with_priority(kind, priority, Rc::clone(&handler)) {
                subscribed.push(kind);
            }
        }
        Subscription {
            routes: Rc::downgrade(&self.routes),
            kinds: subscribed,
            handler,
        }
    }

    /// Is `handler` subscribed to `kind`?
    #[must_use]
    pub fn is_subscribed(&self, kind: EventKind, handler: &Rc<dyn EventHandler>) -> bool {
        self.routes
            .by_kind
            .borrow()
            .get(&kind)
            .is_some_and(|list| list.iter().any(|s| same_handler(&s.handler, handler)))
    }

    #[must_use]
    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.routes.by_kind.borrow().get(&kind).map_or(0, Vec::len)
    }

    /// Drop every subscription. Used between matches.
    pub fn clear(&self) {
        let drained = std::mem::take(&mut *self.routes.by_kind.borrow_mut());
        drop(drained);
    }

    /// Publish an event to every handler subscribed to `kind` right now.
    ///
    /// Returns once all handlers, and everything they published in turn,
    /// have completed.
    pub fn publish(&self, world: &mut World, kind: EventKind, ctx: &EventContext) {
        if let Err(violation) = ctx.validate(kind) {
            warn!(%violation, "dropping malformed event");
            return;
        }

        let depth = self.routes.depth.get();
        if depth >= MAX_DISPATCH_DEPTH {
            warn!(?kind, depth, "dispatch depth limit reached, event dropped");
            return;
        }

        info!(target: EVENT_LOG_TARGET, "{}", EventLine::new(world, kind, ctx));

        let snapshot: SmallVec<[Subscriber; 8]> = match self.routes.by_kind.borrow().get(&kind) {
            Some(list) => list.iter().cloned().collect(),
            None => return,
        };

        self.routes.depth.set(depth + 1);
        let _guard = DepthGuard {
            depth: &self.routes.depth,
            restore: depth,
        };

        for subscriber in snapshot {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                subscriber.handler.handle(self, world, kind, ctx)
            }));
            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(err)) => warn!(?kind, error = %err, "event handler failed"),
                Err(payload) => {
                    error!(?kind, panic = panic_message(&*payload), "event handler panicked");
                }
            }
        }
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let by_kind = self.routes.by_kind.borrow();
        let mut counts: Vec<_> = by_kind.iter().map(|(k, v)| (*k, v.len())).collect();
        counts.sort_by_key(|(k, _)| *k as u8);
        f.debug_struct("EventBus")
            .field("subscribers", &counts)
            .field("depth", &self.routes.depth.get())
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("<non-string panic>")
}

/// Scoped subscription. Unsubscribes from every kind it covers on drop.
///
/// Holds only a weak link to the bus, so dropping it after the bus is gone
/// does nothing.
pub struct Subscription {
    routes: Weak<Routes>,
    kinds: SmallVec<[EventKind; 2]>,
    handler: Rc<dyn EventHandler>,
}

impl Subscription {
    /// Kinds this guard is subscribed to.
    #[must_use]
    pub fn kinds(&self) -> &[EventKind] {
        &self.kinds
    }

    /// Unsubscribe now.
    pub fn cancel(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(routes) = self.routes.upgrade() {
            let bus = EventBus { routes };
            for kind in self.kinds.drain(..) {
                bus.unsubscribe(kind, &self.handler);
            }
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("kinds", &self.kinds)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::CombatantRef;
    use crate::core::{EntityId, MatchConfig, PlayerId};

    fn world() -> World {
        World::from_config(&MatchConfig::default())
    }

    type Log = Rc<RefCell<Vec<&'static str>>>;

    fn recorder(log: &Log, name: &'static str) -> Rc<dyn EventHandler> {
        let log = Rc::clone(log);
        handler_fn(move |_, _, _, _| {
            log.borrow_mut().push(name);
            Ok(())
        })
    }

    fn info() -> EventContext {
        EventContext::new().with_phase("test")
    }

    #[test]
    fn test_fan_out_in_subscription_order() {
        let bus = EventBus::new();
        let mut world = world();
        let log: Log = Rc::default();

        for name in ["a", "b", "c", "d"] {
            bus.subscribe(EventKind::Info, recorder(&log, name));
        }
        bus.publish(&mut world, EventKind::Info, &info());

        assert_eq!(*log.borrow(), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_subscribe_is_idempotent() {
        let bus = EventBus::new();
        let mut world = world();
        let log: Log = Rc::default();
        let handler = recorder(&log, "a");

        assert!(bus.subscribe(EventKind::Info, Rc::clone(&handler)));
        assert!(!bus.subscribe(EventKind::Info, Rc::clone(&handler)));
        assert_eq!(bus.subscriber_count(EventKind::Info), 1);

        bus.publish(&mut world, EventKind::Info, &info());
        assert_eq!(log.borrow().len(), 1);
    }

    #[test]
    fn test_unsubscribe_absent_is_noop() {
        let bus = EventBus::new();
        let log: Log = Rc::default();
        let handler = recorder(&log, "a");

        assert!(!bus.unsubscribe(EventKind::Flip, &handler));
        bus.subscribe(EventKind::Info, Rc::clone(&handler));
        assert!(!bus.unsubscribe(EventKind::Flip, &handler));
        assert!(bus.unsubscribe(EventKind::Info, &handler));
        assert!(!bus.is_subscribed(EventKind::Info, &handler));
    }

    #[test]
    fn test_only_matching_kind_is_dispatched() {
        let bus = EventBus::new();
        let mut world = world();
        let log: Log = Rc::default();
        bus.subscribe(EventKind::Custom, recorder(&log, "custom"));

        bus.publish(&mut world, EventKind::Info, &info());
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_priority_bands() {
        let bus = EventBus::new();
        let mut world = world();
        let log: Log = Rc::default();

        bus.subscribe_with_priority(EventKind::Info, i32::MIN, recorder(&log, "last"));
        bus.subscribe(EventKind::Info, recorder(&log, "mid-1"));
        bus.subscribe_with_priority(EventKind::Info, 10, recorder(&log, "first"));
        bus.subscribe(EventKind::Info, recorder(&log, "mid-2"));

        bus.publish(&mut world, EventKind::Info, &info());
        assert_eq!(*log.borrow(), vec!["first", "mid-1", "mid-2", "last"]);
    }

    #[test]
    fn test_unsubscribe_mid_dispatch_keeps_snapshot() {
        let bus = EventBus::new();
        let mut world = world();
        let log: Log = Rc::default();

        let victim = recorder(&log, "victim");
        let killer = {
            let log = Rc::clone(&log);
            let victim = Rc::clone(&victim);
            handler_fn(move |bus, _, kind, _| {
                log.borrow_mut().push("killer");
                bus.unsubscribe(kind, &victim);
                Ok(())
            })
        };
        bus.subscribe(EventKind::Info, killer);
        bus.subscribe(EventKind::Info, victim);

        bus.publish(&mut world, EventKind::Info, &info());
        assert_eq!(*log.borrow(), vec!["killer", "victim"]);

        log.borrow_mut().clear();
        bus.publish(&mut world, EventKind::Info, &info());
        assert_eq!(*log.borrow(), vec!["killer"]);
    }

    #[test]
    fn test_handler_can_unsubscribe_itself() {
        let bus = EventBus::new();
        let mut world = world();
        let log: Log = Rc::default();

        let slot: Rc<RefCell<Option<Rc<dyn EventHandler>>>> = Rc::default();
        let once = {
            let log = Rc::clone(&log);
            let slot = Rc::clone(&slot);
            handler_fn(move |bus, _, kind, _| {
                log.borrow_mut().push("once");
                if let Some(me) = slot.borrow_mut().take() {
                    bus.unsubscribe(kind, &me);
                }
                Ok(())
            })
        };
        *slot.borrow_mut() = Some(Rc::clone(&once));
        bus.subscribe(EventKind::Info, once);
        bus.subscribe(EventKind::Info, recorder(&log, "after"));

        bus.publish(&mut world, EventKind::Info, &info());
        bus.publish(&mut world, EventKind::Info, &info());
        assert_eq!(*log.borrow(), vec!["once", "after", "after"]);
    }

    #[test]
    fn test_subscribe_mid_dispatch_applies_next_publish() {
        let bus = EventBus::new();
        let mut world = world();
        let log: Log = Rc::default();

        let late = recorder(&log, "late");
        let adder = {
            let log = Rc::clone(&log);
            handler_fn(move |bus, _, kind, _| {
                log.borrow_mut().push("adder");
                bus.subscribe(kind, Rc::clone(&late));
                Ok(())
            })
        };
        bus.subscribe(EventKind::Info, adder);

        bus.publish(&mut world, EventKind::Info, &info());
        assert_eq!(*log.borrow(), vec!["adder"]);

        bus.publish(&mut world, EventKind::Info, &info());
        assert_eq!(*log.borrow(), vec!["adder", "adder", "late"]);
    }

    #[test]
    fn test_failures_are_isolated() {
        let bus = EventBus::new();
        let mut world = world();
        let log: Log = Rc::default();

        bus.subscribe(
            EventKind::Info,
            handler_fn(|_, _, _, _| Err(HandlerError::Failed("boom".into()))),
        );
        bus.subscribe(EventKind::Info, handler_fn(|_, _, _, _| panic!("handler exploded")));
        bus.subscribe(EventKind::Info, recorder(&log, "survivor"));

        bus.publish(&mut world, EventKind::Info, &info());
        assert_eq!(*log.borrow(), vec!["survivor"]);

        // The bus is still usable afterwards.
        bus.publish(&mut world, EventKind::Info, &info());
        assert_eq!(log.borrow().len(), 2);
    }

    #[test]
    fn test_malformed_event_is_dropped() {
        let bus = EventBus::new();
        let mut world = world();
        let log: Log = Rc::default();
        bus.subscribe(EventKind::AttackDeclared, recorder(&log, "attack"));

        let no_target = EventContext::between(PlayerId::HUMAN, PlayerId::AI)
            .with_source(CombatantRef::Card(EntityId(1)))
            .with_amount(3);
        bus.publish(&mut world, EventKind::AttackDeclared, &no_target);

        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_runaway_recursion_is_capped() {
        let bus = EventBus::new();
        let mut world = world();
        let calls = Rc::new(Cell::new(0usize));

        let counter = Rc::clone(&calls);
        bus.subscribe(
            EventKind::Custom,
            handler_fn(move |bus, world, kind, ctx| {
                counter.set(counter.get() + 1);
                bus.publish(world, kind, ctx);
                Ok(())
            }),
        );
        bus.publish(&mut world, EventKind::Custom, &EventContext::new());

        assert_eq!(calls.get(), MAX_DISPATCH_DEPTH);
        assert_eq!(bus.routes.depth.get(), 0);
    }

    #[test]
    fn test_scoped_subscription_unsubscribes_on_drop() {
        let bus = EventBus::new();
        let mut world = world();
        let log: Log = Rc::default();

        let guard = bus.scoped(&[EventKind::Info, EventKind::Custom], 0, recorder(&log, "scoped"));
        assert_eq!(guard.kinds(), &[EventKind::Info, EventKind::Custom]);
        assert_eq!(bus.subscriber_count(EventKind::Custom), 1);

        bus.publish(&mut world, EventKind::Info, &info());
        drop(guard);
        bus.publish(&mut world, EventKind::Info, &info());

        assert_eq!(*log.borrow(), vec!["scoped"]);
        assert_eq!(bus.subscriber_count(EventKind::Info), 0);
        assert_eq!(bus.subscriber_count(EventKind::Custom), 0);
    }

    #[test]
    fn test_scoped_outliving_bus_is_harmless() {
        let log: Log = Rc::default();
        let guard = {
            let bus = EventBus::new();
            bus.scoped(&[EventKind::Info], 0, recorder(&log, "x"))
        };
        guard.cancel();
    }

    #[test]
    fn test_clear() {
        let bus = EventBus::new();
        let log: Log = Rc::default();
        bus.subscribe(EventKind::Info, recorder(&log, "a"));
        bus.subscribe(EventKind::Flip, recorder(&log, "b"));

        bus.clear();
        assert_eq!(bus.subscriber_count(EventKind::Info), 0);
        assert_eq!(bus.subscriber_count(EventKind::Flip), 0);
    }

    #[test]
    fn test_clones_share_routes() {
        let bus = EventBus::new();
        let other = bus.clone();
        let log: Log = Rc::default();

        other.subscribe(EventKind::Info, recorder(&log, "a"));
        assert_eq!(bus.subscriber_count(EventKind::Info), 1);
    }
}
