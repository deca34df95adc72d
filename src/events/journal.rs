//! Event log lines and the recording journal.
//!
//! `EventLine` formats an event as one log line, lazily, so the bus can hand
//! it to `tracing` without paying for formatting when the level is off.
//!
//! `EventJournal` is a ready-made read-only subscriber that keeps every
//! event with a sequence number. Presentation layers and tests read it
//! instead of wiring their own subscribers.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use im::Vector;

use super::bus::{EventBus, EventHandler, Subscription};
use super::event::{EventContext, EventKind};
use crate::core::error::HandlerError;
use crate::core::state::World;

/// Priority band of the journal. Records before any other subscriber, so
/// entries appear in publish order.
pub const JOURNAL_PRIORITY: i32 = i32::MAX;

/// One event formatted as `[KIND] source -> target (amount)`.
pub struct EventLine<'a> {
    world: &'a World,
    kind: EventKind,
    ctx: &'a EventContext,
}

impl<'a> EventLine<'a> {
    #[must_use]
    pub fn new(world: &'a World, kind: EventKind, ctx: &'a EventContext) -> Self {
        Self { world, kind, ctx }
    }

    fn side_name(&self, side: Option<crate::core::PlayerId>) -> &str {
        side.map_or("-", |s| self.world.player(s).name.as_str())
    }
}

impl fmt::Display for EventLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ctx = self.ctx;
        let tag = self.kind.tag();
        let source = self.world.label(ctx.source);
        match self.kind {
            EventKind::TurnStart => {
                write!(f, "[{tag}] {} {}", self.side_name(ctx.owner), ctx.phase)
            }
            EventKind::TurnEnd => write!(f, "[{tag}] {}", self.side_name(ctx.owner)),
            EventKind::Flip => {
                let side = ctx
                    .source_id()
                    .and_then(|id| self.world.card(id))
                    .map_or_else(|| "?".to_string(), |card| card.side().to_string());
                write!(f, "[{tag}] {source} -> {side}")
            }
            EventKind::AttackDeclared => write!(
                f,
                "[{tag}] {source} -> {} (proposed:{})",
                self.world.label(ctx.target),
                ctx.amount
            ),
            EventKind::AttackResolved => {
                let target = match ctx.target {
                    Some(_) => self.world.label(ctx.target),
                    None => format!("player:{}", self.side_name(ctx.opponent)),
                };
                write!(f, "[{tag}] {source} -> {target} (final:{})", ctx.amount)
            }
            EventKind::CardPlayed => write!(f, "[{tag}] {source}"),
            EventKind::Info => write!(f, "[{tag}] {}", ctx.phase),
            EventKind::Custom => write!(
                f,
                "[{tag}] {source} -> {} ({}) {}",
                self.world.label(ctx.target),
                ctx.amount,
                ctx.phase
            ),
        }
    }
}

/// A recorded event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JournalEntry {
    pub seq: u64,
    pub kind: EventKind,
    pub ctx: EventContext,
    pub line: String,
}

#[derive(Default)]
struct Recorder {
    entries: RefCell<Vector<JournalEntry>>,
    next_seq: Cell<u64>,
}

impl EventHandler for Recorder {
    fn handle(
        &self,
        _bus: &EventBus,
        world: &mut World,
        kind: EventKind,
        ctx: &EventContext,
    ) -> Result<(), HandlerError> {
        let seq = self.next_seq.get();
        self.next_seq.set(seq + 1);
        let line = EventLine::new(world, kind, ctx).to_string();
        self.entries.borrow_mut().push_back(JournalEntry {
            seq,
            kind,
            ctx: ctx.clone(),
            line,
        });
        Ok(())
    }
}

/// Records every event published on a bus while it is alive.
pub struct EventJournal {
    recorder: Rc<Recorder>,
    _subscription: Subscription,
}

impl EventJournal {
    /// Subscribe a new journal to every event kind on `bus`.
    #[must_use]
    pub fn attach(bus: &EventBus) -> Self {
        let recorder = Rc::new(Recorder::default());
        let handler: Rc<dyn EventHandler> = recorder.clone();
        let subscription = bus.scoped(&EventKind::ALL, JOURNAL_PRIORITY, handler);
        Self {
            recorder,
            _subscription: subscription,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.recorder.entries.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All entries so far. O(1): the journal is a persistent vector.
    #[must_use]
    pub fn snapshot(&self) -> Vector<JournalEntry> {
        self.recorder.entries.borrow().clone()
    }

    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.recorder
            .entries
            .borrow()
            .iter()
            .map(|e| e.line.clone())
            .collect()
    }

    /// Entries of one kind, in publish order.
    #[must_use]
    pub fn of_kind(&self, kind: EventKind) -> Vec<JournalEntry> {
        self.recorder
            .entries
            .borrow()
            .iter()
            .filter(|e| e.kind == kind)
            .cloned()
            .collect()
    }

    /// Hint messages, in publish order.
    #[must_use]
    pub fn hints(&self) -> Vec<String> {
        self.recorder
            .entries
            .borrow()
            .iter()
            .filter(|e| e.kind == EventKind::Info)
            .filter_map(|e| e.ctx.hint_text().map(str::to_string))
            .collect()
    }

    pub fn clear(&self) {
        self.recorder.entries.borrow_mut().clear();
    }
}

impl fmt::Debug for EventJournal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventJournal")
            .field("entries", &self.len())
            .finish()
    }
}
