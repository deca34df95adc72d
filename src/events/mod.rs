//! Event system: kinds, context payloads, the bus, and the journal.
//!
//! The bus is the only channel between combatants, abilities and the turn
//! driver. Nothing calls an ability directly; everything reacts to events.

pub mod bus;
pub mod event;
pub mod journal;

pub use bus::{
    handler_fn, EventBus, EventHandler, Subscription, EVENT_LOG_TARGET, MAX_DISPATCH_DEPTH,
};
pub use event::{
    EventContext, EventKind, HINT_PREFIX, PHASE_LANE_REBUILD, PHASE_SLOT_EFFECT,
    PHASE_TURN_START_RANDOMIZE,
};
pub use journal::{EventJournal, EventLine, JournalEntry, JOURNAL_PRIORITY};
