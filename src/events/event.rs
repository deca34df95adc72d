//! Event kinds and the context payload carried with every event.
//!
//! Events are point-in-time facts. The bus dispatches them synchronously; none
//! are queued for later processing.
//!
//! ## Required fields
//!
//! | Kind             | Required                               |
//! |------------------|----------------------------------------|
//! | `AttackDeclared` | `source`, `target`, `owner`, `opponent`|
//! | `AttackResolved` | `source`, `owner`, `opponent`          |
//! | `Flip`           | `source`                               |
//! | `CardPlayed`     | `source`                               |
//! | `TurnStart`      | `owner`                                |
//! | `TurnEnd`        | `owner`                                |
//! | `Info`, `Custom` | nothing                                |
//!
//! `AttackResolved` with no target means the hit went to the opponent's hp.

use serde::{Deserialize, Serialize};

use crate::cards::CombatantRef;
use crate::core::error::ProtocolViolation;
use crate::core::{EntityId, PlayerId};

/// Phase tag of the opponent's per-lane slot effects.
pub const PHASE_SLOT_EFFECT: &str = "SlotEffect";

/// Phase tag of flips performed by the turn-start layout policy.
pub const PHASE_TURN_START_RANDOMIZE: &str = "TurnStartRandomize";

/// Phase tag published while the opponent's lanes are being rebuilt.
pub const PHASE_LANE_REBUILD: &str = "LaneRebuild";

/// Prefix of presentation hints carried by `Info` events.
pub const HINT_PREFIX: &str = "HINT: ";

/// Closed set of event kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    TurnStart,
    TurnEnd,
    Flip,
    AttackDeclared,
    AttackResolved,
    CardPlayed,
    Info,
    Custom,
}

impl EventKind {
    /// Every kind, in declaration order.
    pub const ALL: [EventKind; 8] = [
        EventKind::TurnStart,
        EventKind::TurnEnd,
        EventKind::Flip,
        EventKind::AttackDeclared,
        EventKind::AttackResolved,
        EventKind::CardPlayed,
        EventKind::Info,
        EventKind::Custom,
    ];

    /// Bracketed tag used in log lines.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            EventKind::TurnStart => "TURN START",
            EventKind::TurnEnd => "TURN END",
            EventKind::Flip => "FLIP",
            EventKind::AttackDeclared => "ATTACK",
            EventKind::AttackResolved => "RESOLVED",
            EventKind::CardPlayed => "PLAY",
            EventKind::Info => "INFO",
            EventKind::Custom => "CUSTOM",
        }
    }
}

/// Payload published with an event.
///
/// Immutable by convention once published. Built with the `with_*` methods:
///
/// ```
/// use bifronte::cards::CombatantRef;
/// use bifronte::core::{EntityId, PlayerId};
/// use bifronte::events::{EventContext, EventKind};
///
/// let ctx = EventContext::between(PlayerId::HUMAN, PlayerId::AI)
///     .with_source(CombatantRef::Card(EntityId(1)))
///     .with_target(CombatantRef::Slot(EntityId(2)))
///     .with_amount(4);
///
/// assert!(ctx.validate(EventKind::AttackDeclared).is_ok());
/// assert_eq!(ctx.target_id(), Some(EntityId(2)));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventContext {
    /// Side the event originates from.
    pub owner: Option<PlayerId>,

    /// The other side involved.
    pub opponent: Option<PlayerId>,

    pub source: Option<CombatantRef>,

    pub target: Option<CombatantRef>,

    /// Proposed damage on `AttackDeclared`, HP removed on `AttackResolved`.
    pub amount: i32,

    /// Free-form discriminator, also used as a secondary trigger key.
    pub phase: String,
}

impl EventContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Context for an event from `owner` against `opponent`.
    #[must_use]
    pub fn between(owner: PlayerId, opponent: PlayerId) -> Self {
        Self {
            owner: Some(owner),
            opponent: Some(opponent),
            ..Self::default()
        }
    }

    /// Context naming only the side whose turn changes.
    #[must_use]
    pub fn for_side(side: PlayerId) -> Self {
        Self::between(side, side.opponent())
    }

    /// An `Info` context carrying a presentation hint about `source`.
    #[must_use]
    pub fn hint(source: CombatantRef, message: &str) -> Self {
        Self::new()
            .with_source(source)
            .with_phase(format!("{HINT_PREFIX}{message}"))
    }

    #[must_use]
    pub fn with_source(mut self, source: CombatantRef) -> Self {
        self.source = Some(source);
        self
    }

    #[must_use]
    pub fn with_target(mut self, target: CombatantRef) -> Self {
        self.target = Some(target);
        self
    }

    #[must_use]
    pub fn with_amount(mut self, amount: i32) -> Self {
        self.amount = amount;
        self
    }

    #[must_use]
    pub fn with_phase(mut self, phase: impl Into<String>) -> Self {
        self.phase = phase.into();
        self
    }

    #[must_use]
    pub fn source_id(&self) -> Option<EntityId> {
        self.source.map(CombatantRef::id)
    }

    #[must_use]
    pub fn target_id(&self) -> Option<EntityId> {
        self.target.map(CombatantRef::id)
    }

    /// Hint message, if this context carries one.
    #[must_use]
    pub fn hint_text(&self) -> Option<&str> {
        self.phase.strip_prefix(HINT_PREFIX)
    }

    /// Check that the fields required by `kind` are present.
    pub fn validate(&self, kind: EventKind) -> Result<(), ProtocolViolation> {
        let needs_source = matches!(
            kind,
            EventKind::AttackDeclared
                | EventKind::AttackResolved
                | EventKind::Flip
                | EventKind::CardPlayed
        );
        let needs_sides = matches!(kind, EventKind::AttackDeclared | EventKind::AttackResolved);
        let needs_owner = needs_sides || matches!(kind, EventKind::TurnStart | EventKind::TurnEnd);

        if needs_source && self.source.is_none() {
            return Err(ProtocolViolation::MissingSource(kind));
        }
        if kind == EventKind::AttackDeclared && self.target.is_none() {
            return Err(ProtocolViolation::MissingTarget(kind));
        }
        if needs_owner && self.owner.is_none() {
            return Err(ProtocolViolation::MissingOwner(kind));
        }
        if needs_sides && self.opponent.is_none() {
            return Err(ProtocolViolation::MissingOpponent(kind));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attack_declared_needs_target() {
        let ctx = EventContext::between(PlayerId::HUMAN, PlayerId::AI)
            .with_source(CombatantRef::Card(EntityId(1)))
            .with_amount(3);

        assert_eq!(
            ctx.validate(EventKind::AttackDeclared),
            Err(ProtocolViolation::MissingTarget(EventKind::AttackDeclared))
        );
        assert!(ctx.validate(EventKind::AttackResolved).is_ok());
    }

    #[test]
    fn test_turn_events_need_owner() {
        assert_eq!(
            EventContext::new().validate(EventKind::TurnStart),
            Err(ProtocolViolation::MissingOwner(EventKind::TurnStart))
        );
        assert!(EventContext::for_side(PlayerId::AI)
            .validate(EventKind::TurnEnd)
            .is_ok());
    }

    #[test]
    fn test_info_and_custom_need_nothing() {
        assert!(EventContext::new().validate(EventKind::Info).is_ok());
        assert!(EventContext::new().validate(EventKind::Custom).is_ok());
    }

    #[test]
    fn test_hint_text() {
        let ctx = EventContext::hint(CombatantRef::Slot(EntityId(4)), "Strike!");
        assert_eq!(ctx.phase, "HINT: Strike!");
        assert_eq!(ctx.hint_text(), Some("Strike!"));
        assert_eq!(EventContext::new().with_phase("SlotEffect").hint_text(), None);
    }

    #[test]
    fn test_for_side_names_opponent() {
        let ctx = EventContext::for_side(PlayerId::HUMAN);
        assert_eq!(ctx.owner, Some(PlayerId::HUMAN));
        assert_eq!(ctx.opponent, Some(PlayerId::AI));
    }
}
