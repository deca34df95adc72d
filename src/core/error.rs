//! Error types.
//!
//! Nothing in the engine is fatal. Each enum names one category of failure
//! and the place that deals with it:
//!
//! - `Rejection`: an action the rules do not allow. Returned to the caller,
//!   state untouched.
//! - `ProtocolViolation`: an event context missing a field its kind needs.
//!   The bus logs it and drops the event.
//! - `HandlerError`: a subscriber failed. The bus logs it and keeps
//!   dispatching.
//! - `ConfigError`: a `MatchConfig` that cannot describe a battle.

use thiserror::Error;

use super::entity::EntityId;
use super::player::PlayerId;
use crate::events::EventKind;

/// Why an action was refused.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("the match is over")]
    MatchOver,

    #[error("the match has already started")]
    AlreadyStarted,

    #[error("it is not {0}'s turn")]
    NotYourTurn(PlayerId),

    #[error("waiting for end of turn")]
    AwaitingEndTurn,

    #[error("no action points left")]
    NoActionPoints,

    #[error("{0} is not on the board")]
    UnknownEntity(EntityId),

    #[error("{0} is destroyed")]
    Destroyed(EntityId),

    #[error("{0} does not belong to {1}")]
    NotOwned(EntityId, PlayerId),

    #[error("{0} is back-facing")]
    BackFacing(EntityId),

    #[error("{0} has no front damage to attack with")]
    CannotAttack(EntityId),

    #[error("{0} cannot be flipped")]
    NotFlippable(EntityId),

    #[error("{0} cannot be swapped with itself")]
    SameUnit(EntityId),

    #[error("{0} is not an enemy of {1}")]
    NotAnEnemy(EntityId, EntityId),

    #[error("lane {0} is out of range")]
    LaneOutOfRange(usize),

    #[error("lane {0} is occupied")]
    LaneOccupied(usize),

    #[error("no living slot in lane {0}")]
    NoSlot(usize),

    #[error("hand is full")]
    HandFull,

    #[error("deck is empty")]
    DeckEmpty,

    #[error("no card at hand position {0}")]
    NoSuchHandCard(usize),

    #[error("unknown card definition {0}")]
    UnknownDefinition(u32),
}

/// An event context missing a field its kind requires.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ProtocolViolation {
    #[error("{0:?} requires a source")]
    MissingSource(EventKind),

    #[error("{0:?} requires a target")]
    MissingTarget(EventKind),

    #[error("{0:?} requires an owner")]
    MissingOwner(EventKind),

    #[error("{0:?} requires an opponent")]
    MissingOpponent(EventKind),
}

/// A subscriber failure, isolated by the bus.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum HandlerError {
    #[error("per-hit modifier written outside of an incoming AttackDeclared ({0:?})")]
    MisplacedModifier(EventKind),

    #[error("{0} is not a card")]
    NotACard(EntityId),

    #[error("{0}")]
    Failed(String),
}

/// A match configuration that cannot describe a battle.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("a battle needs at least one lane")]
    NoLanes,

    #[error("turn limit must be at least 1")]
    NoTurns,

    #[error("base action points cannot be negative (got {0})")]
    NegativeActionPoints(i32),

    #[error("starting hp must be positive (got {0})")]
    NonPositiveHp(i32),

    #[error("starting hand of {starting} exceeds the hand limit of {max}")]
    HandTooLarge { starting: usize, max: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(Rejection::NoActionPoints.to_string(), "no action points left");
        assert_eq!(
            Rejection::NotYourTurn(PlayerId::AI).to_string(),
            "it is not AI's turn"
        );
        assert_eq!(
            ProtocolViolation::MissingTarget(EventKind::AttackDeclared).to_string(),
            "AttackDeclared requires a target"
        );
        assert_eq!(
            ConfigError::HandTooLarge { starting: 6, max: 5 }.to_string(),
            "starting hand of 6 exceeds the hand limit of 5"
        );
    }
}
