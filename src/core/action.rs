//! Player actions and the action history.
//!
//! Every operation the turn driver exposes has an `Action` variant, so a
//! host (or a scripted opponent) can drive a battle purely through
//! `Battle::apply` and replay it from its recorded history.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::entity::EntityId;
use super::player::PlayerId;

/// One move a side can make.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    /// Attack the lane across from `attacker`. Costs 1 AP.
    Attack { attacker: EntityId },

    /// Attack a chosen enemy. Costs 1 AP.
    AttackTarget { attacker: EntityId, target: EntityId },

    /// Every front-facing card attacks across, then the turn waits to end.
    AttackAll,

    /// Turn one of the side's cards over. Costs 1 AP.
    Flip { unit: EntityId },

    /// Exchange the lanes of two of the side's units. Costs 1 AP.
    Swap { a: EntityId, b: EntityId },

    /// Take a random card from the deck. Costs 1 AP.
    Draw,

    /// Put a hand card into an empty lane.
    Play { hand_index: usize, lane: usize },

    EndTurn,
}

impl Action {
    /// Action points this action costs.
    #[must_use]
    pub const fn cost(self) -> i32 {
        match self {
            Action::Attack { .. }
            | Action::AttackTarget { .. }
            | Action::Flip { .. }
            | Action::Swap { .. }
            | Action::Draw => 1,
            Action::AttackAll | Action::Play { .. } | Action::EndTurn => 0,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Attack { attacker } => write!(f, "attack with {attacker}"),
            Action::AttackTarget { attacker, target } => {
                write!(f, "attack {target} with {attacker}")
            }
            Action::AttackAll => write!(f, "attack with everything"),
            Action::Flip { unit } => write!(f, "flip {unit}"),
            Action::Swap { a, b } => write!(f, "swap {a} and {b}"),
            Action::Draw => write!(f, "draw"),
            Action::Play { hand_index, lane } => {
                write!(f, "play hand card {hand_index} into lane {lane}")
            }
            Action::EndTurn => write!(f, "end turn"),
        }
    }
}

/// An accepted action with its place in the match.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRecord {
    pub player: PlayerId,

    pub action: Action,

    /// Turn number when the action was taken.
    pub turn: u32,

    /// Position in the whole match, starting at 0.
    pub sequence: u32,
}

impl ActionRecord {
    #[must_use]
    pub fn new(player: PlayerId, action: Action, turn: u32, sequence: u32) -> Self {
        Self {
            player,
            action,
            turn,
            sequence,
        }
    }
}
