//! Turn-policy collaborators.
//!
//! The driver asks a `TurnStartPolicy` how to rearrange the player's board at
//! the start of each player turn, and hands the whole opponent turn to a
//! `TurnExecutor`. Both are swappable, so tests can pin the board down and
//! script the opponent.

use tracing::debug;

use crate::cards::{Card, Combatant};
use crate::core::{EntityId, GameRng, PlayerId};

use super::battle::Battle;

/// Rearranges the player's board at the start of their turn.
pub trait TurnStartPolicy {
    /// Permute the lanes in place. Entities and their health are untouched.
    fn arrange(&mut self, rng: &mut GameRng, lanes: &mut [Option<EntityId>]);

    /// Should this living card flip?
    fn should_flip(&mut self, rng: &mut GameRng, card: &Card) -> bool;
}

/// Shuffle every lane and flip each card with a fixed probability.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RandomizeLayout {
    pub flip_chance: f64,
}

impl Default for RandomizeLayout {
    fn default() -> Self {
        Self { flip_chance: 0.5 }
    }
}

impl TurnStartPolicy for RandomizeLayout {
    fn arrange(&mut self, rng: &mut GameRng, lanes: &mut [Option<EntityId>]) {
        rng.shuffle(lanes);
    }

    fn should_flip(&mut self, rng: &mut GameRng, _card: &Card) -> bool {
        rng.gen_bool(self.flip_chance)
    }
}

/// Leave the board exactly as it is.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct KeepLayout;

impl TurnStartPolicy for KeepLayout {
    fn arrange(&mut self, _rng: &mut GameRng, _lanes: &mut [Option<EntityId>]) {}

    fn should_flip(&mut self, _rng: &mut GameRng, _card: &Card) -> bool {
        false
    }
}

/// Plays the opponent's turn.
pub trait TurnExecutor {
    fn execute_turn(&mut self, battle: &mut Battle);
}

impl<F> TurnExecutor for F
where
    F: FnMut(&mut Battle),
{
    fn execute_turn(&mut self, battle: &mut Battle) {
        self(battle);
    }
}

/// Trigger every living slot's effect, left to right.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SlotSweep;

impl TurnExecutor for SlotSweep {
    fn execute_turn(&mut self, battle: &mut Battle) {
        let lanes = battle.world().player(PlayerId::AI).lane_count();
        for lane in 0..lanes {
            if battle.is_finished() {
                break;
            }
            let has_slot = battle
                .world()
                .player(PlayerId::AI)
                .lane(lane)
                .and_then(|id| battle.world().combatant(id))
                .is_some_and(|c| c.alive() && matches!(c, Combatant::Slot(_)));
            if has_slot {
                if let Err(reason) = battle.trigger_slot_effect(lane) {
                    debug!(lane, %reason, "slot effect skipped");
                }
            }
        }
    }
}

/// Do nothing on the opponent's turn.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Passive;

impl TurnExecutor for Passive {
    fn execute_turn(&mut self, _battle: &mut Battle) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keep_layout_is_identity() {
        let mut rng = GameRng::new(1);
        let mut lanes = [Some(EntityId(1)), None, Some(EntityId(3))];
        KeepLayout.arrange(&mut rng, &mut lanes);
        assert_eq!(lanes, [Some(EntityId(1)), None, Some(EntityId(3))]);
    }

    #[test]
    fn test_randomize_is_a_permutation() {
        let mut rng = GameRng::new(99);
        let mut lanes = [Some(EntityId(1)), None, Some(EntityId(3)), Some(EntityId(4))];
        RandomizeLayout::default().arrange(&mut rng, &mut lanes);

        let mut ids: Vec<_> = lanes.iter().flatten().copied().collect();
        ids.sort();
        assert_eq!(ids, vec![EntityId(1), EntityId(3), EntityId(4)]);
        assert_eq!(lanes.iter().filter(|l| l.is_none()).count(), 1);
    }
}
