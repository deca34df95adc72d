//! Battle state: both sides, their lanes, and every combatant on the board.
//!
//! ## PlayerState
//!
//! One side of the battle: name, life total, action points, and a fixed-size
//! array of lanes. The lane index is the position used for opposing-target
//! resolution; reshuffles are permutations of this array.
//!
//! ## World
//!
//! Everything the event handlers read and write:
//! - both `PlayerState`s
//! - the combatants, keyed by `EntityId`
//! - the per-side rebuilding flags and the deferred-strike queue
//!
//! The world owns no subscriptions. Routing lives in the `EventBus`.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use super::config::{DirectDamagePolicy, MatchConfig};
use super::entity::EntityId;
use super::error::Rejection;
use super::player::{PlayerId, PlayerMap};
use super::rng::GameRng;
use crate::cards::{Card, Combatant, CombatantRef, FactionId};

/// One side of the battle.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerState {
    pub name: String,

    /// Direct life total. Never below zero.
    pub hp: i32,

    pub action_points: i32,

    lanes: Vec<Option<EntityId>>,
}

impl PlayerState {
    /// Create a side with `lanes` empty lanes.
    #[must_use]
    pub fn new(name: impl Into<String>, hp: i32, lanes: usize) -> Self {
        Self {
            name: name.into(),
            hp: hp.max(0),
            action_points: 0,
            lanes: vec![None; lanes],
        }
    }

    #[must_use]
    pub fn lanes(&self) -> &[Option<EntityId>] {
        &self.lanes
    }

    #[must_use]
    pub fn lane_count(&self) -> usize {
        self.lanes.len()
    }

    /// Occupant of a lane. Out-of-range lanes are empty.
    #[must_use]
    pub fn lane(&self, lane: usize) -> Option<EntityId> {
        self.lanes.get(lane).copied().flatten()
    }

    /// Lane index of an entity on this side.
    #[must_use]
    pub fn lane_of(&self, id: EntityId) -> Option<usize> {
        self.lanes.iter().position(|occupant| *occupant == Some(id))
    }

    /// Occupied lanes, left to right.
    pub fn occupants(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.lanes.iter().filter_map(|occupant| *occupant)
    }

    /// Remove up to `amount` hp and return how much was actually removed.
    pub fn take_damage(&mut self, amount: i32) -> i32 {
        let removed = amount.clamp(0, self.hp);
        self.hp -= removed;
        removed
    }

    /// Spend one action point if any are left.
    pub fn spend_action_point(&mut self) -> bool {
        if self.action_points > 0 {
            self.action_points -= 1;
            true
        } else {
            false
        }
    }

    pub(crate) fn lanes_mut(&mut self) -> &mut [Option<EntityId>] {
        &mut self.lanes
    }
}

/// A strike that could not find its target because the opposing board was
/// being rebuilt. Retried once on the next tick.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeferredStrike {
    pub attacker: EntityId,
    pub amount: i32,
    pub phase: String,
}

/// Mutable battle state shared by every event handler.
#[derive(Clone, Debug)]
pub struct World {
    players: PlayerMap<PlayerState>,
    combatants: FxHashMap<EntityId, Combatant>,
    rebuilding: PlayerMap<bool>,
    deferred: Vec<DeferredStrike>,
    direct_damage: DirectDamagePolicy,
}

impl World {
    /// Create a world from two sides. Lane counts may differ.
    #[must_use]
    pub fn new(human: PlayerState, ai: PlayerState) -> Self {
        Self {
            players: PlayerMap::from_pair(human, ai),
            combatants: FxHashMap::default(),
            rebuilding: PlayerMap::default(),
            deferred: Vec::new(),
            direct_damage: DirectDamagePolicy::default(),
        }
    }

    /// Create a world with empty boards sized from the configuration.
    #[must_use]
    pub fn from_config(config: &MatchConfig) -> Self {
        Self::new(
            PlayerState::new(config.player_name.clone(), config.starting_hp, config.lanes),
            PlayerState::new(config.ai_name.clone(), config.starting_hp, config.lanes),
        )
        .with_direct_damage(config.direct_damage)
    }

    #[must_use]
    pub fn with_direct_damage(mut self, policy: DirectDamagePolicy) -> Self {
        self.direct_damage = policy;
        self
    }

    #[must_use]
    pub fn direct_damage(&self) -> DirectDamagePolicy {
        self.direct_damage
    }

    // === Sides ===

    #[must_use]
    pub fn player(&self, id: PlayerId) -> &PlayerState {
        &self.players[id]
    }

    pub fn player_mut(&mut self, id: PlayerId) -> &mut PlayerState {
        &mut self.players[id]
    }

    #[must_use]
    pub fn players(&self) -> &PlayerMap<PlayerState> {
        &self.players
    }

    // === Combatants ===

    #[must_use]
    pub fn combatant(&self, id: EntityId) -> Option<&Combatant> {
        self.combatants.get(&id)
    }

    pub fn combatant_mut(&mut self, id: EntityId) -> Option<&mut Combatant> {
        self.combatants.get_mut(&id)
    }

    #[must_use]
    pub fn card(&self, id: EntityId) -> Option<&Card> {
        self.combatant(id).and_then(Combatant::as_card)
    }

    pub fn card_mut(&mut self, id: EntityId) -> Option<&mut Card> {
        self.combatant_mut(id).and_then(Combatant::as_card_mut)
    }

    /// Look up the combatant behind a tagged reference.
    ///
    /// A reference whose tag does not match the stored kind resolves to `None`.
    #[must_use]
    pub fn resolve(&self, reference: CombatantRef) -> Option<&Combatant> {
        self.combatant(reference.id())
            .filter(|combatant| combatant.to_ref() == reference)
    }

    #[must_use]
    pub fn is_alive(&self, id: EntityId) -> bool {
        self.combatant(id).is_some_and(Combatant::alive)
    }

    /// Put a combatant into an empty lane of its owner's board.
    pub fn place(&mut self, combatant: Combatant, lane: usize) -> Result<EntityId, Rejection> {
        let id = combatant.id();
        let side = self.player_mut(combatant.owner());
        match side.lanes.get_mut(lane) {
            None => return Err(Rejection::LaneOutOfRange(lane)),
            Some(Some(_)) => return Err(Rejection::LaneOccupied(lane)),
            Some(slot) => *slot = Some(id),
        }
        self.combatants.insert(id, combatant);
        Ok(id)
    }

    /// Take a combatant off the board. Its lane becomes empty.
    pub fn remove(&mut self, id: EntityId) -> Option<Combatant> {
        let combatant = self.combatants.remove(&id)?;
        let side = self.player_mut(combatant.owner());
        if let Some(lane) = side.lane_of(id) {
            side.lanes[lane] = None;
        }
        Some(combatant)
    }

    /// Combatants on a side, in lane order.
    pub fn board(&self, owner: PlayerId) -> impl Iterator<Item = &Combatant> + '_ {
        self.players[owner]
            .occupants()
            .filter_map(move |id| self.combatants.get(&id))
    }

    /// Living back-facing cards of `owner` belonging to `faction`.
    pub fn allied_back_cards(
        &self,
        owner: PlayerId,
        faction: FactionId,
    ) -> impl Iterator<Item = &Card> + '_ {
        self.board(owner)
            .filter(|combatant| combatant.alive())
            .filter_map(Combatant::as_card)
            .filter(move |card| card.is_back() && card.definition().faction == faction)
    }

    /// Ids of combatants that are on the board with zero health.
    #[must_use]
    pub fn destroyed(&self) -> Vec<EntityId> {
        PlayerId::BOTH
            .into_iter()
            .flat_map(|side| self.board(side))
            .filter(|combatant| !combatant.alive())
            .map(Combatant::id)
            .collect()
    }

    /// Log label for an optional reference. Removed combatants fall back to
    /// their tag and id.
    #[must_use]
    pub fn label(&self, reference: Option<CombatantRef>) -> String {
        match reference {
            None => "-".to_string(),
            Some(r) => self
                .resolve(r)
                .map_or_else(|| r.to_string(), Combatant::label),
        }
    }

    // === Lane permutations ===

    /// Exchange two lanes of one side. Returns `false` if either is out of range.
    pub fn swap_lanes(&mut self, owner: PlayerId, a: usize, b: usize) -> bool {
        let lanes = &mut self.players[owner].lanes;
        if a >= lanes.len() || b >= lanes.len() {
            return false;
        }
        lanes.swap(a, b);
        true
    }

    /// Randomly permute one side's lanes. Entities keep their ids and health.
    pub fn shuffle_lanes(&mut self, owner: PlayerId, rng: &mut GameRng) {
        rng.shuffle(&mut self.players[owner].lanes);
    }

    // === Rebuild and deferred strikes ===

    #[must_use]
    pub fn is_rebuilding(&self, side: PlayerId) -> bool {
        self.rebuilding[side]
    }

    pub fn set_rebuilding(&mut self, side: PlayerId, rebuilding: bool) {
        self.rebuilding[side] = rebuilding;
    }

    /// Queue a strike for its single retry.
    pub fn defer(&mut self, strike: DeferredStrike) {
        self.deferred.push(strike);
    }

    #[must_use]
    pub fn pending_strikes(&self) -> &[DeferredStrike] {
        &self.deferred
    }

    pub fn take_deferred(&mut self) -> Vec<DeferredStrike> {
        std::mem::take(&mut self.deferred)
    }

    // === Back-row auras ===

    /// Action-point bonus from back-facing cards.
    ///
    /// Each faction with at least two living back-facing cards on `owner`'s
    /// board contributes the highest `back_ap_bonus` among them.
    #[must_use]
    pub fn passive_ap_bonus(&self, owner: PlayerId) -> i32 {
        let mut best_by_faction: FxHashMap<FactionId, (usize, i32)> = FxHashMap::default();
        for card in self
            .board(owner)
            .filter(|combatant| combatant.alive())
            .filter_map(Combatant::as_card)
            .filter(|card| card.is_back())
        {
            let entry = best_by_faction
                .entry(card.definition().faction)
                .or_insert((0, 0));
            entry.0 += 1;
            entry.1 = entry.1.max(card.definition().back_ap_bonus);
        }
        best_by_faction
            .values()
            .filter(|(count, _)| *count >= 2)
            .map(|(_, bonus)| *bonus)
            .sum()
    }
}
