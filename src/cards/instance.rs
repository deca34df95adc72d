//! Combatant instances - runtime state.
//!
//! `Card` and `Slot` are the two kinds of combatant that can stand in a lane.
//! `Combatant` is the closed union over both, and `CombatantRef` is the
//! matching tagged reference carried in event contexts.
//!
//! ## Invariants
//!
//! - `health` stays in `[0, max_health]`; `alive ⇔ health > 0`.
//! - `HitModifiers` are scoped to one incoming attack. The resolution step
//!   takes them (read and reset in one move), so they never leak into the
//!   next hit.
//! - Flipping a card toggles `side` in place. The card is never recreated.

use serde::{Deserialize, Serialize};

use super::definition::{CardDefinition, FactionId, FrontType, Side, SlotDefinition};
use crate::core::entity::EntityId;
use crate::core::player::PlayerId;

/// Per-hit modifiers written by abilities while an attack is declared.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HitModifiers {
    /// Replaces the proposed damage of the next hit entirely.
    pub incoming_damage_override: Option<i32>,

    /// Added to the block of the next hit. Negative values count as zero.
    pub temp_block_bonus: i32,
}

impl HitModifiers {
    /// Are both modifiers in their empty state?
    #[must_use]
    pub fn is_clear(&self) -> bool {
        self.incoming_damage_override.is_none() && self.temp_block_bonus == 0
    }
}

/// Tagged reference to a combatant, as carried by event contexts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CombatantRef {
    Card(EntityId),
    Slot(EntityId),
}

impl CombatantRef {
    #[must_use]
    pub const fn id(self) -> EntityId {
        match self {
            CombatantRef::Card(id) | CombatantRef::Slot(id) => id,
        }
    }
}

impl std::fmt::Display for CombatantRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CombatantRef::Card(id) => write!(f, "Card{id}"),
            CombatantRef::Slot(id) => write!(f, "Slot{id}"),
        }
    }
}

/// A two-faced card on a board.
#[derive(Clone, Debug)]
pub struct Card {
    id: EntityId,
    owner: PlayerId,
    definition: CardDefinition,
    health: i32,
    side: Side,
    front_damage: i32,
    modifiers: HitModifiers,
}

impl Card {
    /// Create a full-health card with a fresh id.
    #[must_use]
    pub fn new(definition: CardDefinition, owner: PlayerId, side: Side) -> Self {
        Self {
            id: EntityId::allocate(),
            owner,
            health: definition.max_health,
            front_damage: definition.front_damage,
            definition,
            side,
            modifiers: HitModifiers::default(),
        }
    }

    #[must_use]
    pub fn id(&self) -> EntityId {
        self.id
    }

    #[must_use]
    pub fn owner(&self) -> PlayerId {
        self.owner
    }

    #[must_use]
    pub fn definition(&self) -> &CardDefinition {
        &self.definition
    }

    #[must_use]
    pub fn side(&self) -> Side {
        self.side
    }

    #[must_use]
    pub fn is_front(&self) -> bool {
        self.side == Side::Front
    }

    #[must_use]
    pub fn is_back(&self) -> bool {
        self.side == Side::Back
    }

    /// Is the front face a blocker, and is it showing?
    #[must_use]
    pub fn is_front_blocker(&self) -> bool {
        self.is_front() && self.definition.front_type == FrontType::Block
    }

    /// Current front damage. Starts at the definition's value and may be
    /// rewritten by abilities.
    #[must_use]
    pub fn front_damage(&self) -> i32 {
        self.front_damage
    }

    pub fn set_front_damage(&mut self, damage: i32) {
        self.front_damage = damage;
    }

    /// Toggle the facing and return the new side.
    pub fn flip(&mut self) -> Side {
        self.side = self.side.flipped();
        self.side
    }
}

/// A ward standing in one of the opponent's lanes.
#[derive(Clone, Debug)]
pub struct Slot {
    id: EntityId,
    owner: PlayerId,
    definition: SlotDefinition,
    health: i32,
    modifiers: HitModifiers,
}

impl Slot {
    #[must_use]
    pub fn new(definition: SlotDefinition, owner: PlayerId) -> Self {
        Self {
            id: EntityId::allocate(),
            owner,
            health: definition.max_health,
            definition,
            modifiers: HitModifiers::default(),
        }
    }

    #[must_use]
    pub fn id(&self) -> EntityId {
        self.id
    }

    #[must_use]
    pub fn definition(&self) -> &SlotDefinition {
        &self.definition
    }
}

/// Anything that can stand in a lane and be attacked.
#[derive(Clone, Debug)]
pub enum Combatant {
    Card(Card),
    Slot(Slot),
}

impl From<Card> for Combatant {
    fn from(card: Card) -> Self {
        Combatant::Card(card)
    }
}

impl From<Slot> for Combatant {
    fn from(slot: Slot) -> Self {
        Combatant::Slot(slot)
    }
}

impl Combatant {
    #[must_use]
    pub fn id(&self) -> EntityId {
        match self {
            Combatant::Card(c) => c.id,
            Combatant::Slot(s) => s.id,
        }
    }

    #[must_use]
    pub fn owner(&self) -> PlayerId {
        match self {
            Combatant::Card(c) => c.owner,
            Combatant::Slot(s) => s.owner,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Combatant::Card(c) => &c.definition.name,
            Combatant::Slot(s) => &s.definition.name,
        }
    }

    #[must_use]
    pub fn faction(&self) -> FactionId {
        match self {
            Combatant::Card(c) => c.definition.faction,
            Combatant::Slot(s) => s.definition.faction,
        }
    }

    #[must_use]
    pub fn health(&self) -> i32 {
        match self {
            Combatant::Card(c) => c.health,
            Combatant::Slot(s) => s.health,
        }
    }

    #[must_use]
    pub fn max_health(&self) -> i32 {
        match self {
            Combatant::Card(c) => c.definition.max_health,
            Combatant::Slot(s) => s.definition.max_health,
        }
    }

    #[must_use]
    pub fn alive(&self) -> bool {
        self.health() > 0
    }

    /// Remove up to `amount` health and return how much was actually removed.
    ///
    /// Health never drops below zero; non-positive amounts do nothing.
    pub fn take_damage(&mut self, amount: i32) -> i32 {
        let health = match self {
            Combatant::Card(c) => &mut c.health,
            Combatant::Slot(s) => &mut s.health,
        };
        let removed = amount.clamp(0, *health);
        *health -= removed;
        removed
    }

    #[must_use]
    pub fn modifiers(&self) -> &HitModifiers {
        match self {
            Combatant::Card(c) => &c.modifiers,
            Combatant::Slot(s) => &s.modifiers,
        }
    }

    pub fn modifiers_mut(&mut self) -> &mut HitModifiers {
        match self {
            Combatant::Card(c) => &mut c.modifiers,
            Combatant::Slot(s) => &mut s.modifiers,
        }
    }

    /// Read and reset the per-hit modifiers in one step.
    pub fn take_modifiers(&mut self) -> HitModifiers {
        std::mem::take(self.modifiers_mut())
    }

    #[must_use]
    pub fn to_ref(&self) -> CombatantRef {
        match self {
            Combatant::Card(c) => CombatantRef::Card(c.id),
            Combatant::Slot(s) => CombatantRef::Slot(s.id),
        }
    }

    #[must_use]
    pub fn as_card(&self) -> Option<&Card> {
        match self {
            Combatant::Card(c) => Some(c),
            Combatant::Slot(_) => None,
        }
    }

    pub fn as_card_mut(&mut self) -> Option<&mut Card> {
        match self {
            Combatant::Card(c) => Some(c),
            Combatant::Slot(_) => None,
        }
    }

    #[must_use]
    pub fn as_slot(&self) -> Option<&Slot> {
        match self {
            Combatant::Slot(s) => Some(s),
            Combatant::Card(_) => None,
        }
    }

    /// Short label for logs, e.g. `Card#3 Ember Duelist`.
    #[must_use]
    pub fn label(&self) -> String {
        format!("{} {}", self.to_ref(), self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::definition::{CardId, SlotId};

    fn duelist() -> CardDefinition {
        CardDefinition::new(CardId::new(1), "Duelist", FactionId::new(0))
            .with_health(5)
            .attacker(3)
    }

    #[test]
    fn test_new_card_is_full_health() {
        let card = Card::new(duelist(), PlayerId::HUMAN, Side::Front);
        let combatant = Combatant::from(card);

        assert_eq!(combatant.health(), 5);
        assert!(combatant.alive());
        assert!(combatant.modifiers().is_clear());
        assert!(matches!(combatant.to_ref(), CombatantRef::Card(_)));
    }

    #[test]
    fn test_damage_clamps_at_zero() {
        let mut combatant = Combatant::from(Card::new(duelist(), PlayerId::HUMAN, Side::Front));

        assert_eq!(combatant.take_damage(3), 3);
        assert_eq!(combatant.take_damage(10), 2);
        assert_eq!(combatant.health(), 0);
        assert!(!combatant.alive());
        assert_eq!(combatant.take_damage(4), 0);
        assert_eq!(combatant.health(), 0);
    }

    #[test]
    fn test_negative_damage_does_not_heal() {
        let mut combatant = Combatant::from(Card::new(duelist(), PlayerId::HUMAN, Side::Front));
        combatant.take_damage(2);
        assert_eq!(combatant.take_damage(-5), 0);
        assert_eq!(combatant.health(), 3);
    }

    #[test]
    fn test_flip_keeps_identity() {
        let mut card = Card::new(duelist(), PlayerId::HUMAN, Side::Front);
        let id = card.id();

        assert_eq!(card.flip(), Side::Back);
        assert_eq!(card.flip(), Side::Front);
        assert_eq!(card.id(), id);
    }

    #[test]
    fn test_take_modifiers_resets() {
        let slot = Slot::new(
            SlotDefinition::new(SlotId::new(1), "Ward", FactionId::new(0)).with_health(4),
            PlayerId::AI,
        );
        let mut combatant = Combatant::from(slot);
        combatant.modifiers_mut().incoming_damage_override = Some(0);
        combatant.modifiers_mut().temp_block_bonus = 2;

        let taken = combatant.take_modifiers();
        assert_eq!(taken.incoming_damage_override, Some(0));
        assert_eq!(taken.temp_block_bonus, 2);
        assert!(combatant.modifiers().is_clear());
    }

    #[test]
    fn test_label() {
        let card = Card::new(duelist(), PlayerId::HUMAN, Side::Front);
        let id = card.id();
        assert_eq!(Combatant::from(card).label(), format!("Card{id} Duelist"));
    }
}
