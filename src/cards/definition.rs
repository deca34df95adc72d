//! Card and slot definitions - static data.
//!
//! A `CardDefinition` describes both faces of a card: the front face is an
//! attacker or a blocker, the back face is an aura that buffs same-faction
//! allies. A `SlotDefinition` describes one of the opponent's lane wards.
//!
//! Runtime state (health, facing, per-hit modifiers) lives in the instances
//! built from these definitions, see `cards::instance`.

use serde::{Deserialize, Serialize};

use crate::abilities::AbilitySpec;

/// Identifier for a card definition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CardId(pub u32);

impl CardId {
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for CardId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Card({})", self.0)
    }
}

/// Identifier for a slot definition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlotId(pub u32);

impl SlotId {
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for SlotId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Slot({})", self.0)
    }
}

/// Faction identifier. Content decides which factions exist.
///
/// Back-face auras only reach allies of the same faction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FactionId(pub u16);

impl FactionId {
    #[must_use]
    pub const fn new(id: u16) -> Self {
        Self(id)
    }
}

/// Which face of a card is up.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    #[default]
    Front,
    Back,
}

impl Side {
    /// The opposite face.
    #[must_use]
    pub const fn flipped(self) -> Side {
        match self {
            Side::Front => Side::Back,
            Side::Back => Side::Front,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Front => write!(f, "Front"),
            Side::Back => write!(f, "Back"),
        }
    }
}

/// Role of a card's front face.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FrontType {
    #[default]
    Attack,
    Block,
}

/// Static card definition.
///
/// ## Example
///
/// ```
/// use bifronte::cards::{CardDefinition, CardId, FactionId, FrontType};
///
/// let knight = CardDefinition::new(CardId::new(1), "Ash Knight", FactionId::new(0))
///     .with_health(6)
///     .blocker(2)
///     .with_back_block_bonus(1);
///
/// assert_eq!(knight.front_type, FrontType::Block);
/// assert_eq!(knight.front_block, 2);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardDefinition {
    pub id: CardId,
    pub name: String,
    pub faction: FactionId,
    pub max_health: i32,

    // === Front face ===
    pub front_type: FrontType,

    /// Damage dealt when attacking front-facing.
    pub front_damage: i32,

    /// Block applied to incoming hits while front-facing as a `Block` card.
    pub front_block: i32,

    // === Back face (same-faction auras) ===
    /// Added to every front-facing same-faction ally's proposed damage.
    pub back_damage_bonus: i32,

    /// Added to every same-faction ally's block.
    pub back_block_bonus: i32,

    /// Action points granted when two or more same-faction cards are back-facing.
    pub back_ap_bonus: i32,

    /// Abilities bound while the card is on the board.
    #[serde(default)]
    pub abilities: Vec<AbilitySpec>,
}

impl CardDefinition {
    /// A 1-health attacker with no stats, to be filled in with the builders.
    #[must_use]
    pub fn new(id: CardId, name: impl Into<String>, faction: FactionId) -> Self {
        Self {
            id,
            name: name.into(),
            faction,
            max_health: 1,
            front_type: FrontType::Attack,
            front_damage: 0,
            front_block: 0,
            back_damage_bonus: 0,
            back_block_bonus: 0,
            back_ap_bonus: 0,
            abilities: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_health(mut self, health: i32) -> Self {
        self.max_health = health.max(1);
        self
    }

    /// Make the front face an attacker dealing `damage`.
    #[must_use]
    pub fn attacker(mut self, damage: i32) -> Self {
        self.front_type = FrontType::Attack;
        self.front_damage = damage;
        self
    }

    /// Make the front face a blocker absorbing `block` per hit.
    #[must_use]
    pub fn blocker(mut self, block: i32) -> Self {
        self.front_type = FrontType::Block;
        self.front_block = block;
        self
    }

    #[must_use]
    pub fn with_front_damage(mut self, damage: i32) -> Self {
        self.front_damage = damage;
        self
    }

    #[must_use]
    pub fn with_back_damage_bonus(mut self, bonus: i32) -> Self {
        self.back_damage_bonus = bonus;
        self
    }

    #[must_use]
    pub fn with_back_block_bonus(mut self, bonus: i32) -> Self {
        self.back_block_bonus = bonus;
        self
    }

    #[must_use]
    pub fn with_back_ap_bonus(mut self, bonus: i32) -> Self {
        self.back_ap_bonus = bonus;
        self
    }

    /// Attach an ability (builder pattern).
    #[must_use]
    pub fn with_ability(mut self, ability: AbilitySpec) -> Self {
        self.abilities.push(ability);
        self
    }
}

/// Static definition of an opponent lane ward.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotDefinition {
    pub id: SlotId,
    pub name: String,
    pub faction: FactionId,
    pub max_health: i32,

    /// Flat block applied to every hit.
    #[serde(default)]
    pub block: i32,

    #[serde(default)]
    pub abilities: Vec<AbilitySpec>,
}

impl SlotDefinition {
    #[must_use]
    pub fn new(id: SlotId, name: impl Into<String>, faction: FactionId) -> Self {
        Self {
            id,
            name: name.into(),
            faction,
            max_health: 1,
            block: 0,
            abilities: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_health(mut self, health: i32) -> Self {
        self.max_health = health.max(1);
        self
    }

    #[must_use]
    pub fn with_block(mut self, block: i32) -> Self {
        self.block = block;
        self
    }

    #[must_use]
    pub fn with_ability(mut self, ability: AbilitySpec) -> Self {
        self.abilities.push(ability);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_side_flip_pairs() {
        assert_eq!(Side::Front.flipped(), Side::Back);
        assert_eq!(Side::Front.flipped().flipped(), Side::Front);
        assert_eq!(Side::Back.flipped().flipped(), Side::Back);
    }

    #[test]
    fn test_card_builder() {
        let card = CardDefinition::new(CardId::new(3), "Ember Duelist", FactionId::new(1))
            .with_health(5)
            .attacker(3)
            .with_back_damage_bonus(1)
            .with_back_ap_bonus(1);

        assert_eq!(card.max_health, 5);
        assert_eq!(card.front_type, FrontType::Attack);
        assert_eq!(card.front_damage, 3);
        assert_eq!(card.back_damage_bonus, 1);
        assert_eq!(card.back_ap_bonus, 1);
        assert!(card.abilities.is_empty());
    }

    #[test]
    fn test_health_is_at_least_one() {
        let card = CardDefinition::new(CardId::new(1), "Husk", FactionId::new(0)).with_health(0);
        assert_eq!(card.max_health, 1);
    }

    #[test]
    fn test_definition_serialization() {
        let slot = SlotDefinition::new(SlotId::new(2), "Iron Ward", FactionId::new(0))
            .with_health(8)
            .with_block(1)
            .with_ability(AbilitySpec::slot_strike(2));
        let json = serde_json::to_string(&slot).unwrap();
        let deserialized: SlotDefinition = serde_json::from_str(&json).unwrap();
        assert_eq!(slot, deserialized);
    }
}
