//! Skirmish content and builder.

use thiserror::Error;

use crate::abilities::AbilitySpec;
use crate::cards::{
    CardDefinition, CardId, CardRegistry, DeckEntry, FactionId, Side, SlotDefinition, SlotId,
};
use crate::core::{ConfigError, MatchConfig, PlayerId, Rejection};
use crate::rules::Battle;

pub const EMBER: FactionId = FactionId::new(0);
pub const TIDE: FactionId = FactionId::new(1);
pub const WARDENS: FactionId = FactionId::new(9);

pub const EMBER_DUELIST: CardId = CardId::new(1);
pub const EMBER_STANDARD: CardId = CardId::new(2);
pub const TIDE_BULWARK: CardId = CardId::new(3);
pub const TIDE_HERALD: CardId = CardId::new(4);

pub const SPIKE_WARD: SlotId = SlotId::new(1);
pub const AEGIS_WARD: SlotId = SlotId::new(2);
pub const BRAZIER: SlotId = SlotId::new(3);

/// Player units placed by `with_opening_board`, by lane.
const OPENING_CARDS: [(CardId, Side); 3] = [
    (EMBER_DUELIST, Side::Front),
    (TIDE_BULWARK, Side::Front),
    (EMBER_STANDARD, Side::Back),
];

/// Opponent slots placed by `with_opening_board`, by lane.
const OPENING_SLOTS: [SlotId; 3] = [SPIKE_WARD, AEGIS_WARD, BRAZIER];

/// The skirmish card and slot pool.
#[must_use]
pub fn card_pool() -> CardRegistry {
    let mut registry = CardRegistry::new();

    registry.register_card(
        CardDefinition::new(EMBER_DUELIST, "Ember Duelist", EMBER)
            .with_health(5)
            .attacker(3)
            .with_back_damage_bonus(1)
            .with_back_ap_bonus(1)
            .with_ability(AbilitySpec::flip_strike(2, true)),
    );
    registry.register_card(
        CardDefinition::new(EMBER_STANDARD, "Ember Standard", EMBER)
            .with_health(4)
            .attacker(1)
            .with_back_damage_bonus(2)
            .with_back_ap_bonus(1)
            .with_ability(AbilitySpec::back_rally(1)),
    );
    registry.register_card(
        CardDefinition::new(TIDE_BULWARK, "Tide Bulwark", TIDE)
            .with_health(7)
            .blocker(2)
            .with_back_block_bonus(1),
    );
    registry.register_card(
        CardDefinition::new(TIDE_HERALD, "Tide Herald", TIDE)
            .with_health(4)
            .attacker(2)
            .with_back_block_bonus(1)
            .with_back_ap_bonus(1)
            .with_ability(AbilitySpec::end_turn_barrage(1)),
    );

    registry.register_slot(
        SlotDefinition::new(SPIKE_WARD, "Spike Ward", WARDENS)
            .with_health(6)
            .with_block(1)
            .with_ability(AbilitySpec::slot_strike(2)),
    );
    registry.register_slot(
        SlotDefinition::new(AEGIS_WARD, "Aegis Ward", WARDENS)
            .with_health(3)
            .with_ability(AbilitySpec::shield())
            .with_ability(AbilitySpec::slot_strike(1)),
    );
    registry.register_slot(
        SlotDefinition::new(BRAZIER, "Brazier", WARDENS)
            .with_health(4)
            .with_block(2)
            .with_ability(AbilitySpec::slot_strike(3)),
    );

    registry
}

/// Two copies of every card.
#[must_use]
pub fn starter_deck() -> Vec<DeckEntry> {
    [EMBER_DUELIST, EMBER_STANDARD, TIDE_BULWARK, TIDE_HERALD]
        .into_iter()
        .map(|card| DeckEntry::new(card, 2))
        .collect()
}

/// Why a skirmish could not be built.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("opening board: {0}")]
    Board(#[from] Rejection),
}

/// Builder for a skirmish battle.
#[derive(Clone, Debug, Default)]
pub struct SkirmishBuilder {
    config: MatchConfig,
    opening_board: bool,
    starting_hand: bool,
}

impl SkirmishBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_config(mut self, config: MatchConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.config.seed = seed;
        self
    }

    /// Place the sample units in the first lanes of both boards.
    #[must_use]
    pub fn with_opening_board(mut self) -> Self {
        self.opening_board = true;
        self
    }

    /// Load the starter deck and deal the player's starting hand.
    #[must_use]
    pub fn with_starting_hand(mut self) -> Self {
        self.starting_hand = true;
        self
    }

    /// Build the battle. It is not started.
    pub fn build(self) -> Result<Battle, BuildError> {
        let lanes = self.config.lanes;
        let mut battle = Battle::new(self.config, card_pool())?;

        if self.opening_board {
            for (lane, (card, side)) in OPENING_CARDS.into_iter().enumerate().take(lanes) {
                battle.spawn_card(PlayerId::HUMAN, lane, card, side)?;
            }
            for (lane, slot) in OPENING_SLOTS.into_iter().enumerate().take(lanes) {
                battle.spawn_slot(lane, slot)?;
            }
        }

        battle.set_deck(PlayerId::HUMAN, &starter_deck());
        if self.starting_hand {
            battle.deal_starting_hand(PlayerId::HUMAN);
        }
        Ok(battle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_uses_every_stock_ability() {
        let pool = card_pool();
        let names: Vec<String> = pool
            .cards()
            .flat_map(|c| c.abilities.iter())
            .chain(pool.slots().flat_map(|s| s.abilities.iter()))
            .map(|a| a.name.clone())
            .collect();

        for stock in ["Shield", "Flip Strike", "Back Rally", "Barrage", "Slot Strike"] {
            assert!(names.iter().any(|n| n == stock), "missing {stock}");
        }
    }

    #[test]
    fn test_build_places_opening_board() {
        let battle = SkirmishBuilder::new()
            .with_opening_board()
            .with_starting_hand()
            .build()
            .unwrap();

        assert_eq!(battle.world().player(PlayerId::HUMAN).occupants().count(), 3);
        assert_eq!(battle.world().player(PlayerId::AI).occupants().count(), 3);
        assert_eq!(battle.hand(PlayerId::HUMAN).len(), 3);
        assert_eq!(battle.deck_len(PlayerId::HUMAN), 5);
    }

    #[test]
    fn test_narrow_board_places_fewer_units() {
        let battle = SkirmishBuilder::new()
            .with_config(MatchConfig::default().with_lanes(2))
            .with_opening_board()
            .build()
            .unwrap();

        assert_eq!(battle.world().player(PlayerId::HUMAN).occupants().count(), 2);
        assert!(battle.hand(PlayerId::HUMAN).is_empty());
        assert_eq!(battle.deck_len(PlayerId::HUMAN), 8);
    }

    #[test]
    fn test_bad_config_is_reported() {
        let err = SkirmishBuilder::new()
            .with_config(MatchConfig::default().with_turn_limit(0))
            .build()
            .unwrap_err();
        assert_eq!(err, BuildError::Config(ConfigError::NoTurns));
    }
}
