//! Definition registry and deck lists.
//!
//! `CardRegistry` stores every card and slot definition a battle can spawn.
//! Decks are lists of `DeckEntry` (a card and a number of copies) that the
//! registry expands into a flat draw pile.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use super::definition::{CardDefinition, CardId, SlotDefinition, SlotId};

/// A card and how many copies of it go into the deck.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeckEntry {
    pub card: CardId,
    pub copies: u32,
}

impl DeckEntry {
    #[must_use]
    pub const fn new(card: CardId, copies: u32) -> Self {
        Self { card, copies }
    }
}

/// Registry of card and slot definitions.
///
/// ## Example
///
/// ```
/// use bifronte::cards::{CardDefinition, CardId, CardRegistry, DeckEntry, FactionId};
///
/// let mut registry = CardRegistry::new();
/// registry.register_card(
///     CardDefinition::new(CardId::new(1), "Ember Duelist", FactionId::new(0)).attacker(3),
/// );
///
/// let deck = registry.expand_deck(&[DeckEntry::new(CardId::new(1), 2)]);
/// assert_eq!(deck, vec![CardId::new(1), CardId::new(1)]);
/// ```
#[derive(Clone, Debug, Default)]
pub struct CardRegistry {
    cards: FxHashMap<CardId, CardDefinition>,
    slots: FxHashMap<SlotId, SlotDefinition>,
}

impl CardRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a card definition.
    ///
    /// Panics if a card with the same ID already exists.
    pub fn register_card(&mut self, card: CardDefinition) {
        if self.cards.contains_key(&card.id) {
            panic!("Card with ID {:?} already registered", card.id);
        }
        self.cards.insert(card.id, card);
    }

    /// Register a slot definition.
    ///
    /// Panics if a slot with the same ID already exists.
    pub fn register_slot(&mut self, slot: SlotDefinition) {
        if self.slots.contains_key(&slot.id) {
            panic!("Slot with ID {:?} already registered", slot.id);
        }
        self.slots.insert(slot.id, slot);
    }

    #[must_use]
    pub fn card(&self, id: CardId) -> Option<&CardDefinition> {
        self.cards.get(&id)
    }

    #[must_use]
    pub fn slot(&self, id: SlotId) -> Option<&SlotDefinition> {
        self.slots.get(&id)
    }

    #[must_use]
    pub fn card_count(&self) -> usize {
        self.cards.len()
    }

    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Iterate over all card definitions.
    pub fn cards(&self) -> impl Iterator<Item = &CardDefinition> {
        self.cards.values()
    }

    /// Iterate over all slot definitions.
    pub fn slots(&self) -> impl Iterator<Item = &SlotDefinition> {
        self.slots.values()
    }

    /// Expand deck entries into a draw pile, in entry order.
    ///
    /// Entries naming unregistered cards are skipped.
    #[must_use]
    pub fn expand_deck(&self, entries: &[DeckEntry]) -> Vec<CardId> {
        entries
            .iter()
            .filter(|entry| self.cards.contains_key(&entry.card))
            .flat_map(|entry| std::iter::repeat(entry.card).take(entry.copies as usize))
            .collect()
    }
}
