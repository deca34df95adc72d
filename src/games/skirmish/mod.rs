//! Skirmish: a small ready-to-play match.
//!
//! Two player factions (Ember attackers, Tide defenders) against a row of
//! warden slots. The pool uses every stock ability, which makes it the
//! fixture of choice for integration tests and demos.

mod game;

pub use game::{
    card_pool, starter_deck, BuildError, SkirmishBuilder, AEGIS_WARD, BRAZIER, EMBER,
    EMBER_DUELIST, EMBER_STANDARD, SPIKE_WARD, TIDE, TIDE_BULWARK, TIDE_HERALD, WARDENS,
};
