//! Card system: definitions, combatant instances, and registry.
//!
//! ## Key Types
//!
//! - `CardDefinition` / `SlotDefinition`: static data, both faces of a card
//! - `Card` / `Slot`: runtime state on a board
//! - `Combatant`: closed union over the two, with shared accessors
//! - `CombatantRef`: tagged reference carried in event contexts
//! - `CardRegistry`: definition lookup and deck expansion

pub mod definition;
pub mod instance;
pub mod registry;

pub use definition::{
    CardDefinition, CardId, FactionId, FrontType, Side, SlotDefinition, SlotId,
};
pub use instance::{Card, Combatant, CombatantRef, HitModifiers, Slot};
pub use registry::{CardRegistry, DeckEntry};
