//! # bifronte
//!
//! An event-driven lane combat engine for a turn-based card battler where
//! every card has two faces.
//!
//! ## Design Principles
//!
//! 1. **Everything goes through the bus**: combatants, abilities, and the
//!    turn driver never call each other. They publish events and react to
//!    them on a synchronous `EventBus`.
//!
//! 2. **Two-phase attacks**: an attack is declared first, giving abilities
//!    one window to adjust the incoming hit, and resolved after every other
//!    subscriber has run.
//!
//! 3. **Lanes are positions**: each side has a row of lanes, and a unit
//!    attacks whatever stands at the same index on the other side.
//!
//! 4. **Nothing is fatal**: invalid actions are rejected with a value,
//!    malformed events are dropped, and a failing handler never stops the
//!    dispatch loop.
//!
//! ## Modules
//!
//! - `core`: entity ids, sides, world state, actions, RNG, config, errors
//! - `cards`: definitions, combatant instances, and the registry
//! - `events`: event kinds, the bus, and the recording journal
//! - `combat`: lane resolver and attack protocol
//! - `abilities`: ability trait, bindings, and data-driven ability specs
//! - `rules`: the turn/phase driver and its policies
//! - `games`: sample content
//!
//! ## Example
//!
//! ```
//! use bifronte::games::skirmish::SkirmishBuilder;
//! use bifronte::rules::{KeepLayout, TurnPhase};
//!
//! let mut battle = SkirmishBuilder::new()
//!     .with_opening_board()
//!     .with_starting_hand()
//!     .build()
//!     .unwrap()
//!     .with_layout_policy(KeepLayout);
//!
//! battle.start().unwrap();
//! battle.attack_all().unwrap();
//! assert_eq!(battle.phase(), TurnPhase::AwaitingEndTurn);
//!
//! battle.end_turn().unwrap();
//! assert_eq!(battle.turn(), 2);
//! ```

pub mod abilities;
pub mod cards;
pub mod combat;
pub mod core;
pub mod events;
pub mod games;
pub mod rules;

pub use abilities::{Ability, AbilityBinding, AbilitySpec};
pub use cards::{CardDefinition, CardRegistry, Combatant, CombatantRef, SlotDefinition};
pub use core::{Action, EntityId, MatchConfig, PlayerId, Rejection, World};
pub use events::{EventBus, EventContext, EventJournal, EventKind};
pub use rules::{Battle, GameResult, TurnPhase};
