//! Core engine types: entities, sides, state, actions, RNG, configuration,
//! and errors.
//!
//! Nothing here knows about abilities or turn order. The rest of the crate
//! builds on these types.

pub mod action;
pub mod config;
pub mod entity;
pub mod error;
pub mod player;
pub mod rng;
pub mod state;

pub use action::{Action, ActionRecord};
pub use config::{DirectDamagePolicy, MatchConfig};
pub use entity::EntityId;
pub use error::{ConfigError, HandlerError, ProtocolViolation, Rejection};
pub use player::{PlayerId, PlayerMap};
pub use rng::GameRng;
pub use state::{DeferredStrike, PlayerState, World};
