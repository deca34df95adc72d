//! Match rules: the turn/phase driver, its policy collaborators, and results.
//!
//! `Battle` is the only place that mutates the world outside of event
//! handlers. It validates every player operation, spends action points,
//! sequences turns, and decides when the match is over.

pub mod battle;
pub mod outcome;
pub mod policy;

pub use battle::{Battle, TurnPhase, INFO_ENEMY_SHUFFLE, INFO_MATCH_END, INFO_MATCH_START};
pub use outcome::{GameResult, MatchSummary};
pub use policy::{KeepLayout, Passive, RandomizeLayout, SlotSweep, TurnExecutor, TurnStartPolicy};
