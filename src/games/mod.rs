//! Sample game content built on the engine.

pub mod skirmish;
