//! Combat: lane resolution and the two-phase attack protocol.

pub mod lanes;
pub mod protocol;

pub use lanes::{is_across, opposing, opposing_target, BoardLayout, LaneLookup};
pub use protocol::{
    attack, attack_target, block_value, declare, direct_damage, front_line_block,
    proposed_damage, run_deferred, strike_across, ResolutionHandler, Retry, StrikeOutcome,
    PHASE_COMBAT, RESOLUTION_PRIORITY,
};
