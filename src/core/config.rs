//! Match configuration.
//!
//! `MatchConfig` carries every tunable a battle reads at construction:
//! board width, turn limit, action-point budgets, starting life, hand limits,
//! the RNG seed and the direct-damage policy. It is plain serde data, so hosts
//! can keep it in whatever file format they like.
//!
//! ```
//! use bifronte::core::{DirectDamagePolicy, MatchConfig};
//!
//! let config = MatchConfig::default()
//!     .with_lanes(4)
//!     .with_turn_limit(12)
//!     .with_direct_damage(DirectDamagePolicy::NetOfBlock);
//!
//! assert!(config.validate().is_ok());
//! assert_eq!(config.player_base_ap, 3);
//! ```

use serde::{Deserialize, Serialize};

use super::error::ConfigError;

/// How damage is computed when an attack finds no unit in the opposing lane.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DirectDamagePolicy {
    /// The full proposed damage reaches the opposing side's hp.
    #[default]
    Full,
    /// Proposed damage minus the total block of the opposing side's
    /// front-facing block cards.
    NetOfBlock,
}

/// Configuration for one battle.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    /// Lanes per side.
    pub lanes: usize,

    /// Number of rounds before the match ends on points.
    pub turn_limit: u32,

    /// Action points the human side receives at each turn start.
    pub player_base_ap: i32,

    /// Action points the opponent receives at each turn start.
    pub ai_base_ap: i32,

    pub starting_hp: i32,

    pub starting_hand_size: usize,

    pub max_hand_size: usize,

    pub seed: u64,

    pub direct_damage: DirectDamagePolicy,

    pub player_name: String,

    pub ai_name: String,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            lanes: 3,
            turn_limit: 10,
            player_base_ap: 3,
            ai_base_ap: 0,
            starting_hp: 20,
            starting_hand_size: 3,
            max_hand_size: 5,
            seed: 12345,
            direct_damage: DirectDamagePolicy::Full,
            player_name: "Player".to_string(),
            ai_name: "AI".to_string(),
        }
    }
}

impl MatchConfig {
    #[must_use]
    pub fn with_lanes(mut self, lanes: usize) -> Self {
        self.lanes = lanes;
        self
    }

    #[must_use]
    pub fn with_turn_limit(mut self, turns: u32) -> Self {
        self.turn_limit = turns;
        self
    }

    /// Set the per-turn action points of both sides.
    #[must_use]
    pub fn with_action_points(mut self, player: i32, ai: i32) -> Self {
        self.player_base_ap = player;
        self.ai_base_ap = ai;
        self
    }

    #[must_use]
    pub fn with_starting_hp(mut self, hp: i32) -> Self {
        self.starting_hp = hp;
        self
    }

    /// Set the starting hand and the hand limit.
    #[must_use]
    pub fn with_hand(mut self, starting: usize, max: usize) -> Self {
        self.starting_hand_size = starting;
        self.max_hand_size = max;
        self
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    #[must_use]
    pub fn with_direct_damage(mut self, policy: DirectDamagePolicy) -> Self {
        self.direct_damage = policy;
        self
    }

    #[must_use]
    pub fn with_names(mut self, player: impl Into<String>, ai: impl Into<String>) -> Self {
        self.player_name = player.into();
        self.ai_name = ai.into();
        self
    }

    /// Check that the configuration describes a playable battle.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.lanes == 0 {
            return Err(ConfigError::NoLanes);
        }
        if self.turn_limit == 0 {
            return Err(ConfigError::NoTurns);
        }
        for ap in [self.player_base_ap, self.ai_base_ap] {
            if ap < 0 {
                return Err(ConfigError::NegativeActionPoints(ap));
            }
        }
        if self.starting_hp <= 0 {
            return Err(ConfigError::NonPositiveHp(self.starting_hp));
        }
        if self.starting_hand_size > self.max_hand_size {
            return Err(ConfigError::HandTooLarge {
                starting: self.starting_hand_size,
                max: self.max_hand_size,
            });
        }
        Ok(())
    }
}
