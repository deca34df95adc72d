//! Match results.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::{PlayerId, World};

/// Result of a completed match.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameResult {
    Winner(PlayerId),
    Draw,
}

impl GameResult {
    /// Decide by hp difference. Equal hp, including both sides at zero, is
    /// a draw.
    #[must_use]
    pub fn from_hp(human: i32, ai: i32) -> Self {
        match human.cmp(&ai) {
            Ordering::Greater => GameResult::Winner(PlayerId::HUMAN),
            Ordering::Less => GameResult::Winner(PlayerId::AI),
            Ordering::Equal => GameResult::Draw,
        }
    }

    #[must_use]
    pub fn is_winner(&self, player: PlayerId) -> bool {
        *self == GameResult::Winner(player)
    }
}

impl fmt::Display for GameResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameResult::Winner(side) => write!(f, "{side} wins"),
            GameResult::Draw => write!(f, "Draw"),
        }
    }
}

/// Final numbers of a finished match.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchSummary {
    pub result: GameResult,
    pub turns: u32,
    pub actions: usize,
    pub player_name: String,
    pub player_hp: i32,
    pub ai_name: String,
    pub ai_hp: i32,
}

impl MatchSummary {
    #[must_use]
    pub fn new(result: GameResult, world: &World, turns: u32, actions: usize) -> Self {
        let human = world.player(PlayerId::HUMAN);
        let ai = world.player(PlayerId::AI);
        Self {
            result,
            turns,
            actions,
            player_name: human.name.clone(),
            player_hp: human.hp,
            ai_name: ai.name.clone(),
            ai_hp: ai.hp,
        }
    }

    /// `Score: <player> <hp> - <ai> <hp> (<result>)`
    #[must_use]
    pub fn score_line(&self) -> String {
        format!(
            "Score: {} {} - {} {} ({})",
            self.player_name, self.player_hp, self.ai_name, self.ai_hp, self.result
        )
    }
}
