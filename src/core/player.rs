//! Side identification and per-side data storage.
//!
//! A battle always has exactly two sides: the human-controlled side and the
//! heuristic opponent. `PlayerMap` stores one value per side and is indexed
//! by `PlayerId`.

use serde::{Deserialize, Serialize};
use std::ops::{Index, IndexMut};

/// Identifier for one of the two sides of a battle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerId(pub u8);

impl PlayerId {
    /// The human-controlled side.
    pub const HUMAN: PlayerId = PlayerId(0);

    /// The heuristic opponent.
    pub const AI: PlayerId = PlayerId(1);

    /// Both sides, human first.
    pub const BOTH: [PlayerId; 2] = [PlayerId::HUMAN, PlayerId::AI];

    /// Get the raw side index (0 or 1).
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// The other side.
    #[must_use]
    pub const fn opponent(self) -> PlayerId {
        if self.0 == 0 {
            PlayerId::AI
        } else {
            PlayerId::HUMAN
        }
    }

    #[must_use]
    pub const fn is_human(self) -> bool {
        self.0 == 0
    }
}

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_human() {
            write!(f, "Human")
        } else {
            write!(f, "AI")
        }
    }
}

/// One value per side with O(1) access.
///
/// ```
/// use bifronte::core::{PlayerId, PlayerMap};
///
/// let mut hp: PlayerMap<i32> = PlayerMap::new(|_| 20);
/// hp[PlayerId::AI] -= 3;
/// assert_eq!(hp[PlayerId::HUMAN], 20);
/// assert_eq!(hp[PlayerId::AI], 17);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerMap<T> {
    data: [T; 2],
}

impl<T> PlayerMap<T> {
    /// Build both entries from a factory.
    pub fn new(mut factory: impl FnMut(PlayerId) -> T) -> Self {
        Self {
            data: [factory(PlayerId::HUMAN), factory(PlayerId::AI)],
        }
    }

    /// Build from explicit values.
    pub fn from_pair(human: T, ai: T) -> Self {
        Self { data: [human, ai] }
    }

    pub fn get(&self, player: PlayerId) -> &T {
        &self.data[player.index()]
    }

    pub fn get_mut(&mut self, player: PlayerId) -> &mut T {
        &mut self.data[player.index()]
    }

    /// Iterate over (PlayerId, &T) pairs, human first.
    pub fn iter(&self) -> impl Iterator<Item = (PlayerId, &T)> {
        PlayerId::BOTH.into_iter().zip(self.data.iter())
    }

    /// Iterate over (PlayerId, &mut T) pairs, human first.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (PlayerId, &mut T)> {
        PlayerId::BOTH.into_iter().zip(self.data.iter_mut())
    }
}

impl<T: Default> Default for PlayerMap<T> {
    fn default() -> Self {
        Self::new(|_| T::default())
    }
}

impl<T> Index<PlayerId> for PlayerMap<T> {
    type Output = T;

    fn index(&self, player: PlayerId) -> &Self::Output {
        self.get(player)
    }
}

impl<T> IndexMut<PlayerId> for PlayerMap<T> {
    fn index_mut(&mut self, player: PlayerId) -> &mut Self::Output {
        self.get_mut(player)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opponent_is_involution() {
        for side in PlayerId::BOTH {
            assert_ne!(side, side.opponent());
            assert_eq!(side, side.opponent().opponent());
        }
    }

    #[test]
    fn test_player_map_mutation() {
        let mut map: PlayerMap<i32> = PlayerMap::default();

        map[PlayerId::HUMAN] = 10;
        map[PlayerId::AI] = 20;

        let pairs: Vec<_> = map.iter().collect();
        assert_eq!(pairs, vec![(PlayerId::HUMAN, &10), (PlayerId::AI, &20)]);
    }

    #[test]
    fn test_player_map_serialization() {
        let map = PlayerMap::from_pair(3, 0);
        let json = serde_json::to_string(&map).unwrap();
        let deserialized: PlayerMap<i32> = serde_json::from_str(&json).unwrap();
        assert_eq!(map, deserialized);
    }
}
