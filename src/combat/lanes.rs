//! Lane resolver.
//!
//! A combatant's position is its lane index on its owner's board. The unit
//! "across" from it is whatever stands at the same index on the other side.
//! Board sizes may differ between the two sides.
//!
//! The resolver reads the board through `BoardLayout`, so it can be used
//! against any layout provider; `World` is the one the engine uses.

use crate::core::{EntityId, PlayerId, World};

/// Board/layout provider.
pub trait BoardLayout {
    /// Side and lane index of a combatant on the board.
    fn locate(&self, id: EntityId) -> Option<(PlayerId, usize)>;

    /// Occupant of a lane, dead or alive.
    fn occupant(&self, side: PlayerId, lane: usize) -> Option<EntityId>;

    fn lane_count(&self, side: PlayerId) -> usize;

    fn is_alive(&self, id: EntityId) -> bool;

    /// Is this side's board being rebuilt right now?
    fn is_rebuilding(&self, _side: PlayerId) -> bool {
        false
    }
}

impl BoardLayout for World {
    fn locate(&self, id: EntityId) -> Option<(PlayerId, usize)> {
        let owner = self.combatant(id)?.owner();
        let lane = self.player(owner).lane_of(id)?;
        Some((owner, lane))
    }

    fn occupant(&self, side: PlayerId, lane: usize) -> Option<EntityId> {
        self.player(side).lane(lane)
    }

    fn lane_count(&self, side: PlayerId) -> usize {
        self.player(side).lane_count()
    }

    fn is_alive(&self, id: EntityId) -> bool {
        World::is_alive(self, id)
    }

    fn is_rebuilding(&self, side: PlayerId) -> bool {
        World::is_rebuilding(self, side)
    }
}

/// What stands across from an attacker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LaneLookup {
    /// A living combatant.
    Occupied(EntityId),
    /// Out of range, empty, or holding a dead combatant.
    Vacant,
    /// The opposing board is mid-rebuild; try again next tick.
    Rebuilding,
    /// The attacker is not on a board.
    Unplaced,
}

/// Resolve the lane across from `attacker`.
pub fn opposing<B: BoardLayout + ?Sized>(layout: &B, attacker: EntityId) -> LaneLookup {
    let Some((side, lane)) = layout.locate(attacker) else {
        return LaneLookup::Unplaced;
    };
    let across = side.opponent();
    if layout.is_rebuilding(across) {
        return LaneLookup::Rebuilding;
    }
    if lane >= layout.lane_count(across) {
        return LaneLookup::Vacant;
    }
    match layout.occupant(across, lane) {
        Some(id) if layout.is_alive(id) => LaneLookup::Occupied(id),
        _ => LaneLookup::Vacant,
    }
}

/// The living combatant across from `attacker`, if any.
pub fn opposing_target<B: BoardLayout + ?Sized>(layout: &B, attacker: EntityId) -> Option<EntityId> {
    match opposing(layout, attacker) {
        LaneLookup::Occupied(id) => Some(id),
        _ => None,
    }
}

/// Does `other` stand directly across from `unit`?
pub fn is_across<B: BoardLayout + ?Sized>(layout: &B, unit: EntityId, other: EntityId) -> bool {
    opposing_target(layout, unit) == Some(other)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustc_hash::FxHashMap;

    /// Hand-built layout: lanes per side, plus a set of dead ids.
    #[derive(Default)]
    struct Grid {
        lanes: [Vec<Option<EntityId>>; 2],
        dead: Vec<EntityId>,
        rebuilding: Option<PlayerId>,
    }

    impl Grid {
        fn index(&self) -> FxHashMap<EntityId, (PlayerId, usize)> {
            let mut out = FxHashMap::default();
            for side in PlayerId::BOTH {
                for (lane, occupant) in self.lanes[side.index()].iter().enumerate() {
                    if let Some(id) = occupant {
                        out.insert(*id, (side, lane));
                    }
                }
            }
            out
        }
    }

    impl BoardLayout for Grid {
        fn locate(&self, id: EntityId) -> Option<(PlayerId, usize)> {
            self.index().get(&id).copied()
        }

        fn occupant(&self, side: PlayerId, lane: usize) -> Option<EntityId> {
            self.lanes[side.index()].get(lane).copied().flatten()
        }

        fn lane_count(&self, side: PlayerId) -> usize {
            self.lanes[side.index()].len()
        }

        fn is_alive(&self, id: EntityId) -> bool {
            !self.dead.contains(&id)
        }

        fn is_rebuilding(&self, side: PlayerId) -> bool {
            self.rebuilding == Some(side)
        }
    }

    fn grid() -> Grid {
        Grid {
            lanes: [
                vec![Some(EntityId(1)), Some(EntityId(2)), Some(EntityId(3)), Some(EntityId(4))],
                vec![Some(EntityId(11)), None, Some(EntityId(13))],
            ],
            ..Grid::default()
        }
    }

    #[test]
    fn test_occupied_lane() {
        let g = grid();
        assert_eq!(opposing(&g, EntityId(1)), LaneLookup::Occupied(EntityId(11)));
        assert_eq!(opposing(&g, EntityId(13)), LaneLookup::Occupied(EntityId(3)));
        assert!(is_across(&g, EntityId(11), EntityId(1)));
        assert!(!is_across(&g, EntityId(11), EntityId(2)));
    }

    #[test]
    fn test_empty_lane_is_vacant() {
        assert_eq!(opposing(&grid(), EntityId(2)), LaneLookup::Vacant);
    }

    #[test]
    fn test_unequal_board_sizes() {
        // Lane 3 exists for the human side only.
        assert_eq!(opposing(&grid(), EntityId(4)), LaneLookup::Vacant);
    }

    #[test]
    fn test_dead_occupant_is_vacant() {
        let mut g = grid();
        g.dead.push(EntityId(11));
        assert_eq!(opposing(&g, EntityId(1)), LaneLookup::Vacant);
        assert_eq!(opposing_target(&g, EntityId(1)), None);
    }

    #[test]
    fn test_rebuilding_side() {
        let mut g = grid();
        g.rebuilding = Some(PlayerId::AI);
        assert_eq!(opposing(&g, EntityId(1)), LaneLookup::Rebuilding);
        assert_eq!(opposing(&g, EntityId(11)), LaneLookup::Occupied(EntityId(1)));
    }

    #[test]
    fn test_unplaced_attacker() {
        assert_eq!(opposing(&grid(), EntityId(99)), LaneLookup::Unplaced);
    }
}
