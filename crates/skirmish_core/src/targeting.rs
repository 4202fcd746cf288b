//! Who may attack whom.
//!
//! Targeting is a pure predicate over [`TargetInfo`] snapshots and the
//! map's visibility layer. Nothing is cached: the simulation re-evaluates
//! every target every tick, because teams can lose sight of a unit at any
//! moment.

use crate::components::{ItemType, ObjectId, Owner, TileCoord};
use crate::map::Map;
use crate::math::Fixed;
use crate::unit_kind::{capabilities, TargetingProfile};

/// Radius in tiles within which idle armed units pick their own targets.
pub const DEFAULT_GUARD_RANGE: i32 = 10;

/// The facts about a unit that targeting decisions depend on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetInfo {
    /// Object id.
    pub id: ObjectId,
    /// Item type.
    pub item: ItemType,
    /// Owner.
    pub owner: Owner,
    /// Current tile.
    pub location: TileCoord,
    /// Whether the unit is airborne.
    pub flying: bool,
    /// Whether the unit still has health left.
    pub alive: bool,
}

/// Check whether `attacker` may target `candidate` right now.
///
/// Dead units and the attacker itself are never targetable.
#[must_use]
pub fn can_target(attacker: &TargetInfo, candidate: &TargetInfo, map: &Map) -> bool {
    if !candidate.alive || candidate.id == attacker.id {
        return false;
    }

    match capabilities(attacker.item).targeting {
        TargetingProfile::AirToGround => {
            !candidate.flying
                && (attacker.owner.is_enemy_of(&candidate.owner)
                    || candidate.item == ItemType::Sandworm)
                && map.is_visible(attacker.owner.team, candidate.location)
        }
        TargetingProfile::GroundOnly => {
            !candidate.flying
                && attacker.owner.is_enemy_of(&candidate.owner)
                && map.is_visible(attacker.owner.team, candidate.location)
        }
        TargetingProfile::Unarmed => false,
        TargetingProfile::Devour => !candidate.flying && candidate.item != ItemType::Sandworm,
    }
}

/// Pick the nearest targetable candidate within `range` tiles.
///
/// Distance is block distance between tiles. Ties go to the lowest object
/// id, so the choice does not depend on candidate order.
#[must_use]
pub fn acquire_target(
    attacker: &TargetInfo,
    candidates: &[TargetInfo],
    map: &Map,
    range: i32,
) -> Option<ObjectId> {
    let range = Fixed::from_num(range);
    candidates
        .iter()
        .filter(|candidate| can_target(attacker, candidate, map))
        .map(|candidate| (attacker.location.block_distance(candidate.location), candidate.id))
        .filter(|(distance, _)| *distance <= range)
        .min()
        .map(|(_, id)| id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::HouseId;

    fn info(id: ObjectId, item: ItemType, team: u8, x: i32) -> TargetInfo {
        TargetInfo {
            id,
            item,
            owner: Owner::new(HouseId::Atreides, team),
            location: TileCoord::new(x, 0),
            flying: capabilities(item).is_flying(),
            alive: true,
        }
    }

    fn visible_map() -> Map {
        let mut map = Map::new(32, 4);
        for team in 0..2 {
            map.reveal(team, TileCoord::new(0, 0), 40);
        }
        map
    }

    #[test]
    fn test_ornithopter_rules() {
        let map = visible_map();
        let thopter = info(1, ItemType::Ornithopter, 0, 0);

        assert!(can_target(&thopter, &info(2, ItemType::Tank, 1, 3), &map));
        assert!(!can_target(&thopter, &info(3, ItemType::Tank, 0, 3), &map));
        assert!(!can_target(&thopter, &info(4, ItemType::Ornithopter, 1, 3), &map));
        // The worm is fair game even on our own team.
        assert!(can_target(&thopter, &info(5, ItemType::Sandworm, 0, 3), &map));
    }

    #[test]
    fn test_invisible_candidates_are_skipped() {
        let map = Map::new(32, 4);
        let thopter = info(1, ItemType::Ornithopter, 0, 0);
        assert!(!can_target(&thopter, &info(2, ItemType::Tank, 1, 3), &map));
    }

    #[test]
    fn test_dead_and_self_are_skipped() {
        let map = visible_map();
        let tank = info(1, ItemType::Tank, 0, 0);
        let mut enemy = info(2, ItemType::Trike, 1, 1);
        enemy.alive = false;
        assert!(!can_target(&tank, &enemy, &map));
        assert!(!can_target(&tank, &tank, &map));
    }

    #[test]
    fn test_ground_only_and_unarmed() {
        let map = visible_map();
        let tank = info(1, ItemType::Tank, 0, 0);
        assert!(!can_target(&tank, &info(2, ItemType::Ornithopter, 1, 1), &map));
        assert!(can_target(&tank, &info(3, ItemType::Soldier, 1, 1), &map));

        let carryall = info(4, ItemType::Carryall, 0, 0);
        assert!(!can_target(&carryall, &info(3, ItemType::Soldier, 1, 1), &map));
    }

    #[test]
    fn test_worm_devours_everyone_on_the_ground() {
        let map = Map::new(8, 8);
        let worm = info(1, ItemType::Sandworm, 7, 0);
        assert!(can_target(&worm, &info(2, ItemType::Soldier, 7, 1), &map));
        assert!(can_target(&worm, &info(3, ItemType::Tank, 0, 1), &map));
        assert!(!can_target(&worm, &info(4, ItemType::Sandworm, 0, 1), &map));
        assert!(!can_target(&worm, &info(5, ItemType::Carryall, 0, 1), &map));
    }

    #[test]
    fn test_acquire_nearest_then_lowest_id() {
        let map = visible_map();
        let tank = info(1, ItemType::Tank, 0, 5);
        let candidates = [
            info(9, ItemType::Trike, 1, 8),
            info(7, ItemType::Trike, 1, 2),
            info(3, ItemType::Trike, 1, 20),
        ];
        // 9 and 7 are both three tiles away.
        assert_eq!(acquire_target(&tank, &candidates, &map, DEFAULT_GUARD_RANGE), Some(7));
        assert_eq!(acquire_target(&tank, &candidates, &map, 2), None);
    }
}
