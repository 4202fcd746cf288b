//! Tile grid with per-category occupancy and per-team visibility.
//!
//! The map owns every [`Tile`]. Units refer to their tile only by
//! coordinate and the map never points back at units, so there are no
//! ownership cycles.
//!
//! # Occupancy rules
//!
//! - [`OccupancyCategory::Ground`]: one vehicle, exclusive of infantry.
//! - [`OccupancyCategory::Infantry`]: up to [`NUM_INFANTRY_PER_TILE`]
//!   soldiers, never together with a ground vehicle.
//! - [`OccupancyCategory::Air`]: any number of aircraft. The air layer never
//!   conflicts with the ground layer.
//!
//! Coordinates outside the map are an expected condition: every operation
//! checks [`Map::tile_exists`] first and reports "no effect". Breaking an
//! occupancy rule is a programming error and panics.

use serde::{Deserialize, Serialize};

use crate::components::{HouseId, ObjectId, TeamId, TileCoord};

/// Maximum number of infantry units sharing one tile.
pub const NUM_INFANTRY_PER_TILE: usize = 5;

/// Number of teams tracked by the visibility layer.
pub const MAX_TEAMS: TeamId = 8;

/// Occupancy slot a unit registers in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OccupancyCategory {
    /// Ground vehicles.
    Ground,
    /// Foot soldiers.
    Infantry,
    /// Aircraft.
    Air,
}

impl OccupancyCategory {
    /// All categories in slot order.
    pub const ALL: [Self; 3] = [Self::Ground, Self::Infantry, Self::Air];
}

/// What kind of remains a dead-unit marker shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeadUnitKind {
    /// Crashed ornithopter.
    Ornithopter,
    /// Burnt-out ground vehicle.
    Vehicle,
    /// Fallen infantry.
    Infantry,
}

/// Remains of a destroyed unit left on a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeadUnitMarker {
    /// Kind of remains.
    pub kind: DeadUnitKind,
    /// House of the destroyed unit.
    pub house: HouseId,
    /// Rounded world position the unit died at.
    pub position: (i32, i32),
}

/// One map cell.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Tile {
    ground: Option<ObjectId>,
    infantry: Vec<ObjectId>,
    air: Vec<ObjectId>,
    wrecks: Vec<DeadUnitMarker>,
}

impl Tile {
    /// Occupants registered in one category.
    #[must_use]
    pub fn occupants(&self, category: OccupancyCategory) -> &[ObjectId] {
        match category {
            OccupancyCategory::Ground => match &self.ground {
                Some(id) => std::slice::from_ref(id),
                None => &[],
            },
            OccupancyCategory::Infantry => &self.infantry,
            OccupancyCategory::Air => &self.air,
        }
    }

    /// Dead-unit markers on this tile, oldest first.
    #[must_use]
    pub fn wrecks(&self) -> &[DeadUnitMarker] {
        &self.wrecks
    }

    /// Check whether any ground-layer unit (vehicle or infantry) is here.
    #[must_use]
    pub fn has_ground_layer_occupant(&self) -> bool {
        self.ground.is_some() || !self.infantry.is_empty()
    }

    /// Check whether any aircraft is here.
    #[must_use]
    pub fn has_air_occupant(&self) -> bool {
        !self.air.is_empty()
    }

    fn contains(&self, id: ObjectId, category: OccupancyCategory) -> bool {
        self.occupants(category).contains(&id)
    }

    fn has_room_for(&self, category: OccupancyCategory) -> bool {
        match category {
            OccupancyCategory::Ground => !self.has_ground_layer_occupant(),
            OccupancyCategory::Infantry => {
                self.ground.is_none() && self.infantry.len() < NUM_INFANTRY_PER_TILE
            }
            OccupancyCategory::Air => true,
        }
    }

    fn insert(&mut self, id: ObjectId, category: OccupancyCategory) {
        match category {
            OccupancyCategory::Ground => self.ground = Some(id),
            OccupancyCategory::Infantry => insert_sorted(&mut self.infantry, id),
            OccupancyCategory::Air => insert_sorted(&mut self.air, id),
        }
    }

    fn remove(&mut self, id: ObjectId, category: OccupancyCategory) -> bool {
        match category {
            OccupancyCategory::Ground => {
                if self.ground == Some(id) {
                    self.ground = None;
                    true
                } else {
                    false
                }
            }
            OccupancyCategory::Infantry => remove_id(&mut self.infantry, id),
            OccupancyCategory::Air => remove_id(&mut self.air, id),
        }
    }
}

// Shared lists stay sorted by id, so their contents do not depend on the
// order units arrived in.
fn insert_sorted(list: &mut Vec<ObjectId>, id: ObjectId) {
    let index = list.partition_point(|&other| other < id);
    list.insert(index, id);
}

fn remove_id(list: &mut Vec<ObjectId>, id: ObjectId) -> bool {
    match list.iter().position(|&other| other == id) {
        Some(index) => {
            list.remove(index);
            true
        }
        None => false,
    }
}

/// The tile grid.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Map {
    width: i32,
    height: i32,
    tiles: Vec<Tile>,
    /// One bit per team for every tile, row-major.
    visibility: Vec<u8>,
}

impl Map {
    /// Create an empty, unexplored map.
    ///
    /// # Panics
    ///
    /// Panics if `width` or `height` is not positive.
    #[must_use]
    pub fn new(width: i32, height: i32) -> Self {
        assert!(width > 0, "Map width must be positive");
        assert!(height > 0, "Map height must be positive");

        let tile_count = (width as usize) * (height as usize);
        Self {
            width,
            height,
            tiles: vec![Tile::default(); tile_count],
            visibility: vec![0; tile_count],
        }
    }

    /// Map width in tiles.
    #[must_use]
    pub const fn width(&self) -> i32 {
        self.width
    }

    /// Map height in tiles.
    #[must_use]
    pub const fn height(&self) -> i32 {
        self.height
    }

    #[inline]
    fn index(&self, coord: TileCoord) -> Option<usize> {
        if self.tile_exists(coord) {
            Some((coord.y as usize) * (self.width as usize) + (coord.x as usize))
        } else {
            None
        }
    }

    /// Check if a coordinate lies on the map.
    #[must_use]
    pub const fn tile_exists(&self, coord: TileCoord) -> bool {
        coord.x >= 0 && coord.x < self.width && coord.y >= 0 && coord.y < self.height
    }

    /// Get the tile at a coordinate.
    /// Returns `None` if out of bounds.
    #[must_use]
    pub fn get_tile(&self, coord: TileCoord) -> Option<&Tile> {
        self.index(coord).map(|index| &self.tiles[index])
    }

    fn tile_mut(&mut self, coord: TileCoord) -> Option<&mut Tile> {
        self.index(coord).map(move |index| &mut self.tiles[index])
    }

    /// Current occupants of one category. Empty for out-of-map coordinates.
    #[must_use]
    pub fn query(&self, coord: TileCoord, category: OccupancyCategory) -> &[ObjectId] {
        self.get_tile(coord)
            .map_or(&[], |tile| tile.occupants(category))
    }

    /// Check whether `id` could be assigned to `coord` right now.
    #[must_use]
    pub fn can_assign(&self, id: ObjectId, coord: TileCoord, category: OccupancyCategory) -> bool {
        self.get_tile(coord)
            .is_some_and(|tile| !tile.contains(id, category) && tile.has_room_for(category))
    }

    /// Register `id` on a tile.
    ///
    /// Returns `false` (and changes nothing) if the tile does not exist.
    ///
    /// # Panics
    ///
    /// Panics if `id` is already registered there, or if the tile has no room
    /// for another occupant of `category`. Callers check
    /// [`can_assign`](Self::can_assign) for moves that may be blocked.
    pub fn assign(&mut self, id: ObjectId, coord: TileCoord, category: OccupancyCategory) -> bool {
        let Some(tile) = self.tile_mut(coord) else {
            return false;
        };
        assert!(
            !tile.contains(id, category),
            "object {id} assigned twice to tile {coord} as {category:?}"
        );
        assert!(
            tile.has_room_for(category),
            "occupancy conflict: tile {coord} has no {category:?} room for object {id}"
        );
        tile.insert(id, category);
        true
    }

    /// Remove `id` from a tile.
    ///
    /// Returns `false` (and changes nothing) if the tile does not exist.
    ///
    /// # Panics
    ///
    /// Panics if `id` is not registered there.
    pub fn unassign(&mut self, id: ObjectId, coord: TileCoord, category: OccupancyCategory) -> bool {
        let Some(tile) = self.tile_mut(coord) else {
            return false;
        };
        let removed = tile.remove(id, category);
        assert!(
            removed,
            "object {id} is not registered on tile {coord} as {category:?}"
        );
        true
    }

    /// Move `id` from one tile to another in a single step.
    ///
    /// Returns `false` and leaves both tiles untouched when `to` does not
    /// exist or has no room. Nothing can observe the unit registered in
    /// zero or two tiles.
    ///
    /// # Panics
    ///
    /// Panics if `id` is not registered on `from`.
    pub fn relocate(
        &mut self,
        id: ObjectId,
        from: TileCoord,
        to: TileCoord,
        category: OccupancyCategory,
    ) -> bool {
        if from == to {
            assert!(
                self.get_tile(from).is_some_and(|tile| tile.contains(id, category)),
                "object {id} is not registered on tile {from} as {category:?}"
            );
            return true;
        }
        if !self.can_assign(id, to, category) {
            return false;
        }
        self.unassign(id, from, category);
        self.assign(id, to, category)
    }

    /// Leave a dead-unit marker on a tile.
    /// Returns `false` if out of bounds.
    pub fn place_wreck(&mut self, coord: TileCoord, marker: DeadUnitMarker) -> bool {
        match self.tile_mut(coord) {
            Some(tile) => {
                tile.wrecks.push(marker);
                true
            }
            None => false,
        }
    }

    /// Dead-unit markers on a tile. Empty for out-of-map coordinates.
    #[must_use]
    pub fn wrecks(&self, coord: TileCoord) -> &[DeadUnitMarker] {
        self.get_tile(coord).map_or(&[], Tile::wrecks)
    }

    /// All wrecks in row-major tile order.
    pub fn all_wrecks(&self) -> impl Iterator<Item = (TileCoord, &DeadUnitMarker)> + '_ {
        self.coords()
            .zip(self.tiles.iter())
            .flat_map(|(coord, tile)| tile.wrecks.iter().map(move |w| (coord, w)))
    }

    /// Mark every tile within `range` tiles of `centre` as seen by `team`.
    ///
    /// Teams outside [`MAX_TEAMS`] have no visibility layer and are ignored.
    pub fn reveal(&mut self, team: TeamId, centre: TileCoord, range: u32) {
        if team >= MAX_TEAMS {
            return;
        }
        let bit = 1u8 << team;
        let r = range as i32;
        let r_sq = r * r;
        for y in (centre.y - r)..=(centre.y + r) {
            for x in (centre.x - r)..=(centre.x + r) {
                let dx = x - centre.x;
                let dy = y - centre.y;
                if dx * dx + dy * dy > r_sq {
                    continue;
                }
                if let Some(index) = self.index(TileCoord::new(x, y)) {
                    self.visibility[index] |= bit;
                }
            }
        }
    }

    /// Check whether `team` has seen a tile.
    #[must_use]
    pub fn is_visible(&self, team: TeamId, coord: TileCoord) -> bool {
        if team >= MAX_TEAMS {
            return false;
        }
        self.index(coord)
            .is_some_and(|index| self.visibility[index] & (1 << team) != 0)
    }

    /// Check whether any team has seen a tile.
    #[must_use]
    pub fn is_visible_to_any(&self, coord: TileCoord) -> bool {
        self.index(coord)
            .is_some_and(|index| self.visibility[index] != 0)
    }

    /// Raw visibility bits, row-major.
    #[must_use]
    pub fn visibility_rows(&self) -> &[u8] {
        &self.visibility
    }

    /// Replace the visibility layer.
    /// Returns `false` (and changes nothing) if the length does not match.
    pub fn restore_visibility(&mut self, rows: Vec<u8>) -> bool {
        if rows.len() != self.visibility.len() {
            return false;
        }
        self.visibility = rows;
        true
    }

    /// Every `(tile, category)` slot holding `id`.
    ///
    /// Scans the whole map; meant for tests and debug validation.
    #[must_use]
    pub fn registrations(&self, id: ObjectId) -> Vec<(TileCoord, OccupancyCategory)> {
        let mut found = Vec::new();
        for (coord, tile) in self.coords().zip(self.tiles.iter()) {
            for category in OccupancyCategory::ALL {
                if tile.contains(id, category) {
                    found.push((coord, category));
                }
            }
        }
        found
    }

    /// Total number of registered occupants across all tiles.
    #[must_use]
    pub fn occupant_count(&self) -> usize {
        self.tiles
            .iter()
            .map(|tile| usize::from(tile.ground.is_some()) + tile.infantry.len() + tile.air.len())
            .sum()
    }

    fn coords(&self) -> impl Iterator<Item = TileCoord> {
        let width = self.width;
        let height = self.height;
        (0..height).flat_map(move |y| (0..width).map(move |x| TileCoord::new(x, y)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(x: i32, y: i32) -> TileCoord {
        TileCoord::new(x, y)
    }

    #[test]
    fn test_out_of_bounds_is_no_op() {
        let mut map = Map::new(4, 4);
        assert!(!map.tile_exists(t(-1, 0)));
        assert!(!map.tile_exists(t(4, 0)));
        assert!(!map.assign(1, t(4, 4), OccupancyCategory::Ground));
        assert!(!map.unassign(1, t(-1, 2), OccupancyCategory::Air));
        assert!(map.query(t(9, 9), OccupancyCategory::Ground).is_empty());
        assert!(map.get_tile(t(0, -1)).is_none());
        assert_eq!(map.occupant_count(), 0);
    }

    #[test]
    fn test_ground_and_air_share_tile() {
        let mut map = Map::new(4, 4);
        assert!(map.assign(1, t(1, 1), OccupancyCategory::Ground));
        assert!(map.assign(2, t(1, 1), OccupancyCategory::Air));
        assert!(map.assign(3, t(1, 1), OccupancyCategory::Air));
        assert_eq!(map.query(t(1, 1), OccupancyCategory::Ground), &[1]);
        assert_eq!(map.query(t(1, 1), OccupancyCategory::Air), &[2, 3]);
    }

    #[test]
    fn test_infantry_capacity() {
        let mut map = Map::new(4, 4);
        for id in 0..NUM_INFANTRY_PER_TILE as ObjectId {
            assert!(map.assign(id, t(0, 0), OccupancyCategory::Infantry));
        }
        assert!(!map.can_assign(99, t(0, 0), OccupancyCategory::Infantry));
        assert!(!map.can_assign(99, t(0, 0), OccupancyCategory::Ground));
        assert!(map.can_assign(99, t(0, 0), OccupancyCategory::Air));
    }

    #[test]
    fn test_ground_excludes_infantry() {
        let mut map = Map::new(4, 4);
        map.assign(1, t(2, 2), OccupancyCategory::Ground);
        assert!(!map.can_assign(2, t(2, 2), OccupancyCategory::Infantry));
        assert!(!map.can_assign(2, t(2, 2), OccupancyCategory::Ground));
    }

    #[test]
    #[should_panic(expected = "occupancy conflict")]
    fn test_ground_conflict_panics() {
        let mut map = Map::new(4, 4);
        map.assign(1, t(0, 0), OccupancyCategory::Ground);
        map.assign(2, t(0, 0), OccupancyCategory::Ground);
    }

    #[test]
    #[should_panic(expected = "assigned twice")]
    fn test_double_assign_panics() {
        let mut map = Map::new(4, 4);
        map.assign(1, t(0, 0), OccupancyCategory::Air);
        map.assign(1, t(0, 0), OccupancyCategory::Air);
    }

    #[test]
    #[should_panic(expected = "not registered")]
    fn test_unassign_absent_panics() {
        let mut map = Map::new(4, 4);
        map.unassign(1, t(0, 0), OccupancyCategory::Ground);
    }

    #[test]
    fn test_relocate_moves_registration() {
        let mut map = Map::new(4, 4);
        map.assign(7, t(0, 0), OccupancyCategory::Air);
        assert!(map.relocate(7, t(0, 0), t(1, 0), OccupancyCategory::Air));
        assert_eq!(map.registrations(7), vec![(t(1, 0), OccupancyCategory::Air)]);
    }

    #[test]
    fn test_relocate_blocked_changes_nothing() {
        let mut map = Map::new(4, 4);
        map.assign(1, t(0, 0), OccupancyCategory::Ground);
        map.assign(2, t(1, 0), OccupancyCategory::Ground);
        let before = map.clone();

        assert!(!map.relocate(1, t(0, 0), t(1, 0), OccupancyCategory::Ground));
        assert!(!map.relocate(1, t(0, 0), t(-1, 0), OccupancyCategory::Ground));
        assert_eq!(map, before);
    }

    #[test]
    fn test_wrecks() {
        let mut map = Map::new(4, 4);
        let marker = DeadUnitMarker {
            kind: DeadUnitKind::Ornithopter,
            house: HouseId::Ordos,
            position: (100, 40),
        };
        assert!(map.place_wreck(t(1, 0), marker));
        assert!(!map.place_wreck(t(10, 0), marker));
        assert_eq!(map.wrecks(t(1, 0)), &[marker]);
        assert_eq!(map.all_wrecks().count(), 1);
    }

    #[test]
    fn test_reveal_is_per_team_circle() {
        let mut map = Map::new(10, 10);
        map.reveal(1, t(5, 5), 2);
        assert!(map.is_visible(1, t(5, 5)));
        assert!(map.is_visible(1, t(7, 5)));
        assert!(!map.is_visible(1, t(7, 7)));
        assert!(!map.is_visible(0, t(5, 5)));
        assert!(map.is_visible_to_any(t(5, 3)));
        assert!(!map.is_visible_to_any(t(0, 0)));

        // Reveal near the edge clips silently.
        map.reveal(0, t(0, 0), 3);
        assert!(map.is_visible(0, t(0, 0)));
    }

    #[test]
    fn test_restore_visibility_checks_length() {
        let mut map = Map::new(2, 2);
        assert!(!map.restore_visibility(vec![0; 3]));
        assert!(map.restore_visibility(vec![1, 0, 0, 0]));
        assert!(map.is_visible(0, t(0, 0)));
    }
}
