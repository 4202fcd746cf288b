//! Plain data shared by the map, movement and lifecycle modules.
//!
//! Everything here is pure data with small helpers. Behavior lives in
//! [`crate::movement`], [`crate::targeting`] and [`crate::unit`].

use serde::{Deserialize, Serialize};

use crate::math::{block_distance, Fixed, Vec2Fixed, TILESIZE};

/// Unique identifier for units and other map objects.
pub type ObjectId = u32;

/// Team index. Units on the same team never target each other.
pub type TeamId = u8;

// ============================================================================
// Ownership
// ============================================================================

/// The great houses (and minor factions) a unit can belong to.
///
/// The house selects the balance-table column; the team decides
/// friend or foe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum HouseId {
    /// House Harkonnen.
    Harkonnen,
    /// House Atreides.
    Atreides,
    /// House Ordos.
    Ordos,
    /// The Fremen.
    Fremen,
    /// Imperial Sardaukar.
    Sardaukar,
    /// Mercenaries.
    Mercenary,
}

impl HouseId {
    /// Number of houses (balance-table columns).
    pub const COUNT: usize = 6;

    /// All houses in table order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::Harkonnen,
        Self::Atreides,
        Self::Ordos,
        Self::Fremen,
        Self::Sardaukar,
        Self::Mercenary,
    ];

    /// Column index in the balance table.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Inverse of [`index`](Self::index).
    #[must_use]
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

/// Owner of a unit: the house it was built for and the team it fights on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Owner {
    /// Owning house.
    pub house: HouseId,
    /// Team the house plays on.
    pub team: TeamId,
}

impl Owner {
    /// Create a new owner.
    #[must_use]
    pub const fn new(house: HouseId, team: TeamId) -> Self {
        Self { house, team }
    }

    /// Check whether two owners fight on opposing teams.
    #[must_use]
    pub const fn is_enemy_of(&self, other: &Self) -> bool {
        self.team != other.team
    }
}

// ============================================================================
// Item types
// ============================================================================

/// Buildable unit types known to the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ItemType {
    /// Rocket-armed attack aircraft.
    Ornithopter,
    /// Unarmed transport aircraft.
    Carryall,
    /// Fast light vehicle.
    Trike,
    /// Main battle tank.
    Tank,
    /// Light infantry squad.
    Soldier,
    /// The worm. Eats ground units of every team.
    Sandworm,
}

impl ItemType {
    /// Number of item types (balance-table rows).
    pub const COUNT: usize = 6;

    /// All item types in table order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::Ornithopter,
        Self::Carryall,
        Self::Trike,
        Self::Tank,
        Self::Soldier,
        Self::Sandworm,
    ];

    /// Row index in the balance table.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Inverse of [`index`](Self::index).
    #[must_use]
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

// ============================================================================
// Health
// ============================================================================

/// Fraction of max health below which ground units slow down.
pub const HEAVILY_DAMAGED_RATIO: Fixed = Fixed::from_bits(1 << 30); // 0.25

/// Speed multiplier applied to heavily damaged ground units.
pub const HEAVILY_DAMAGED_SPEED_MULTIPLIER: Fixed = Fixed::from_bits(3 << 30); // 0.75

/// Health component for damageable units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Health {
    /// Current health points.
    pub current: u32,
    /// Maximum health points.
    pub max: u32,
}

impl Health {
    /// Create new health component at full health.
    #[must_use]
    pub const fn new(max: u32) -> Self {
        Self { current: max, max }
    }

    /// Check if the unit is dead (health == 0).
    #[must_use]
    pub const fn is_dead(&self) -> bool {
        self.current == 0
    }

    /// Apply damage, returning actual damage dealt.
    pub fn apply_damage(&mut self, amount: u32) -> u32 {
        let actual = amount.min(self.current);
        self.current = self.current.saturating_sub(actual);
        actual
    }

    /// Check if health has dropped below [`HEAVILY_DAMAGED_RATIO`].
    #[must_use]
    pub fn is_heavily_damaged(&self) -> bool {
        if self.max == 0 {
            return false;
        }
        // current < max * ratio, in integers so any u32 pair is safe.
        let ratio_bits = HEAVILY_DAMAGED_RATIO.to_bits() as u128;
        (u128::from(self.current) << 32) < u128::from(self.max) * ratio_bits
    }
}

// ============================================================================
// Coordinates
// ============================================================================

/// Integer tile coordinate on the map grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct TileCoord {
    /// Column.
    pub x: i32,
    /// Row.
    pub y: i32,
}

impl TileCoord {
    /// Create a new tile coordinate.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Tile containing a world-space position: `floor(real / TILESIZE)`.
    #[must_use]
    pub fn from_world(position: Vec2Fixed) -> Self {
        let size = Fixed::from_num(TILESIZE);
        Self {
            x: (position.x / size).floor().to_num::<i32>(),
            y: (position.y / size).floor().to_num::<i32>(),
        }
    }

    /// World-space centre of this tile.
    #[must_use]
    pub fn center(self) -> Vec2Fixed {
        Vec2Fixed::from_ints(
            self.x * TILESIZE + TILESIZE / 2,
            self.y * TILESIZE + TILESIZE / 2,
        )
    }

    /// Octile ("block") distance to another tile.
    #[must_use]
    pub fn block_distance(self, other: Self) -> Fixed {
        block_distance(self.x, self.y, other.x, other.y)
    }
}

impl std::fmt::Display for TileCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Where a unit is heading, with an explicit invalid state.
///
/// The variant records why the destination was set, which the movement
/// state machine reports as turning toward an order or drifting back to
/// the guard point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Destination {
    /// No destination.
    #[default]
    Invalid,
    /// Destination given by an order (move or attack).
    Order(TileCoord),
    /// Automatic return to the guard point after drifting too far.
    GuardReturn(TileCoord),
}

impl Destination {
    /// Check whether a destination is set.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        !matches!(self, Self::Invalid)
    }

    /// Target tile, if any.
    #[must_use]
    pub const fn tile(&self) -> Option<TileCoord> {
        match self {
            Self::Invalid => None,
            Self::Order(tile) | Self::GuardReturn(tile) => Some(*tile),
        }
    }

    /// Clear the destination.
    pub fn invalidate(&mut self) {
        *self = Self::Invalid;
    }
}

/// What a unit is currently attacking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Target {
    /// Nothing.
    #[default]
    None,
    /// Target given by an attack order. Kept for as long as it is targetable.
    Ordered(ObjectId),
    /// Target picked automatically. Dropped once it leaves guard range.
    Acquired(ObjectId),
}

impl Target {
    /// Targeted object, if any.
    #[must_use]
    pub const fn id(&self) -> Option<ObjectId> {
        match self {
            Self::None => None,
            Self::Ordered(id) | Self::Acquired(id) => Some(*id),
        }
    }

    /// Check whether nothing is targeted.
    #[must_use]
    pub const fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

// ============================================================================
// Commands
// ============================================================================

/// Orders a player can give a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnitCommand {
    /// Go to a tile. The tile also becomes the guard point.
    Move(TileCoord),
    /// Attack a unit.
    Attack(ObjectId),
    /// Drop every order and guard the current tile.
    Stop,
    /// Guard a tile, returning there first.
    Guard(TileCoord),
}
