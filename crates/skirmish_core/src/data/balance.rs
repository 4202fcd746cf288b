//! Static game-balance table indexed by item type and house.

use serde::{Deserialize, Serialize};

use crate::components::{HouseId, ItemType};
use crate::error::{GameError, Result};
use crate::math::{fixed_serde, Fixed, ANGLE_RANGE, TILESIZE};

/// Largest health a unit may have. Keeps health ratios inside the
/// fixed-point range.
pub const MAX_HEALTH: u32 = i32::MAX as u32;

/// Fastest a unit may travel, in world units per tick.
pub const MAX_SPEED: Fixed = Fixed::const_from_int(TILESIZE as i64);

/// Weapon statistics for armed unit types.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct WeaponStats {
    /// Damage per hit.
    pub damage: u32,
    /// Range in tiles (block distance).
    pub range: u32,
    /// Ticks between shots.
    pub reload: u32,
}

/// Movement and combat statistics for one `[item][house]` cell.
///
/// # Example RON
///
/// ```ron
/// UnitStats(
///     max_speed: 25769803776,  // Fixed-point for 6.0
///     turn_speed: 17179869184, // Fixed-point for 4.0
///     max_health: 50,
///     view_range: 5,
///     weapon: Some(WeaponStats(damage: 40, range: 5, reload: 150)),
/// )
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct UnitStats {
    /// World units travelled per tick at full speed.
    #[serde(with = "fixed_serde")]
    pub max_speed: Fixed,

    /// Degrees256 turned per tick.
    #[serde(with = "fixed_serde")]
    pub turn_speed: Fixed,

    /// Maximum health points.
    pub max_health: u32,

    /// Radius in tiles revealed around ground units.
    pub view_range: u32,

    /// Weapon (None for unarmed units).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weapon: Option<WeaponStats>,
}

impl UnitStats {
    /// Check whether this unit type carries a weapon.
    #[must_use]
    pub const fn is_armed(&self) -> bool {
        self.weapon.is_some()
    }

    fn validate(&self, item: ItemType) -> std::result::Result<(), String> {
        if self.max_speed < Fixed::ZERO || self.max_speed > MAX_SPEED {
            return Err(format!("{item:?}: max_speed {} outside [0, {MAX_SPEED}]", self.max_speed));
        }
        if self.turn_speed < Fixed::ZERO || self.turn_speed > ANGLE_RANGE {
            return Err(format!("{item:?}: turn_speed {} outside [0, 256]", self.turn_speed));
        }
        if self.max_health == 0 || self.max_health > MAX_HEALTH {
            return Err(format!("{item:?}: max_health {} outside [1, {MAX_HEALTH}]", self.max_health));
        }
        Ok(())
    }
}

/// Balance entry for one item type as written in data files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitBalance {
    /// Item type this entry describes.
    pub item: ItemType,
    /// Stats used by every house without an override.
    pub stats: UnitStats,
    /// Per-house replacements.
    #[serde(default)]
    pub house_overrides: Vec<(HouseId, UnitStats)>,
}

/// Root of a balance data document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceData {
    /// One entry per item type.
    pub units: Vec<UnitBalance>,
}

/// Read-only `[item][house]` lookup of [`UnitStats`].
///
/// Every cell is populated, so lookups cannot fail.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BalanceTable {
    cells: Vec<UnitStats>,
}

const HALF: Fixed = Fixed::from_bits(1 << 31);

const fn fx(n: i64) -> Fixed {
    Fixed::const_from_int(n)
}

impl BalanceTable {
    /// Built-in defaults used when no data file is supplied.
    #[must_use]
    pub fn standard() -> Self {
        let base = |item: ItemType| -> UnitStats {
            match item {
                ItemType::Ornithopter => UnitStats {
                    max_speed: fx(6),
                    turn_speed: fx(4),
                    max_health: 50,
                    view_range: 5,
                    weapon: Some(WeaponStats {
                        damage: 40,
                        range: 5,
                        reload: 150,
                    }),
                },
                ItemType::Carryall => UnitStats {
                    max_speed: fx(8),
                    turn_speed: fx(4),
                    max_health: 100,
                    view_range: 2,
                    weapon: None,
                },
                ItemType::Trike => UnitStats {
                    max_speed: fx(3) + HALF,
                    turn_speed: fx(8),
                    max_health: 100,
                    view_range: 4,
                    weapon: Some(WeaponStats {
                        damage: 5,
                        range: 3,
                        reload: 30,
                    }),
                },
                ItemType::Tank => UnitStats {
                    max_speed: fx(2),
                    turn_speed: fx(4),
                    max_health: 200,
                    view_range: 4,
                    weapon: Some(WeaponStats {
                        damage: 25,
                        range: 4,
                        reload: 80,
                    }),
                },
                ItemType::Soldier => UnitStats {
                    max_speed: fx(1),
                    turn_speed: fx(16),
                    max_health: 20,
                    view_range: 4,
                    weapon: Some(WeaponStats {
                        damage: 3,
                        range: 2,
                        reload: 30,
                    }),
                },
                ItemType::Sandworm => UnitStats {
                    max_speed: fx(1) + HALF,
                    turn_speed: fx(4),
                    max_health: 1000,
                    view_range: 0,
                    weapon: Some(WeaponStats {
                        damage: 1000,
                        range: 1,
                        reload: 50,
                    }),
                },
            }
        };

        let mut table = Self::uniform(base);
        // Ordos ornithopters are a touch faster.
        let mut ordos = *table.get(ItemType::Ornithopter, HouseId::Ordos);
        ordos.max_speed = fx(6) + HALF;
        table.set(ItemType::Ornithopter, HouseId::Ordos, ordos);
        table
    }

    /// Build a table where every house shares the row produced by `row`.
    #[must_use]
    pub fn uniform(row: impl Fn(ItemType) -> UnitStats) -> Self {
        let mut cells = Vec::with_capacity(ItemType::COUNT * HouseId::COUNT);
        for item in ItemType::ALL {
            let stats = row(item);
            cells.extend(std::iter::repeat(stats).take(HouseId::COUNT));
        }
        Self { cells }
    }

    /// Parse a RON [`BalanceData`] document.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::DataParseError`] if the document does not parse,
    /// lists an item twice, omits an item, or contains invalid stats.
    pub fn from_ron_str(source_name: &str, ron_text: &str) -> Result<Self> {
        let parse_err = |message: String| GameError::DataParseError {
            source_name: source_name.to_string(),
            message,
        };

        let data: BalanceData = ron::from_str(ron_text).map_err(|e| parse_err(e.to_string()))?;
        Self::from_data(&data).map_err(parse_err)
    }

    /// Build a table from already-deserialized data.
    ///
    /// # Errors
    ///
    /// Returns a description of the first problem found.
    pub fn from_data(data: &BalanceData) -> std::result::Result<Self, String> {
        let mut rows: Vec<Option<&UnitBalance>> = vec![None; ItemType::COUNT];
        for entry in &data.units {
            let slot = &mut rows[entry.item.index()];
            if slot.is_some() {
                return Err(format!("{:?} listed more than once", entry.item));
            }
            entry.stats.validate(entry.item)?;
            for (_, stats) in &entry.house_overrides {
                stats.validate(entry.item)?;
            }
            *slot = Some(entry);
        }

        let mut cells = Vec::with_capacity(ItemType::COUNT * HouseId::COUNT);
        for item in ItemType::ALL {
            let entry = rows[item.index()].ok_or_else(|| format!("{item:?} missing"))?;
            for house in HouseId::ALL {
                let stats = entry
                    .house_overrides
                    .iter()
                    .rev()
                    .find(|(h, _)| *h == house)
                    .map_or(entry.stats, |(_, s)| *s);
                cells.push(stats);
            }
        }
        Ok(Self { cells })
    }

    /// Look up stats for a unit type built by a house.
    #[must_use]
    pub fn get(&self, item: ItemType, house: HouseId) -> &UnitStats {
        &self.cells[Self::cell_index(item, house)]
    }

    /// Replace one cell.
    pub fn set(&mut self, item: ItemType, house: HouseId, stats: UnitStats) {
        let index = Self::cell_index(item, house);
        self.cells[index] = stats;
    }

    /// Replace the row of `item` for every house.
    #[must_use]
    pub fn with_item(mut self, item: ItemType, stats: UnitStats) -> Self {
        for house in HouseId::ALL {
            self.set(item, house, stats);
        }
        self
    }

    /// Export the table as data (one override per house that differs from
    /// the Harkonnen column).
    #[must_use]
    pub fn to_data(&self) -> BalanceData {
        let units = ItemType::ALL
            .iter()
            .map(|&item| {
                let stats = *self.get(item, HouseId::ALL[0]);
                let house_overrides = HouseId::ALL[1..]
                    .iter()
                    .filter(|&&house| *self.get(item, house) != stats)
                    .map(|&house| (house, *self.get(item, house)))
                    .collect();
                UnitBalance {
                    item,
                    stats,
                    house_overrides,
                }
            })
            .collect();
        BalanceData { units }
    }

    const fn cell_index(item: ItemType, house: HouseId) -> usize {
        item.index() * HouseId::COUNT + house.index()
    }
}

impl Default for BalanceTable {
    fn default() -> Self {
        Self::standard()
    }
}
