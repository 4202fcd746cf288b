//! Ordered binary persistence for units and whole games.
//!
//! Everything is written with `bincode` (fixed-width little-endian integers,
//! no field names), so the layout is defined purely by the order of the
//! records below. New fields may only ever be appended.
//!
//! # Unit record
//!
//! ```text
//! version: u32
//! base:    UnitRecord
//! kind:    AirRecord      (aircraft only)
//! ```
//!
//! # Game save
//!
//! ```text
//! magic:   u32 = 8675309
//! version: u32
//! header:  GameHeader     (tick, next id, map size)
//! visibility rows, wrecks
//! unit count: u32, then that many unit records
//! ```
//!
//! Loading validates every field before anything is constructed. A load
//! either returns a consistent value or a [`LoadError`].

use std::collections::BTreeSet;
use std::io::{Read, Write};

use serde::{Deserialize, Serialize};

use crate::components::{
    Destination, Health, ItemType, ObjectId, Owner, Target, TileCoord,
};
use crate::data::{MAX_HEALTH, MAX_SPEED};
use crate::error::{GameError, LoadError, Result};
use crate::map::{DeadUnitMarker, Map, MAX_TEAMS};
use crate::math::{angle_to_drawn_angle, fixed_serde, Fixed, Vec2Fixed, ANGLE_RANGE};
use crate::movement::MotionState;
use crate::unit::{KindState, Unit};
use crate::unit_kind::capabilities;

/// Version written at the start of every unit record.
pub const UNIT_RECORD_VERSION: u32 = 1;

/// First word of a game save.
pub const SAVE_MAGIC: u32 = 8_675_309;

/// Game save layout version.
pub const SAVE_VERSION: u32 = 1;

/// Largest map edge accepted when loading.
pub const MAX_MAP_EDGE: i32 = 1024;

#[derive(Serialize, Deserialize)]
struct UnitRecord {
    id: ObjectId,
    item: ItemType,
    owner: Owner,
    health: Health,
    position: Vec2Fixed,
    location: TileCoord,
    #[serde(with = "fixed_serde")]
    angle: Fixed,
    drawn_angle: u8,
    destination: Destination,
    guard_point: TileCoord,
    target: Target,
    weapon_timer: u32,
    motion: MotionState,
    drawn_frame: u32,
}

#[derive(Serialize, Deserialize)]
struct AirRecord {
    #[serde(with = "fixed_serde")]
    current_max_speed: Fixed,
}

fn invalid(field: &'static str, reason: impl Into<String>) -> LoadError {
    LoadError::InvalidField {
        field,
        reason: reason.into(),
    }
}

impl UnitRecord {
    fn validate(&self) -> std::result::Result<(), LoadError> {
        if self.owner.team >= MAX_TEAMS {
            return Err(invalid("owner", format!("team {} out of range", self.owner.team)));
        }
        if self.health.max == 0
            || self.health.max > MAX_HEALTH
            || self.health.current > self.health.max
        {
            return Err(invalid(
                "health",
                format!("{}/{}", self.health.current, self.health.max),
            ));
        }
        if self.angle < Fixed::ZERO || self.angle >= ANGLE_RANGE {
            return Err(invalid("angle", format!("{} outside [0, 256)", self.angle)));
        }
        if self.drawn_angle != angle_to_drawn_angle(self.angle) {
            return Err(invalid(
                "drawn_angle",
                format!("{} does not match heading {}", self.drawn_angle, self.angle),
            ));
        }
        if self.location != TileCoord::from_world(self.position) {
            return Err(invalid(
                "location",
                format!("{} does not contain the unit's position", self.location),
            ));
        }
        if self.drawn_frame >= capabilities(self.item).frame_count {
            return Err(invalid("drawn_frame", self.drawn_frame.to_string()));
        }
        if self.target.id() == Some(self.id) {
            return Err(invalid("target", "unit targets itself"));
        }
        Ok(())
    }
}

fn read<T, R>(reader: &mut R, what: &'static str) -> std::result::Result<T, LoadError>
where
    T: serde::de::DeserializeOwned,
    R: Read,
{
    bincode::deserialize_from(reader).map_err(|e| LoadError::from_bincode(what, &e))
}

fn write<T, W>(writer: &mut W, value: &T, what: &str) -> Result<()>
where
    T: Serialize,
    W: Write,
{
    bincode::serialize_into(writer, value)
        .map_err(|e| GameError::InvalidState(format!("Failed to write {what}: {e}")))
}

impl Unit {
    /// Write this unit as one versioned record.
    ///
    /// # Errors
    ///
    /// Returns an error if the writer fails.
    pub fn save<W: Write>(&self, writer: &mut W) -> Result<()> {
        write(writer, &UNIT_RECORD_VERSION, "unit version")?;
        let base = UnitRecord {
            id: self.id,
            item: self.item,
            owner: self.owner,
            health: self.health,
            position: self.position,
            location: self.location,
            angle: self.angle,
            drawn_angle: self.drawn_angle,
            destination: self.destination,
            guard_point: self.guard_point,
            target: self.target,
            weapon_timer: self.weapon_timer,
            motion: self.motion,
            drawn_frame: self.drawn_frame,
        };
        write(writer, &base, "unit record")?;
        if let KindState::Air { current_max_speed } = self.kind {
            write(writer, &AirRecord { current_max_speed }, "air record")?;
        }
        Ok(())
    }

    /// Read a unit written by [`save`](Self::save).
    ///
    /// The unit is not registered on any map.
    ///
    /// # Errors
    ///
    /// Returns a [`LoadError`] if the stream is truncated, does not decode,
    /// has the wrong version, or holds an inconsistent unit.
    pub fn load<R: Read>(reader: &mut R) -> std::result::Result<Self, LoadError> {
        let version: u32 = read(reader, "unit version")?;
        if version != UNIT_RECORD_VERSION {
            return Err(LoadError::UnsupportedVersion {
                found: version,
                expected: UNIT_RECORD_VERSION,
            });
        }

        let base: UnitRecord = read(reader, "unit record")?;
        base.validate()?;

        let kind = if capabilities(base.item).is_flying() {
            let air: AirRecord = read(reader, "air record")?;
            if air.current_max_speed < Fixed::ZERO || air.current_max_speed > MAX_SPEED {
                return Err(invalid(
                    "current_max_speed",
                    format!("{} outside [0, {MAX_SPEED}]", air.current_max_speed),
                ));
            }
            KindState::Air {
                current_max_speed: air.current_max_speed,
            }
        } else {
            KindState::Ground
        };

        Ok(Self {
            id: base.id,
            item: base.item,
            owner: base.owner,
            health: base.health,
            position: base.position,
            location: base.location,
            angle: base.angle,
            drawn_angle: base.drawn_angle,
            destination: base.destination,
            guard_point: base.guard_point,
            target: base.target,
            weapon_timer: base.weapon_timer,
            motion: base.motion,
            drawn_frame: base.drawn_frame,
            kind,
        })
    }
}

/// Game-wide counters stored after the magic and version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct GameHeader {
    pub tick: u64,
    pub next_id: ObjectId,
    pub width: i32,
    pub height: i32,
}

/// Everything restored from a game save.
pub(crate) struct LoadedGame {
    pub header: GameHeader,
    pub map: Map,
    pub units: Vec<Unit>,
}

/// Write a full game save.
pub(crate) fn save_game<'a, W: Write>(
    writer: &mut W,
    header: GameHeader,
    map: &Map,
    units: impl ExactSizeIterator<Item = &'a Unit>,
) -> Result<()> {
    write(writer, &SAVE_MAGIC, "magic")?;
    write(writer, &SAVE_VERSION, "version")?;
    write(writer, &header, "header")?;
    write(writer, &map.visibility_rows(), "visibility")?;
    let wrecks: Vec<(TileCoord, DeadUnitMarker)> =
        map.all_wrecks().map(|(coord, marker)| (coord, *marker)).collect();
    write(writer, &wrecks, "wrecks")?;

    let count = u32::try_from(units.len())
        .map_err(|_| GameError::InvalidState("too many units to save".to_string()))?;
    write(writer, &count, "unit count")?;
    for unit in units {
        unit.save(writer)?;
    }
    Ok(())
}

/// Read and validate a full game save, rebuilding occupancy.
pub(crate) fn load_game<R: Read>(reader: &mut R) -> std::result::Result<LoadedGame, LoadError> {
    let magic: u32 = read(reader, "magic")?;
    if magic != SAVE_MAGIC {
        return Err(LoadError::BadMagic(magic));
    }
    let version: u32 = read(reader, "version")?;
    if version != SAVE_VERSION {
        return Err(LoadError::UnsupportedVersion {
            found: version,
            expected: SAVE_VERSION,
        });
    }

    let header: GameHeader = read(reader, "header")?;
    for (field, edge) in [("width", header.width), ("height", header.height)] {
        if edge <= 0 || edge > MAX_MAP_EDGE {
            return Err(invalid(field, format!("{edge} outside 1..={MAX_MAP_EDGE}")));
        }
    }
    let mut map = Map::new(header.width, header.height);

    let visibility: Vec<u8> = read(reader, "visibility")?;
    if !map.restore_visibility(visibility) {
        return Err(invalid("visibility", "row length does not match map size"));
    }

    let wrecks: Vec<(TileCoord, DeadUnitMarker)> = read(reader, "wrecks")?;
    for (coord, marker) in wrecks {
        if !map.place_wreck(coord, marker) {
            return Err(invalid("wrecks", format!("tile {coord} outside the map")));
        }
    }

    let count: u32 = read(reader, "unit count")?;
    let mut seen = BTreeSet::new();
    let mut units = Vec::new();
    for _ in 0..count {
        let unit = Unit::load(reader)?;
        if unit.id >= header.next_id {
            return Err(invalid(
                "id",
                format!("{} not below next id {}", unit.id, header.next_id),
            ));
        }
        if !seen.insert(unit.id) {
            return Err(invalid("id", format!("{} appears twice", unit.id)));
        }
        if !map.tile_exists(unit.location) {
            return Err(invalid("location", format!("tile {} outside the map", unit.location)));
        }
        if !map.can_assign(unit.id, unit.location, unit.occupancy()) {
            return Err(LoadError::Corrupt(format!(
                "occupancy conflict for unit {} on tile {}",
                unit.id, unit.location
            )));
        }
        map.assign(unit.id, unit.location, unit.occupancy());
        units.push(unit);
    }

    Ok(LoadedGame { header, map, units })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::HouseId;
    use crate::data::BalanceTable;

    fn sample_unit(item: ItemType) -> Unit {
        let mut unit = Unit::new(
            3,
            item,
            Owner::new(HouseId::Ordos, 1),
            TileCoord::new(4, 2),
            Fixed::from_num(37.5),
            &BalanceTable::standard(),
        );
        unit.set_destination(Destination::Order(TileCoord::new(9, 9)));
        unit.apply_damage(7);
        unit
    }

    fn round_trip(unit: &Unit) -> Unit {
        let mut bytes = Vec::new();
        unit.save(&mut bytes).unwrap();
        Unit::load(&mut bytes.as_slice()).unwrap()
    }

    #[test]
    fn test_unit_round_trip() {
        for item in [ItemType::Ornithopter, ItemType::Tank] {
            let unit = sample_unit(item);
            assert_eq!(round_trip(&unit), unit);
        }
    }

    #[test]
    fn test_air_record_is_trailing() {
        let mut air = Vec::new();
        sample_unit(ItemType::Ornithopter).save(&mut air).unwrap();
        let mut ground = Vec::new();
        sample_unit(ItemType::Trike).save(&mut ground).unwrap();
        // One trailing I32F32 for the cruise speed.
        assert_eq!(air.len(), ground.len() + 8);
        let tail = i64::from_le_bytes(air[air.len() - 8..].try_into().unwrap());
        assert_eq!(Fixed::from_bits(tail), Fixed::from_num(6.5));
    }

    #[test]
    fn test_truncated_unit_is_rejected() {
        let mut bytes = Vec::new();
        sample_unit(ItemType::Ornithopter).save(&mut bytes).unwrap();
        for cut in [0, 3, 10, bytes.len() - 1] {
            let err = Unit::load(&mut &bytes[..cut]).unwrap_err();
            assert!(matches!(err, LoadError::Truncated(_)), "cut {cut}: {err}");
        }
    }

    #[test]
    fn test_wrong_version_is_rejected() {
        let mut bytes = Vec::new();
        sample_unit(ItemType::Tank).save(&mut bytes).unwrap();
        bytes[0] = 9;
        assert!(matches!(
            Unit::load(&mut bytes.as_slice()),
            Err(LoadError::UnsupportedVersion { found: 9, .. })
        ));
    }

    #[test]
    fn test_inconsistent_location_is_rejected() {
        let mut unit = sample_unit(ItemType::Tank);
        unit.location = TileCoord::new(0, 0);
        let mut bytes = Vec::new();
        unit.save(&mut bytes).unwrap();
        assert!(matches!(
            Unit::load(&mut bytes.as_slice()),
            Err(LoadError::InvalidField { field: "location", .. })
        ));
    }

    #[test]
    fn test_oversized_health_is_rejected() {
        let mut unit = sample_unit(ItemType::Tank);
        unit.health = Health {
            current: 3_000_000_000,
            max: 4_000_000_000,
        };
        let mut bytes = Vec::new();
        unit.save(&mut bytes).unwrap();
        assert!(matches!(
            Unit::load(&mut bytes.as_slice()),
            Err(LoadError::InvalidField { field: "health", .. })
        ));

        unit.health = Health {
            current: MAX_HEALTH,
            max: MAX_HEALTH,
        };
        assert_eq!(round_trip(&unit).health().max, MAX_HEALTH);
    }

    #[test]
    fn test_runaway_cruise_speed_is_rejected() {
        for speed in [Fixed::MAX, MAX_SPEED + Fixed::DELTA, -Fixed::DELTA] {
            let mut unit = sample_unit(ItemType::Ornithopter);
            unit.kind = KindState::Air {
                current_max_speed: speed,
            };
            let mut bytes = Vec::new();
            unit.save(&mut bytes).unwrap();
            assert!(matches!(
                Unit::load(&mut bytes.as_slice()),
                Err(LoadError::InvalidField {
                    field: "current_max_speed",
                    ..
                })
            ));
        }
    }

    #[test]
    fn test_bad_magic() {
        let bytes = 1234u32.to_le_bytes();
        assert!(matches!(
            load_game(&mut bytes.as_slice()),
            Err(LoadError::BadMagic(1234))
        ));
    }
}
