//! Core simulation loop.
//!
//! [`Simulation`] is the explicit context every system works through: it
//! owns the tick counter, the map, the units and the balance table. There
//! are no globals.
//!
//! # Determinism
//!
//! - No floating-point math (uses fixed-point via [`Fixed`])
//! - No randomness
//! - Units are always processed in ascending id order
//! - Same inputs always produce same outputs
//!
//! # Tick order
//!
//! For each living unit, in id order:
//! 1. **Weapon timer** counts down
//! 2. **Targeting** re-validates or acquires a target and fires
//! 3. **Movement** turns, moves, checks position and animates
//!
//! Then units at zero health are destroyed in id order.
//!
//! # Example
//!
//! ```
//! use skirmish_core::components::{HouseId, ItemType, Owner, TileCoord, UnitCommand};
//! use skirmish_core::math::Fixed;
//! use skirmish_core::simulation::{Simulation, UnitSpawnParams};
//!
//! let mut sim = Simulation::new(16, 16);
//! let tank = sim
//!     .spawn_unit(UnitSpawnParams {
//!         item: ItemType::Tank,
//!         owner: Owner::new(HouseId::Atreides, 0),
//!         tile: TileCoord::new(1, 1),
//!         angle: Fixed::ZERO,
//!     })
//!     .unwrap();
//!
//! sim.apply_command(tank, UnitCommand::Move(TileCoord::new(4, 1))).unwrap();
//! sim.tick();
//! assert!(sim.unit(tank).unwrap().position().x > Fixed::from_num(96));
//! ```

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use crate::components::{Destination, ItemType, ObjectId, Owner, Target, TileCoord, UnitCommand};
use crate::data::BalanceTable;
use crate::error::{GameError, Result};
use crate::events::{DamageEvent, SimEvent, TickEvents};
use crate::map::{Map, MAX_TEAMS};
use crate::math::Fixed;
use crate::movement::{self, TickContext};
use crate::persistence::{self, GameHeader};
use crate::targeting::{acquire_target, can_target, TargetInfo, DEFAULT_GUARD_RANGE};
use crate::unit::{SpriteState, Unit};

/// Parameters for spawning a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitSpawnParams {
    /// Item type.
    pub item: ItemType,
    /// Owner.
    pub owner: Owner,
    /// Tile to place the unit on (at its centre).
    pub tile: TileCoord,
    /// Initial heading in degrees256.
    pub angle: Fixed,
}

/// Storage for all units in the simulation.
///
/// Uses a `HashMap` for O(1) lookup by id, with deterministic iteration
/// via sorted keys when processing systems.
#[derive(Debug, Clone, Default)]
pub struct UnitStorage {
    units: HashMap<ObjectId, Unit>,
}

impl UnitStorage {
    /// Create empty unit storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, unit: Unit) {
        self.units.insert(unit.id(), unit);
    }

    pub(crate) fn remove(&mut self, id: ObjectId) -> Option<Unit> {
        self.units.remove(&id)
    }

    /// Get a unit by id.
    #[must_use]
    pub fn get(&self, id: ObjectId) -> Option<&Unit> {
        self.units.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: ObjectId) -> Option<&mut Unit> {
        self.units.get_mut(&id)
    }

    /// Check if a unit exists.
    #[must_use]
    pub fn contains(&self, id: ObjectId) -> bool {
        self.units.contains_key(&id)
    }

    /// Get the number of units.
    #[must_use]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Check if storage is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Get sorted unit ids for deterministic iteration.
    #[must_use]
    pub fn sorted_ids(&self) -> Vec<ObjectId> {
        let mut ids: Vec<_> = self.units.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Iterate over all units in id order.
    pub fn iter_sorted(&self) -> impl Iterator<Item = &Unit> + '_ {
        self.sorted_ids()
            .into_iter()
            .filter_map(move |id| self.units.get(&id))
    }
}

/// The core game simulation.
///
/// This struct owns all game state and provides methods to advance the
/// simulation deterministically.
#[derive(Debug, Clone)]
pub struct Simulation {
    /// Current simulation tick.
    tick: u64,
    /// Next object id to hand out.
    next_id: ObjectId,
    /// The tile grid.
    map: Map,
    /// All units.
    units: UnitStorage,
    /// Static balance data.
    balance: BalanceTable,
    /// Effects from destructions requested between ticks.
    pending_events: TickEvents,
}

impl Simulation {
    /// Create an empty simulation on a `width` x `height` map with the
    /// built-in balance table.
    ///
    /// # Panics
    ///
    /// Panics if either map dimension is not positive.
    #[must_use]
    pub fn new(width: i32, height: i32) -> Self {
        Self::with_balance(width, height, BalanceTable::standard())
    }

    /// Create an empty simulation with an injected balance table.
    ///
    /// # Panics
    ///
    /// Panics if either map dimension is not positive.
    #[must_use]
    pub fn with_balance(width: i32, height: i32, balance: BalanceTable) -> Self {
        Self {
            tick: 0,
            next_id: 1,
            map: Map::new(width, height),
            units: UnitStorage::new(),
            balance,
            pending_events: TickEvents::default(),
        }
    }

    /// Get the current tick.
    #[must_use]
    pub const fn get_tick(&self) -> u64 {
        self.tick
    }

    /// The tile grid.
    #[must_use]
    pub const fn map(&self) -> &Map {
        &self.map
    }

    /// The balance table.
    #[must_use]
    pub const fn balance(&self) -> &BalanceTable {
        &self.balance
    }

    /// Unit storage.
    #[must_use]
    pub const fn storage(&self) -> &UnitStorage {
        &self.units
    }

    /// Get a unit by id.
    #[must_use]
    pub fn unit(&self, id: ObjectId) -> Option<&Unit> {
        self.units.get(id)
    }

    /// All units in id order.
    pub fn units(&self) -> impl Iterator<Item = &Unit> + '_ {
        self.units.iter_sorted()
    }

    /// Mark tiles around `centre` as seen by `team`, e.g. for scenario
    /// start positions or scouting reports.
    pub fn reveal(&mut self, team: u8, centre: TileCoord, range: u32) {
        self.map.reveal(team, centre, range);
    }

    /// Spawn a new unit.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::TileOutOfBounds`] if the tile is off the map,
    /// [`GameError::TileOccupied`] if the tile has no room for this unit,
    /// or [`GameError::InvalidState`] if the team has no visibility layer.
    pub fn spawn_unit(&mut self, params: UnitSpawnParams) -> Result<ObjectId> {
        if params.owner.team >= MAX_TEAMS {
            return Err(GameError::InvalidState(format!(
                "team {} exceeds the {MAX_TEAMS} supported teams",
                params.owner.team
            )));
        }
        if !self.map.tile_exists(params.tile) {
            return Err(GameError::TileOutOfBounds(params.tile));
        }

        let id = self.next_id;
        let unit = Unit::new(
            id,
            params.item,
            params.owner,
            params.tile,
            params.angle,
            &self.balance,
        );
        if !unit.assign_to_map(&mut self.map, &self.balance) {
            return Err(GameError::TileOccupied {
                tile: params.tile,
                item: params.item,
            });
        }

        self.next_id += 1;
        self.units.insert(unit);
        tracing::debug!(unit = id, item = ?params.item, tile = %params.tile, "Unit spawned");
        Ok(id)
    }

    /// Apply a player command to a unit.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::UnitNotFound`] if the unit (or attack target)
    /// doesn't exist, [`GameError::TileOutOfBounds`] for off-map tiles, or
    /// [`GameError::InvalidState`] if an unarmed unit is told to attack.
    pub fn apply_command(&mut self, id: ObjectId, command: UnitCommand) -> Result<()> {
        if let UnitCommand::Move(tile) | UnitCommand::Guard(tile) = command {
            if !self.map.tile_exists(tile) {
                return Err(GameError::TileOutOfBounds(tile));
            }
        }
        if let UnitCommand::Attack(target) = command {
            if !self.units.contains(target) {
                return Err(GameError::UnitNotFound(target));
            }
            if target == id {
                return Err(GameError::InvalidState(format!("Unit {id} cannot attack itself")));
            }
        }

        let unit = self.units.get_mut(id).ok_or(GameError::UnitNotFound(id))?;
        match command {
            UnitCommand::Move(tile) => {
                unit.set_destination(Destination::Order(tile));
                unit.set_guard_point(tile);
                unit.set_target(Target::None);
            }
            UnitCommand::Attack(target) => {
                if !unit.stats(&self.balance).is_armed() {
                    return Err(GameError::InvalidState(format!("Unit {id} cannot attack")));
                }
                unit.set_target(Target::Ordered(target));
            }
            UnitCommand::Stop => {
                let here = unit.location();
                unit.set_destination(Destination::Invalid);
                unit.set_guard_point(here);
                unit.set_target(Target::None);
            }
            UnitCommand::Guard(tile) => {
                unit.set_destination(Destination::GuardReturn(tile));
                unit.set_guard_point(tile);
                unit.set_target(Target::None);
            }
        }
        tracing::trace!(unit = id, ?command, "Command applied");
        Ok(())
    }

    /// Advance the simulation by one tick.
    pub fn tick(&mut self) -> TickEvents {
        let mut events = std::mem::take(&mut self.pending_events);

        for id in self.units.sorted_ids() {
            let Some(mut unit) = self.units.remove(id) else {
                continue;
            };
            if !unit.health().is_dead() {
                unit.weapon_timer = unit.weapon_timer.saturating_sub(1);
                self.run_targeting(&mut unit, &mut events);
                let mut ctx = TickContext {
                    map: &mut self.map,
                    balance: &self.balance,
                    game_cycle: self.tick,
                    events: &mut events,
                };
                movement::update(&mut unit, &mut ctx);
            }
            self.units.insert(unit);
        }

        for id in self.units.sorted_ids() {
            if self.units.get(id).is_some_and(|unit| unit.health().is_dead()) {
                if let Some(unit) = self.units.remove(id) {
                    unit.destroy(&mut self.map, &mut events);
                    events.deaths.push(id);
                }
            }
        }

        self.tick += 1;

        #[cfg(feature = "debug-validation")]
        assert!(
            self.check_occupancy(),
            "occupancy registry out of sync at tick {}",
            self.tick
        );

        #[cfg(debug_assertions)]
        {
            let hash = self.state_hash();
            tracing::debug!(tick = self.tick, state_hash = hash, "Simulation state hash");
        }

        events
    }

    /// Pick, keep or drop a target, steer toward it and fire when possible.
    fn run_targeting(&mut self, unit: &mut Unit, events: &mut TickEvents) {
        let Some(weapon) = unit.stats(&self.balance).weapon else {
            unit.target = Target::None;
            return;
        };
        let me = unit.target_info();
        let guard_range = Fixed::from_num(DEFAULT_GUARD_RANGE);

        if let Some(target_id) = unit.target.id() {
            let ordered = matches!(unit.target, Target::Ordered(_));
            let still_valid = self.units.get(target_id).is_some_and(|target| {
                let info = target.target_info();
                can_target(&me, &info, &self.map)
                    && (ordered || me.location.block_distance(info.location) <= guard_range)
            });
            if !still_valid {
                tracing::trace!(unit = me.id, target = target_id, "Target lost");
                unit.target = Target::None;
            }
        }

        if unit.target.is_none() && !matches!(unit.destination, Destination::Order(_)) {
            let candidates: Vec<TargetInfo> =
                self.units.iter_sorted().map(Unit::target_info).collect();
            if let Some(found) = acquire_target(&me, &candidates, &self.map, DEFAULT_GUARD_RANGE) {
                tracing::trace!(unit = me.id, target = found, "Target acquired");
                unit.target = Target::Acquired(found);
            }
        }

        let Some(target_id) = unit.target.id() else {
            return;
        };
        let Some(target) = self.units.get_mut(target_id) else {
            return;
        };

        let target_tile = target.location();
        let in_range = unit.location.block_distance(target_tile) <= Fixed::from_num(weapon.range);

        if unit.is_flying() || !in_range {
            unit.destination = Destination::Order(target_tile);
        } else {
            unit.destination.invalidate();
        }

        if in_range && unit.weapon_timer == 0 {
            let damage = target.apply_damage(weapon.damage);
            events.damage_events.push(DamageEvent {
                attacker: unit.id,
                target: target_id,
                damage,
            });
            events.push(SimEvent::WeaponFired {
                attacker: unit.id,
                target: target_id,
                sound: unit.capabilities().attack_sound,
                position: unit.position.rounded(),
            });
            unit.weapon_timer = weapon.reload;
        }
    }

    /// Destroy a unit immediately.
    ///
    /// Returns `false` if no such unit exists, so calling this twice is
    /// harmless. Death effects are delivered with the next tick's events.
    pub fn destroy_unit(&mut self, id: ObjectId) -> bool {
        match self.units.remove(id) {
            Some(unit) => {
                unit.destroy(&mut self.map, &mut self.pending_events);
                self.pending_events.deaths.push(id);
                true
            }
            None => false,
        }
    }

    /// Drawing state of every unit, in id order.
    #[must_use]
    pub fn render_states(&self) -> Vec<(ObjectId, SpriteState)> {
        self.units()
            .map(|unit| (unit.id(), unit.render_state()))
            .collect()
    }

    /// Check that every unit is registered in exactly one occupancy slot,
    /// the one matching its location, and nothing else is registered.
    #[must_use]
    pub fn check_occupancy(&self) -> bool {
        let all_match = self.units().all(|unit| {
            self.map.registrations(unit.id()) == vec![(unit.location(), unit.occupancy())]
        });
        all_match && self.map.occupant_count() == self.units.len()
    }

    /// Calculate a hash of the current simulation state.
    ///
    /// Used for desync detection. Two simulations with identical state
    /// produce identical hashes.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();

        self.tick.hash(&mut hasher);
        self.next_id.hash(&mut hasher);
        self.map.hash(&mut hasher);

        let ids = self.units.sorted_ids();
        ids.len().hash(&mut hasher);
        for id in ids {
            if let Some(unit) = self.units.get(id) {
                unit.hash(&mut hasher);
            }
        }

        hasher.finish()
    }

    /// Write a game save.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn save(&self) -> Result<Vec<u8>> {
        let header = GameHeader {
            tick: self.tick,
            next_id: self.next_id,
            width: self.map.width(),
            height: self.map.height(),
        };
        let units: Vec<&Unit> = self.units().collect();
        let mut bytes = Vec::new();
        persistence::save_game(&mut bytes, header, &self.map, units.into_iter())?;
        Ok(bytes)
    }

    /// Restore a game written by [`save`](Self::save).
    ///
    /// The balance table is static data and is injected rather than saved.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::Load`] if the save is truncated, corrupt, or
    /// inconsistent. Nothing is partially restored.
    pub fn load(data: &[u8], balance: BalanceTable) -> Result<Self> {
        let loaded = persistence::load_game(&mut &data[..])?;
        let mut units = UnitStorage::new();
        for unit in loaded.units {
            units.insert(unit);
        }
        tracing::debug!(
            tick = loaded.header.tick,
            units = units.len(),
            "Simulation loaded"
        );
        Ok(Self {
            tick: loaded.header.tick,
            next_id: loaded.header.next_id,
            map: loaded.map,
            units,
            balance,
            pending_events: TickEvents::default(),
        })
    }
}
