//! Scenario loading and configuration.
//!
//! Scenarios define the initial game state for headless runs: map size,
//! balance data, starting units, visibility and a script of timed orders.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use skirmish_core::components::{
    HouseId, ItemType, ObjectId, Owner, TeamId, TileCoord, UnitCommand,
};
use skirmish_core::data::BalanceTable;
use skirmish_core::error::GameError;
use skirmish_core::math::Fixed;
use skirmish_core::simulation::{Simulation, UnitSpawnParams};
use thiserror::Error;

/// Error type for scenario operations.
#[derive(Error, Debug)]
pub enum ScenarioError {
    /// File not found.
    #[error("Scenario file not found: {0}")]
    FileNotFound(String),
    /// Failed to read or write a file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse scenario: {0}")]
    ParseError(#[from] ron::error::SpannedError),
    /// The simulation rejected part of the scenario.
    #[error("Game error: {0}")]
    Game(#[from] GameError),
    /// An order or attack names a placement that does not exist.
    #[error("Order {order} refers to unknown placement {placement}")]
    UnknownPlacement {
        /// Index of the offending order.
        order: usize,
        /// The placement index it used.
        placement: usize,
    },
}

/// A complete scenario configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Map dimensions in tiles.
    pub map_size: (i32, i32),
    /// Balance data file, relative to the scenario file. Built-in
    /// defaults are used when absent.
    #[serde(default)]
    pub balance: Option<PathBuf>,
    /// Starting units. Object ids are handed out in this order, from 1.
    pub units: Vec<UnitPlacement>,
    /// Areas each team has already scouted.
    #[serde(default)]
    pub reveal: Vec<RevealArea>,
    /// Scripted orders.
    #[serde(default)]
    pub orders: Vec<TimedOrder>,
    /// Ticks to run.
    pub ticks: u64,
}

/// Placement of a unit at scenario start.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitPlacement {
    /// Unit type.
    pub item: ItemType,
    /// House it was built for.
    pub house: HouseId,
    /// Team it fights on.
    pub team: TeamId,
    /// Starting tile.
    pub tile: (i32, i32),
    /// Starting heading in degrees256.
    #[serde(default)]
    pub angle: i32,
}

impl UnitPlacement {
    /// Create a new unit placement facing east.
    #[must_use]
    pub fn new(item: ItemType, house: HouseId, team: TeamId, x: i32, y: i32) -> Self {
        Self {
            item,
            house,
            team,
            tile: (x, y),
            angle: 0,
        }
    }
}

/// A circle of tiles a team can see from the start.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevealArea {
    /// Team that sees the area.
    pub team: TeamId,
    /// Centre tile.
    pub centre: (i32, i32),
    /// Radius in tiles.
    pub range: u32,
}

/// An order issued before a given tick runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimedOrder {
    /// Tick at which the order is given.
    pub tick: u64,
    /// Index into [`Scenario::units`].
    pub unit: usize,
    /// What to do.
    pub order: Order,
}

/// Scenario-level orders. Units are named by placement index.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum Order {
    /// Move to a tile.
    Move((i32, i32)),
    /// Attack the unit from another placement.
    Attack(usize),
    /// Stop and guard the current tile.
    Stop,
    /// Guard a tile.
    Guard((i32, i32)),
}

/// A scenario turned into a live simulation.
#[derive(Debug)]
pub struct PreparedScenario {
    /// The simulation at tick 0.
    pub simulation: Simulation,
    /// Object id of each placement, by index.
    pub unit_ids: Vec<ObjectId>,
}

impl PreparedScenario {
    /// Resolve a scripted order into a unit id and core command.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError::UnknownPlacement`] for bad indices.
    pub fn resolve(
        &self,
        index: usize,
        order: &TimedOrder,
    ) -> Result<(ObjectId, UnitCommand), ScenarioError> {
        let lookup = |placement: usize| {
            self.unit_ids
                .get(placement)
                .copied()
                .ok_or(ScenarioError::UnknownPlacement {
                    order: index,
                    placement,
                })
        };
        let unit = lookup(order.unit)?;
        let command = match order.order {
            Order::Move((x, y)) => UnitCommand::Move(TileCoord::new(x, y)),
            Order::Attack(placement) => UnitCommand::Attack(lookup(placement)?),
            Order::Stop => UnitCommand::Stop,
            Order::Guard((x, y)) => UnitCommand::Guard(TileCoord::new(x, y)),
        };
        Ok((unit, command))
    }
}

impl Scenario {
    /// Load a scenario from a RON file.
    ///
    /// A relative balance path is resolved against the scenario's directory.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        let mut scenario = Self::from_ron_str(&contents)?;
        if let (Some(balance), Some(dir)) = (scenario.balance.as_mut(), path.parent()) {
            if balance.is_relative() {
                *balance = dir.join(&*balance);
            }
        }
        tracing::debug!(name = %scenario.name, path = %path.display(), "Scenario loaded");
        Ok(scenario)
    }

    /// Load from a RON string (useful for embedded scenarios).
    pub fn from_ron_str(ron: &str) -> Result<Self, ScenarioError> {
        let scenario: Scenario = ron::from_str(ron)?;
        Ok(scenario)
    }

    /// An ornithopter wing raiding a tank column while a worm roams.
    #[must_use]
    pub fn desert_raid() -> Self {
        let units = vec![
            UnitPlacement::new(ItemType::Ornithopter, HouseId::Atreides, 0, 2, 2),
            UnitPlacement::new(ItemType::Ornithopter, HouseId::Atreides, 0, 2, 4),
            UnitPlacement::new(ItemType::Trike, HouseId::Atreides, 0, 4, 10),
            UnitPlacement::new(ItemType::Tank, HouseId::Harkonnen, 1, 20, 12),
            UnitPlacement::new(ItemType::Tank, HouseId::Harkonnen, 1, 21, 12),
            UnitPlacement::new(ItemType::Soldier, HouseId::Harkonnen, 1, 20, 14),
            UnitPlacement::new(ItemType::Sandworm, HouseId::Fremen, 7, 12, 20),
        ];
        let orders = vec![
            TimedOrder {
                tick: 0,
                unit: 0,
                order: Order::Attack(3),
            },
            TimedOrder {
                tick: 0,
                unit: 1,
                order: Order::Attack(4),
            },
            TimedOrder {
                tick: 0,
                unit: 2,
                order: Order::Move((18, 12)),
            },
            TimedOrder {
                tick: 30,
                unit: 6,
                order: Order::Move((20, 13)),
            },
        ];
        Self {
            name: "Desert Raid".to_string(),
            description: "Ornithopters strike a Harkonnen column".to_string(),
            map_size: (32, 24),
            balance: None,
            units,
            reveal: vec![RevealArea {
                team: 0,
                centre: (20, 12),
                range: 6,
            }],
            orders,
            ticks: 600,
        }
    }

    /// The balance table this scenario runs with.
    pub fn balance_table(&self) -> Result<BalanceTable, ScenarioError> {
        match &self.balance {
            Some(path) => {
                let text = std::fs::read_to_string(path)?;
                Ok(BalanceTable::from_ron_str(&path.display().to_string(), &text)?)
            }
            None => Ok(BalanceTable::standard()),
        }
    }

    /// Build the starting simulation.
    ///
    /// # Errors
    ///
    /// Fails if the balance data does not load or a placement is rejected.
    pub fn prepare(&self) -> Result<PreparedScenario, ScenarioError> {
        let (width, height) = self.map_size;
        if width <= 0 || height <= 0 {
            return Err(GameError::InvalidState(format!(
                "map size {width}x{height} must be positive"
            ))
            .into());
        }

        let mut simulation = Simulation::with_balance(width, height, self.balance_table()?);
        for area in &self.reveal {
            let (x, y) = area.centre;
            simulation.reveal(area.team, TileCoord::new(x, y), area.range);
        }

        let mut unit_ids = Vec::with_capacity(self.units.len());
        for placement in &self.units {
            let (x, y) = placement.tile;
            let id = simulation.spawn_unit(UnitSpawnParams {
                item: placement.item,
                owner: Owner::new(placement.house, placement.team),
                tile: TileCoord::new(x, y),
                angle: Fixed::from_num(placement.angle),
            })?;
            unit_ids.push(id);
        }

        Ok(PreparedScenario {
            simulation,
            unit_ids,
        })
    }
}

impl Default for Scenario {
    fn default() -> Self {
        Self::desert_raid()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_scenario_prepares() {
        let scenario = Scenario::default();
        let prepared = scenario.prepare().unwrap();
        assert_eq!(prepared.unit_ids, (1..=7).collect::<Vec<_>>());
        assert!(prepared.simulation.check_occupancy());
    }

    #[test]
    fn test_parse_from_ron() {
        let ron = r#"
            Scenario(
                name: "Test",
                map_size: (16, 8),
                units: [
                    UnitPlacement(item: Tank, house: Ordos, team: 0, tile: (1, 1)),
                    UnitPlacement(item: Trike, house: Harkonnen, team: 1, tile: (9, 1), angle: 128),
                ],
                orders: [
                    TimedOrder(tick: 5, unit: 0, order: Attack(1)),
                    TimedOrder(tick: 9, unit: 1, order: Move((3, 3))),
                ],
                ticks: 100,
            )
        "#;
        let scenario = Scenario::from_ron_str(ron).unwrap();
        assert_eq!(scenario.units.len(), 2);
        assert_eq!(scenario.units[1].angle, 128);
        assert!(scenario.balance.is_none());
        assert!(scenario.reveal.is_empty());

        let prepared = scenario.prepare().unwrap();
        let (unit, command) = prepared.resolve(0, &scenario.orders[0]).unwrap();
        assert_eq!(unit, 1);
        assert_eq!(command, UnitCommand::Attack(2));
    }

    #[test]
    fn test_unknown_placement_is_reported() {
        let mut scenario = Scenario::desert_raid();
        scenario.orders.push(TimedOrder {
            tick: 1,
            unit: 0,
            order: Order::Attack(42),
        });
        let prepared = scenario.prepare().unwrap();
        let last = scenario.orders.len() - 1;
        assert!(matches!(
            prepared.resolve(last, &scenario.orders[last]),
            Err(ScenarioError::UnknownPlacement { placement: 42, .. })
        ));
    }

    #[test]
    fn test_overlapping_placements_fail() {
        let mut scenario = Scenario::desert_raid();
        scenario
            .units
            .push(UnitPlacement::new(ItemType::Trike, HouseId::Ordos, 0, 20, 12));
        assert!(matches!(
            scenario.prepare(),
            Err(ScenarioError::Game(GameError::TileOccupied { .. }))
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            Scenario::load("/definitely/not/here.ron"),
            Err(ScenarioError::FileNotFound(_))
        ));
    }
}
