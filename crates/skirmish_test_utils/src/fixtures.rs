//! Test fixtures and helpers.
//!
//! Pre-built simulations and unit placements for consistent testing.

use fixed::types::I32F32;
use skirmish_core::components::{HouseId, ItemType, ObjectId, Owner, TeamId, TileCoord, UnitCommand};
use skirmish_core::math::Fixed;
use skirmish_core::simulation::{Simulation, UnitSpawnParams};

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> I32F32 {
    I32F32::from_num(n)
}

/// Create a fixed-point number from a float (for tests only).
///
/// Note: In real simulation code, never use floats.
/// This is only for convenient test setup.
#[must_use]
pub fn fixed_f(n: f64) -> I32F32 {
    I32F32::from_num(n)
}

/// Spawn a unit facing east on `(x, y)`.
///
/// # Panics
///
/// Panics if the tile is off the map or already taken.
pub fn spawn(
    sim: &mut Simulation,
    item: ItemType,
    house: HouseId,
    team: TeamId,
    x: i32,
    y: i32,
) -> ObjectId {
    sim.spawn_unit(UnitSpawnParams {
        item,
        owner: Owner::new(house, team),
        tile: TileCoord::new(x, y),
        angle: Fixed::ZERO,
    })
    .unwrap_or_else(|err| panic!("fixture spawn of {item:?} at ({x}, {y}) failed: {err}"))
}

/// Issue a command, panicking if the simulation rejects it.
///
/// # Panics
///
/// Panics if the command is rejected.
pub fn order(sim: &mut Simulation, unit: ObjectId, command: UnitCommand) {
    sim.apply_command(unit, command)
        .unwrap_or_else(|err| panic!("fixture order {command:?} for unit {unit} failed: {err}"));
}

/// Let every team see the whole map.
pub fn reveal_all(sim: &mut Simulation, teams: &[TeamId]) {
    let centre = TileCoord::new(sim.map().width() / 2, sim.map().height() / 2);
    let range = sim.map().width().max(sim.map().height()) as u32;
    for &team in teams {
        sim.reveal(team, centre, range);
    }
}

/// Three ground vehicles driving across an empty 32x32 map.
#[must_use]
pub fn ground_convoy() -> Simulation {
    let mut sim = Simulation::new(32, 32);
    let lead = spawn(&mut sim, ItemType::Tank, HouseId::Atreides, 0, 2, 2);
    let second = spawn(&mut sim, ItemType::Trike, HouseId::Atreides, 0, 2, 4);
    let third = spawn(&mut sim, ItemType::Tank, HouseId::Ordos, 0, 4, 2);
    order(&mut sim, lead, UnitCommand::Move(TileCoord::new(25, 20)));
    order(&mut sim, second, UnitCommand::Move(TileCoord::new(2, 28)));
    order(&mut sim, third, UnitCommand::Guard(TileCoord::new(16, 16)));
    sim
}

/// An ornithopter ordered to attack a tank column it can see.
#[must_use]
pub fn ornithopter_raid() -> Simulation {
    let mut sim = Simulation::new(32, 32);
    let thopter = spawn(&mut sim, ItemType::Ornithopter, HouseId::Atreides, 0, 2, 2);
    let tank = spawn(&mut sim, ItemType::Tank, HouseId::Harkonnen, 1, 14, 12);
    spawn(&mut sim, ItemType::Tank, HouseId::Harkonnen, 1, 15, 12);
    spawn(&mut sim, ItemType::Soldier, HouseId::Harkonnen, 1, 14, 14);
    sim.reveal(0, TileCoord::new(14, 12), 8);
    order(&mut sim, thopter, UnitCommand::Attack(tank));
    sim
}

/// Two armies of `per_side` units facing each other on a 64x64 map,
/// fully visible to both teams so they engage on their own.
///
/// # Panics
///
/// Panics if `per_side` does not fit in the deployment zones.
#[must_use]
pub fn skirmish(per_side: usize) -> Simulation {
    const ROSTER: [ItemType; 4] = [
        ItemType::Tank,
        ItemType::Trike,
        ItemType::Soldier,
        ItemType::Ornithopter,
    ];

    let mut sim = Simulation::new(64, 64);
    for i in 0..per_side {
        let item = ROSTER[i % ROSTER.len()];
        let row = (i / 6) as i32 * 2;
        let col = (i % 6) as i32;
        spawn(&mut sim, item, HouseId::Atreides, 0, 20 + col, 2 + row);
        spawn(&mut sim, item, HouseId::Harkonnen, 1, 38 + col, 2 + row);
    }
    reveal_all(&mut sim, &[0, 1]);
    sim
}
