//! End-to-end movement scenarios driven through the public simulation API.

use skirmish_core::components::{Destination, HouseId, ItemType, TileCoord, UnitCommand};
use skirmish_core::data::{BalanceTable, UnitStats};
use skirmish_core::events::SimEvent;
use skirmish_core::math::{Fixed, TILESIZE};
use skirmish_core::movement::MotionState;
use skirmish_core::simulation::Simulation;
use skirmish_test_utils::fixtures::{fixed, order, spawn};

#[test]
fn tank_drives_five_tiles_east_and_stops() {
    let mut sim = Simulation::new(16, 4);
    let tank = spawn(&mut sim, ItemType::Tank, HouseId::Atreides, 0, 0, 0);
    assert_eq!(sim.unit(tank).unwrap().stats(sim.balance()).max_speed, fixed(2));
    order(&mut sim, tank, UnitCommand::Move(TileCoord::new(5, 0)));

    let limit = (5 * TILESIZE / 2) as u64;
    let mut last_x = sim.unit(tank).unwrap().position().x;
    let mut reached_at = None;

    for tick in 1..=limit {
        let events = sim.tick();
        let unit = sim.unit(tank).unwrap();
        assert!(unit.position().x > last_x, "x stalled on tick {tick}");
        assert_eq!(unit.position().y, fixed(32));
        last_x = unit.position().x;

        if unit.location().x == 5 {
            assert!(events.effects.contains(&SimEvent::DestinationReached {
                unit: tank,
                tile: TileCoord::new(5, 0),
            }));
            reached_at = Some(tick);
            break;
        }
        assert!(unit.destination().is_valid());
    }

    assert!(reached_at.is_some(), "tank never reached x = 5");
    assert_eq!(sim.unit(tank).unwrap().destination(), Destination::Invalid);
}

#[test]
fn reached_destination_stays_invalid() {
    let mut sim = Simulation::new(16, 4);
    let tank = spawn(&mut sim, ItemType::Tank, HouseId::Atreides, 0, 0, 0);
    order(&mut sim, tank, UnitCommand::Move(TileCoord::new(5, 0)));

    for _ in 0..200 {
        sim.tick();
    }
    let parked = sim.unit(tank).unwrap().clone();
    assert_eq!(parked.destination(), Destination::Invalid);
    assert_eq!(parked.motion(), MotionState::Idle);

    for _ in 0..100 {
        sim.tick();
        let unit = sim.unit(tank).unwrap();
        assert_eq!(unit.destination(), Destination::Invalid);
        assert_eq!(unit.position(), parked.position());
    }
}

#[test]
fn aircraft_arrival_counts_two_tiles_out() {
    let mut sim = Simulation::new(16, 4);
    let thopter = spawn(&mut sim, ItemType::Ornithopter, HouseId::Atreides, 0, 0, 0);
    order(&mut sim, thopter, UnitCommand::Move(TileCoord::new(5, 0)));

    for _ in 0..100 {
        sim.tick();
        if !sim.unit(thopter).unwrap().destination().is_valid() {
            break;
        }
    }

    let unit = sim.unit(thopter).unwrap();
    assert_eq!(unit.destination(), Destination::Invalid);
    assert_eq!(unit.location(), TileCoord::new(3, 0));

    // Still airborne: it keeps circling instead of parking.
    let before = unit.position();
    sim.tick();
    let unit = sim.unit(thopter).unwrap();
    assert_ne!(unit.position(), before);
    assert_eq!(unit.motion(), MotionState::Moving);
}

#[test]
fn hovering_aircraft_turns_the_short_way_down() {
    let hover = UnitStats {
        max_speed: Fixed::ZERO,
        turn_speed: fixed(10),
        ..*BalanceTable::standard().get(ItemType::Ornithopter, HouseId::Atreides)
    };
    let balance = BalanceTable::standard().with_item(ItemType::Ornithopter, hover);
    let mut sim = Simulation::with_balance(8, 8, balance);
    let thopter = spawn(&mut sim, ItemType::Ornithopter, HouseId::Atreides, 0, 2, 0);
    order(&mut sim, thopter, UnitCommand::Move(TileCoord::new(2, 6)));

    for step in 1..=6 {
        sim.tick();
        let angle = sim.unit(thopter).unwrap().angle();
        assert_eq!(angle, fixed(256 - 10 * step), "heading after tick {step}");
    }

    sim.tick();
    let unit = sim.unit(thopter).unwrap();
    assert_eq!(unit.angle(), fixed(192));
    assert_eq!(unit.drawn_angle(), 6);
    assert_eq!(unit.location(), TileCoord::new(2, 0));
}

#[test]
fn stop_order_parks_a_ground_unit() {
    let mut sim = Simulation::new(16, 16);
    let trike = spawn(&mut sim, ItemType::Trike, HouseId::Ordos, 0, 1, 1);
    order(&mut sim, trike, UnitCommand::Move(TileCoord::new(12, 12)));
    for _ in 0..20 {
        sim.tick();
    }
    order(&mut sim, trike, UnitCommand::Stop);
    let stopped_at = sim.unit(trike).unwrap().position();
    for _ in 0..20 {
        sim.tick();
    }
    let unit = sim.unit(trike).unwrap();
    assert_eq!(unit.position(), stopped_at);
    assert_eq!(unit.guard_point(), unit.location());
}

#[test]
fn ground_units_queue_behind_a_blocker() {
    let mut sim = Simulation::new(8, 1);
    let blocker = spawn(&mut sim, ItemType::Tank, HouseId::Atreides, 0, 3, 0);
    let mover = spawn(&mut sim, ItemType::Trike, HouseId::Atreides, 0, 0, 0);
    order(&mut sim, mover, UnitCommand::Move(TileCoord::new(6, 0)));

    let mut blocked = false;
    for _ in 0..200 {
        let events = sim.tick();
        blocked |= events
            .effects
            .iter()
            .any(|event| matches!(event, SimEvent::MoveBlocked { unit, .. } if *unit == mover));
        assert!(sim.check_occupancy());
    }

    assert!(blocked);
    assert_eq!(sim.unit(mover).unwrap().location(), TileCoord::new(2, 0));
    assert_eq!(sim.unit(blocker).unwrap().location(), TileCoord::new(3, 0));
    assert_eq!(
        sim.map().query(TileCoord::new(3, 0), skirmish_core::map::OccupancyCategory::Ground),
        &[blocker]
    );
}
