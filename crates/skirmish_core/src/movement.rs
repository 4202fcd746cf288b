//! Per-unit movement state machine.
//!
//! Each tick a unit runs, in order:
//!
//! 1. **Snapshot** its destination, so commands arriving mid-tick cannot
//!    leave a half-applied target.
//! 2. **Turn** toward the destination along the shorter arc.
//! 3. **Move** along its heading, relocating its tile registration in one
//!    step when it crosses a tile boundary.
//! 4. **Check position**: clear a reached destination, or head back to the
//!    guard point after drifting too far.
//! 5. **Animate**.
//!
//! Aircraft keep flying once launched and turn while moving. Ground units
//! rotate in place and only drive once the remaining turn fits in one step.

use serde::{Deserialize, Serialize};

use crate::components::{Destination, TileCoord, HEAVILY_DAMAGED_SPEED_MULTIPLIER};
use crate::data::{BalanceTable, UnitStats};
use crate::events::{SimEvent, TickEvents};
use crate::map::Map;
use crate::math::{
    angle_to_drawn_angle, cos256, destination_angle, normalize_angle, sin256, Fixed, Vec2Fixed,
    ANGLE_RANGE,
};
use crate::unit::{KindState, Unit};
use crate::unit_kind::MovementProfile;

/// Block distance from the guard point beyond which an idle unit returns.
pub const GUARD_DRIFT_LIMIT: i32 = 17;

/// Block distance at which aircraft consider their destination reached.
pub const AIR_REACH_DISTANCE: i32 = 2;

/// Divisor applied to the turn speed of loitering aircraft.
const LOITER_TURN_DIVISOR: i32 = 8;

/// Movement state of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MotionState {
    /// Parked with nowhere to go.
    #[default]
    Idle,
    /// Travelling along the current heading.
    Moving,
    /// Turning toward an ordered destination.
    TurningToDestination,
    /// Turning back toward the guard point.
    TurningToGuard,
}

/// Which way a heading should rotate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TurnDirection {
    /// Already aligned.
    None,
    /// Counter-clockwise on screen (heading increases).
    Left,
    /// Clockwise on screen (heading decreases).
    Right,
}

/// Shorter rotation from `heading` to `target` and its length.
///
/// On an exact tie (a half turn) the rotation goes right.
#[must_use]
pub fn turn_direction(heading: Fixed, target: Fixed) -> (TurnDirection, Fixed) {
    let angle_left = normalize_angle(target - heading);
    let angle_right = normalize_angle(heading - target);

    if angle_left == Fixed::ZERO {
        (TurnDirection::None, Fixed::ZERO)
    } else if angle_left < angle_right {
        (TurnDirection::Left, angle_left)
    } else {
        (TurnDirection::Right, angle_right)
    }
}

/// Length of the shorter arc between two headings, in `[0, 128]`.
#[must_use]
pub fn angular_distance(heading: Fixed, target: Fixed) -> Fixed {
    turn_direction(heading, target).1
}

/// Rotate `heading` toward `target` by at most `turn_speed`, never past it.
///
/// The result is wrapped into `[0, 256)`.
#[must_use]
pub fn turn_toward(heading: Fixed, target: Fixed, turn_speed: Fixed) -> Fixed {
    let (direction, remaining) = turn_direction(heading, target);
    let step = turn_speed.max(Fixed::ZERO).min(remaining);
    match direction {
        TurnDirection::None => normalize_angle(heading),
        TurnDirection::Left => normalize_angle(heading + step),
        TurnDirection::Right => normalize_angle(heading - step),
    }
}

/// Per-tick displacement for a heading and speed, in screen space.
#[must_use]
pub fn velocity(angle: Fixed, speed: Fixed) -> Vec2Fixed {
    Vec2Fixed::new(cos256(angle) * speed, -(sin256(angle) * speed))
}

/// Block distance at which a destination counts as reached.
#[must_use]
pub fn reach_distance(profile: MovementProfile) -> Fixed {
    match profile {
        MovementProfile::Flying => Fixed::from_num(AIR_REACH_DISTANCE),
        MovementProfile::Tracked | MovementProfile::Foot => Fixed::ZERO,
    }
}

/// Everything a movement step may read or write besides the unit itself.
pub struct TickContext<'a> {
    /// The tile grid.
    pub map: &'a mut Map,
    /// Static balance data.
    pub balance: &'a BalanceTable,
    /// Tick counter, used for animation.
    pub game_cycle: u64,
    /// Event sink.
    pub events: &'a mut TickEvents,
}

/// Advance one unit by one tick.
pub fn update(unit: &mut Unit, ctx: &mut TickContext<'_>) {
    let stats = *unit.stats(ctx.balance);
    let destination = unit.destination;
    let flying = unit.is_flying();
    let launched = unit.motion != MotionState::Idle || destination.is_valid();

    let should_move = if flying {
        turn_aircraft(unit, destination, &stats, launched);
        launched
    } else {
        turn_ground(unit, destination, &stats)
    };

    if should_move {
        move_step(unit, ctx, &stats);
    }

    check_position(unit, ctx.events);
    unit.motion = motion_state(unit, flying && launched);
    animate(unit, ctx.game_cycle);
}

fn turn_aircraft(unit: &mut Unit, destination: Destination, stats: &UnitStats, launched: bool) {
    let reload = stats.weapon.map_or(0, |weapon| weapon.reload);

    match destination.tile() {
        Some(tile) if unit.weapon_timer <= reload / 3 => {
            let wanted = destination_angle(unit.position, tile.center());
            unit.angle = turn_toward(unit.angle, wanted, stats.turn_speed);
        }
        _ if launched => {
            let drift = stats.turn_speed / Fixed::from_num(LOITER_TURN_DIVISOR);
            unit.angle = normalize_angle(unit.angle - drift);
        }
        _ => {}
    }
}

/// Turn a ground unit; returns whether it may also drive this tick.
fn turn_ground(unit: &mut Unit, destination: Destination, stats: &UnitStats) -> bool {
    let Some(tile) = destination.tile() else {
        return false;
    };
    let wanted = destination_angle(unit.position, tile.center());
    let remaining = angular_distance(unit.angle, wanted);
    unit.angle = turn_toward(unit.angle, wanted, stats.turn_speed);
    remaining <= stats.turn_speed
}

fn move_step(unit: &mut Unit, ctx: &mut TickContext<'_>, stats: &UnitStats) {
    let speed = match unit.kind {
        KindState::Air { current_max_speed } => current_max_speed,
        KindState::Ground if unit.health.is_heavily_damaged() => {
            stats.max_speed * HEAVILY_DAMAGED_SPEED_MULTIPLIER
        }
        KindState::Ground => stats.max_speed,
    };

    let new_position = unit.position + velocity(unit.angle, speed);
    let new_location = TileCoord::from_world(new_position);

    if new_location != unit.location {
        if !ctx.map.tile_exists(new_location)
            || !ctx
                .map
                .relocate(unit.id, unit.location, new_location, unit.occupancy())
        {
            tracing::trace!(unit = unit.id, tile = %new_location, "Move blocked");
            ctx.events.push(SimEvent::MoveBlocked {
                unit: unit.id,
                tile: new_location,
            });
            return;
        }
        if !unit.is_flying() {
            ctx.map
                .reveal(unit.owner.team, new_location, stats.view_range);
        }
    }

    unit.position = new_position;
    unit.location = new_location;
}

fn check_position(unit: &mut Unit, events: &mut TickEvents) {
    // Targeting owns the destination while a target is held.
    if !unit.target.is_none() {
        return;
    }
    match unit.destination.tile() {
        Some(tile) => {
            let reach = reach_distance(unit.capabilities().movement);
            if unit.location.block_distance(tile) <= reach {
                unit.destination.invalidate();
                events.push(SimEvent::DestinationReached {
                    unit: unit.id,
                    tile,
                });
            }
        }
        None => {
            let drift = unit.location.block_distance(unit.guard_point);
            if drift > Fixed::from_num(GUARD_DRIFT_LIMIT) {
                tracing::debug!(unit = unit.id, guard = %unit.guard_point, "Returning to guard point");
                unit.destination = Destination::GuardReturn(unit.guard_point);
                events.push(SimEvent::ReturningToGuard {
                    unit: unit.id,
                    tile: unit.guard_point,
                });
            }
        }
    }
}

fn motion_state(unit: &Unit, airborne: bool) -> MotionState {
    let Some(tile) = unit.destination.tile() else {
        return if airborne {
            MotionState::Moving
        } else {
            MotionState::Idle
        };
    };

    let wanted = destination_angle(unit.position, tile.center());
    if angular_distance(unit.angle, wanted) == Fixed::ZERO {
        MotionState::Moving
    } else if matches!(unit.destination, Destination::GuardReturn(_)) {
        MotionState::TurningToGuard
    } else {
        MotionState::TurningToDestination
    }
}

fn animate(unit: &mut Unit, game_cycle: u64) {
    let caps = unit.capabilities();
    let frame_time = u64::from(caps.frame_time);
    let frame_count = u64::from(caps.frame_count);
    unit.drawn_frame = ((game_cycle + u64::from(unit.id)) / frame_time % frame_count) as u32;
    unit.drawn_angle = angle_to_drawn_angle(unit.angle);
    debug_assert!(unit.angle >= Fixed::ZERO && unit.angle < ANGLE_RANGE);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{HouseId, ItemType, Owner, Target};

    fn ctx_parts() -> (Map, BalanceTable, TickEvents) {
        (Map::new(16, 16), BalanceTable::standard(), TickEvents::default())
    }

    fn spawn(map: &mut Map, balance: &BalanceTable, id: u32, item: ItemType, tile: TileCoord) -> Unit {
        let unit = Unit::new(
            id,
            item,
            Owner::new(HouseId::Harkonnen, 0),
            tile,
            Fixed::ZERO,
            balance,
        );
        assert!(unit.assign_to_map(map, balance));
        unit
    }

    #[test]
    fn test_turn_direction_prefers_shorter_arc() {
        let (dir, len) = turn_direction(Fixed::ZERO, Fixed::from_num(200));
        assert_eq!(dir, TurnDirection::Right);
        assert_eq!(len, Fixed::from_num(56));

        let (dir, len) = turn_direction(Fixed::from_num(250), Fixed::from_num(10));
        assert_eq!(dir, TurnDirection::Left);
        assert_eq!(len, Fixed::from_num(16));
    }

    #[test]
    fn test_half_turn_tie_goes_right() {
        let (dir, len) = turn_direction(Fixed::from_num(10), Fixed::from_num(138));
        assert_eq!(dir, TurnDirection::Right);
        assert_eq!(len, Fixed::from_num(128));
    }

    #[test]
    fn test_two_hundred_unit_turn_takes_six_steps() {
        let target = Fixed::from_num(200);
        let speed = Fixed::from_num(10);
        let mut heading = Fixed::ZERO;
        let mut steps = 0;
        while heading != target {
            heading = turn_toward(heading, target, speed);
            steps += 1;
            assert!(steps <= 6, "took the long way round");
        }
        assert_eq!(steps, 6);
    }

    #[test]
    fn test_turn_never_overshoots() {
        let heading = Fixed::from_num(60);
        let target = Fixed::from_num(64);
        assert_eq!(turn_toward(heading, target, Fixed::from_num(10)), target);
        assert_eq!(turn_toward(heading, target, Fixed::ZERO), heading);
    }

    #[test]
    fn test_velocity_screen_space() {
        let right = velocity(Fixed::ZERO, Fixed::from_num(2));
        assert_eq!(right, Vec2Fixed::from_ints(2, 0));
        let up = velocity(Fixed::from_num(64), Fixed::from_num(2));
        assert_eq!(up, Vec2Fixed::from_ints(0, -2));
    }

    #[test]
    fn test_ground_unit_drives_to_destination() {
        let (mut map, balance, mut events) = ctx_parts();
        let mut tank = spawn(&mut map, &balance, 1, ItemType::Tank, TileCoord::new(0, 0));
        tank.set_destination(Destination::Order(TileCoord::new(3, 0)));

        let mut ticks = 0;
        while tank.destination().is_valid() {
            let mut ctx = TickContext {
                map: &mut map,
                balance: &balance,
                game_cycle: ticks,
                events: &mut events,
            };
            update(&mut tank, &mut ctx);
            ticks += 1;
            assert!(ticks < 200);
        }

        assert_eq!(tank.location(), TileCoord::new(3, 0));
        assert_eq!(tank.motion(), MotionState::Idle);
        assert_eq!(map.registrations(1), vec![(TileCoord::new(3, 0), crate::map::OccupancyCategory::Ground)]);
        assert!(events
            .effects
            .contains(&SimEvent::DestinationReached { unit: 1, tile: TileCoord::new(3, 0) }));
    }

    #[test]
    fn test_ground_unit_turns_in_place_first() {
        let (mut map, balance, mut events) = ctx_parts();
        let mut tank = spawn(&mut map, &balance, 1, ItemType::Tank, TileCoord::new(5, 5));
        // Straight down: a quarter turn right.
        tank.set_destination(Destination::Order(TileCoord::new(5, 10)));

        let start = tank.position();
        let mut ctx = TickContext {
            map: &mut map,
            balance: &balance,
            game_cycle: 0,
            events: &mut events,
        };
        update(&mut tank, &mut ctx);
        assert_eq!(tank.position(), start);
        assert_eq!(tank.angle(), Fixed::from_num(252));
        assert_eq!(tank.motion(), MotionState::TurningToDestination);
    }

    #[test]
    fn test_blocked_move_changes_nothing() {
        let (mut map, balance, mut events) = ctx_parts();
        let mut tank = spawn(&mut map, &balance, 1, ItemType::Tank, TileCoord::new(0, 0));
        let _blocker = spawn(&mut map, &balance, 2, ItemType::Trike, TileCoord::new(1, 0));
        tank.set_destination(Destination::Order(TileCoord::new(4, 0)));

        for cycle in 0..40 {
            let mut ctx = TickContext {
                map: &mut map,
                balance: &balance,
                game_cycle: cycle,
                events: &mut events,
            };
            update(&mut tank, &mut ctx);
        }
        assert_eq!(tank.location(), TileCoord::new(0, 0));
        assert_eq!(TileCoord::from_world(tank.position()), TileCoord::new(0, 0));
        assert!(events
            .effects
            .contains(&SimEvent::MoveBlocked { unit: 1, tile: TileCoord::new(1, 0) }));
    }

    #[test]
    fn test_aircraft_loiters_without_destination_once_launched() {
        let (mut map, balance, mut events) = ctx_parts();
        let mut thopter = spawn(&mut map, &balance, 1, ItemType::Ornithopter, TileCoord::new(8, 8));

        // Parked until the first order.
        let mut ctx = TickContext {
            map: &mut map,
            balance: &balance,
            game_cycle: 0,
            events: &mut events,
        };
        update(&mut thopter, &mut ctx);
        assert_eq!(thopter.motion(), MotionState::Idle);
        assert_eq!(thopter.position(), TileCoord::new(8, 8).center());

        thopter.set_destination(Destination::Order(TileCoord::new(8, 8)));
        update(&mut thopter, &mut ctx);
        assert!(!thopter.destination().is_valid());
        assert_eq!(thopter.motion(), MotionState::Moving);

        let heading = thopter.angle();
        update(&mut thopter, &mut ctx);
        assert_eq!(thopter.angle(), normalize_angle(heading - Fixed::from_num(0.5)));
    }

    #[test]
    fn test_drift_sets_guard_return() {
        let (_, balance, mut events) = ctx_parts();
        let mut map = Map::new(40, 4);
        let mut thopter = spawn(&mut map, &balance, 1, ItemType::Ornithopter, TileCoord::new(20, 1));
        thopter.set_guard_point(TileCoord::new(2, 1));

        let mut ctx = TickContext {
            map: &mut map,
            balance: &balance,
            game_cycle: 0,
            events: &mut events,
        };
        update(&mut thopter, &mut ctx);
        assert_eq!(thopter.destination(), Destination::GuardReturn(TileCoord::new(2, 1)));
        assert_eq!(thopter.motion(), MotionState::TurningToGuard);
    }

    #[test]
    fn test_attacking_unit_keeps_destination_in_reach() {
        let (mut map, balance, mut events) = ctx_parts();
        let mut thopter = spawn(&mut map, &balance, 1, ItemType::Ornithopter, TileCoord::new(4, 4));
        thopter.set_target(Target::Ordered(2));
        thopter.set_destination(Destination::Order(TileCoord::new(5, 4)));

        let mut ctx = TickContext {
            map: &mut map,
            balance: &balance,
            game_cycle: 0,
            events: &mut events,
        };
        for _ in 0..3 {
            update(&mut thopter, &mut ctx);
            assert_eq!(thopter.destination(), Destination::Order(TileCoord::new(5, 4)));
        }
        assert!(!events
            .effects
            .iter()
            .any(|event| matches!(event, SimEvent::DestinationReached { .. })));
    }

    #[test]
    fn test_animation_frame_cycles() {
        let (mut map, balance, mut events) = ctx_parts();
        let mut thopter = spawn(&mut map, &balance, 1, ItemType::Ornithopter, TileCoord::new(8, 8));
        let mut frames = Vec::new();
        for cycle in 0..9 {
            let mut ctx = TickContext {
                map: &mut map,
                balance: &balance,
                game_cycle: cycle,
                events: &mut events,
            };
            update(&mut thopter, &mut ctx);
            frames.push(thopter.drawn_frame());
        }
        // (cycle + 1) / 3 % 3
        assert_eq!(frames, vec![0, 0, 1, 1, 1, 2, 2, 2, 0]);
    }
}
