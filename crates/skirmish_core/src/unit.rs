//! The unit entity: construction, map registration and destruction.
//!
//! A [`Unit`] is one tagged record. Behavior that differs per item type is
//! selected through [`capabilities`], and the only kind-specific runtime
//! data is carried in [`KindState`].
//!
//! Destruction consumes the unit, so a unit cannot be destroyed twice.

use serde::{Deserialize, Serialize};

use crate::components::{Destination, Health, ItemType, ObjectId, Owner, Target, TileCoord};
use crate::data::{BalanceTable, UnitStats};
use crate::events::{SimEvent, TickEvents};
use crate::map::{DeadUnitMarker, Map, OccupancyCategory};
use crate::math::{angle_to_drawn_angle, fixed_serde, normalize_angle, Fixed, Vec2Fixed};
use crate::movement::MotionState;
use crate::targeting::TargetInfo;
use crate::unit_kind::{capabilities, KindCapabilities};

/// Runtime data that only some kinds carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KindState {
    /// Aircraft.
    Air {
        /// Cruise speed fixed at launch, in world units per tick.
        #[serde(with = "fixed_serde")]
        current_max_speed: Fixed,
    },
    /// Vehicles, infantry and the worm. Speed comes from the balance table
    /// every tick.
    Ground,
}

/// What the rendering collaborator needs to draw a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpriteState {
    /// Rounded world position.
    pub position: (i32, i32),
    /// Sprite direction in `[0, 8)`.
    pub drawn_angle: u8,
    /// Animation frame in `[0, frame_count)`.
    pub frame: u32,
    /// Frames in the animation cycle.
    pub frame_count: u32,
    /// Where to draw the shadow relative to the unit, if it has one.
    pub shadow_offset: Option<(i32, i32)>,
}

/// A unit on the map.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Unit {
    pub(crate) id: ObjectId,
    pub(crate) item: ItemType,
    pub(crate) owner: Owner,
    pub(crate) health: Health,
    pub(crate) position: Vec2Fixed,
    pub(crate) location: TileCoord,
    pub(crate) angle: Fixed,
    pub(crate) drawn_angle: u8,
    pub(crate) destination: Destination,
    pub(crate) guard_point: TileCoord,
    pub(crate) target: Target,
    pub(crate) weapon_timer: u32,
    pub(crate) motion: MotionState,
    pub(crate) drawn_frame: u32,
    pub(crate) kind: KindState,
}

impl Unit {
    /// Create a fresh unit at the centre of `tile`, at full health.
    ///
    /// The unit is not registered on any map yet; see
    /// [`assign_to_map`](Self::assign_to_map).
    #[must_use]
    pub fn new(
        id: ObjectId,
        item: ItemType,
        owner: Owner,
        tile: TileCoord,
        angle: Fixed,
        balance: &BalanceTable,
    ) -> Self {
        let stats = balance.get(item, owner.house);
        let angle = normalize_angle(angle);
        let kind = if capabilities(item).is_flying() {
            KindState::Air {
                current_max_speed: stats.max_speed,
            }
        } else {
            KindState::Ground
        };

        Self {
            id,
            item,
            owner,
            health: Health::new(stats.max_health),
            position: tile.center(),
            location: tile,
            angle,
            drawn_angle: angle_to_drawn_angle(angle),
            destination: Destination::Invalid,
            guard_point: tile,
            target: Target::None,
            weapon_timer: 0,
            motion: MotionState::Idle,
            drawn_frame: 0,
            kind,
        }
    }

    /// Object id.
    #[must_use]
    pub const fn id(&self) -> ObjectId {
        self.id
    }

    /// Item type.
    #[must_use]
    pub const fn item(&self) -> ItemType {
        self.item
    }

    /// Owner.
    #[must_use]
    pub const fn owner(&self) -> Owner {
        self.owner
    }

    /// Health.
    #[must_use]
    pub const fn health(&self) -> Health {
        self.health
    }

    /// World-space position.
    #[must_use]
    pub const fn position(&self) -> Vec2Fixed {
        self.position
    }

    /// Tile the unit is registered on.
    #[must_use]
    pub const fn location(&self) -> TileCoord {
        self.location
    }

    /// Heading in degrees256, always in `[0, 256)`.
    #[must_use]
    pub const fn angle(&self) -> Fixed {
        self.angle
    }

    /// Sprite direction bucket.
    #[must_use]
    pub const fn drawn_angle(&self) -> u8 {
        self.drawn_angle
    }

    /// Current destination.
    #[must_use]
    pub const fn destination(&self) -> Destination {
        self.destination
    }

    /// Point the unit returns to when it drifts away.
    #[must_use]
    pub const fn guard_point(&self) -> TileCoord {
        self.guard_point
    }

    /// Current target.
    #[must_use]
    pub const fn target(&self) -> Target {
        self.target
    }

    /// Ticks until the weapon can fire again.
    #[must_use]
    pub const fn weapon_timer(&self) -> u32 {
        self.weapon_timer
    }

    /// Movement state.
    #[must_use]
    pub const fn motion(&self) -> MotionState {
        self.motion
    }

    /// Animation frame.
    #[must_use]
    pub const fn drawn_frame(&self) -> u32 {
        self.drawn_frame
    }

    /// Kind-specific state.
    #[must_use]
    pub const fn kind(&self) -> KindState {
        self.kind
    }

    /// Cruise speed of aircraft; `None` for ground kinds.
    #[must_use]
    pub const fn current_max_speed(&self) -> Option<Fixed> {
        match self.kind {
            KindState::Air { current_max_speed } => Some(current_max_speed),
            KindState::Ground => None,
        }
    }

    /// Static profile of this unit's item type.
    #[must_use]
    pub const fn capabilities(&self) -> &'static KindCapabilities {
        capabilities(self.item)
    }

    /// Balance row for this unit's item type and house.
    #[must_use]
    pub fn stats<'a>(&self, balance: &'a BalanceTable) -> &'a UnitStats {
        balance.get(self.item, self.owner.house)
    }

    /// Check whether the unit is airborne.
    #[must_use]
    pub const fn is_flying(&self) -> bool {
        self.capabilities().is_flying()
    }

    /// Occupancy slot this unit uses.
    #[must_use]
    pub const fn occupancy(&self) -> OccupancyCategory {
        self.capabilities().movement.occupancy()
    }

    /// Replace the destination.
    pub fn set_destination(&mut self, destination: Destination) {
        self.destination = destination;
    }

    /// Replace the guard point.
    pub fn set_guard_point(&mut self, tile: TileCoord) {
        self.guard_point = tile;
    }

    /// Replace the target.
    pub fn set_target(&mut self, target: Target) {
        self.target = target;
    }

    /// Apply damage, returning actual damage dealt.
    pub fn apply_damage(&mut self, amount: u32) -> u32 {
        self.health.apply_damage(amount)
    }

    /// Snapshot used by targeting decisions.
    #[must_use]
    pub const fn target_info(&self) -> TargetInfo {
        TargetInfo {
            id: self.id,
            item: self.item,
            owner: self.owner,
            location: self.location,
            flying: self.is_flying(),
            alive: !self.health.is_dead(),
        }
    }

    /// Register the unit on its tile.
    ///
    /// Ground units reveal the map around them; aircraft deliberately do
    /// not. Returns `false` (and changes nothing) if the tile does not exist
    /// or has no room.
    pub fn assign_to_map(&self, map: &mut Map, balance: &BalanceTable) -> bool {
        let category = self.occupancy();
        if !map.can_assign(self.id, self.location, category) {
            return false;
        }
        map.assign(self.id, self.location, category);
        if !self.is_flying() {
            map.reveal(self.owner.team, self.location, self.stats(balance).view_range);
        }
        true
    }

    /// Destroy the unit: leave remains, request death effects, and
    /// deregister it from the map.
    ///
    /// The explosion is only requested if some team can see the tile, and
    /// the sound only if the owner's team can.
    pub fn destroy(self, map: &mut Map, events: &mut TickEvents) {
        let death = self.capabilities().death;
        let position = self.position.rounded();

        if let Some(kind) = death.wreck {
            map.place_wreck(
                self.location,
                DeadUnitMarker {
                    kind,
                    house: self.owner.house,
                    position,
                },
            );
        }
        if let Some(kind) = death.explosion {
            if map.is_visible_to_any(self.location) {
                events.push(SimEvent::Explosion { kind, position });
            }
        }
        if let Some(sound) = death.sound {
            if map.is_visible(self.owner.team, self.location) {
                events.push(SimEvent::Sound { sound, position });
            }
        }

        map.unassign(self.id, self.location, self.occupancy());
        tracing::debug!(unit = self.id, item = ?self.item, "Unit destroyed");
    }

    /// Logical drawing state for the rendering collaborator.
    #[must_use]
    pub fn render_state(&self) -> SpriteState {
        let caps = self.capabilities();
        SpriteState {
            position: self.position.rounded(),
            drawn_angle: self.drawn_angle,
            frame: self.drawn_frame,
            frame_count: caps.frame_count,
            shadow_offset: caps.shadow_offset,
        }
    }
}
