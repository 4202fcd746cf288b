//! Static capability profiles for each [`ItemType`].
//!
//! Unit specialization is data, not inheritance: every item type maps to a
//! [`KindCapabilities`] record that selects its movement, targeting and
//! death-effect behavior. Stats that vary per house (speed, health, weapon)
//! live in the balance table instead.

use serde::{Deserialize, Serialize};

use crate::components::ItemType;
use crate::map::{DeadUnitKind, OccupancyCategory};

/// How a unit moves and which occupancy slot it uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MovementProfile {
    /// Keeps flying once launched and moves while turning.
    Flying,
    /// Vehicle: rotates in place, then drives.
    Tracked,
    /// Infantry: rotates in place, then walks. Shares tiles.
    Foot,
}

impl MovementProfile {
    /// Occupancy slot for units with this profile.
    #[must_use]
    pub const fn occupancy(self) -> OccupancyCategory {
        match self {
            Self::Flying => OccupancyCategory::Air,
            Self::Tracked => OccupancyCategory::Ground,
            Self::Foot => OccupancyCategory::Infantry,
        }
    }

    /// Check whether this profile flies.
    #[must_use]
    pub const fn is_flying(self) -> bool {
        matches!(self, Self::Flying)
    }
}

/// Rule set deciding which units a kind may attack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetingProfile {
    /// Strikes visible enemy ground units, and the worm on any team.
    AirToGround,
    /// Attacks visible enemy ground units.
    GroundOnly,
    /// Never attacks.
    Unarmed,
    /// Swallows any ground unit except other worms, regardless of team or
    /// visibility.
    Devour,
}

/// Explosion animation requested on death.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExplosionKind {
    /// Small puff (infantry).
    Small,
    /// Medium blast (light vehicles, aircraft).
    Medium,
    /// Large blast (tanks).
    Large,
}

/// Sound cues the core can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SoundId {
    /// Small explosion.
    ExplosionSmall,
    /// Medium explosion.
    ExplosionMedium,
    /// Large explosion.
    ExplosionLarge,
    /// Infantry death scream.
    Scream,
    /// Rocket launch.
    Rocket,
    /// Machine-gun burst.
    Gun,
    /// Tank cannon.
    Cannon,
    /// Worm strike.
    WormAttack,
}

/// What happens when a unit of this kind is destroyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeathEffect {
    /// Explosion spawned if anyone can see the unit.
    pub explosion: Option<ExplosionKind>,
    /// Sound played if the owner's team can see the unit.
    pub sound: Option<SoundId>,
    /// Remains left on the tile.
    pub wreck: Option<DeadUnitKind>,
}

/// Full static profile of an item type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KindCapabilities {
    /// Movement behavior.
    pub movement: MovementProfile,
    /// Targeting rules.
    pub targeting: TargetingProfile,
    /// Death behavior.
    pub death: DeathEffect,
    /// Sound played when the weapon fires.
    pub attack_sound: Option<SoundId>,
    /// Animation frames per cycle.
    pub frame_count: u32,
    /// Game cycles each animation frame is shown.
    pub frame_time: u32,
    /// Offset of the ground shadow from the unit, in world units.
    pub shadow_offset: Option<(i32, i32)>,
}

impl KindCapabilities {
    /// Check whether this kind flies.
    #[must_use]
    pub const fn is_flying(&self) -> bool {
        self.movement.is_flying()
    }
}

const ORNITHOPTER: KindCapabilities = KindCapabilities {
    movement: MovementProfile::Flying,
    targeting: TargetingProfile::AirToGround,
    death: DeathEffect {
        explosion: Some(ExplosionKind::Medium),
        sound: Some(SoundId::ExplosionMedium),
        wreck: Some(DeadUnitKind::Ornithopter),
    },
    attack_sound: Some(SoundId::Rocket),
    frame_count: 3,
    frame_time: 3,
    shadow_offset: Some((4, 12)),
};

const CARRYALL: KindCapabilities = KindCapabilities {
    movement: MovementProfile::Flying,
    targeting: TargetingProfile::Unarmed,
    death: DeathEffect {
        explosion: Some(ExplosionKind::Medium),
        sound: Some(SoundId::ExplosionMedium),
        wreck: None,
    },
    attack_sound: None,
    frame_count: 1,
    frame_time: 1,
    shadow_offset: Some((4, 12)),
};

const TRIKE: KindCapabilities = KindCapabilities {
    movement: MovementProfile::Tracked,
    targeting: TargetingProfile::GroundOnly,
    death: DeathEffect {
        explosion: Some(ExplosionKind::Medium),
        sound: Some(SoundId::ExplosionMedium),
        wreck: Some(DeadUnitKind::Vehicle),
    },
    attack_sound: Some(SoundId::Gun),
    frame_count: 1,
    frame_time: 1,
    shadow_offset: None,
};

const TANK: KindCapabilities = KindCapabilities {
    movement: MovementProfile::Tracked,
    targeting: TargetingProfile::GroundOnly,
    death: DeathEffect {
        explosion: Some(ExplosionKind::Large),
        sound: Some(SoundId::ExplosionLarge),
        wreck: Some(DeadUnitKind::Vehicle),
    },
    attack_sound: Some(SoundId::Cannon),
    frame_count: 1,
    frame_time: 1,
    shadow_offset: None,
};

const SOLDIER: KindCapabilities = KindCapabilities {
    movement: MovementProfile::Foot,
    targeting: TargetingProfile::GroundOnly,
    death: DeathEffect {
        explosion: Some(ExplosionKind::Small),
        sound: Some(SoundId::Scream),
        wreck: Some(DeadUnitKind::Infantry),
    },
    attack_sound: Some(SoundId::Gun),
    frame_count: 4,
    frame_time: 5,
    shadow_offset: None,
};

const SANDWORM: KindCapabilities = KindCapabilities {
    movement: MovementProfile::Tracked,
    targeting: TargetingProfile::Devour,
    death: DeathEffect {
        explosion: None,
        sound: None,
        wreck: None,
    },
    attack_sound: Some(SoundId::WormAttack),
    frame_count: 5,
    frame_time: 4,
    shadow_offset: None,
};

/// Look up the static profile of an item type.
#[must_use]
pub const fn capabilities(item: ItemType) -> &'static KindCapabilities {
    match item {
        ItemType::Ornithopter => &ORNITHOPTER,
        ItemType::Carryall => &CARRYALL,
        ItemType::Trike => &TRIKE,
        ItemType::Tank => &TANK,
        ItemType::Soldier => &SOLDIER,
        ItemType::Sandworm => &SANDWORM,
    }
}
