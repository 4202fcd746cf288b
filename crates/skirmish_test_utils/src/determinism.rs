//! Determinism testing utilities.
//!
//! Provides a harness for verifying that the simulation
//! produces identical results given identical inputs.
//!
//! # Testing Strategy
//!
//! Lockstep multiplayer and replays only work if every client computes
//! the same state from the same commands. Sources of non-determinism include:
//!
//! - **Floating-point math**: Different CPUs can produce different results.
//!   We use fixed-point arithmetic via [`skirmish_core::math::Fixed`] throughout.
//!
//! - **HashMap iteration order**: Rust's default hasher is randomized.
//!   Units are always processed in sorted object-id order.
//!
//! - **Occupant order**: Tile occupant lists are kept sorted by id, so a
//!   loaded game hashes the same as the game that was saved.
//!
//! # Test Levels
//!
//! 1. **Unit tests**: Individual system determinism (movement, targeting, etc.)
//! 2. **Property tests**: Random inputs must still produce deterministic outputs
//! 3. **Integration tests**: Full simulation scenarios are reproducible
//! 4. **Parallel tests**: Running N simulations in parallel all match

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use rayon::prelude::*;
use skirmish_core::simulation::Simulation;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of ticks simulated.
    pub ticks: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for deterministic simulation).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the simulation was deterministic, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the simulation produced different hashes across runs.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Simulation is non-deterministic!\n\
                 Runs: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Result of parallel simulation runs.
#[derive(Debug, Clone)]
pub struct ParallelSimResult {
    /// Final state hash from each simulation.
    pub hashes: Vec<u64>,
    /// Number of ticks each simulation ran.
    pub ticks: u64,
    /// Number of simulations run.
    pub num_sims: usize,
}

impl ParallelSimResult {
    /// Check if all simulations produced identical results.
    #[must_use]
    pub fn is_deterministic(&self) -> bool {
        self.hashes.windows(2).all(|w| w[0] == w[1])
    }

    /// Assert all simulations matched.
    ///
    /// # Panics
    ///
    /// Panics if simulations produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic() {
            let mut unique: Vec<u64> = self.hashes.clone();
            unique.sort_unstable();
            unique.dedup();
            panic!(
                "Parallel simulations diverged!\n\
                 Simulations: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {}\n\
                 All hashes: {:?}",
                self.num_sims,
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a simulation multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run the simulation
/// * `ticks` - Number of ticks to simulate per run
/// * `setup` - Function to create initial simulation state
/// * `step` - Function to advance simulation by one tick
/// * `hash` - Function to compute state hash
///
/// # Example
///
/// ```
/// use skirmish_test_utils::determinism::verify_determinism;
/// use skirmish_test_utils::fixtures::ground_convoy;
///
/// let result = verify_determinism(
///     3,
///     50,
///     ground_convoy,
///     |sim| { sim.tick(); },
///     |sim| sim.state_hash(),
/// );
/// result.assert_deterministic();
/// ```
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    ticks: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for _ in 0..ticks {
            step(&mut state);
        }

        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        ticks,
    }
}

/// Run a [`Simulation`] twice from identical setup and compare the final
/// state hashes.
pub fn verify_simulation_determinism<F>(setup_fn: F, num_ticks: u64) -> bool
where
    F: Fn() -> Simulation,
{
    let result = verify_determinism(
        2,
        num_ticks,
        &setup_fn,
        |sim| {
            sim.tick();
        },
        Simulation::state_hash,
    );
    result.is_deterministic
}

/// Run N simulations on the rayon pool and collect final hashes.
///
/// This is useful for catching non-determinism that only manifests
/// under thread scheduling variations, memory layout differences, etc.
///
/// # Example
///
/// ```
/// use skirmish_test_utils::determinism::run_parallel_simulations;
/// use skirmish_test_utils::fixtures::ornithopter_raid;
///
/// let result = run_parallel_simulations(ornithopter_raid, 4, 100);
/// result.assert_deterministic();
/// ```
pub fn run_parallel_simulations<F>(setup_fn: F, num_sims: usize, num_ticks: u64) -> ParallelSimResult
where
    F: Fn() -> Simulation + Sync,
{
    let hashes = (0..num_sims)
        .into_par_iter()
        .map(|_| {
            let mut sim = setup_fn();
            for _ in 0..num_ticks {
                sim.tick();
            }
            sim.state_hash()
        })
        .collect();

    ParallelSimResult {
        hashes,
        ticks: num_ticks,
        num_sims,
    }
}

/// Compare two simulation runs tick-by-tick, finding first divergence.
///
/// # Returns
///
/// `None` if simulations are deterministic, `Some(tick)` if they diverge
/// at that tick.
pub fn find_first_divergence<F>(setup_fn: F, num_ticks: u64) -> Option<u64>
where
    F: Fn() -> Simulation,
{
    let mut sim1 = setup_fn();
    let mut sim2 = setup_fn();

    if sim1.state_hash() != sim2.state_hash() {
        return Some(0);
    }

    for tick in 1..=num_ticks {
        sim1.tick();
        sim2.tick();

        if sim1.state_hash() != sim2.state_hash() {
            tracing::warn!(tick, "Simulations diverged");
            return Some(tick);
        }
    }

    None
}

/// Verify that a save/load round trip preserves simulation state exactly,
/// and that the loaded game keeps evolving identically.
pub fn verify_serialization_determinism<F>(setup_fn: F, num_ticks: u64) -> bool
where
    F: Fn() -> Simulation,
{
    let mut sim = setup_fn();

    for _ in 0..num_ticks {
        sim.tick();
    }

    let Ok(bytes) = sim.save() else {
        return false;
    };
    let Ok(mut restored) = Simulation::load(&bytes, sim.balance().clone()) else {
        return false;
    };

    if restored.state_hash() != sim.state_hash() {
        return false;
    }

    for _ in 0..num_ticks {
        sim.tick();
        restored.tick();
    }
    restored.state_hash() == sim.state_hash()
}

/// Compute a simple hash for any hashable value.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Proptest strategies for determinism testing.
///
/// These strategies generate random but reproducible inputs for
/// property-based testing of simulation determinism.
pub mod strategies {
    use proptest::prelude::*;
    use skirmish_core::components::{HouseId, ItemType, ObjectId, Owner, TileCoord, UnitCommand};
    use skirmish_core::map::MAX_TEAMS;
    use skirmish_core::math::{Fixed, ANGLE_RANGE};
    use skirmish_core::simulation::UnitSpawnParams;

    /// Generate a heading anywhere in `[0, 256)`, fractional parts included.
    pub fn arb_angle() -> impl Strategy<Value = Fixed> {
        (0..ANGLE_RANGE.to_bits()).prop_map(Fixed::from_bits)
    }

    /// Generate a heading that may lie outside `[0, 256)`.
    pub fn arb_unnormalized_angle() -> impl Strategy<Value = Fixed> {
        (-1024i64..1024).prop_map(Fixed::from_num)
    }

    /// Generate a turn speed.
    ///
    /// Range: 0 to 64 degrees256 per tick
    pub fn arb_turn_speed() -> impl Strategy<Value = Fixed> {
        (0..(64i64 << 32)).prop_map(Fixed::from_bits)
    }

    /// Generate a tile on a `width` x `height` map.
    pub fn arb_tile(width: i32, height: i32) -> impl Strategy<Value = TileCoord> {
        (0..width, 0..height).prop_map(|(x, y)| TileCoord::new(x, y))
    }

    /// Generate any item type.
    pub fn arb_item() -> impl Strategy<Value = ItemType> {
        proptest::sample::select(ItemType::ALL.to_vec())
    }

    /// Generate any owner on a valid team.
    pub fn arb_owner() -> impl Strategy<Value = Owner> {
        (proptest::sample::select(HouseId::ALL.to_vec()), 0..MAX_TEAMS)
            .prop_map(|(house, team)| Owner::new(house, team))
    }

    /// Generate spawn parameters on a `width` x `height` map.
    pub fn arb_spawn(width: i32, height: i32) -> impl Strategy<Value = UnitSpawnParams> {
        (arb_item(), arb_owner(), arb_tile(width, height), arb_angle()).prop_map(
            |(item, owner, tile, angle)| UnitSpawnParams {
                item,
                owner,
                tile,
                angle,
            },
        )
    }

    /// Generate a list of spawn parameters. Some may collide; callers
    /// skip the ones the simulation rejects.
    pub fn arb_spawn_list(
        width: i32,
        height: i32,
        max_units: usize,
    ) -> impl Strategy<Value = Vec<UnitSpawnParams>> {
        proptest::collection::vec(arb_spawn(width, height), 1..max_units)
    }

    /// Generate a command for a map of the given size. Attack targets are
    /// drawn from `1..=max_id`.
    pub fn arb_command(width: i32, height: i32, max_id: ObjectId) -> impl Strategy<Value = UnitCommand> {
        prop_oneof![
            arb_tile(width, height).prop_map(UnitCommand::Move),
            (1..=max_id).prop_map(UnitCommand::Attack),
            Just(UnitCommand::Stop),
            arb_tile(width, height).prop_map(UnitCommand::Guard),
        ]
    }

    /// Generate `(tick, unit, command)` orders for up to `max_ticks` ticks.
    pub fn arb_orders(
        width: i32,
        height: i32,
        max_id: ObjectId,
        max_ticks: u64,
        max_len: usize,
    ) -> impl Strategy<Value = Vec<(u64, ObjectId, UnitCommand)>> {
        let order = (0..max_ticks, 1..=max_id, arb_command(width, height, max_id));
        proptest::collection::vec(order, 0..max_len).prop_map(|mut orders| {
            orders.sort_by_key(|(tick, _, _)| *tick);
            orders
        })
    }

    /// Generate damage values (1-100).
    pub fn arb_damage() -> impl Strategy<Value = u32> {
        1u32..100u32
    }
}
