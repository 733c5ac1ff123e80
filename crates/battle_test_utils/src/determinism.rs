//! Determinism testing utilities.
//!
//! Provides a harness for verifying that a battle's event log reproduces
//! its state exactly.
//!
//! # Testing Strategy
//!
//! A battle is the fold of its event log over the genesis state, so the
//! engine must be 100% deterministic. Sources of non-determinism include:
//!
//! - **Floating-point math**: We use fixed-point arithmetic via
//!   [`battle_core::math::Fixed`] for positions, speeds and rolls.
//!
//! - **HashMap iteration order**: Rust's default hasher is randomized.
//!   Resolution only iterates `Vec`s in submission order.
//!
//! - **System randomness**: Combat rolls use a `ChaCha8Rng` seeded from the
//!   battle id and turn number, never the thread RNG.
//!
//! - **Wall-clock time**: Timestamps are captured when events are built and
//!   travel inside the event.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::thread;

use battle_core::prelude::*;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of turns resolved per run.
    pub turns: u32,
}

impl DeterminismResult {
    fn from_hashes(hashes: Vec<u64>, turns: u32) -> Self {
        Self {
            is_deterministic: hashes.windows(2).all(|w| w[0] == w[1]),
            hashes,
            turns,
        }
    }

    /// Get all unique hashes (should be 1 for a deterministic battle).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that every run matched, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Battle is non-deterministic!\n\
                 Runs: {}\n\
                 Turns: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.turns,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Build a battle several times and verify the results match.
///
/// # Arguments
///
/// * `runs` - Number of times to build the battle
/// * `turns` - Number of turns to play per run
/// * `setup` - Function to create the initial state
/// * `step` - Function to play one turn
/// * `hash` - Function to compute the state hash
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    turns: u32,
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
        for _ in 0..turns {
            step(&mut state);
        }
        hashes.push(hash(&state));
    }

    DeterminismResult::from_hashes(hashes, turns)
}

/// Replay a recorded battle on `runs` threads and collect the final hashes.
///
/// The live state's hash is the first entry; every replay must match it.
/// A replay that fails to apply an event contributes hash `0`.
pub fn replay_in_parallel(manager: &BattleManager, runs: usize) -> DeterminismResult {
    let genesis = manager.state().genesis();
    let events = manager.events();
    let turns = manager.state().turn_number;

    let mut hashes = vec![manager.state().state_hash()];
    let replayed: Vec<u64> = thread::scope(|s| {
        let handles: Vec<_> = (0..runs)
            .map(|_| {
                let genesis = genesis.clone();
                s.spawn(move || {
                    BattleManager::replay(genesis, events.iter().cloned())
                        .map_or(0, |replayed| replayed.state().state_hash())
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|h| h.join().unwrap_or(0))
            .collect()
    });
    hashes.extend(replayed);

    DeterminismResult::from_hashes(hashes, turns)
}

/// Step two replays event by event, finding the first divergence.
///
/// # Returns
///
/// `None` if both produce the same state after every event, `Some(n)` if
/// the states differ after `n` events (0 means the genesis states differ).
pub fn find_first_divergence(a: &BattleReplay, b: &BattleReplay) -> Option<usize> {
    let mut left = ReplayPlayer::new(a.clone());
    let mut right = ReplayPlayer::new(b.clone());

    if left.state().state_hash() != right.state().state_hash() {
        return Some(0);
    }

    let steps = a.event_count().max(b.event_count());
    for position in 1..=steps {
        let advanced = left.advance().is_ok() && right.advance().is_ok();
        if !advanced || left.state().state_hash() != right.state().state_hash() {
            return Some(position);
        }
    }

    None
}

/// Verify that a snapshot round-trip preserves the battle state exactly.
pub fn verify_snapshot_determinism(state: &BattleState) -> bool {
    let Ok(bytes) = state.to_bytes() else {
        return false;
    };
    let Ok(restored) = BattleState::from_bytes(&bytes) else {
        return false;
    };
    restored.state_hash() == state.state_hash()
}

/// Compute a simple hash for any hashable value.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}
