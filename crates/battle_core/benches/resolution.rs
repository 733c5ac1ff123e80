//! Turn resolution benchmarks for battle_core.
//!
//! Run with: `cargo bench -p battle_core`

// Benchmark binaries don't need docs on macro-generated functions
#![allow(missing_docs)]

use battle_core::prelude::*;
use battle_test_utils::fixtures::BattleFixture;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Two fleets of `per_side` cruisers in a line, every ship moving and
/// firing everything it carries at its opposite number.
fn fleet_battle(per_side: usize) -> BattleState {
    let mut battle = BattleFixture::seeded(1, 2000, 2000);
    let west = battle.add_fraction("West");
    let east = battle.add_fraction("East");
    for i in 0..per_side {
        let y = 20 + 10 * i32::try_from(i).unwrap_or(0);
        battle.add_ship(west, ShipType::Cruiser, 100, y);
        battle.add_ship(east, ShipType::Cruiser, 130, y);
    }
    battle.start();

    for i in 0..per_side {
        let _ = battle.move_ship(west, i, 200, 1000);
        for _ in 0..4 {
            let _ = battle.fire_laser((west, i), (east, i));
            let _ = battle.fire_missile((west, i), (east, i));
            let _ = battle.fire_laser((east, i), (west, i));
            let _ = battle.fire_missile((east, i), (west, i));
        }
    }
    battle.state().clone()
}

/// Runs turn resolution benchmarks for the battle_core crate.
pub fn resolution_benchmark(c: &mut Criterion) {
    let small = fleet_battle(10);
    let large = fleet_battle(100);

    c.bench_function("resolve_turn_10v10", |b| {
        b.iter(|| {
            let mut state = small.clone();
            let mut rng = ChaCha8Rng::seed_from_u64(state.turn_seed());
            black_box(resolve_turn(&mut state, &mut rng))
        })
    });

    c.bench_function("resolve_turn_100v100", |b| {
        b.iter(|| {
            let mut state = large.clone();
            let mut rng = ChaCha8Rng::seed_from_u64(state.turn_seed());
            black_box(resolve_turn(&mut state, &mut rng))
        })
    });

    c.bench_function("state_hash_100v100", |b| b.iter(|| black_box(large.state_hash())));
}

criterion_group!(benches, resolution_benchmark);
criterion_main!(benches);
