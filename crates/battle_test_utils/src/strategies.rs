//! Proptest strategies for battles.
//!
//! These strategies generate random but reproducible order scripts. Scripts
//! address fractions and ships by index; [`crate::fixtures::BattleFixture::apply_step`]
//! wraps the indices, so every generated script applies to every fixture.

use battle_core::math::{Fixed, Vec2Fixed};
use battle_core::stats::ShipType;
use proptest::prelude::*;

/// One scripted command against a fixture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptStep {
    /// Queue a move.
    Move {
        /// Fraction index.
        fraction: usize,
        /// Ship index within the fraction.
        ship: usize,
        /// Destination x.
        x: i32,
        /// Destination y.
        y: i32,
    },
    /// Queue a laser shot.
    Laser {
        /// Shooter `(fraction, ship)`.
        shooter: (usize, usize),
        /// Target `(fraction, ship)`.
        target: (usize, usize),
    },
    /// Queue a missile shot.
    Missile {
        /// Shooter `(fraction, ship)`.
        shooter: (usize, usize),
        /// Target `(fraction, ship)`.
        target: (usize, usize),
    },
    /// Mark a fraction's turn finished.
    FinishTurn {
        /// Fraction index.
        fraction: usize,
    },
    /// Resolve the turn.
    EndTurn,
}

/// Generate a coordinate inside a `size`-wide battlefield.
pub fn arb_coordinate(size: i32) -> impl Strategy<Value = i32> {
    0..=size
}

/// Generate a position inside `width x height`.
pub fn arb_position(width: i32, height: i32) -> impl Strategy<Value = Vec2Fixed> {
    (arb_coordinate(width), arb_coordinate(height)).prop_map(|(x, y)| Vec2Fixed::from_ints(x, y))
}

/// Generate a distance in fixed-point.
///
/// Range: 0 to 100, covering every weapon's range and beyond.
pub fn arb_distance() -> impl Strategy<Value = Fixed> {
    (0i32..100i32).prop_map(Fixed::from_num)
}

/// Generate any hull class.
pub fn arb_ship_type() -> impl Strategy<Value = ShipType> {
    prop::sample::select(ShipType::ALL.to_vec())
}

/// Generate damage values (1-300).
pub fn arb_damage() -> impl Strategy<Value = u32> {
    1u32..300u32
}

fn arb_slot() -> impl Strategy<Value = (usize, usize)> {
    (0usize..4, 0usize..4)
}

/// Generate one script step on a `size x size` battlefield.
pub fn arb_step(size: i32) -> impl Strategy<Value = ScriptStep> {
    prop_oneof![
        3 => (0usize..4, 0usize..4, arb_coordinate(size), arb_coordinate(size))
            .prop_map(|(fraction, ship, x, y)| ScriptStep::Move { fraction, ship, x, y }),
        3 => (arb_slot(), arb_slot())
            .prop_map(|(shooter, target)| ScriptStep::Laser { shooter, target }),
        3 => (arb_slot(), arb_slot())
            .prop_map(|(shooter, target)| ScriptStep::Missile { shooter, target }),
        1 => (0usize..4).prop_map(|fraction| ScriptStep::FinishTurn { fraction }),
        2 => Just(ScriptStep::EndTurn),
    ]
}

/// Generate a script of up to `max_len` steps.
pub fn arb_script(size: i32, max_len: usize) -> impl Strategy<Value = Vec<ScriptStep>> {
    proptest::collection::vec(arb_step(size), 0..max_len)
}
