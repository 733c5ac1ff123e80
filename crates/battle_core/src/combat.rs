//! Combat rolls and range checks.
//!
//! A roll is a uniform fixed-point value in `[0, 1)` drawn from the turn's
//! seeded generator; a shot succeeds when `roll < chance`. Drawing 32 random
//! bits straight into the fractional part keeps the roll platform-independent.

use rand::RngCore;

use crate::error::{BattleError, Result};
use crate::math::{percent, Fixed};
use crate::stats::{
    laser_hit_chance, missile_hit_chance, WeaponType, LASER_MAX_RANGE, MISSILE_MAX_RANGE,
    POINT_DEFENSE_INTERCEPT_CHANCE, POINT_DEFENSE_RANGE,
};

/// Outcome of one probabilistic check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Roll {
    /// Drawn value in `[0, 1)`.
    pub roll: Fixed,
    /// Success threshold.
    pub chance: Fixed,
}

impl Roll {
    /// Whether the check succeeded.
    #[must_use]
    pub fn success(&self) -> bool {
        self.roll < self.chance
    }

    /// Diagnostic rendering for admin logs.
    #[must_use]
    pub fn describe(&self) -> String {
        format!(
            "roll={:.4} chance={:.4}",
            self.roll.to_num::<f64>(),
            self.chance.to_num::<f64>()
        )
    }
}

/// Draw a uniform value in `[0, 1)`.
pub fn draw<R: RngCore + ?Sized>(rng: &mut R) -> Fixed {
    Fixed::from_bits(i64::from(rng.next_u32()))
}

/// Roll against `chance`.
pub fn roll_against<R: RngCore + ?Sized>(rng: &mut R, chance: Fixed) -> Roll {
    Roll {
        roll: draw(rng),
        chance,
    }
}

/// Maximum range of a weapon, if it fires at all.
#[must_use]
pub const fn max_range(weapon: WeaponType) -> u32 {
    match weapon {
        WeaponType::Laser => LASER_MAX_RANGE,
        WeaponType::Missile => MISSILE_MAX_RANGE,
        WeaponType::PointDefense => POINT_DEFENSE_RANGE,
    }
}

/// Fail with [`BattleError::OutOfRange`] when `distance` exceeds the weapon's range.
pub fn check_range(weapon: WeaponType, distance: Fixed) -> Result<()> {
    let max = max_range(weapon);
    if distance > Fixed::from_num(max) {
        return Err(BattleError::OutOfRange {
            weapon,
            distance: distance.to_num::<f64>(),
            max_range: max,
        });
    }
    Ok(())
}

/// Hit chance of `weapon` at `distance`; zero when out of range.
#[must_use]
pub fn hit_chance(weapon: WeaponType, distance: Fixed) -> Fixed {
    match weapon {
        WeaponType::Laser => laser_hit_chance(distance),
        WeaponType::Missile => missile_hit_chance(distance).unwrap_or(Fixed::ZERO),
        WeaponType::PointDefense => percent(POINT_DEFENSE_INTERCEPT_CHANCE),
    }
}
