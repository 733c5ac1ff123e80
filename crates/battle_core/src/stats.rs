//! Static ship attribute tables and weapon constants.
//!
//! Base stats are only read when a ship is created; after that the ship's own
//! meters degrade with damage and are the source of truth.

use serde::{Deserialize, Serialize};

use crate::math::{percent, Fixed};

/// Hull classes a fraction can field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShipType {
    /// Fast, fragile escort.
    Corvette,
    /// Line escort.
    Destroyer,
    /// Medium warship.
    Cruiser,
    /// Heavy warship.
    Battleship,
    /// The largest mobile hull.
    SuperBattleship,
    /// Immobile station.
    OrbitalFort,
}

/// Base attributes of a hull class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShipStats {
    /// Distance travelled per turn.
    pub speed: u32,
    /// Structural hit points.
    pub hit_points: u32,
    /// Shield capacity, depleted first.
    pub shields: u32,
    /// Armor plating, depleted after shields.
    pub armor: u32,
    /// Number of weapon modules.
    pub modules: usize,
}

impl ShipType {
    /// Every hull class, in table order.
    pub const ALL: [ShipType; 6] = [
        ShipType::Corvette,
        ShipType::Destroyer,
        ShipType::Cruiser,
        ShipType::Battleship,
        ShipType::SuperBattleship,
        ShipType::OrbitalFort,
    ];

    /// Base stats for this hull class.
    #[must_use]
    pub const fn stats(self) -> ShipStats {
        let (speed, hit_points, shields, armor, modules) = match self {
            ShipType::Corvette => (10, 50, 25, 25, 1),
            ShipType::Destroyer => (8, 100, 50, 50, 2),
            ShipType::Cruiser => (6, 200, 100, 100, 4),
            ShipType::Battleship => (5, 400, 200, 200, 8),
            ShipType::SuperBattleship => (5, 600, 300, 300, 12),
            ShipType::OrbitalFort => (0, 100, 50, 50, 2),
        };
        ShipStats {
            speed,
            hit_points,
            shields,
            armor,
            modules,
        }
    }

    /// Display name used in turn log messages.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            ShipType::Corvette => "Corvette",
            ShipType::Destroyer => "Destroyer",
            ShipType::Cruiser => "Cruiser",
            ShipType::Battleship => "Battleship",
            ShipType::SuperBattleship => "Super Battleship",
            ShipType::OrbitalFort => "Orbital Fort",
        }
    }
}

/// Weapon a system slot is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WeaponType {
    /// Direct-fire beam weapon.
    Laser,
    /// Guided missile launcher.
    Missile,
    /// Missile interception battery.
    PointDefense,
}

impl WeaponType {
    /// Lowercase label for logs and error messages.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            WeaponType::Laser => "laser",
            WeaponType::Missile => "missile",
            WeaponType::PointDefense => "point defense",
        }
    }
}

/// Laser shots beyond this distance miss automatically.
pub const LASER_MAX_RANGE: u32 = 40;
/// Damage of a laser hit.
pub const LASER_DAMAGE: u32 = 10;
/// Laser hit chance at point-blank range, in percent.
pub const LASER_ACCURACY_NEAR: u32 = 95;
/// Laser hit chance at maximum range, in percent.
pub const LASER_ACCURACY_FAR: u32 = 35;

/// Missiles are fully reliable up to this distance.
pub const MISSILE_EFFECTIVE_RANGE: u32 = 35;
/// Missiles cannot be fired beyond this distance.
pub const MISSILE_MAX_RANGE: u32 = 55;
/// Damage of a missile hit.
pub const MISSILE_DAMAGE: u32 = 25;
/// Missile hit chance within effective range, in percent.
pub const MISSILE_ACCURACY_EFFECTIVE: u32 = 90;
/// Missile hit chance at maximum range, in percent.
pub const MISSILE_ACCURACY_FAR: u32 = 40;

/// Point defense covers missiles passing within this distance of the ship.
pub const POINT_DEFENSE_RANGE: u32 = 15;
/// Chance for one point-defense slot to stop a missile, in percent.
pub const POINT_DEFENSE_INTERCEPT_CHANCE: u32 = 50;

/// Spacing of presentation waypoints along ship and missile paths.
pub const PATH_WAYPOINT_SPACING: u32 = 2;

/// Laser hit chance at `distance`.
///
/// Falls linearly from [`LASER_ACCURACY_NEAR`] at zero distance to
/// [`LASER_ACCURACY_FAR`] at [`LASER_MAX_RANGE`], and is zero beyond.
#[must_use]
pub fn laser_hit_chance(distance: Fixed) -> Fixed {
    let max_range = Fixed::from_num(LASER_MAX_RANGE);
    if distance > max_range {
        return Fixed::ZERO;
    }
    let near = percent(LASER_ACCURACY_NEAR);
    let far = percent(LASER_ACCURACY_FAR);
    near - (near - far) * (distance / max_range)
}

/// Missile hit chance at `distance`, or `None` beyond [`MISSILE_MAX_RANGE`].
///
/// Constant [`MISSILE_ACCURACY_EFFECTIVE`] inside the effective range, then
/// falls linearly to [`MISSILE_ACCURACY_FAR`] at maximum range.
#[must_use]
pub fn missile_hit_chance(distance: Fixed) -> Option<Fixed> {
    let effective = Fixed::from_num(MISSILE_EFFECTIVE_RANGE);
    let max_range = Fixed::from_num(MISSILE_MAX_RANGE);
    if distance > max_range {
        return None;
    }
    let reliable = percent(MISSILE_ACCURACY_EFFECTIVE);
    if distance <= effective {
        return Some(reliable);
    }
    let far = percent(MISSILE_ACCURACY_FAR);
    let falloff = (distance - effective) / (max_range - effective);
    Some(reliable - (reliable - far) * falloff)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ship_table() {
        let corvette = ShipType::Corvette.stats();
        assert_eq!(corvette.speed, 10);
        assert_eq!(corvette.hit_points, 50);
        assert_eq!(corvette.modules, 1);

        let fort = ShipType::OrbitalFort.stats();
        assert_eq!(fort.speed, 0);
        assert_eq!(fort.modules, 2);

        assert_eq!(ShipType::SuperBattleship.stats().modules, 12);
    }

    #[test]
    fn test_laser_accuracy_is_monotonic() {
        let mut previous = laser_hit_chance(Fixed::ZERO);
        assert_eq!(previous, percent(LASER_ACCURACY_NEAR));
        for d in 1..=LASER_MAX_RANGE {
            let chance = laser_hit_chance(Fixed::from_num(d));
            assert!(chance <= previous, "accuracy rose at distance {d}");
            previous = chance;
        }
        assert_eq!(
            laser_hit_chance(Fixed::from_num(LASER_MAX_RANGE)),
            percent(LASER_ACCURACY_FAR)
        );
        assert_eq!(
            laser_hit_chance(Fixed::from_num(LASER_MAX_RANGE + 1)),
            Fixed::ZERO
        );
    }

    #[test]
    fn test_missile_accuracy_bands() {
        let close = missile_hit_chance(Fixed::from_num(10));
        assert_eq!(close, Some(percent(MISSILE_ACCURACY_EFFECTIVE)));

        let edge = missile_hit_chance(Fixed::from_num(MISSILE_MAX_RANGE));
        assert_eq!(edge, Some(percent(MISSILE_ACCURACY_FAR)));

        let between = missile_hit_chance(Fixed::from_num(45)).unwrap_or_default();
        assert!(between < percent(MISSILE_ACCURACY_EFFECTIVE));
        assert!(between > percent(MISSILE_ACCURACY_FAR));

        assert_eq!(missile_hit_chance(Fixed::from_num(56)), None);
    }
}
