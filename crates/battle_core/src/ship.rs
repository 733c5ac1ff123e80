//! Ships, their weapon modules and damage absorption.

use serde::{Deserialize, Serialize};

use crate::ids::{FractionId, ShipId};
use crate::math::{fixed_serde, Fixed, Vec2Fixed};
use crate::stats::{ShipType, WeaponType};

/// A current/maximum pair for a depletable ship attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Meter {
    /// Remaining value.
    pub current: u32,
    /// Value at creation.
    pub max: u32,
}

impl Meter {
    /// A full meter.
    #[must_use]
    pub const fn full(max: u32) -> Self {
        Self { current: max, max }
    }

    /// Whether nothing is left.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.current == 0
    }

    /// Soak up to `amount`, returning how much this meter absorbed.
    pub fn absorb(&mut self, amount: u32) -> u32 {
        let absorbed = amount.min(self.current);
        self.current -= absorbed;
        absorbed
    }
}

/// One weapon mounting point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SystemSlot {
    /// Weapon bound to this slot.
    pub weapon: WeaponType,
}

impl SystemSlot {
    /// A slot carrying `weapon`.
    #[must_use]
    pub const fn new(weapon: WeaponType) -> Self {
        Self { weapon }
    }
}

/// A weapon module: a group of system slots.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModuleState {
    /// Slots in this module.
    pub slots: Vec<SystemSlot>,
}

impl ModuleState {
    /// The standard module: one laser, one missile launcher, one point-defense battery.
    #[must_use]
    pub fn standard() -> Self {
        Self {
            slots: vec![
                SystemSlot::new(WeaponType::Laser),
                SystemSlot::new(WeaponType::Missile),
                SystemSlot::new(WeaponType::PointDefense),
            ],
        }
    }

    /// A module built from explicit weapons.
    #[must_use]
    pub fn with_weapons(weapons: &[WeaponType]) -> Self {
        Self {
            slots: weapons.iter().copied().map(SystemSlot::new).collect(),
        }
    }

    /// Number of slots bound to `weapon`.
    #[must_use]
    pub fn count(&self, weapon: WeaponType) -> u32 {
        self.slots.iter().filter(|slot| slot.weapon == weapon).count() as u32
    }
}

/// How one hit was distributed across the damage layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DamageReport {
    /// Damage before absorption.
    pub raw: u32,
    /// Absorbed by shields.
    pub shields: u32,
    /// Absorbed by armor.
    pub armor: u32,
    /// Taken by the hull.
    pub hull: u32,
    /// Whether this hit took hit points to zero.
    pub destroyed: bool,
}

impl DamageReport {
    /// Damage that actually landed on some layer.
    #[must_use]
    pub const fn applied(&self) -> u32 {
        self.shields + self.armor + self.hull
    }
}

/// A ship in a fraction's fleet.
///
/// Ships are never removed from their fraction: destruction is `hit_points`
/// reaching zero, and the ship stays addressable for log references.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShipState {
    /// Ship identity.
    pub ship_id: ShipId,
    /// Owning fraction (back-reference).
    pub fraction_id: FractionId,
    /// Display name.
    pub name: String,
    /// Hull class.
    pub ship_type: ShipType,
    /// Current position.
    pub position: Vec2Fixed,
    /// Distance travelled per turn.
    #[serde(with = "fixed_serde")]
    pub speed: Fixed,
    /// Structural integrity.
    pub hit_points: Meter,
    /// First damage layer.
    pub shields: Meter,
    /// Second damage layer.
    pub armor: Meter,
    /// Weapon modules, count fixed by hull class.
    pub modules: Vec<ModuleState>,
}

impl ShipState {
    /// Build a ship at full strength from the hull's base stats.
    ///
    /// An empty `modules` list gets the standard loadout.
    #[must_use]
    pub fn new(
        ship_id: ShipId,
        fraction_id: FractionId,
        name: impl Into<String>,
        ship_type: ShipType,
        position: Vec2Fixed,
        modules: Vec<ModuleState>,
    ) -> Self {
        let stats = ship_type.stats();
        let modules = if modules.is_empty() {
            vec![ModuleState::standard(); stats.modules]
        } else {
            modules
        };
        Self {
            ship_id,
            fraction_id,
            name: name.into(),
            ship_type,
            position,
            speed: Fixed::from_num(stats.speed),
            hit_points: Meter::full(stats.hit_points),
            shields: Meter::full(stats.shields),
            armor: Meter::full(stats.armor),
            modules,
        }
    }

    /// Whether the ship has been destroyed.
    #[must_use]
    pub const fn is_destroyed(&self) -> bool {
        self.hit_points.is_empty()
    }

    /// Whether the ship can still act.
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        !self.is_destroyed()
    }

    /// Laser slots across all modules.
    #[must_use]
    pub fn number_of_lasers(&self) -> u32 {
        self.weapon_count(WeaponType::Laser)
    }

    /// Missile slots across all modules.
    #[must_use]
    pub fn number_of_missiles(&self) -> u32 {
        self.weapon_count(WeaponType::Missile)
    }

    /// Point-defense slots across all modules.
    #[must_use]
    pub fn number_of_points_defense(&self) -> u32 {
        self.weapon_count(WeaponType::PointDefense)
    }

    fn weapon_count(&self, weapon: WeaponType) -> u32 {
        self.modules.iter().map(|module| module.count(weapon)).sum()
    }

    /// Apply `amount` damage: shields first, then armor, then hit points.
    ///
    /// Each layer absorbs up to its remaining value before the next is touched.
    /// Hit points clamp at zero; `destroyed` is only set by the hit that
    /// crosses zero.
    pub fn apply_damage(&mut self, amount: u32) -> DamageReport {
        let was_alive = self.is_alive();
        let mut remaining = amount;

        let shields = self.shields.absorb(remaining);
        remaining -= shields;
        let armor = self.armor.absorb(remaining);
        remaining -= armor;
        let hull = self.hit_points.absorb(remaining);

        DamageReport {
            raw: amount,
            shields,
            armor,
            hull,
            destroyed: was_alive && self.is_destroyed(),
        }
    }
}
