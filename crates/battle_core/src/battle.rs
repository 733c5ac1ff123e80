//! The battle aggregate root.
//!
//! [`BattleState`] is created once in [`BattleStatus::Preparation`] and is
//! afterwards only mutated by event handlers. It carries the fleets, the
//! orders queued for the next resolution, the presentation paths of the last
//! resolution and the append-only battle log.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::error::{BattleError, Result};
use crate::events::unix_millis;
use crate::fraction::FractionState;
use crate::ids::{BattleId, FractionId, ShipId};
use crate::math::Vec2Fixed;
use crate::ship::ShipState;
use crate::turn_log::TurnLogEntry;

/// Largest accepted battlefield width or height.
///
/// Keeps the squared distance between any two in-bounds points representable
/// in [`Fixed`](crate::math::Fixed).
pub const MAX_BATTLEFIELD_SIZE: u32 = 32_767;

/// Check battlefield dimensions: both non-zero and at most
/// [`MAX_BATTLEFIELD_SIZE`].
pub fn check_dimensions(width: u32, height: u32) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(BattleError::InvalidPayload(format!(
            "battlefield {width}x{height} has no area"
        )));
    }
    if width > MAX_BATTLEFIELD_SIZE || height > MAX_BATTLEFIELD_SIZE {
        return Err(BattleError::InvalidPayload(format!(
            "battlefield {width}x{height} exceeds {MAX_BATTLEFIELD_SIZE} units per side"
        )));
    }
    Ok(())
}

/// Lifecycle phase of a battle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum BattleStatus {
    /// Fractions and ships are being set up; `turn_number` is 0.
    #[default]
    Preparation,
    /// Turns are being played.
    InProgress,
    /// At most one fraction remains undefeated.
    Finished,
}

/// A queued move: the latest requested destination for one ship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShipMoveOrder {
    /// Ordering fraction.
    pub fraction_id: FractionId,
    /// Ship to move.
    pub ship_id: ShipId,
    /// Requested destination.
    pub target: Vec2Fixed,
}

/// A queued laser or missile shot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShotOrder {
    /// Fraction of the firing ship.
    pub fraction_id: FractionId,
    /// Firing ship.
    pub shooter_ship_id: ShipId,
    /// Fraction of the target ship.
    pub target_fraction_id: FractionId,
    /// Target ship.
    pub target_ship_id: ShipId,
}

/// The route a ship took during the last resolution.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShipMovementPath {
    /// Owning fraction.
    pub fraction_id: FractionId,
    /// Moving ship.
    pub ship_id: ShipId,
    /// Position before moving.
    pub start: Vec2Fixed,
    /// Requested destination.
    pub target: Vec2Fixed,
    /// Where the ship actually stopped this turn.
    pub end: Vec2Fixed,
    /// Intermediate points between `start` and `end`.
    pub waypoints: Vec<Vec2Fixed>,
}

/// The flight of one missile during the last resolution.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MissileMovementPath {
    /// Fraction of the launching ship.
    pub fraction_id: FractionId,
    /// Launching ship.
    pub shooter_ship_id: ShipId,
    /// Fraction of the target.
    pub target_fraction_id: FractionId,
    /// Target ship.
    pub target_ship_id: ShipId,
    /// Launch point.
    pub start: Vec2Fixed,
    /// Target position at launch.
    pub target: Vec2Fixed,
    /// Intermediate points between `start` and `target`.
    pub waypoints: Vec<Vec2Fixed>,
}

/// The battle aggregate root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BattleState {
    /// Stable identity.
    pub battle_id: BattleId,
    /// Display name.
    pub name: String,
    /// Lifecycle phase.
    pub status: BattleStatus,
    /// 0 during preparation, then 1 and counting.
    pub turn_number: u32,
    /// Playable width.
    pub width: u32,
    /// Playable height.
    pub height: u32,
    /// Fractions in creation order.
    pub fractions: Vec<FractionState>,
    /// Move orders for the next resolution, one per ship.
    pub pending_moves: Vec<ShipMoveOrder>,
    /// Laser shots for the next resolution, in submission order.
    pub pending_laser_shots: Vec<ShotOrder>,
    /// Missile shots for the next resolution, in submission order.
    pub pending_missile_shots: Vec<ShotOrder>,
    /// Ship paths computed by the last resolution.
    pub ship_movement_paths: Vec<ShipMovementPath>,
    /// Missile paths computed by the last resolution.
    pub missile_movement_paths: Vec<MissileMovementPath>,
    /// Append-only log of every resolved turn.
    pub battle_log: Vec<TurnLogEntry>,
    /// Surviving fraction once the battle is finished.
    pub winner: Option<FractionId>,
    /// Soft-delete marker.
    pub is_deleted: bool,
    /// Creation time, unix milliseconds.
    pub created_at: u64,
    /// Timestamp of the last applied event, unix milliseconds.
    pub last_updated: u64,
}

impl BattleState {
    /// A fresh battle in preparation with a newly minted id.
    #[must_use]
    pub fn new(name: impl Into<String>, width: u32, height: u32) -> Self {
        Self::with_id(BattleId::new(), name, width, height, unix_millis())
    }

    /// A fresh battle in preparation with explicit identity and creation time.
    #[must_use]
    pub fn with_id(
        battle_id: BattleId,
        name: impl Into<String>,
        width: u32,
        height: u32,
        created_at: u64,
    ) -> Self {
        Self {
            battle_id,
            name: name.into(),
            status: BattleStatus::Preparation,
            turn_number: 0,
            width,
            height,
            fractions: Vec::new(),
            pending_moves: Vec::new(),
            pending_laser_shots: Vec::new(),
            pending_missile_shots: Vec::new(),
            ship_movement_paths: Vec::new(),
            missile_movement_paths: Vec::new(),
            battle_log: Vec::new(),
            winner: None,
            is_deleted: false,
            created_at,
            last_updated: created_at,
        }
    }

    /// The empty battle this one started from: same identity, name and bounds.
    ///
    /// Replaying the event log over the genesis state must reproduce `self`.
    #[must_use]
    pub fn genesis(&self) -> Self {
        Self::with_id(
            self.battle_id,
            self.name.clone(),
            self.width,
            self.height,
            self.created_at,
        )
    }

    /// Look up a fraction.
    #[must_use]
    pub fn fraction(&self, fraction_id: FractionId) -> Option<&FractionState> {
        self.fractions
            .iter()
            .find(|fraction| fraction.fraction_id == fraction_id)
    }

    /// Mutable lookup of a fraction.
    pub fn fraction_mut(&mut self, fraction_id: FractionId) -> Option<&mut FractionState> {
        self.fractions
            .iter_mut()
            .find(|fraction| fraction.fraction_id == fraction_id)
    }

    /// Look up a ship of a specific fraction.
    #[must_use]
    pub fn ship(&self, fraction_id: FractionId, ship_id: ShipId) -> Option<&ShipState> {
        self.fraction(fraction_id)?.ship(ship_id)
    }

    /// Mutable lookup of a ship of a specific fraction.
    pub fn ship_mut(&mut self, fraction_id: FractionId, ship_id: ShipId) -> Option<&mut ShipState> {
        self.fraction_mut(fraction_id)?.ship_mut(ship_id)
    }

    /// Find a ship in any fraction.
    #[must_use]
    pub fn find_ship(&self, ship_id: ShipId) -> Option<(&FractionState, &ShipState)> {
        self.fractions.iter().find_map(|fraction| {
            fraction.ship(ship_id).map(|ship| (fraction, ship))
        })
    }

    /// Fraction that must exist for an event to proceed.
    pub fn require_fraction(&self, fraction_id: FractionId) -> Result<&FractionState> {
        self.fraction(fraction_id).ok_or_else(|| {
            BattleError::InvalidTarget(format!("fraction {fraction_id} is not part of this battle"))
        })
    }

    /// Ship of `fraction_id` that must exist and still be alive.
    pub fn require_live_ship(&self, fraction_id: FractionId, ship_id: ShipId) -> Result<&ShipState> {
        let fraction = self.require_fraction(fraction_id)?;
        let ship = fraction.ship(ship_id).ok_or_else(|| {
            BattleError::InvalidTarget(format!(
                "ship {ship_id} does not belong to fraction {fraction_id}"
            ))
        })?;
        if ship.is_destroyed() {
            return Err(BattleError::InvalidTarget(format!(
                "ship {ship_id} has been destroyed"
            )));
        }
        Ok(ship)
    }

    /// Check that this battle's dimensions are playable.
    pub fn check_dimensions(&self) -> Result<()> {
        check_dimensions(self.width, self.height)
    }

    /// Whether `position` lies inside the playable area.
    #[must_use]
    pub fn contains(&self, position: Vec2Fixed) -> bool {
        position.within_bounds(self.width, self.height)
    }

    /// Fractions that are still in the fight.
    pub fn undefeated_fractions(&self) -> impl Iterator<Item = &FractionState> {
        self.fractions.iter().filter(|fraction| !fraction.is_defeated)
    }

    /// Undefeated fractions that have not finished their turn yet.
    #[must_use]
    pub fn waiting_on(&self) -> Vec<FractionId> {
        self.undefeated_fractions()
            .filter(|fraction| !fraction.turn_finished)
            .map(|fraction| fraction.fraction_id)
            .collect()
    }

    /// True when every undefeated fraction has finished its turn.
    #[must_use]
    pub fn all_fractions_finished(&self) -> bool {
        self.waiting_on().is_empty()
    }

    /// Log entries produced while resolving `turn`.
    pub fn log_for_turn(&self, turn: u32) -> impl Iterator<Item = &TurnLogEntry> {
        self.battle_log.iter().filter(move |entry| entry.turn == turn)
    }

    /// Seed for the combat rolls of the turn currently being resolved.
    ///
    /// Depends only on the battle identity and the turn number, so a replayed
    /// log rolls the same dice.
    #[must_use]
    pub fn turn_seed(&self) -> u64 {
        let id = self.battle_id.as_u128();
        let folded = (id >> 64) as u64 ^ id as u64;
        folded ^ u64::from(self.turn_number).wrapping_mul(0x9E37_79B9_7F4A_7C15)
    }

    /// Deterministic hash of the whole aggregate.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }

    /// Serialize a snapshot.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self)
            .map_err(|e| BattleError::Serialization(format!("Failed to serialize battle: {e}")))
    }

    /// Restore a snapshot.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        bincode::deserialize(data)
            .map_err(|e| BattleError::Serialization(format!("Failed to deserialize battle: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::AuthToken;
    use crate::stats::ShipType;

    fn battle_with_one_ship() -> (BattleState, FractionId, ShipId) {
        let mut battle = BattleState::new("Test", 1000, 800);
        let fraction_id = FractionId::new();
        let ship_id = ShipId::new();
        let mut fraction =
            FractionState::new(fraction_id, "Blue", "bob", "#0000ff", AuthToken::generate());
        fraction.ships.push(ShipState::new(
            ship_id,
            fraction_id,
            "Lance",
            ShipType::Destroyer,
            Vec2Fixed::from_ints(10, 10),
            Vec::new(),
        ));
        battle.fractions.push(fraction);
        (battle, fraction_id, ship_id)
    }

    #[test]
    fn test_new_battle_is_in_preparation() {
        let battle = BattleState::new("Test", 1000, 800);
        assert_eq!(battle.status, BattleStatus::Preparation);
        assert_eq!(battle.turn_number, 0);
        assert!(battle.fractions.is_empty());
    }

    #[test]
    fn test_dimensions_are_capped() {
        assert!(check_dimensions(MAX_BATTLEFIELD_SIZE, MAX_BATTLEFIELD_SIZE).is_ok());
        assert!(matches!(
            check_dimensions(MAX_BATTLEFIELD_SIZE + 1, 10),
            Err(BattleError::InvalidPayload(_))
        ));
        assert!(check_dimensions(40_000, 40_000).is_err());
        assert!(check_dimensions(0, 10).is_err());
    }

    #[test]
    fn test_genesis_keeps_identity_only() {
        let (battle, _, _) = battle_with_one_ship();
        let genesis = battle.genesis();
        assert_eq!(genesis.battle_id, battle.battle_id);
        assert_eq!(genesis.created_at, battle.created_at);
        assert!(genesis.fractions.is_empty());
    }

    #[test]
    fn test_require_live_ship() {
        let (mut battle, fraction_id, ship_id) = battle_with_one_ship();
        assert!(battle.require_live_ship(fraction_id, ship_id).is_ok());
        assert!(matches!(
            battle.require_live_ship(FractionId::new(), ship_id),
            Err(BattleError::InvalidTarget(_))
        ));

        if let Some(ship) = battle.ship_mut(fraction_id, ship_id) {
            ship.apply_damage(10_000);
        }
        assert!(matches!(
            battle.require_live_ship(fraction_id, ship_id),
            Err(BattleError::InvalidTarget(_))
        ));
    }

    #[test]
    fn test_snapshot_roundtrip_preserves_hash() {
        let (battle, _, _) = battle_with_one_ship();
        let bytes = battle.to_bytes().unwrap();
        let restored = BattleState::from_bytes(&bytes).unwrap();
        assert_eq!(restored, battle);
        assert_eq!(restored.state_hash(), battle.state_hash());
    }

    #[test]
    fn test_turn_seed_changes_per_turn() {
        let (mut battle, _, _) = battle_with_one_ship();
        battle.turn_number = 1;
        let first = battle.turn_seed();
        battle.turn_number = 2;
        assert_ne!(first, battle.turn_seed());
    }

    #[test]
    fn test_waiting_on_skips_finished_and_defeated() {
        let (mut battle, fraction_id, _) = battle_with_one_ship();
        assert_eq!(battle.waiting_on(), vec![fraction_id]);

        if let Some(fraction) = battle.fraction_mut(fraction_id) {
            fraction.turn_finished = true;
        }
        assert!(battle.all_fractions_finished());
    }
}
