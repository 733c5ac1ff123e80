//! Turn log entries: the audit trail of turn resolution.
//!
//! Every entry carries a player-facing `message` and an `admin_log` with
//! diagnostic detail (rolls, raw damage). Projections must drop `admin_log`
//! for non-admin consumers.

use serde::{Deserialize, Serialize};

use crate::fraction::FractionState;
use crate::ids::{FractionId, ShipId};
use crate::ship::ShipState;

/// What a log entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TurnLogEntryType {
    /// A ship moved along its path.
    ShipMove,
    /// A laser shot hit.
    LaserHit,
    /// A laser shot missed (including out-of-range shots).
    LaserMiss,
    /// A missile left its launcher.
    MissileFired,
    /// A missile hit.
    MissileHit,
    /// A missile missed.
    MissileMiss,
    /// Point defense stopped a missile.
    MissileIntercepted,
    /// A missile order could not be fired: target beyond maximum range.
    MissileOutOfRange,
    /// A ship's hit points reached zero.
    ShipDestroyed,
    /// Damage inflicted, from the attacker's point of view.
    DamageDealt,
    /// Damage taken, from the target's point of view.
    DamageReceived,
    /// Every ship of a fraction has been destroyed.
    FractionDefeated,
}

/// A fraction/ship pair named in a log entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct LogParty {
    /// Fraction identity.
    pub fraction_id: Option<FractionId>,
    /// Fraction display name.
    pub fraction_name: String,
    /// Ship identity, if a ship is involved.
    pub ship_id: Option<ShipId>,
    /// Ship display name.
    pub ship_name: String,
}

impl LogParty {
    /// A ship together with its fraction.
    #[must_use]
    pub fn ship(fraction: &FractionState, ship: &ShipState) -> Self {
        Self {
            fraction_id: Some(fraction.fraction_id),
            fraction_name: fraction.fraction_name.clone(),
            ship_id: Some(ship.ship_id),
            ship_name: ship.name.clone(),
        }
    }

    /// A fraction as a whole.
    #[must_use]
    pub fn fraction(fraction: &FractionState) -> Self {
        Self {
            fraction_id: Some(fraction.fraction_id),
            fraction_name: fraction.fraction_name.clone(),
            ship_id: None,
            ship_name: String::new(),
        }
    }
}

/// One thing that happened during a turn.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TurnLogEntry {
    /// Turn in which the entry was produced.
    pub turn: u32,
    /// Entry classification.
    pub entry_type: TurnLogEntryType,
    /// Acting party.
    pub actor: LogParty,
    /// Affected party, if any.
    pub target: Option<LogParty>,
    /// Player-facing description.
    pub message: String,
    /// Admin-only diagnostic detail.
    pub admin_log: String,
}

impl TurnLogEntry {
    /// Start an entry for `turn`.
    #[must_use]
    pub fn new(turn: u32, entry_type: TurnLogEntryType, actor: LogParty) -> Self {
        Self {
            turn,
            entry_type,
            actor,
            target: None,
            message: String::new(),
            admin_log: String::new(),
        }
    }

    /// Set the affected party.
    #[must_use]
    pub fn with_target(mut self, target: LogParty) -> Self {
        self.target = Some(target);
        self
    }

    /// Set the player-facing message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Set the admin-only detail.
    #[must_use]
    pub fn with_admin_log(mut self, admin_log: impl Into<String>) -> Self {
        self.admin_log = admin_log.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let entry = TurnLogEntry::new(3, TurnLogEntryType::LaserMiss, LogParty::default())
            .with_target(LogParty::default())
            .with_message("missed")
            .with_admin_log("roll=0.99");
        assert_eq!(entry.turn, 3);
        assert!(entry.target.is_some());
        assert_eq!(entry.message, "missed");
        assert_eq!(entry.admin_log, "roll=0.99");
    }
}
