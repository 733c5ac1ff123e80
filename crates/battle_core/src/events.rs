//! Immutable intent records that drive every battle mutation.
//!
//! An [`Event`] is an envelope (identity, battle, issuing fraction, timestamp)
//! around an [`EventPayload`] carrying the minimal intent. Anything a handler
//! would otherwise have to invent (new fraction/ship ids, auth tokens) is
//! minted here, at construction, so that replaying the log is deterministic.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::ids::{AuthToken, BattleId, EventId, FractionId, ShipId};
use crate::math::Vec2Fixed;
use crate::ship::ModuleState;
use crate::stats::ShipType;

/// Current wall-clock time in unix milliseconds.
///
/// Only read when constructing events or battles, never during resolution.
#[must_use]
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_millis() as u64)
}

/// Stable discriminator of an event's type, used for dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventKind {
    /// See [`AddFraction`].
    AddFraction,
    /// See [`UpdateFraction`].
    UpdateFraction,
    /// See [`AddFractionShip`].
    AddFractionShip,
    /// See [`UpdateFractionShip`].
    UpdateFractionShip,
    /// See [`SetShipPosition`].
    SetShipPosition,
    /// Move the battle from preparation to play.
    StartBattle,
    /// See [`AddShipMove`].
    AddShipMove,
    /// Queue a laser shot, see [`ShotIntent`].
    AddLaserShot,
    /// Queue a missile shot, see [`ShotIntent`].
    AddMissileShot,
    /// The issuing fraction is done with its orders for this turn.
    FinishTurn,
    /// Resolve the current turn.
    EndOfTurn,
    /// Soft-delete the battle.
    DeleteBattle,
}

impl EventKind {
    /// Every event type.
    pub const ALL: [EventKind; 12] = [
        EventKind::AddFraction,
        EventKind::UpdateFraction,
        EventKind::AddFractionShip,
        EventKind::UpdateFractionShip,
        EventKind::SetShipPosition,
        EventKind::StartBattle,
        EventKind::AddShipMove,
        EventKind::AddLaserShot,
        EventKind::AddMissileShot,
        EventKind::FinishTurn,
        EventKind::EndOfTurn,
        EventKind::DeleteBattle,
    ];
}

/// Create a fraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddFraction {
    /// Identity of the new fraction.
    pub fraction_id: FractionId,
    /// Fraction display name.
    pub fraction_name: String,
    /// Controlling player's name.
    pub player_name: String,
    /// Presentation color.
    pub fraction_color: String,
    /// Credential handed to the player once.
    pub auth_token: AuthToken,
}

impl AddFraction {
    /// Mint the identity and credential for a new fraction.
    #[must_use]
    pub fn new(
        fraction_name: impl Into<String>,
        player_name: impl Into<String>,
        fraction_color: impl Into<String>,
    ) -> Self {
        Self {
            fraction_id: FractionId::new(),
            fraction_name: fraction_name.into(),
            player_name: player_name.into(),
            fraction_color: fraction_color.into(),
            auth_token: AuthToken::generate(),
        }
    }
}

/// Change a fraction's presentation details. `None` keeps the current value.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UpdateFraction {
    /// New display name.
    pub fraction_name: Option<String>,
    /// New player name.
    pub player_name: Option<String>,
    /// New color.
    pub fraction_color: Option<String>,
}

/// Add a ship to the issuing fraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddFractionShip {
    /// Identity of the new ship.
    pub ship_id: ShipId,
    /// Display name.
    pub name: String,
    /// Hull class.
    pub ship_type: ShipType,
    /// Starting position.
    pub position: Vec2Fixed,
    /// Explicit loadout; empty means the standard loadout.
    pub modules: Vec<ModuleState>,
}

impl AddFractionShip {
    /// A ship with the standard loadout and a freshly minted id.
    #[must_use]
    pub fn new(name: impl Into<String>, ship_type: ShipType, position: Vec2Fixed) -> Self {
        Self {
            ship_id: ShipId::new(),
            name: name.into(),
            ship_type,
            position,
            modules: Vec::new(),
        }
    }

    /// Replace the standard loadout.
    #[must_use]
    pub fn with_modules(mut self, modules: Vec<ModuleState>) -> Self {
        self.modules = modules;
        self
    }
}

/// Administrative correction of a ship. `None` keeps the current value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateFractionShip {
    /// Ship to correct.
    pub ship_id: ShipId,
    /// New display name.
    pub name: Option<String>,
    /// New position.
    pub position: Option<Vec2Fixed>,
}

/// Re-place a ship during preparation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetShipPosition {
    /// Ship to place.
    pub ship_id: ShipId,
    /// New position.
    pub position: Vec2Fixed,
}

/// Queue a move order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddShipMove {
    /// Ship to move.
    pub ship_id: ShipId,
    /// Requested destination.
    pub target: Vec2Fixed,
}

/// Queue a shot from one of the issuing fraction's ships.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShotIntent {
    /// Firing ship.
    pub shooter_ship_id: ShipId,
    /// Fraction owning the target.
    pub target_fraction_id: FractionId,
    /// Target ship.
    pub target_ship_id: ShipId,
}

/// Intent payload of an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventPayload {
    /// Create a fraction.
    AddFraction(AddFraction),
    /// Edit a fraction.
    UpdateFraction(UpdateFraction),
    /// Add a ship.
    AddFractionShip(AddFractionShip),
    /// Correct a ship.
    UpdateFractionShip(UpdateFractionShip),
    /// Place a ship.
    SetShipPosition(SetShipPosition),
    /// Begin turn 1.
    StartBattle,
    /// Queue a move.
    AddShipMove(AddShipMove),
    /// Queue a laser shot.
    AddLaserShot(ShotIntent),
    /// Queue a missile shot.
    AddMissileShot(ShotIntent),
    /// Mark the issuing fraction's turn as finished.
    FinishTurn,
    /// Resolve the turn.
    EndOfTurn,
    /// Soft-delete the battle.
    DeleteBattle,
}

impl EventPayload {
    /// Discriminator used for dispatch.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::AddFraction(_) => EventKind::AddFraction,
            Self::UpdateFraction(_) => EventKind::UpdateFraction,
            Self::AddFractionShip(_) => EventKind::AddFractionShip,
            Self::UpdateFractionShip(_) => EventKind::UpdateFractionShip,
            Self::SetShipPosition(_) => EventKind::SetShipPosition,
            Self::StartBattle => EventKind::StartBattle,
            Self::AddShipMove(_) => EventKind::AddShipMove,
            Self::AddLaserShot(_) => EventKind::AddLaserShot,
            Self::AddMissileShot(_) => EventKind::AddMissileShot,
            Self::FinishTurn => EventKind::FinishTurn,
            Self::EndOfTurn => EventKind::EndOfTurn,
            Self::DeleteBattle => EventKind::DeleteBattle,
        }
    }
}

/// An immutable command addressed to one battle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    event_id: EventId,
    battle_id: BattleId,
    fraction_id: Option<FractionId>,
    timestamp: u64,
    payload: EventPayload,
}

impl Event {
    /// A battle-scoped event (no issuing fraction).
    #[must_use]
    pub fn battle(battle_id: BattleId, payload: EventPayload) -> Self {
        Self {
            event_id: EventId::new(),
            battle_id,
            fraction_id: None,
            timestamp: unix_millis(),
            payload,
        }
    }

    /// An event issued on behalf of a fraction.
    #[must_use]
    pub fn fraction(battle_id: BattleId, fraction_id: FractionId, payload: EventPayload) -> Self {
        Self {
            fraction_id: Some(fraction_id),
            ..Self::battle(battle_id, payload)
        }
    }

    /// Fraction creation; the envelope carries the new fraction's id.
    #[must_use]
    pub fn add_fraction(battle_id: BattleId, payload: AddFraction) -> Self {
        Self::fraction(battle_id, payload.fraction_id, EventPayload::AddFraction(payload))
    }

    /// Override the construction timestamp.
    #[must_use]
    pub fn at(mut self, timestamp: u64) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Event identity.
    #[must_use]
    pub const fn event_id(&self) -> EventId {
        self.event_id
    }

    /// Target battle.
    #[must_use]
    pub const fn battle_id(&self) -> BattleId {
        self.battle_id
    }

    /// Issuing fraction, absent for battle-scoped events.
    #[must_use]
    pub const fn fraction_id(&self) -> Option<FractionId> {
        self.fraction_id
    }

    /// Construction time, unix milliseconds.
    #[must_use]
    pub const fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// Intent payload.
    #[must_use]
    pub const fn payload(&self) -> &EventPayload {
        &self.payload
    }

    /// Discriminator used for dispatch.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        self.payload.kind()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_fraction_envelope_carries_new_id() {
        let payload = AddFraction::new("Red", "alice", "#ff0000");
        let fraction_id = payload.fraction_id;
        let event = Event::add_fraction(BattleId::new(), payload);

        assert_eq!(event.fraction_id(), Some(fraction_id));
        assert_eq!(event.kind(), EventKind::AddFraction);
    }

    #[test]
    fn test_battle_scoped_event_has_no_fraction() {
        let event = Event::battle(BattleId::new(), EventPayload::StartBattle);
        assert_eq!(event.fraction_id(), None);
        assert!(event.timestamp() > 0);
    }

    #[test]
    fn test_event_ids_are_unique() {
        let battle_id = BattleId::new();
        let a = Event::battle(battle_id, EventPayload::EndOfTurn);
        let b = Event::battle(battle_id, EventPayload::EndOfTurn);
        assert_ne!(a.event_id(), b.event_id());
    }

    #[test]
    fn test_kind_covers_all_payloads() {
        let intent = ShotIntent {
            shooter_ship_id: ShipId::new(),
            target_fraction_id: FractionId::new(),
            target_ship_id: ShipId::new(),
        };
        assert_eq!(
            EventPayload::AddMissileShot(intent).kind(),
            EventKind::AddMissileShot
        );
        assert_eq!(EventPayload::AddLaserShot(intent).kind(), EventKind::AddLaserShot);
        assert_eq!(EventKind::ALL.len(), 12);
    }
}
