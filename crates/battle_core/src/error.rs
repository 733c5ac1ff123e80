//! Error types for the battle engine.

use thiserror::Error;

use crate::battle::BattleStatus;
use crate::dispatcher::PhaseRequirement;
use crate::events::EventKind;
use crate::ids::BattleId;
use crate::stats::WeaponType;

/// Result type alias using [`BattleError`].
pub type Result<T> = std::result::Result<T, BattleError>;

/// Top-level error type for event application and battle persistence.
///
/// Every variant except the wiring defects (see [`BattleError::is_fatal`]) is
/// a rejected command: the battle is left untouched and the event is not
/// logged.
#[derive(Debug, Error)]
pub enum BattleError {
    /// Event submitted in a battle phase that does not accept it.
    #[error("{event:?} requires a battle in {required:?}, but the battle is {actual:?}")]
    InvalidPhase {
        /// Rejected event.
        event: EventKind,
        /// Phase the handler requires.
        required: PhaseRequirement,
        /// Phase the battle is in.
        actual: BattleStatus,
    },

    /// Unknown, foreign or destroyed ship or fraction reference.
    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    /// Malformed intent payload.
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// Weapon fired beyond its maximum range.
    #[error("{} target at distance {distance} is beyond maximum range {max_range}", weapon.label())]
    OutOfRange {
        /// Weapon that was fired.
        weapon: WeaponType,
        /// Distance to the target.
        distance: f64,
        /// Weapon's maximum range.
        max_range: u32,
    },

    /// No handler is registered for this event type.
    #[error("No handler registered for event type {0:?}")]
    UnregisteredEventType(EventKind),

    /// A handler was routed an event of a different type.
    #[error("Handler for {expected:?} received a {actual:?} event")]
    HandlerMismatch {
        /// Type the handler was registered for.
        expected: EventKind,
        /// Type it received.
        actual: EventKind,
    },

    /// The battle has been soft-deleted.
    #[error("Battle {0} has been deleted")]
    BattleDeleted(BattleId),

    /// The event is addressed to another battle.
    #[error("Event for battle {actual} applied to battle {expected}")]
    WrongBattle {
        /// Battle the manager owns.
        expected: BattleId,
        /// Battle named by the event.
        actual: BattleId,
    },

    /// Snapshot or replay (de)serialization failure.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Replaying the event log did not reproduce the live state.
    #[error("Replay diverged: expected state hash {expected_hash}, got {actual_hash}")]
    ReplayDivergence {
        /// Hash of the live state.
        expected_hash: u64,
        /// Hash of the replayed state.
        actual_hash: u64,
    },
}

impl BattleError {
    /// Whether this error signals a wiring defect rather than a bad command.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::UnregisteredEventType(_) | Self::HandlerMismatch { .. }
        )
    }

    /// Stable reason code for rejected commands.
    #[must_use]
    pub const fn reason_code(&self) -> &'static str {
        match self {
            Self::InvalidPhase { .. } => "invalid_phase",
            Self::InvalidTarget(_) => "invalid_target",
            Self::InvalidPayload(_) => "invalid_payload",
            Self::OutOfRange { .. } => "out_of_range",
            Self::UnregisteredEventType(_) => "unregistered_event_type",
            Self::HandlerMismatch { .. } => "handler_mismatch",
            Self::BattleDeleted(_) => "battle_deleted",
            Self::WrongBattle { .. } => "wrong_battle",
            Self::Serialization(_) => "serialization",
            Self::ReplayDivergence { .. } => "replay_divergence",
        }
    }
}
