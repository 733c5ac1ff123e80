//! # Battle Core
//!
//! Event-sourced state machine for turn-based multi-fraction space battles.
//!
//! This crate contains **only** deterministic logic:
//! - No rendering
//! - No network
//! - No wall-clock reads during resolution
//! - No floating-point math in the simulation (uses fixed-point)
//!
//! Every mutation of a [`battle::BattleState`] goes through a typed
//! [`events::Event`] applied by a [`manager::BattleManager`]. Combat rolls
//! are seeded from the battle identity and turn number, so replaying the
//! event log over the genesis state reproduces the battle bit for bit.
//!
//! ## Crate Structure
//!
//! - [`battle`] - Aggregate root and queued orders
//! - [`fraction`], [`ship`] - Fleets, modules and damage layers
//! - [`events`] - Intent records
//! - [`dispatcher`], [`handlers`] - Phase-gated routing and validation
//! - [`resolution`], [`combat`] - Turn resolution
//! - [`manager`] - Append-only event log
//! - [`replay`] - Replay files and playback
//! - [`math`] - Fixed-point math utilities

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod battle;
pub mod combat;
pub mod dispatcher;
pub mod error;
pub mod events;
pub mod fraction;
pub mod handlers;
pub mod ids;
pub mod manager;
pub mod math;
pub mod replay;
pub mod resolution;
pub mod ship;
pub mod stats;
pub mod turn_log;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::battle::{
        BattleState, BattleStatus, MissileMovementPath, ShipMoveOrder, ShipMovementPath,
        ShotOrder, MAX_BATTLEFIELD_SIZE,
    };
    pub use crate::dispatcher::{EventDispatcher, PhaseRequirement};
    pub use crate::error::{BattleError, Result};
    pub use crate::events::{
        AddFraction, AddFractionShip, AddShipMove, Event, EventKind, EventPayload,
        SetShipPosition, ShotIntent, UpdateFraction, UpdateFractionShip,
    };
    pub use crate::fraction::FractionState;
    pub use crate::ids::{AuthToken, BattleId, EventId, FractionId, ShipId};
    pub use crate::manager::BattleManager;
    pub use crate::math::{Fixed, Vec2Fixed};
    pub use crate::replay::{BattleReplay, ReplayPlayer};
    pub use crate::resolution::{resolve_turn, TurnSummary};
    pub use crate::ship::{ModuleState, ShipState, SystemSlot};
    pub use crate::stats::{ShipType, WeaponType};
    pub use crate::turn_log::{LogParty, TurnLogEntry, TurnLogEntryType};
}
