//! Read models handed to clients.
//!
//! [`PlayerBattleView`] is safe to show any participant: it never carries a
//! fraction credential nor the diagnostic `admin_log` of log entries.
//! [`AdminBattleView`] adds both, plus the pending order queues.

use battle_core::battle::{BattleState, BattleStatus};
use battle_core::fraction::FractionState;
use battle_core::ids::{BattleId, FractionId, ShipId};
use battle_core::math::Vec2Fixed;
use battle_core::ship::{Meter, ShipState};
use battle_core::stats::ShipType;
use battle_core::turn_log::{LogParty, TurnLogEntry, TurnLogEntryType};
use serde::Serialize;

use crate::error::Result;

/// A position in battle units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PointView {
    /// Horizontal coordinate.
    pub x: f64,
    /// Vertical coordinate.
    pub y: f64,
}

impl From<Vec2Fixed> for PointView {
    fn from(value: Vec2Fixed) -> Self {
        let (x, y) = value.to_f64_pair();
        Self { x, y }
    }
}

/// One ship as seen by players.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShipView {
    /// Ship identity.
    pub ship_id: ShipId,
    /// Display name.
    pub name: String,
    /// Hull class.
    pub ship_type: ShipType,
    /// Current position.
    pub position: PointView,
    /// Maximum move distance per turn.
    pub speed: f64,
    /// Hull integrity.
    pub hit_points: Meter,
    /// Shield layer.
    pub shields: Meter,
    /// Armor layer.
    pub armor: Meter,
    /// Laser slots.
    pub lasers: u32,
    /// Missile launchers.
    pub missiles: u32,
    /// Point-defense slots.
    pub point_defense: u32,
    /// Whether the hull is gone.
    pub destroyed: bool,
}

impl From<&ShipState> for ShipView {
    fn from(ship: &ShipState) -> Self {
        Self {
            ship_id: ship.ship_id,
            name: ship.name.clone(),
            ship_type: ship.ship_type,
            position: ship.position.into(),
            speed: ship.speed.to_num(),
            hit_points: ship.hit_points,
            shields: ship.shields,
            armor: ship.armor,
            lasers: ship.number_of_lasers(),
            missiles: ship.number_of_missiles(),
            point_defense: ship.number_of_points_defense(),
            destroyed: ship.is_destroyed(),
        }
    }
}

/// One fraction as seen by players.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FractionView {
    /// Fraction identity.
    pub fraction_id: FractionId,
    /// Fraction display name.
    pub fraction_name: String,
    /// Controlling player.
    pub player_name: String,
    /// Presentation color.
    pub fraction_color: String,
    /// Whether every ship is destroyed.
    pub is_defeated: bool,
    /// Whether the fraction finished this turn.
    pub turn_finished: bool,
    /// Ships in creation order.
    pub ships: Vec<ShipView>,
}

impl From<&FractionState> for FractionView {
    fn from(fraction: &FractionState) -> Self {
        Self {
            fraction_id: fraction.fraction_id,
            fraction_name: fraction.fraction_name.clone(),
            player_name: fraction.player_name.clone(),
            fraction_color: fraction.fraction_color.clone(),
            is_defeated: fraction.is_defeated,
            turn_finished: fraction.turn_finished,
            ships: fraction.ships.iter().map(ShipView::from).collect(),
        }
    }
}

/// Flight path of a ship during the last resolved turn.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShipPathView {
    /// Ship identity.
    pub ship_id: ShipId,
    /// Where the path begins.
    pub start: PointView,
    /// Where the ship stopped.
    pub end: PointView,
    /// Ordered destination.
    pub target: PointView,
    /// Evenly spaced points along the path.
    pub waypoints: Vec<PointView>,
}

/// Flight path of a missile during the last resolved turn.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MissilePathView {
    /// Launching ship.
    pub shooter_ship_id: ShipId,
    /// Targeted ship.
    pub target_ship_id: ShipId,
    /// Where the path begins.
    pub start: PointView,
    /// Target position at launch.
    pub target: PointView,
    /// Evenly spaced points along the path.
    pub waypoints: Vec<PointView>,
}

/// A turn log entry without diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEntryView {
    /// Turn the entry belongs to.
    pub turn: u32,
    /// What happened.
    pub entry_type: TurnLogEntryType,
    /// Who acted.
    pub actor: LogParty,
    /// Who was affected, if anyone.
    pub target: Option<LogParty>,
    /// Player-facing description.
    pub message: String,
}

impl From<&TurnLogEntry> for LogEntryView {
    fn from(entry: &TurnLogEntry) -> Self {
        Self {
            turn: entry.turn,
            entry_type: entry.entry_type,
            actor: entry.actor.clone(),
            target: entry.target.clone(),
            message: entry.message.clone(),
        }
    }
}

/// Battle as presented to any participant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerBattleView {
    /// Battle identity.
    pub battle_id: BattleId,
    /// Display name.
    pub name: String,
    /// Lifecycle phase.
    pub status: BattleStatus,
    /// Current turn, 0 before start.
    pub turn_number: u32,
    /// Battlefield width.
    pub width: u32,
    /// Battlefield height.
    pub height: u32,
    /// Surviving fraction once finished.
    pub winner: Option<FractionId>,
    /// Fractions yet to finish the turn.
    pub waiting_on: Vec<FractionId>,
    /// Timestamp of the last applied event.
    pub last_updated: u64,
    /// Participating fractions.
    pub fractions: Vec<FractionView>,
    /// Ship paths of the last resolution.
    pub ship_movement_paths: Vec<ShipPathView>,
    /// Missile paths of the last resolution.
    pub missile_movement_paths: Vec<MissilePathView>,
    /// Turn log.
    pub battle_log: Vec<LogEntryView>,
}

fn points(waypoints: &[Vec2Fixed]) -> Vec<PointView> {
    waypoints.iter().copied().map(PointView::from).collect()
}

impl PlayerBattleView {
    /// Project the battle for players.
    pub fn from_state(state: &BattleState) -> Self {
        Self {
            battle_id: state.battle_id,
            name: state.name.clone(),
            status: state.status,
            turn_number: state.turn_number,
            width: state.width,
            height: state.height,
            winner: state.winner,
            waiting_on: state.waiting_on(),
            last_updated: state.last_updated,
            fractions: state.fractions.iter().map(FractionView::from).collect(),
            ship_movement_paths: state
                .ship_movement_paths
                .iter()
                .map(|path| ShipPathView {
                    ship_id: path.ship_id,
                    start: path.start.into(),
                    end: path.end.into(),
                    target: path.target.into(),
                    waypoints: points(&path.waypoints),
                })
                .collect(),
            missile_movement_paths: state
                .missile_movement_paths
                .iter()
                .map(|path| MissilePathView {
                    shooter_ship_id: path.shooter_ship_id,
                    target_ship_id: path.target_ship_id,
                    start: path.start.into(),
                    target: path.target.into(),
                    waypoints: points(&path.waypoints),
                })
                .collect(),
            battle_log: state.battle_log.iter().map(LogEntryView::from).collect(),
        }
    }

    /// Pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Credential of one fraction, for operators only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CredentialView {
    /// Fraction identity.
    pub fraction_id: FractionId,
    /// Raw credential.
    pub auth_token: String,
}

/// Diagnostic text of one log entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdminLogView {
    /// Turn the entry belongs to.
    pub turn: u32,
    /// What happened.
    pub entry_type: TurnLogEntryType,
    /// Diagnostic detail.
    pub admin_log: String,
}

/// Battle as presented to operators.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdminBattleView {
    /// Everything players see.
    #[serde(flatten)]
    pub battle: PlayerBattleView,
    /// Whether the battle was deleted.
    pub is_deleted: bool,
    /// Creation timestamp.
    pub created_at: u64,
    /// Deterministic state hash.
    pub state_hash: u64,
    /// Fraction credentials.
    pub credentials: Vec<CredentialView>,
    /// Queued move orders.
    pub pending_moves: usize,
    /// Queued laser shots.
    pub pending_laser_shots: usize,
    /// Queued missile shots.
    pub pending_missile_shots: usize,
    /// Diagnostic text of every log entry.
    pub admin_log: Vec<AdminLogView>,
}

impl AdminBattleView {
    /// Project the battle for operators.
    pub fn from_state(state: &BattleState) -> Self {
        Self {
            battle: PlayerBattleView::from_state(state),
            is_deleted: state.is_deleted,
            created_at: state.created_at,
            state_hash: state.state_hash(),
            credentials: state
                .fractions
                .iter()
                .map(|fraction| CredentialView {
                    fraction_id: fraction.fraction_id,
                    auth_token: fraction.auth_token.expose().to_string(),
                })
                .collect(),
            pending_moves: state.pending_moves.len(),
            pending_laser_shots: state.pending_laser_shots.len(),
            pending_missile_shots: state.pending_missile_shots.len(),
            admin_log: state
                .battle_log
                .iter()
                .map(|entry| AdminLogView {
                    turn: entry.turn,
                    entry_type: entry.entry_type,
                    admin_log: entry.admin_log.clone(),
                })
                .collect(),
        }
    }

    /// Pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
