//! Command entry point of the battle host.
//!
//! [`BattleService`] wraps the registry with authorization, capacity limits,
//! persistence and notifications. Every accepted event is appended to the
//! store and followed by a fresh snapshot before the call returns.

use std::sync::Arc;
use std::time::Duration;

use battle_core::battle::{BattleState, BattleStatus};
use battle_core::error::BattleError;
use battle_core::events::{AddFraction, AddFractionShip, Event, EventKind, EventPayload};
use battle_core::ids::{AuthToken, BattleId, FractionId, ShipId};
use battle_core::turn_log::TurnLogEntryType;
use tracing::{error, info, warn};

use crate::auth::authorize;
use crate::config::ServerConfig;
use crate::error::{Result, ServerError};
use crate::notify::{BattleNotification, Notifier};
use crate::projection::{AdminBattleView, PlayerBattleView};
use crate::registry::BattleRegistry;
use crate::store::{BattleStore, FileStore, MemoryStore};

/// Credential handed to a player exactly once, when their fraction joins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FractionCredentials {
    /// The new fraction.
    pub fraction_id: FractionId,
    /// Token the player must present with every command.
    pub auth_token: AuthToken,
}

/// Outcome of one turn resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnReport {
    /// The turn that was resolved.
    pub turn: u32,
    /// Log entries written for it.
    pub entries: usize,
    /// Ships destroyed in it.
    pub destroyed: usize,
    /// Battle status afterwards.
    pub status: BattleStatus,
    /// Winner, once finished.
    pub winner: Option<FractionId>,
}

impl TurnReport {
    fn from_state(state: &BattleState) -> Self {
        let turn = state.turn_number.saturating_sub(1);
        let mut entries = 0;
        let mut destroyed = 0;
        for entry in state.log_for_turn(turn) {
            entries += 1;
            if entry.entry_type == TurnLogEntryType::ShipDestroyed {
                destroyed += 1;
            }
        }
        Self {
            turn,
            entries,
            destroyed,
            status: state.status,
            winner: state.winner,
        }
    }
}

const fn is_fraction_command(kind: EventKind) -> bool {
    matches!(
        kind,
        EventKind::UpdateFraction
            | EventKind::AddFractionShip
            | EventKind::SetShipPosition
            | EventKind::AddShipMove
            | EventKind::AddLaserShot
            | EventKind::AddMissileShot
            | EventKind::FinishTurn
    )
}

/// Battle host facade.
#[derive(Debug)]
pub struct BattleService {
    config: ServerConfig,
    registry: BattleRegistry,
    notifier: Notifier,
}

impl BattleService {
    /// A service persisting to `store`.
    pub fn new(config: ServerConfig, store: Arc<dyn BattleStore>) -> Self {
        let registry = BattleRegistry::new(store, config.verify_replay_on_load);
        let notifier = Notifier::new(config.notification_capacity);
        Self {
            config,
            registry,
            notifier,
        }
    }

    /// A service that keeps everything in memory.
    pub fn in_memory(config: ServerConfig) -> Self {
        Self::new(config, Arc::new(MemoryStore::new()))
    }

    /// A service persisting to `config.snapshot_dir`, or in memory without one.
    pub fn from_config(config: ServerConfig) -> Result<Self> {
        config.validate()?;
        match config.snapshot_dir.clone() {
            Some(dir) => {
                let store = FileStore::open(&dir)?;
                info!(dir = %dir.display(), "Persisting battles to disk");
                Ok(Self::new(config, Arc::new(store)))
            }
            None => Ok(Self::in_memory(config)),
        }
    }

    /// Active configuration.
    pub const fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Underlying registry.
    pub const fn registry(&self) -> &BattleRegistry {
        &self.registry
    }

    /// Receive notifications for every battle on this host.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<BattleNotification> {
        self.notifier.subscribe()
    }

    /// Create a battle in preparation. Bounds default to the configured size.
    pub async fn create_battle(&self, name: &str, bounds: Option<(u32, u32)>) -> Result<BattleId> {
        let (width, height) =
            bounds.unwrap_or((self.config.default_width, self.config.default_height));
        self.create_battle_from(BattleState::new(name, width, height))
            .await
    }

    /// Register an explicitly constructed battle.
    pub async fn create_battle_from(&self, state: BattleState) -> Result<BattleId> {
        state.check_dimensions()?;
        if !state.fractions.is_empty() || state.status != BattleStatus::Preparation {
            return Err(BattleError::InvalidPayload(
                "battles must be created empty and in preparation".to_string(),
            )
            .into());
        }
        self.registry.create(state).await
    }

    /// Add a fraction and mint its credential.
    ///
    /// The returned token is the only copy the player will get.
    pub async fn add_fraction(
        &self,
        battle_id: BattleId,
        fraction_name: &str,
        player_name: &str,
        fraction_color: &str,
    ) -> Result<FractionCredentials> {
        let payload = AddFraction::new(fraction_name, player_name, fraction_color);
        let credentials = FractionCredentials {
            fraction_id: payload.fraction_id,
            auth_token: payload.auth_token.clone(),
        };
        self.apply(battle_id, Event::add_fraction(battle_id, payload), None)
            .await?;
        Ok(credentials)
    }

    /// Field a ship for an authorized fraction.
    pub async fn add_ship(
        &self,
        battle_id: BattleId,
        fraction_id: FractionId,
        token: &str,
        ship: AddFractionShip,
    ) -> Result<ShipId> {
        let ship_id = ship.ship_id;
        self.submit(
            battle_id,
            fraction_id,
            token,
            EventPayload::AddFractionShip(ship),
        )
        .await?;
        Ok(ship_id)
    }

    /// Submit a command on behalf of a fraction.
    ///
    /// Only fraction commands are accepted here; lifecycle events go through
    /// the operator methods.
    pub async fn submit(
        &self,
        battle_id: BattleId,
        fraction_id: FractionId,
        token: &str,
        payload: EventPayload,
    ) -> Result<()> {
        let kind = payload.kind();
        if !is_fraction_command(kind) {
            warn!(%battle_id, %fraction_id, ?kind, "Fraction attempted operator command");
            return Err(ServerError::Forbidden(kind));
        }
        let event = Event::fraction(battle_id, fraction_id, payload);
        let state = self.apply(battle_id, event, Some(token)).await?;

        if kind == EventKind::FinishTurn {
            self.notifier.publish(BattleNotification::WaitingOn {
                battle_id,
                turn: state.turn_number,
                fractions: state.waiting_on(),
            });
        }
        Ok(())
    }

    /// Apply an operator event without credential checks.
    pub async fn submit_admin(
        &self,
        battle_id: BattleId,
        fraction_id: Option<FractionId>,
        payload: EventPayload,
    ) -> Result<BattleState> {
        let event = match fraction_id {
            Some(fraction_id) => Event::fraction(battle_id, fraction_id, payload),
            None => Event::battle(battle_id, payload),
        };
        self.apply(battle_id, event, None).await
    }

    /// Move the battle from preparation to its first turn.
    pub async fn start_battle(&self, battle_id: BattleId) -> Result<()> {
        self.submit_admin(battle_id, None, EventPayload::StartBattle)
            .await?;
        Ok(())
    }

    /// Resolve the current turn and announce the outcome.
    pub async fn end_turn(&self, battle_id: BattleId) -> Result<TurnReport> {
        let state = self
            .submit_admin(battle_id, None, EventPayload::EndOfTurn)
            .await?;
        let report = TurnReport::from_state(&state);

        self.notifier.publish(BattleNotification::TurnResolved {
            battle_id,
            turn: report.turn,
            entries: report.entries,
            destroyed: report.destroyed,
        });
        if report.status == BattleStatus::Finished {
            self.notifier.publish(BattleNotification::BattleFinished {
                battle_id,
                winner: report.winner,
            });
        }
        Ok(report)
    }

    /// Delete a battle. It stays stored but rejects every further event.
    pub async fn delete_battle(&self, battle_id: BattleId) -> Result<()> {
        self.submit_admin(battle_id, None, EventPayload::DeleteBattle)
            .await?;
        Ok(())
    }

    /// The battle as any participant may see it.
    pub async fn player_view(&self, battle_id: BattleId) -> Result<PlayerBattleView> {
        let state = self.registry.state(battle_id).await?;
        Ok(PlayerBattleView::from_state(&state))
    }

    /// The battle including credentials and diagnostics.
    pub async fn admin_view(&self, battle_id: BattleId) -> Result<AdminBattleView> {
        let state = self.registry.state(battle_id).await?;
        Ok(AdminBattleView::from_state(&state))
    }

    /// Drop battles idle longer than the configured timeout from memory.
    pub async fn evict_idle(&self) -> Vec<BattleId> {
        self.registry
            .evict_idle(Duration::from_secs(self.config.idle_eviction_secs))
            .await
    }

    async fn apply(
        &self,
        battle_id: BattleId,
        event: Event,
        token: Option<&str>,
    ) -> Result<BattleState> {
        let kind = event.kind();
        let store = Arc::clone(self.registry.store());
        let config = &self.config;

        let result = self
            .registry
            .with_battle(battle_id, |manager| {
                if let (Some(token), Some(fraction_id)) = (token, event.fraction_id()) {
                    authorize(manager.state(), fraction_id, token)?;
                }
                check_limits(config, manager.state(), &event)?;
                manager.apply_event(event.clone())?;

                // Log first: a snapshot left behind is rolled forward on load.
                store
                    .append_event(battle_id, &event)
                    .and_then(|()| store.save_snapshot(manager.state()))
                    .map_err(ServerError::persistence)?;
                Ok(manager.state().clone())
            })
            .await;

        match &result {
            Err(err) if err.is_persistence_failure() => {
                error!(%battle_id, ?kind, error = %err, "Failed to persist battle");
            }
            Err(err) => warn!(
                %battle_id,
                ?kind,
                reason = err.reason_code(),
                error = %err,
                "Command rejected"
            ),
            Ok(_) => {}
        }
        result
    }
}

fn check_limits(config: &ServerConfig, state: &BattleState, event: &Event) -> Result<()> {
    match event.payload() {
        EventPayload::AddFraction(_) if state.fractions.len() >= config.max_fractions => {
            Err(ServerError::LimitExceeded(format!(
                "battle already has {} fractions",
                config.max_fractions
            )))
        }
        EventPayload::AddFractionShip(_) => {
            let fleet = event
                .fraction_id()
                .and_then(|fraction_id| state.fraction(fraction_id))
                .map_or(0, |fraction| fraction.ships.len());
            if fleet >= config.max_ships_per_fraction {
                Err(ServerError::LimitExceeded(format!(
                    "fraction already has {} ships",
                    config.max_ships_per_fraction
                )))
            } else {
                Ok(())
            }
        }
        _ => Ok(()),
    }
}
