//! Scenario loading and headless simulation.
//!
//! Scenarios describe a battlefield and the fleets placed on it. They are
//! stored as RON files; [`simulate`] plays one through a [`BattleService`]
//! with every fraction following the nearest-enemy strategy.

use std::path::Path;

use battle_core::battle::{check_dimensions, BattleState, BattleStatus};
use battle_core::events::{unix_millis, AddFractionShip, EventPayload};
use battle_core::ids::{BattleId, FractionId};
use battle_core::math::Vec2Fixed;
use battle_core::stats::ShipType;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::Result;
use crate::projection::AdminBattleView;
use crate::service::{BattleService, FractionCredentials};
use crate::strategy::nearest_enemy_orders;

/// Error type for scenario operations.
#[derive(Error, Debug)]
pub enum ScenarioError {
    /// File not found.
    #[error("Scenario file not found: {0}")]
    FileNotFound(String),
    /// Failed to read file.
    #[error("Failed to read scenario file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse scenario: {0}")]
    ParseError(#[from] ron::error::SpannedError),
    /// Parsed, but cannot be played.
    #[error("Invalid scenario: {0}")]
    Invalid(String),
}

/// A ship to place at battle setup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipPlacement {
    /// Display name; generated from the hull class when absent.
    #[serde(default)]
    pub name: Option<String>,
    /// Hull class.
    pub ship_type: ShipType,
    /// Horizontal position.
    pub x: i32,
    /// Vertical position.
    pub y: i32,
}

/// One fleet in a scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FleetSetup {
    /// Fraction name.
    pub name: String,
    /// Player controlling the fraction.
    pub player: String,
    /// Presentation color.
    pub color: String,
    /// Ships to field.
    pub ships: Vec<ShipPlacement>,
}

fn default_turns() -> u32 {
    50
}

/// A complete battle setup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name, also used as the battle name.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Battlefield width.
    pub width: u32,
    /// Battlefield height.
    pub height: u32,
    /// Seed for the battle identity, which in turn seeds every combat roll.
    pub seed: u64,
    /// Turn limit when none is given on the command line.
    #[serde(default = "default_turns")]
    pub turns: u32,
    /// Participating fleets.
    pub fleets: Vec<FleetSetup>,
}

impl Scenario {
    /// Load a scenario from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> std::result::Result<Self, ScenarioError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_ron_str(&contents)
    }

    /// Parse a scenario from a RON string.
    pub fn from_ron_str(ron: &str) -> std::result::Result<Self, ScenarioError> {
        let scenario: Self = ron::from_str(ron)?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Two small fleets facing each other, used when no file is given.
    pub fn skirmish() -> Self {
        let fleet = |name: &str, player: &str, color: &str, x: i32| FleetSetup {
            name: name.to_string(),
            player: player.to_string(),
            color: color.to_string(),
            ships: vec![
                ShipPlacement {
                    name: None,
                    ship_type: ShipType::Destroyer,
                    x,
                    y: 80,
                },
                ShipPlacement {
                    name: None,
                    ship_type: ShipType::Corvette,
                    x,
                    y: 120,
                },
            ],
        };
        Self {
            name: "Skirmish".to_string(),
            description: "Two light squadrons closing from opposite flanks".to_string(),
            width: 300,
            height: 200,
            seed: 7,
            turns: default_turns(),
            fleets: vec![
                fleet("Crimson Fleet", "red", "#d03030", 60),
                fleet("Azure Fleet", "blue", "#3060d0", 240),
            ],
        }
    }

    /// Check that the scenario describes a battle that can start.
    pub fn validate(&self) -> std::result::Result<(), ScenarioError> {
        check_dimensions(self.width, self.height)
            .map_err(|err| ScenarioError::Invalid(err.to_string()))?;
        if self.fleets.is_empty() {
            return Err(ScenarioError::Invalid("no fleets".to_string()));
        }
        for fleet in &self.fleets {
            if fleet.ships.is_empty() {
                return Err(ScenarioError::Invalid(format!(
                    "fleet '{}' has no ships",
                    fleet.name
                )));
            }
            let outside = fleet.ships.iter().find(|ship| {
                !Vec2Fixed::from_ints(ship.x, ship.y).within_bounds(self.width, self.height)
            });
            if let Some(ship) = outside {
                return Err(ScenarioError::Invalid(format!(
                    "fleet '{}' places a ship at ({}, {}) outside the battlefield",
                    fleet.name, ship.x, ship.y
                )));
            }
        }
        Ok(())
    }

    fn battle_id(&self) -> BattleId {
        BattleId::from_uuid(Uuid::from_u128(u128::from(self.seed)))
    }
}

/// How a simulated battle ended.
#[derive(Debug, Clone)]
pub struct SimulationReport {
    /// The simulated battle.
    pub battle_id: BattleId,
    /// Turns actually resolved.
    pub turns_played: u32,
    /// Final status.
    pub status: BattleStatus,
    /// Winner, if the battle finished with one.
    pub winner: Option<FractionId>,
    /// Final state for operators.
    pub view: AdminBattleView,
}

/// Play `scenario` for at most `turns` turns, or until a winner emerges.
///
/// Orders the strategy produces that the engine rejects are skipped.
pub async fn simulate(
    service: &BattleService,
    scenario: &Scenario,
    turns: u32,
) -> Result<SimulationReport> {
    scenario.validate()?;
    let state = BattleState::with_id(
        scenario.battle_id(),
        scenario.name.clone(),
        scenario.width,
        scenario.height,
        unix_millis(),
    );
    let battle_id = service.create_battle_from(state).await?;

    let mut fleets: Vec<FractionCredentials> = Vec::with_capacity(scenario.fleets.len());
    for fleet in &scenario.fleets {
        let credentials = service
            .add_fraction(battle_id, &fleet.name, &fleet.player, &fleet.color)
            .await?;
        for (index, placement) in fleet.ships.iter().enumerate() {
            let name = placement.name.clone().unwrap_or_else(|| {
                format!("{} {}", placement.ship_type.display_name(), index + 1)
            });
            let ship = AddFractionShip::new(
                name,
                placement.ship_type,
                Vec2Fixed::from_ints(placement.x, placement.y),
            );
            service
                .add_ship(
                    battle_id,
                    credentials.fraction_id,
                    credentials.auth_token.expose(),
                    ship,
                )
                .await?;
        }
        fleets.push(credentials);
    }

    service.start_battle(battle_id).await?;
    info!(%battle_id, scenario = %scenario.name, fleets = fleets.len(), "Simulation started");

    let mut turns_played = 0;
    while turns_played < turns {
        let state = service.registry().state(battle_id).await?;
        if state.status != BattleStatus::InProgress {
            break;
        }

        for credentials in &fleets {
            let defeated = state
                .fraction(credentials.fraction_id)
                .map_or(true, |fraction| fraction.is_defeated);
            if defeated {
                continue;
            }
            let token = credentials.auth_token.expose();
            for order in nearest_enemy_orders(&state, credentials.fraction_id) {
                if let Err(err) = service
                    .submit(battle_id, credentials.fraction_id, token, order)
                    .await
                {
                    debug!(%battle_id, reason = err.reason_code(), "Strategy order skipped");
                }
            }
            service
                .submit(battle_id, credentials.fraction_id, token, EventPayload::FinishTurn)
                .await?;
        }

        let report = service.end_turn(battle_id).await?;
        turns_played += 1;
        debug!(
            turn = report.turn,
            entries = report.entries,
            destroyed = report.destroyed,
            "Turn simulated"
        );
    }

    let view = service.admin_view(battle_id).await?;
    info!(
        %battle_id,
        turns = turns_played,
        status = ?view.battle.status,
        "Simulation complete"
    );
    Ok(SimulationReport {
        battle_id,
        turns_played,
        status: view.battle.status,
        winner: view.battle.winner,
        view,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;

    #[test]
    fn test_builtin_skirmish_is_valid() {
        assert!(Scenario::skirmish().validate().is_ok());
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            Scenario::load("/nonexistent/scenario.ron"),
            Err(ScenarioError::FileNotFound(_))
        ));
    }

    #[test]
    fn test_parse_minimal_scenario() {
        let ron = r##"(
            name: "Pocket",
            width: 100,
            height: 100,
            seed: 3,
            fleets: [
                (name: "Red", player: "ann", color: "#f00", ships: [(ship_type: Corvette, x: 10, y: 10)]),
                (name: "Blue", player: "bob", color: "#00f", ships: [(ship_type: OrbitalFort, x: 90, y: 90)]),
            ],
        )"##;
        let scenario = Scenario::from_ron_str(ron).unwrap();
        assert_eq!(scenario.turns, 50);
        assert_eq!(scenario.fleets[1].ships[0].ship_type, ShipType::OrbitalFort);
        assert_eq!(scenario.fleets[0].ships[0].name, None);
    }

    #[test]
    fn test_ship_outside_battlefield_is_invalid() {
        let mut scenario = Scenario::skirmish();
        scenario.fleets[0].ships[0].x = 1000;
        assert!(matches!(scenario.validate(), Err(ScenarioError::Invalid(_))));
    }

    #[test]
    fn test_oversized_battlefield_is_invalid() {
        let mut scenario = Scenario::skirmish();
        scenario.width = 40_000;
        scenario.height = 40_000;
        assert!(matches!(scenario.validate(), Err(ScenarioError::Invalid(_))));
    }

    #[test]
    fn test_empty_fleet_is_invalid() {
        let mut scenario = Scenario::skirmish();
        scenario.fleets[1].ships.clear();
        assert!(matches!(scenario.validate(), Err(ScenarioError::Invalid(_))));
    }

    #[tokio::test]
    async fn test_simulation_respects_turn_limit() {
        let service = BattleService::in_memory(ServerConfig::default());
        let report = simulate(&service, &Scenario::skirmish(), 3).await.unwrap();

        assert!(report.turns_played <= 3);
        assert!(report.view.battle.turn_number >= 1);
        assert_eq!(report.battle_id, Scenario::skirmish().battle_id());
    }
}
