//! One handler per event type.
//!
//! Handlers run after the dispatcher's phase gate. Each one validates the
//! whole event against the current state first and only then mutates, so a
//! rejected event leaves the battle exactly as it was.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

use crate::battle::{BattleState, BattleStatus, ShipMoveOrder, ShotOrder};
use crate::error::{BattleError, Result};
use crate::events::{Event, EventKind, EventPayload, ShotIntent};
use crate::fraction::FractionState;
use crate::ids::FractionId;
use crate::resolution::resolve_turn;
use crate::ship::{ModuleState, ShipState};
use crate::stats::{ShipType, WeaponType};

/// Borrow the payload of `$variant`, or bail with a routing error.
macro_rules! payload {
    ($event:expr, $variant:ident) => {
        match $event.payload() {
            EventPayload::$variant(inner) => inner,
            _ => {
                return Err(BattleError::HandlerMismatch {
                    expected: EventKind::$variant,
                    actual: $event.kind(),
                })
            }
        }
    };
}

fn expect_kind(event: &Event, expected: EventKind) -> Result<()> {
    if event.kind() == expected {
        Ok(())
    } else {
        Err(BattleError::HandlerMismatch {
            expected,
            actual: event.kind(),
        })
    }
}

fn issuing_fraction(event: &Event) -> Result<FractionId> {
    event.fraction_id().ok_or_else(|| {
        BattleError::InvalidTarget(format!("{:?} must be issued by a fraction", event.kind()))
    })
}

fn require_name(label: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(BattleError::InvalidPayload(format!("{label} must not be empty")));
    }
    Ok(())
}

fn require_in_bounds(state: &BattleState, position: crate::math::Vec2Fixed) -> Result<()> {
    state.check_dimensions()?;
    if !state.contains(position) {
        let (x, y) = position.to_f64_pair();
        return Err(BattleError::InvalidPayload(format!(
            "position ({x:.2}, {y:.2}) lies outside the {}x{} battlefield",
            state.width, state.height
        )));
    }
    Ok(())
}

fn validate_modules(ship_type: ShipType, modules: &[ModuleState]) -> Result<()> {
    if modules.is_empty() {
        return Ok(());
    }
    let expected = ship_type.stats().modules;
    if modules.len() != expected {
        return Err(BattleError::InvalidPayload(format!(
            "{} carries {expected} modules, got {}",
            ship_type.display_name(),
            modules.len()
        )));
    }
    if modules.iter().any(|module| module.slots.is_empty()) {
        return Err(BattleError::InvalidPayload(
            "every module needs at least one system slot".to_string(),
        ));
    }
    Ok(())
}

/// Create a fraction.
pub fn add_fraction(event: &Event, state: &mut BattleState) -> Result<()> {
    let payload = payload!(event, AddFraction);

    require_name("fraction name", &payload.fraction_name)?;
    require_name("player name", &payload.player_name)?;
    if event.fraction_id() != Some(payload.fraction_id) {
        return Err(BattleError::InvalidPayload(
            "envelope fraction does not match the new fraction".to_string(),
        ));
    }
    if state.fraction(payload.fraction_id).is_some() {
        return Err(BattleError::InvalidPayload(format!(
            "fraction {} already exists",
            payload.fraction_id
        )));
    }

    state.fractions.push(FractionState::new(
        payload.fraction_id,
        payload.fraction_name.clone(),
        payload.player_name.clone(),
        payload.fraction_color.clone(),
        payload.auth_token.clone(),
    ));
    debug!(fraction = %payload.fraction_id, name = %payload.fraction_name, "fraction added");
    Ok(())
}

/// Edit a fraction's presentation details.
pub fn update_fraction(event: &Event, state: &mut BattleState) -> Result<()> {
    let payload = payload!(event, UpdateFraction);
    let fraction_id = issuing_fraction(event)?;

    state.require_fraction(fraction_id)?;
    if let Some(name) = &payload.fraction_name {
        require_name("fraction name", name)?;
    }
    if let Some(name) = &payload.player_name {
        require_name("player name", name)?;
    }

    if let Some(fraction) = state.fraction_mut(fraction_id) {
        if let Some(name) = &payload.fraction_name {
            fraction.fraction_name = name.clone();
        }
        if let Some(name) = &payload.player_name {
            fraction.player_name = name.clone();
        }
        if let Some(color) = &payload.fraction_color {
            fraction.fraction_color = color.clone();
        }
    }
    Ok(())
}

/// Add a ship to the issuing fraction.
pub fn add_fraction_ship(event: &Event, state: &mut BattleState) -> Result<()> {
    let payload = payload!(event, AddFractionShip);
    let fraction_id = issuing_fraction(event)?;

    state.require_fraction(fraction_id)?;
    require_name("ship name", &payload.name)?;
    require_in_bounds(state, payload.position)?;
    validate_modules(payload.ship_type, &payload.modules)?;
    if state.find_ship(payload.ship_id).is_some() {
        return Err(BattleError::InvalidPayload(format!(
            "ship {} already exists",
            payload.ship_id
        )));
    }

    let ship = ShipState::new(
        payload.ship_id,
        fraction_id,
        payload.name.clone(),
        payload.ship_type,
        payload.position,
        payload.modules.clone(),
    );
    if let Some(fraction) = state.fraction_mut(fraction_id) {
        fraction.ships.push(ship);
    }
    debug!(fraction = %fraction_id, ship = %payload.ship_id, ship_type = ?payload.ship_type, "ship added");
    Ok(())
}

/// Administrative rename or reposition of a ship, in any phase.
pub fn update_fraction_ship(event: &Event, state: &mut BattleState) -> Result<()> {
    let payload = payload!(event, UpdateFractionShip);
    let fraction_id = issuing_fraction(event)?;

    if state.ship(fraction_id, payload.ship_id).is_none() {
        return Err(BattleError::InvalidTarget(format!(
            "ship {} does not belong to fraction {fraction_id}",
            payload.ship_id
        )));
    }
    if let Some(name) = &payload.name {
        require_name("ship name", name)?;
    }
    if let Some(position) = payload.position {
        require_in_bounds(state, position)?;
    }

    if let Some(ship) = state.ship_mut(fraction_id, payload.ship_id) {
        if let Some(name) = &payload.name {
            ship.name = name.clone();
        }
        if let Some(position) = payload.position {
            ship.position = position;
        }
    }
    Ok(())
}

/// Place a ship during preparation.
pub fn set_ship_position(event: &Event, state: &mut BattleState) -> Result<()> {
    let payload = payload!(event, SetShipPosition);
    let fraction_id = issuing_fraction(event)?;

    if state.ship(fraction_id, payload.ship_id).is_none() {
        return Err(BattleError::InvalidTarget(format!(
            "ship {} does not belong to fraction {fraction_id}",
            payload.ship_id
        )));
    }
    require_in_bounds(state, payload.position)?;

    if let Some(ship) = state.ship_mut(fraction_id, payload.ship_id) {
        ship.position = payload.position;
    }
    Ok(())
}

/// Leave preparation: status becomes in-progress and turn 1 begins.
pub fn start_battle(event: &Event, state: &mut BattleState) -> Result<()> {
    expect_kind(event, EventKind::StartBattle)?;
    state.check_dimensions()?;

    if state.fractions.is_empty() {
        return Err(BattleError::InvalidPayload(
            "a battle needs at least one fraction".to_string(),
        ));
    }
    if let Some(empty) = state.fractions.iter().find(|f| f.ships.is_empty()) {
        return Err(BattleError::InvalidPayload(format!(
            "fraction {} has no ships",
            empty.fraction_name
        )));
    }

    state.status = BattleStatus::InProgress;
    state.turn_number = 1;
    info!(battle = %state.battle_id, fractions = state.fractions.len(), "battle started");
    Ok(())
}

/// Queue a move, replacing any earlier move of the same ship this turn.
pub fn add_ship_move(event: &Event, state: &mut BattleState) -> Result<()> {
    let payload = payload!(event, AddShipMove);
    let fraction_id = issuing_fraction(event)?;

    let ship = state.require_live_ship(fraction_id, payload.ship_id)?;
    if ship.speed <= crate::math::Fixed::ZERO {
        return Err(BattleError::InvalidPayload(format!(
            "{} cannot move",
            ship.ship_type.display_name()
        )));
    }
    require_in_bounds(state, payload.target)?;

    let order = ShipMoveOrder {
        fraction_id,
        ship_id: payload.ship_id,
        target: payload.target,
    };
    match state
        .pending_moves
        .iter_mut()
        .find(|queued| queued.ship_id == payload.ship_id)
    {
        Some(queued) => *queued = order,
        None => state.pending_moves.push(order),
    }
    Ok(())
}

fn queue_shot(
    event: &Event,
    state: &mut BattleState,
    intent: &ShotIntent,
    weapon: WeaponType,
) -> Result<()> {
    let fraction_id = issuing_fraction(event)?;

    let shooter = state.require_live_ship(fraction_id, intent.shooter_ship_id)?;
    let carried = match weapon {
        WeaponType::Laser => shooter.number_of_lasers(),
        WeaponType::Missile => shooter.number_of_missiles(),
        WeaponType::PointDefense => shooter.number_of_points_defense(),
    };
    if carried == 0 {
        return Err(BattleError::InvalidPayload(format!(
            "ship {} carries no {}",
            shooter.name,
            weapon.label()
        )));
    }
    if intent.target_fraction_id == fraction_id {
        return Err(BattleError::InvalidTarget(
            "cannot fire on your own fraction".to_string(),
        ));
    }
    state.require_live_ship(intent.target_fraction_id, intent.target_ship_id)?;

    let order = ShotOrder {
        fraction_id,
        shooter_ship_id: intent.shooter_ship_id,
        target_fraction_id: intent.target_fraction_id,
        target_ship_id: intent.target_ship_id,
    };
    match weapon {
        WeaponType::Missile => state.pending_missile_shots.push(order),
        _ => state.pending_laser_shots.push(order),
    }
    Ok(())
}

/// Queue a laser shot.
pub fn add_laser_shot(event: &Event, state: &mut BattleState) -> Result<()> {
    let intent = *payload!(event, AddLaserShot);
    queue_shot(event, state, &intent, WeaponType::Laser)
}

/// Queue a missile shot.
pub fn add_missile_shot(event: &Event, state: &mut BattleState) -> Result<()> {
    let intent = *payload!(event, AddMissileShot);
    queue_shot(event, state, &intent, WeaponType::Missile)
}

/// Mark the issuing fraction as done with this turn's orders.
pub fn finish_turn(event: &Event, state: &mut BattleState) -> Result<()> {
    expect_kind(event, EventKind::FinishTurn)?;
    let fraction_id = issuing_fraction(event)?;

    let fraction = state.require_fraction(fraction_id)?;
    if fraction.is_defeated {
        return Err(BattleError::InvalidTarget(format!(
            "fraction {} has been defeated",
            fraction.fraction_name
        )));
    }

    if let Some(fraction) = state.fraction_mut(fraction_id) {
        fraction.turn_finished = true;
    }
    Ok(())
}

/// Resolve the current turn with dice seeded from the battle and turn.
pub fn end_of_turn(event: &Event, state: &mut BattleState) -> Result<()> {
    expect_kind(event, EventKind::EndOfTurn)?;

    let mut rng = ChaCha8Rng::seed_from_u64(state.turn_seed());
    let summary = resolve_turn(state, &mut rng);
    info!(
        battle = %state.battle_id,
        turn = summary.turn,
        entries = summary.entries,
        destroyed = summary.destroyed.len(),
        finished = summary.finished,
        "turn resolved"
    );
    Ok(())
}

/// Soft-delete the battle.
pub fn delete_battle(event: &Event, state: &mut BattleState) -> Result<()> {
    expect_kind(event, EventKind::DeleteBattle)?;
    state.is_deleted = true;
    info!(battle = %state.battle_id, "battle deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{AddFraction, AddFractionShip, AddShipMove, UpdateFractionShip};
    use crate::math::Vec2Fixed;

    struct Setup {
        state: BattleState,
        red: FractionId,
        blue: FractionId,
        red_ship: crate::ids::ShipId,
        blue_ship: crate::ids::ShipId,
    }

    fn setup() -> Setup {
        let mut state = BattleState::new("Handlers", 1000, 800);
        let battle_id = state.battle_id;

        let red = AddFraction::new("Red", "alice", "#ff0000");
        let blue = AddFraction::new("Blue", "bob", "#0000ff");
        let (red_id, blue_id) = (red.fraction_id, blue.fraction_id);
        add_fraction(&Event::add_fraction(battle_id, red), &mut state).unwrap();
        add_fraction(&Event::add_fraction(battle_id, blue), &mut state).unwrap();

        let red_ship = AddFractionShip::new("Needle", ShipType::Corvette, Vec2Fixed::from_ints(100, 100));
        let blue_ship = AddFractionShip::new("Lance", ShipType::Corvette, Vec2Fixed::from_ints(120, 120));
        let (red_ship_id, blue_ship_id) = (red_ship.ship_id, blue_ship.ship_id);
        add_fraction_ship(
            &Event::fraction(battle_id, red_id, EventPayload::AddFractionShip(red_ship)),
            &mut state,
        )
        .unwrap();
        add_fraction_ship(
            &Event::fraction(battle_id, blue_id, EventPayload::AddFractionShip(blue_ship)),
            &mut state,
        )
        .unwrap();

        Setup {
            state,
            red: red_id,
            blue: blue_id,
            red_ship: red_ship_id,
            blue_ship: blue_ship_id,
        }
    }

    #[test]
    fn test_add_ship_outside_bounds_is_rejected() {
        let mut s = setup();
        let before = s.state.clone();
        let ship = AddFractionShip::new("Stray", ShipType::Cruiser, Vec2Fixed::from_ints(1001, 5));
        let event = Event::fraction(s.state.battle_id, s.red, EventPayload::AddFractionShip(ship));

        let err = add_fraction_ship(&event, &mut s.state).unwrap_err();
        assert!(matches!(err, BattleError::InvalidPayload(_)));
        assert_eq!(s.state, before);
    }

    #[test]
    fn test_wrong_module_count_is_rejected() {
        let mut s = setup();
        let ship = AddFractionShip::new("Odd", ShipType::Destroyer, Vec2Fixed::from_ints(5, 5))
            .with_modules(vec![ModuleState::standard()]);
        let event = Event::fraction(s.state.battle_id, s.red, EventPayload::AddFractionShip(ship));

        assert!(matches!(
            add_fraction_ship(&event, &mut s.state),
            Err(BattleError::InvalidPayload(_))
        ));
    }

    #[test]
    fn test_oversized_battlefield_cannot_start_or_field_ships() {
        let mut s = setup();
        s.state.width = 40_000;
        s.state.height = 40_000;
        let before = s.state.clone();

        let ship = AddFractionShip::new("Far", ShipType::Corvette, Vec2Fixed::from_ints(39_000, 39_000));
        let event = Event::fraction(s.state.battle_id, s.red, EventPayload::AddFractionShip(ship));
        assert!(matches!(
            add_fraction_ship(&event, &mut s.state),
            Err(BattleError::InvalidPayload(_))
        ));

        let start = Event::battle(s.state.battle_id, EventPayload::StartBattle);
        assert!(matches!(
            start_battle(&start, &mut s.state),
            Err(BattleError::InvalidPayload(_))
        ));
        assert_eq!(s.state, before);
    }

    #[test]
    fn test_start_requires_ships_everywhere() {
        let mut s = setup();
        let extra = AddFraction::new("Green", "carol", "#00ff00");
        add_fraction(&Event::add_fraction(s.state.battle_id, extra), &mut s.state).unwrap();

        let start = Event::battle(s.state.battle_id, EventPayload::StartBattle);
        assert!(matches!(
            start_battle(&start, &mut s.state),
            Err(BattleError::InvalidPayload(_))
        ));
        assert_eq!(s.state.status, BattleStatus::Preparation);
    }

    #[test]
    fn test_move_replaces_previous_order() {
        let mut s = setup();
        start_battle(&Event::battle(s.state.battle_id, EventPayload::StartBattle), &mut s.state).unwrap();

        for target in [(300, 300), (500, 500)] {
            let payload = AddShipMove {
                ship_id: s.red_ship,
                target: Vec2Fixed::from_ints(target.0, target.1),
            };
            let event = Event::fraction(s.state.battle_id, s.red, EventPayload::AddShipMove(payload));
            add_ship_move(&event, &mut s.state).unwrap();
        }

        assert_eq!(s.state.pending_moves.len(), 1);
        assert_eq!(s.state.pending_moves[0].target, Vec2Fixed::from_ints(500, 500));
    }

    #[test]
    fn test_shots_accumulate() {
        let mut s = setup();
        start_battle(&Event::battle(s.state.battle_id, EventPayload::StartBattle), &mut s.state).unwrap();

        let intent = ShotIntent {
            shooter_ship_id: s.red_ship,
            target_fraction_id: s.blue,
            target_ship_id: s.blue_ship,
        };
        for _ in 0..2 {
            let event = Event::fraction(s.state.battle_id, s.red, EventPayload::AddLaserShot(intent));
            add_laser_shot(&event, &mut s.state).unwrap();
        }
        assert_eq!(s.state.pending_laser_shots.len(), 2);
    }

    #[test]
    fn test_shot_from_foreign_ship_is_rejected() {
        let mut s = setup();
        let intent = ShotIntent {
            shooter_ship_id: s.blue_ship,
            target_fraction_id: s.blue,
            target_ship_id: s.blue_ship,
        };
        let event = Event::fraction(s.state.battle_id, s.red, EventPayload::AddMissileShot(intent));
        assert!(matches!(
            add_missile_shot(&event, &mut s.state),
            Err(BattleError::InvalidTarget(_))
        ));
        assert!(s.state.pending_missile_shots.is_empty());
    }

    #[test]
    fn test_friendly_fire_is_rejected() {
        let mut s = setup();
        let intent = ShotIntent {
            shooter_ship_id: s.red_ship,
            target_fraction_id: s.red,
            target_ship_id: s.red_ship,
        };
        let event = Event::fraction(s.state.battle_id, s.red, EventPayload::AddLaserShot(intent));
        assert!(matches!(
            add_laser_shot(&event, &mut s.state),
            Err(BattleError::InvalidTarget(_))
        ));
    }

    #[test]
    fn test_missing_weapon_is_rejected() {
        let mut s = setup();
        if let Some(ship) = s.state.ship_mut(s.red, s.red_ship) {
            ship.modules = vec![ModuleState::with_weapons(&[WeaponType::Laser])];
        }
        let intent = ShotIntent {
            shooter_ship_id: s.red_ship,
            target_fraction_id: s.blue,
            target_ship_id: s.blue_ship,
        };
        let event = Event::fraction(s.state.battle_id, s.red, EventPayload::AddMissileShot(intent));
        assert!(matches!(
            add_missile_shot(&event, &mut s.state),
            Err(BattleError::InvalidPayload(_))
        ));
    }

    #[test]
    fn test_mismatched_routing_is_reported() {
        let mut s = setup();
        let event = Event::battle(s.state.battle_id, EventPayload::EndOfTurn);
        let err = add_fraction(&event, &mut s.state).unwrap_err();
        assert!(matches!(
            err,
            BattleError::HandlerMismatch {
                expected: EventKind::AddFraction,
                actual: EventKind::EndOfTurn
            }
        ));
    }

    #[test]
    fn test_update_ship_renames() {
        let mut s = setup();
        let payload = UpdateFractionShip {
            ship_id: s.blue_ship,
            name: Some("Renamed".to_string()),
            position: None,
        };
        let event = Event::fraction(s.state.battle_id, s.blue, EventPayload::UpdateFractionShip(payload));
        update_fraction_ship(&event, &mut s.state).unwrap();
        assert_eq!(
            s.state.ship(s.blue, s.blue_ship).map(|ship| ship.name.as_str()),
            Some("Renamed")
        );
    }
}
