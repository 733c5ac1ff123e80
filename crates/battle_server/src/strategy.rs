//! Scripted fleet behaviour for headless battles.

use battle_core::battle::BattleState;
use battle_core::events::{AddShipMove, EventPayload, ShotIntent};
use battle_core::ids::FractionId;
use battle_core::math::{Fixed, Vec2Fixed};
use battle_core::ship::ShipState;
use battle_core::stats::{LASER_MAX_RANGE, MISSILE_MAX_RANGE};

/// Closest living enemy ship to `position`, first found on ties.
pub fn nearest_enemy(
    state: &BattleState,
    fraction_id: FractionId,
    position: Vec2Fixed,
) -> Option<&ShipState> {
    state
        .fractions
        .iter()
        .filter(|fraction| fraction.fraction_id != fraction_id)
        .flat_map(|fraction| fraction.alive_ships())
        .min_by_key(|ship| ship.position.distance_squared(position))
}

/// Orders for every living ship of `fraction_id`: close in on the nearest
/// enemy and fire every weapon that could reach it this turn.
///
/// Ships stop at half laser range rather than ramming. Range is estimated
/// after this ship's own move; the target may still drift out of reach.
pub fn nearest_enemy_orders(state: &BattleState, fraction_id: FractionId) -> Vec<EventPayload> {
    let Some(fraction) = state.fraction(fraction_id) else {
        return Vec::new();
    };
    let laser_range = Fixed::from_num(LASER_MAX_RANGE);
    let missile_range = Fixed::from_num(MISSILE_MAX_RANGE);
    let standoff = laser_range / 2;

    let mut orders = Vec::new();
    for ship in fraction.alive_ships() {
        let Some(enemy) = nearest_enemy(state, fraction_id, ship.position) else {
            continue;
        };
        let distance = ship.position.distance(enemy.position);

        let mut expected = distance;
        if ship.speed > Fixed::ZERO && distance > standoff {
            let step = ship.speed.min(distance - standoff);
            orders.push(EventPayload::AddShipMove(AddShipMove {
                ship_id: ship.ship_id,
                target: ship.position.move_towards(enemy.position, step),
            }));
            expected = distance - step;
        }

        let intent = ShotIntent {
            shooter_ship_id: ship.ship_id,
            target_fraction_id: enemy.fraction_id,
            target_ship_id: enemy.ship_id,
        };
        if expected <= missile_range {
            for _ in 0..ship.number_of_missiles() {
                orders.push(EventPayload::AddMissileShot(intent));
            }
        }
        if expected <= laser_range {
            for _ in 0..ship.number_of_lasers() {
                orders.push(EventPayload::AddLaserShot(intent));
            }
        }
    }
    orders
}

#[cfg(test)]
mod tests {
    use super::*;
    use battle_core::events::{AddFraction, AddFractionShip, Event};
    use battle_core::ids::ShipId;
    use battle_core::manager::BattleManager;
    use battle_core::stats::ShipType;

    fn battle(blue_ships: &[(ShipType, i32, i32)]) -> (BattleState, FractionId, Vec<ShipId>) {
        let mut manager = BattleManager::new(BattleState::new("Orders", 500, 500));
        let battle_id = manager.battle_id();
        let red = AddFraction::new("Red", "ann", "#f00");
        let blue = AddFraction::new("Blue", "bob", "#00f");
        manager
            .apply_event(Event::add_fraction(battle_id, red.clone()))
            .unwrap();
        manager
            .apply_event(Event::add_fraction(battle_id, blue.clone()))
            .unwrap();

        let scout = AddFractionShip::new("Scout", ShipType::Corvette, Vec2Fixed::from_ints(100, 100));
        manager
            .apply_event(Event::fraction(
                battle_id,
                red.fraction_id,
                EventPayload::AddFractionShip(scout),
            ))
            .unwrap();

        let mut blue_ids = Vec::new();
        for (i, (ship_type, x, y)) in blue_ships.iter().enumerate() {
            let ship = AddFractionShip::new(format!("Blue {i}"), *ship_type, Vec2Fixed::from_ints(*x, *y));
            blue_ids.push(ship.ship_id);
            manager
                .apply_event(Event::fraction(
                    battle_id,
                    blue.fraction_id,
                    EventPayload::AddFractionShip(ship),
                ))
                .unwrap();
        }
        (manager.state().clone(), red.fraction_id, blue_ids)
    }

    #[test]
    fn test_nearest_enemy_picks_closest() {
        let (state, red, blue) = battle(&[
            (ShipType::Corvette, 400, 400),
            (ShipType::Corvette, 120, 100),
        ]);
        let enemy = nearest_enemy(&state, red, Vec2Fixed::from_ints(100, 100)).unwrap();
        assert_eq!(enemy.ship_id, blue[1]);
    }

    #[test]
    fn test_distant_enemy_only_draws_a_move() {
        let (state, red, _) = battle(&[(ShipType::Corvette, 400, 400)]);
        let orders = nearest_enemy_orders(&state, red);
        assert_eq!(orders.len(), 1);
        assert!(matches!(orders[0], EventPayload::AddShipMove(_)));
    }

    #[test]
    fn test_close_enemy_draws_full_salvo() {
        let (state, red, blue) = battle(&[(ShipType::Corvette, 110, 100)]);
        let orders = nearest_enemy_orders(&state, red);

        // Already inside the standoff distance, so no move.
        let shots: Vec<_> = orders
            .iter()
            .filter_map(|order| match order {
                EventPayload::AddLaserShot(intent) | EventPayload::AddMissileShot(intent) => {
                    Some(intent.target_ship_id)
                }
                _ => None,
            })
            .collect();
        let modules = ShipType::Corvette.stats().modules;
        assert_eq!(orders.len(), 2 * modules);
        assert!(shots.iter().all(|target| *target == blue[0]));
    }

    #[test]
    fn test_no_enemies_no_orders() {
        let (state, red, _) = battle(&[]);
        assert!(nearest_enemy_orders(&state, red).is_empty());
    }
}
