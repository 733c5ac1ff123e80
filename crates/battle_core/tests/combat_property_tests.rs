//! Property tests for damage, defeat and turn progression.

use battle_core::prelude::*;
use battle_core::stats::{laser_hit_chance, missile_hit_chance, MISSILE_MAX_RANGE};
use battle_test_utils::fixtures::skirmish;
use battle_test_utils::strategies::{arb_damage, arb_distance, arb_script, arb_ship_type};
use proptest::prelude::*;

fn fresh_ship(ship_type: ShipType) -> ShipState {
    ShipState::new(
        ShipId::new(),
        FractionId::new(),
        "Sentinel",
        ship_type,
        Vec2Fixed::ZERO,
        Vec::new(),
    )
}

proptest! {
    #[test]
    fn hit_points_never_underflow(ship_type in arb_ship_type(), hits in prop::collection::vec(arb_damage(), 1..40)) {
        let mut ship = fresh_ship(ship_type);
        let mut destroyed_reports = 0;
        for amount in hits {
            let report = ship.apply_damage(amount);
            if report.destroyed {
                destroyed_reports += 1;
            }
            prop_assert!(ship.hit_points.current <= ship.hit_points.max);
        }
        prop_assert!(destroyed_reports <= 1);
        prop_assert_eq!(destroyed_reports == 1, ship.is_destroyed());
    }

    #[test]
    fn damage_layers_drain_in_order(ship_type in arb_ship_type(), amount in arb_damage()) {
        let mut ship = fresh_ship(ship_type);
        let shields_before = ship.shields.current;
        let report = ship.apply_damage(amount);

        if report.armor > 0 {
            prop_assert_eq!(report.shields, shields_before);
            prop_assert_eq!(ship.shields.current, 0);
        }
        if report.hull > 0 {
            prop_assert_eq!(ship.armor.current, 0);
        }
        if amount < shields_before {
            prop_assert_eq!(ship.armor.current, ship.armor.max);
            prop_assert_eq!(ship.hit_points.current, ship.hit_points.max);
        }
    }

    #[test]
    fn accuracy_falls_with_distance(a in arb_distance(), b in arb_distance()) {
        let (near, far) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(laser_hit_chance(near) >= laser_hit_chance(far));
        let missile = |d| missile_hit_chance(d).unwrap_or(Fixed::ZERO);
        prop_assert!(missile(near) >= missile(far));
        prop_assert_eq!(
            missile_hit_chance(far).is_none(),
            far > Fixed::from_num(MISSILE_MAX_RANGE)
        );
    }

    #[test]
    fn scripted_battles_keep_their_invariants(script in arb_script(300, 60)) {
        let mut battle = skirmish(21);
        let mut last_turn = battle.state().turn_number;

        for step in &script {
            let log_before = battle.state().battle_log.len();
            battle.apply_step(step);
            let state = battle.state();

            prop_assert!(state.turn_number >= last_turn);
            prop_assert!(state.battle_log.len() >= log_before);
            last_turn = state.turn_number;

            for fraction in &state.fractions {
                let wiped_out = fraction.ships.iter().all(ShipState::is_destroyed);
                prop_assert_eq!(fraction.is_defeated, wiped_out);
            }
            if state.status == BattleStatus::Finished {
                prop_assert!(state.undefeated_fractions().count() <= 1);
                prop_assert_eq!(state.winner, state.undefeated_fractions().next().map(|f| f.fraction_id));
            }
        }
    }
}

#[test]
fn preparation_always_means_turn_zero() {
    let battle = BattleState::new("Fresh", 10, 10);
    assert_eq!(battle.status, BattleStatus::Preparation);
    assert_eq!(battle.turn_number, 0);
}
