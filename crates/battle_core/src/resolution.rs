//! Turn resolution.
//!
//! Runs the queued orders of one turn against the aggregate in a fixed
//! order: movement, lasers, missiles, defeat check, turn advance. All
//! randomness comes from the generator passed in, so the same state and the
//! same seed always produce the same outcome and the same log.

use std::collections::HashMap;

use rand::RngCore;
use tracing::{debug, info};

use crate::battle::{
    BattleState, BattleStatus, MissileMovementPath, ShipMoveOrder, ShipMovementPath, ShotOrder,
};
use crate::combat::{check_range, hit_chance, roll_against, Roll};
use crate::ids::{FractionId, ShipId};
use crate::math::{plot_waypoints, Fixed, Vec2Fixed};
use crate::stats::{
    WeaponType, LASER_DAMAGE, MISSILE_DAMAGE, PATH_WAYPOINT_SPACING, POINT_DEFENSE_RANGE,
};
use crate::turn_log::{LogParty, TurnLogEntry, TurnLogEntryType};

/// What one resolution did, for logging and notifications.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TurnSummary {
    /// Turn that was resolved.
    pub turn: u32,
    /// Log entries appended.
    pub entries: usize,
    /// Ships destroyed this turn, in destruction order.
    pub destroyed: Vec<ShipId>,
    /// Fractions defeated this turn.
    pub defeated: Vec<FractionId>,
    /// Whether the battle finished with this turn.
    pub finished: bool,
}

/// Resolve the current turn of `state`.
///
/// Clears last turn's paths, consumes the pending orders and advances
/// `turn_number`. Orders whose ships have been destroyed in the meantime are
/// skipped silently.
pub fn resolve_turn<R: RngCore + ?Sized>(state: &mut BattleState, rng: &mut R) -> TurnSummary {
    let turn = state.turn_number;
    let log_start = state.battle_log.len();
    let mut summary = TurnSummary {
        turn,
        ..TurnSummary::default()
    };

    state.ship_movement_paths.clear();
    state.missile_movement_paths.clear();
    let moves = std::mem::take(&mut state.pending_moves);
    let lasers = std::mem::take(&mut state.pending_laser_shots);
    let missiles = std::mem::take(&mut state.pending_missile_shots);

    debug!(
        turn,
        moves = moves.len(),
        lasers = lasers.len(),
        missiles = missiles.len(),
        "resolving turn"
    );

    resolve_movement(state, turn, &moves);
    resolve_lasers(state, turn, &lasers, rng, &mut summary);
    resolve_missiles(state, turn, &missiles, rng, &mut summary);
    check_defeat(state, turn, &mut summary);
    advance_turn(state, &mut summary);

    summary.entries = state.battle_log.len() - log_start;
    summary
}

fn fmt_pos(position: Vec2Fixed) -> String {
    let (x, y) = position.to_f64_pair();
    format!("({x:.2}, {y:.2})")
}

fn resolve_movement(state: &mut BattleState, turn: u32, moves: &[ShipMoveOrder]) {
    let spacing = Fixed::from_num(PATH_WAYPOINT_SPACING);

    for order in moves {
        let Some(fraction) = state.fraction(order.fraction_id) else {
            continue;
        };
        let Some(ship) = fraction.ship(order.ship_id).filter(|ship| ship.is_alive()) else {
            continue;
        };

        let start = ship.position;
        let end = start.move_towards(order.target, ship.speed);
        if end == start {
            continue;
        }

        let travelled = start.distance(end).to_num::<f64>();
        let entry = TurnLogEntry::new(turn, TurnLogEntryType::ShipMove, LogParty::ship(fraction, ship))
            .with_message(format!("{} moved {travelled:.1} units", ship.name))
            .with_admin_log(format!(
                "from {} to {} requested {} speed {}",
                fmt_pos(start),
                fmt_pos(end),
                fmt_pos(order.target),
                ship.speed
            ));
        let path = ShipMovementPath {
            fraction_id: order.fraction_id,
            ship_id: order.ship_id,
            start,
            target: order.target,
            end,
            waypoints: plot_waypoints(start, end, spacing),
        };

        if let Some(ship) = state.ship_mut(order.fraction_id, order.ship_id) {
            ship.position = end;
        }
        state.ship_movement_paths.push(path);
        state.battle_log.push(entry);
    }
}

/// Both sides of a shot, captured before anything is mutated.
struct Engagement {
    shooter: LogParty,
    target: LogParty,
    target_fraction_id: FractionId,
    target_ship_id: ShipId,
    from: Vec2Fixed,
    to: Vec2Fixed,
    distance: Fixed,
    lasers: u32,
    missiles: u32,
}

impl Engagement {
    /// `None` when either ship is gone.
    fn prepare(state: &BattleState, order: &ShotOrder) -> Option<Self> {
        let shooter_fraction = state.fraction(order.fraction_id)?;
        let shooter = shooter_fraction
            .ship(order.shooter_ship_id)
            .filter(|ship| ship.is_alive())?;
        let target_fraction = state.fraction(order.target_fraction_id)?;
        let target = target_fraction
            .ship(order.target_ship_id)
            .filter(|ship| ship.is_alive())?;

        Some(Self {
            shooter: LogParty::ship(shooter_fraction, shooter),
            target: LogParty::ship(target_fraction, target),
            target_fraction_id: order.target_fraction_id,
            target_ship_id: order.target_ship_id,
            from: shooter.position,
            to: target.position,
            distance: shooter.position.distance(target.position),
            lasers: shooter.number_of_lasers(),
            missiles: shooter.number_of_missiles(),
        })
    }

    fn entry(&self, turn: u32, entry_type: TurnLogEntryType) -> TurnLogEntry {
        TurnLogEntry::new(turn, entry_type, self.shooter.clone()).with_target(self.target.clone())
    }

    fn distance_f64(&self) -> f64 {
        self.distance.to_num::<f64>()
    }
}

fn resolve_lasers<R: RngCore + ?Sized>(
    state: &mut BattleState,
    turn: u32,
    shots: &[ShotOrder],
    rng: &mut R,
    summary: &mut TurnSummary,
) {
    let mut fired: HashMap<ShipId, u32> = HashMap::new();

    for order in shots {
        let Some(shot) = Engagement::prepare(state, order) else {
            continue;
        };
        let used = fired.entry(order.shooter_ship_id).or_insert(0);
        if *used >= shot.lasers {
            debug!(ship = %order.shooter_ship_id, "laser shot dropped, no free laser");
            continue;
        }
        *used += 1;

        if let Err(err) = check_range(WeaponType::Laser, shot.distance) {
            state.battle_log.push(
                shot.entry(turn, TurnLogEntryType::LaserMiss)
                    .with_message(format!(
                        "{}'s laser could not reach {}",
                        shot.shooter.ship_name, shot.target.ship_name
                    ))
                    .with_admin_log(err.to_string()),
            );
            continue;
        }

        let roll = roll_against(rng, hit_chance(WeaponType::Laser, shot.distance));
        let admin = format!("distance={:.2} {}", shot.distance_f64(), roll.describe());
        if roll.success() {
            state.battle_log.push(
                shot.entry(turn, TurnLogEntryType::LaserHit)
                    .with_message(format!(
                        "{}'s laser hit {}",
                        shot.shooter.ship_name, shot.target.ship_name
                    ))
                    .with_admin_log(admin),
            );
            apply_hit(state, turn, &shot, LASER_DAMAGE, summary);
        } else {
            state.battle_log.push(
                shot.entry(turn, TurnLogEntryType::LaserMiss)
                    .with_message(format!(
                        "{}'s laser missed {}",
                        shot.shooter.ship_name, shot.target.ship_name
                    ))
                    .with_admin_log(admin),
            );
        }
    }
}

fn resolve_missiles<R: RngCore + ?Sized>(
    state: &mut BattleState,
    turn: u32,
    shots: &[ShotOrder],
    rng: &mut R,
    summary: &mut TurnSummary,
) {
    let spacing = Fixed::from_num(PATH_WAYPOINT_SPACING);
    let mut launched: HashMap<ShipId, u32> = HashMap::new();
    let mut defended: HashMap<ShipId, u32> = HashMap::new();

    for order in shots {
        let Some(shot) = Engagement::prepare(state, order) else {
            continue;
        };
        let used = launched.entry(order.shooter_ship_id).or_insert(0);
        if *used >= shot.missiles {
            debug!(ship = %order.shooter_ship_id, "missile shot dropped, no free launcher");
            continue;
        }
        *used += 1;

        if let Err(err) = check_range(WeaponType::Missile, shot.distance) {
            state.battle_log.push(
                shot.entry(turn, TurnLogEntryType::MissileOutOfRange)
                    .with_message(format!(
                        "{} is out of missile range of {}",
                        shot.target.ship_name, shot.shooter.ship_name
                    ))
                    .with_admin_log(err.to_string()),
            );
            continue;
        }

        let chance = hit_chance(WeaponType::Missile, shot.distance);
        state.missile_movement_paths.push(MissileMovementPath {
            fraction_id: order.fraction_id,
            shooter_ship_id: order.shooter_ship_id,
            target_fraction_id: order.target_fraction_id,
            target_ship_id: order.target_ship_id,
            start: shot.from,
            target: shot.to,
            waypoints: plot_waypoints(shot.from, shot.to, spacing),
        });
        state.battle_log.push(
            shot.entry(turn, TurnLogEntryType::MissileFired)
                .with_message(format!(
                    "{} launched a missile at {}",
                    shot.shooter.ship_name, shot.target.ship_name
                ))
                .with_admin_log(format!(
                    "distance={:.2} chance={:.4}",
                    shot.distance_f64(),
                    chance.to_num::<f64>()
                )),
        );

        let mut defence = String::new();
        if let Some((defender_id, defender)) = find_interceptor(state, &shot, &defended) {
            *defended.entry(defender_id).or_insert(0) += 1;
            let intercept = roll_against(rng, hit_chance(WeaponType::PointDefense, Fixed::ZERO));
            if intercept.success() {
                state.battle_log.push(
                    TurnLogEntry::new(turn, TurnLogEntryType::MissileIntercepted, defender.clone())
                        .with_target(shot.shooter.clone())
                        .with_message(format!(
                            "{} shot down a missile from {}",
                            defender.ship_name, shot.shooter.ship_name
                        ))
                        .with_admin_log(format!("point defense {}", intercept.describe())),
                );
                continue;
            }
            defence = format!("point defense by {} failed {}; ", defender.ship_name, intercept.describe());
        }

        let roll: Roll = roll_against(rng, chance);
        let admin = format!("{defence}distance={:.2} {}", shot.distance_f64(), roll.describe());
        if roll.success() {
            state.battle_log.push(
                shot.entry(turn, TurnLogEntryType::MissileHit)
                    .with_message(format!(
                        "{}'s missile hit {}",
                        shot.shooter.ship_name, shot.target.ship_name
                    ))
                    .with_admin_log(admin),
            );
            apply_hit(state, turn, &shot, MISSILE_DAMAGE, summary);
        } else {
            state.battle_log.push(
                shot.entry(turn, TurnLogEntryType::MissileMiss)
                    .with_message(format!(
                        "{}'s missile missed {}",
                        shot.shooter.ship_name, shot.target.ship_name
                    ))
                    .with_admin_log(admin),
            );
        }
    }
}

/// First living ship of the target fraction with an unused point-defense
/// slot whose range covers the missile's flight segment.
fn find_interceptor(
    state: &BattleState,
    shot: &Engagement,
    defended: &HashMap<ShipId, u32>,
) -> Option<(ShipId, LogParty)> {
    let range = Fixed::from_num(POINT_DEFENSE_RANGE);
    let fraction = state.fraction(shot.target_fraction_id)?;
    fraction
        .alive_ships()
        .find(|ship| {
            let used = defended.get(&ship.ship_id).copied().unwrap_or(0);
            used < ship.number_of_points_defense()
                && ship.position.distance_to_segment(shot.from, shot.to) <= range
        })
        .map(|ship| (ship.ship_id, LogParty::ship(fraction, ship)))
}

fn apply_hit(
    state: &mut BattleState,
    turn: u32,
    shot: &Engagement,
    damage: u32,
    summary: &mut TurnSummary,
) {
    let Some(target) = state.ship_mut(shot.target_fraction_id, shot.target_ship_id) else {
        return;
    };
    let report = target.apply_damage(damage);
    let remaining = format!(
        "shields={}/{} armor={}/{} hull={}/{}",
        target.shields.current,
        target.shields.max,
        target.armor.current,
        target.armor.max,
        target.hit_points.current,
        target.hit_points.max
    );

    state.battle_log.push(
        shot.entry(turn, TurnLogEntryType::DamageDealt)
            .with_message(format!(
                "{} dealt {} damage to {}",
                shot.shooter.ship_name,
                report.applied(),
                shot.target.ship_name
            ))
            .with_admin_log(format!("raw={} applied={}", report.raw, report.applied())),
    );
    state.battle_log.push(
        TurnLogEntry::new(turn, TurnLogEntryType::DamageReceived, shot.target.clone())
            .with_target(shot.shooter.clone())
            .with_message(format!(
                "{} took {} damage ({} shields, {} armor, {} hull)",
                shot.target.ship_name,
                report.applied(),
                report.shields,
                report.armor,
                report.hull
            ))
            .with_admin_log(remaining),
    );

    if report.destroyed {
        state.battle_log.push(
            TurnLogEntry::new(turn, TurnLogEntryType::ShipDestroyed, shot.target.clone())
                .with_target(shot.shooter.clone())
                .with_message(format!(
                    "{} was destroyed by {}",
                    shot.target.ship_name, shot.shooter.ship_name
                )),
        );
        summary.destroyed.push(shot.target_ship_id);
        debug!(ship = %shot.target_ship_id, "ship destroyed");
    }
}

fn check_defeat(state: &mut BattleState, turn: u32, summary: &mut TurnSummary) {
    let mut entries = Vec::new();
    for fraction in &mut state.fractions {
        if fraction.is_defeated || !fraction.all_ships_destroyed() {
            continue;
        }
        fraction.is_defeated = true;
        summary.defeated.push(fraction.fraction_id);
        entries.push(
            TurnLogEntry::new(turn, TurnLogEntryType::FractionDefeated, LogParty::fraction(fraction))
                .with_message(format!("{} has been defeated", fraction.fraction_name)),
        );
    }
    state.battle_log.extend(entries);
}

fn advance_turn(state: &mut BattleState, summary: &mut TurnSummary) {
    for fraction in &mut state.fractions {
        fraction.turn_finished = false;
    }
    state.turn_number = state.turn_number.saturating_add(1);

    let any_defeated = state.fractions.iter().any(|fraction| fraction.is_defeated);
    let survivors: Vec<FractionId> = state
        .undefeated_fractions()
        .map(|fraction| fraction.fraction_id)
        .collect();

    if any_defeated && survivors.len() <= 1 {
        state.status = BattleStatus::Finished;
        state.winner = survivors.first().copied();
        summary.finished = true;
        info!(
            battle = %state.battle_id,
            turn = summary.turn,
            winner = ?state.winner,
            "battle finished"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::MAX_BATTLEFIELD_SIZE;
    use crate::fraction::FractionState;
    use crate::ids::AuthToken;
    use crate::ship::{ModuleState, ShipState};
    use crate::stats::ShipType;
    use rand::rngs::mock::StepRng;

    struct Duel {
        state: BattleState,
        red: FractionId,
        blue: FractionId,
        red_ship: ShipId,
        blue_ship: ShipId,
    }

    fn duel(red_at: (i32, i32), blue_at: (i32, i32), blue_modules: Vec<ModuleState>) -> Duel {
        let mut state = BattleState::new("Duel", 1000, 800);
        state.status = BattleStatus::InProgress;
        state.turn_number = 1;

        let red = FractionId::new();
        let blue = FractionId::new();
        let red_ship = ShipId::new();
        let blue_ship = ShipId::new();

        let mut red_fraction = FractionState::new(red, "Red", "alice", "#f00", AuthToken::generate());
        red_fraction.ships.push(ShipState::new(
            red_ship,
            red,
            "Needle",
            ShipType::Corvette,
            Vec2Fixed::from_ints(red_at.0, red_at.1),
            Vec::new(),
        ));
        let mut blue_fraction = FractionState::new(blue, "Blue", "bob", "#00f", AuthToken::generate());
        blue_fraction.ships.push(ShipState::new(
            blue_ship,
            blue,
            "Lance",
            ShipType::Corvette,
            Vec2Fixed::from_ints(blue_at.0, blue_at.1),
            blue_modules,
        ));
        state.fractions.push(red_fraction);
        state.fractions.push(blue_fraction);

        Duel {
            state,
            red,
            blue,
            red_ship,
            blue_ship,
        }
    }

    fn shot(d: &Duel) -> ShotOrder {
        ShotOrder {
            fraction_id: d.red,
            shooter_ship_id: d.red_ship,
            target_fraction_id: d.blue,
            target_ship_id: d.blue_ship,
        }
    }

    fn count(state: &BattleState, entry_type: TurnLogEntryType) -> usize {
        state
            .battle_log
            .iter()
            .filter(|entry| entry.entry_type == entry_type)
            .count()
    }

    fn always_hit() -> StepRng {
        StepRng::new(0, 0)
    }

    fn always_miss() -> StepRng {
        StepRng::new(u64::MAX, 0)
    }

    #[test]
    fn test_move_is_clipped_to_speed() {
        let mut d = duel((100, 100), (500, 500), Vec::new());
        d.state.pending_moves.push(ShipMoveOrder {
            fraction_id: d.red,
            ship_id: d.red_ship,
            target: Vec2Fixed::from_ints(200, 100),
        });

        resolve_turn(&mut d.state, &mut always_hit());

        let ship = d.state.ship(d.red, d.red_ship).unwrap();
        assert_eq!(ship.position, Vec2Fixed::from_ints(110, 100));
        let path = &d.state.ship_movement_paths[0];
        assert_eq!(path.target, Vec2Fixed::from_ints(200, 100));
        assert_eq!(path.end, Vec2Fixed::from_ints(110, 100));
        assert_eq!(path.waypoints.len(), 4);
        assert_eq!(count(&d.state, TurnLogEntryType::ShipMove), 1);
    }

    #[test]
    fn test_laser_limit_per_ship() {
        let mut d = duel((100, 100), (110, 100), Vec::new());
        d.state.pending_laser_shots = vec![shot(&d), shot(&d), shot(&d)];

        resolve_turn(&mut d.state, &mut always_hit());

        assert_eq!(count(&d.state, TurnLogEntryType::LaserHit), 1);
        let target = d.state.ship(d.blue, d.blue_ship).unwrap();
        assert_eq!(target.shields.current, 25 - LASER_DAMAGE);
    }

    #[test]
    fn test_laser_out_of_range_misses() {
        let mut d = duel((100, 100), (200, 100), Vec::new());
        d.state.pending_laser_shots.push(shot(&d));

        resolve_turn(&mut d.state, &mut always_hit());

        let miss = d
            .state
            .battle_log
            .iter()
            .find(|entry| entry.entry_type == TurnLogEntryType::LaserMiss)
            .unwrap();
        assert!(miss.admin_log.contains("beyond maximum range"));
        assert_eq!(count(&d.state, TurnLogEntryType::LaserHit), 0);
    }

    #[test]
    fn test_missile_beyond_range_is_a_no_op() {
        let mut d = duel((100, 100), (200, 100), Vec::new());
        d.state.pending_missile_shots.push(shot(&d));

        resolve_turn(&mut d.state, &mut always_hit());

        assert_eq!(count(&d.state, TurnLogEntryType::MissileOutOfRange), 1);
        assert_eq!(count(&d.state, TurnLogEntryType::MissileFired), 0);
        assert_eq!(count(&d.state, TurnLogEntryType::MissileHit), 0);
        assert_eq!(count(&d.state, TurnLogEntryType::MissileMiss), 0);
        assert!(d.state.missile_movement_paths.is_empty());
    }

    #[test]
    fn test_surplus_missile_orders_need_a_launcher_first() {
        let mut d = duel((100, 100), (200, 100), Vec::new());
        d.state.pending_missile_shots = vec![shot(&d), shot(&d), shot(&d)];

        resolve_turn(&mut d.state, &mut always_hit());

        // One launcher, so only the first order reaches the range check.
        assert_eq!(count(&d.state, TurnLogEntryType::MissileOutOfRange), 1);
    }

    #[test]
    fn test_far_apart_ships_on_the_largest_battlefield() {
        let mut d = duel((0, 0), (0, 0), Vec::new());
        d.state.width = MAX_BATTLEFIELD_SIZE;
        d.state.height = MAX_BATTLEFIELD_SIZE;
        let far = i32::try_from(MAX_BATTLEFIELD_SIZE).unwrap();
        d.state.fractions[1].ships[0].position = Vec2Fixed::from_ints(far, far);
        d.state.pending_laser_shots.push(shot(&d));
        d.state.pending_missile_shots.push(shot(&d));

        resolve_turn(&mut d.state, &mut always_hit());

        assert_eq!(count(&d.state, TurnLogEntryType::LaserHit), 0);
        assert_eq!(count(&d.state, TurnLogEntryType::LaserMiss), 1);
        assert_eq!(count(&d.state, TurnLogEntryType::MissileOutOfRange), 1);
        let target = d.state.ship(d.blue, d.blue_ship).unwrap();
        assert_eq!(target.shields.current, 25);
    }

    #[test]
    fn test_point_defense_intercepts() {
        let mut d = duel((100, 100), (120, 120), Vec::new());
        d.state.pending_missile_shots.push(shot(&d));

        resolve_turn(&mut d.state, &mut always_hit());

        assert_eq!(count(&d.state, TurnLogEntryType::MissileFired), 1);
        assert_eq!(count(&d.state, TurnLogEntryType::MissileIntercepted), 1);
        assert_eq!(count(&d.state, TurnLogEntryType::MissileHit), 0);
        assert_eq!(d.state.missile_movement_paths.len(), 1);
    }

    #[test]
    fn test_missile_hits_without_point_defense() {
        let unguarded = vec![ModuleState::with_weapons(&[WeaponType::Laser, WeaponType::Missile])];
        let mut d = duel((100, 100), (120, 120), unguarded);
        d.state.pending_missile_shots.push(shot(&d));

        resolve_turn(&mut d.state, &mut always_hit());

        let types: Vec<_> = d.state.battle_log.iter().map(|e| e.entry_type).collect();
        assert_eq!(
            types,
            vec![
                TurnLogEntryType::MissileFired,
                TurnLogEntryType::MissileHit,
                TurnLogEntryType::DamageDealt,
                TurnLogEntryType::DamageReceived,
            ]
        );
        let target = d.state.ship(d.blue, d.blue_ship).unwrap();
        assert_eq!(target.shields.current, 0);
        assert_eq!(target.armor.current, 25);
    }

    #[test]
    fn test_failed_intercept_then_miss() {
        let mut d = duel((100, 100), (120, 120), Vec::new());
        d.state.pending_missile_shots.push(shot(&d));

        resolve_turn(&mut d.state, &mut always_miss());

        let miss = d
            .state
            .battle_log
            .iter()
            .find(|entry| entry.entry_type == TurnLogEntryType::MissileMiss)
            .unwrap();
        assert!(miss.admin_log.starts_with("point defense by Lance failed"));
    }

    #[test]
    fn test_destruction_defeat_and_finish() {
        let mut d = duel((100, 100), (105, 100), Vec::new());
        if let Some(ship) = d.state.ship_mut(d.blue, d.blue_ship) {
            ship.shields.current = 0;
            ship.armor.current = 0;
            ship.hit_points.current = 5;
        }
        d.state.pending_laser_shots.push(shot(&d));

        let summary = resolve_turn(&mut d.state, &mut always_hit());

        assert_eq!(summary.destroyed, vec![d.blue_ship]);
        assert_eq!(summary.defeated, vec![d.blue]);
        assert!(summary.finished);
        assert_eq!(count(&d.state, TurnLogEntryType::ShipDestroyed), 1);
        assert_eq!(count(&d.state, TurnLogEntryType::FractionDefeated), 1);
        assert_eq!(d.state.status, BattleStatus::Finished);
        assert_eq!(d.state.winner, Some(d.red));
        assert_eq!(d.state.turn_number, 2);
    }

    #[test]
    fn test_advance_resets_flags_and_consumes_orders() {
        let mut d = duel((100, 100), (500, 500), Vec::new());
        for fraction in &mut d.state.fractions {
            fraction.turn_finished = true;
        }
        d.state.pending_laser_shots.push(shot(&d));

        let summary = resolve_turn(&mut d.state, &mut always_hit());

        assert_eq!(summary.turn, 1);
        assert_eq!(d.state.turn_number, 2);
        assert!(d.state.fractions.iter().all(|f| !f.turn_finished));
        assert!(d.state.pending_laser_shots.is_empty());
        assert_eq!(d.state.status, BattleStatus::InProgress);
    }

    #[test]
    fn test_dead_shooter_does_not_fire() {
        let mut d = duel((100, 100), (110, 100), Vec::new());
        if let Some(ship) = d.state.ship_mut(d.red, d.red_ship) {
            ship.apply_damage(10_000);
        }
        d.state.pending_laser_shots.push(shot(&d));

        let summary = resolve_turn(&mut d.state, &mut always_hit());

        assert_eq!(count(&d.state, TurnLogEntryType::LaserHit), 0);
        assert_eq!(summary.defeated, vec![d.red]);
        assert_eq!(d.state.winner, Some(d.blue));
    }
}
