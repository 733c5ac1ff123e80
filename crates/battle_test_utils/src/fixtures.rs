//! Test fixtures and helpers.
//!
//! Battles are always built by applying real events through a
//! [`BattleManager`], so fixtures exercise the same validation as production
//! code. A seeded fixture mints every id, token and timestamp from a counter,
//! which makes two fixtures built from the same seed bit-identical.

use battle_core::prelude::*;
use fixed::types::I32F32;
use uuid::Uuid;

use crate::strategies::ScriptStep;

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> I32F32 {
    I32F32::from_num(n)
}

/// Create a fixed-point number from a float (for tests only).
///
/// Note: In real simulation code, never use floats.
/// This is only for convenient test setup.
#[must_use]
pub fn fixed_f(n: f64) -> I32F32 {
    I32F32::from_num(n)
}

/// Identity of a fixture fraction and the ships it has fielded.
#[derive(Debug, Clone)]
pub struct FractionHandle {
    /// Fraction identity.
    pub fraction_id: FractionId,
    /// Credential minted for the fraction.
    pub token: AuthToken,
    /// Ships in creation order.
    pub ships: Vec<ShipId>,
}

/// A battle under construction, addressed by fraction and ship index.
#[derive(Debug, Clone)]
pub struct BattleFixture {
    manager: BattleManager,
    fractions: Vec<FractionHandle>,
    seed: Option<u64>,
    counter: u64,
}

impl BattleFixture {
    /// An empty battle with freshly minted identities.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            manager: BattleManager::new(BattleState::new("Fixture", width, height)),
            fractions: Vec::new(),
            seed: None,
            counter: 0,
        }
    }

    /// An empty battle whose ids and timestamps derive from `seed`.
    #[must_use]
    pub fn seeded(seed: u64, width: u32, height: u32) -> Self {
        let battle_id = BattleId::from_uuid(Uuid::from_u128(u128::from(seed) << 64));
        Self {
            manager: BattleManager::new(BattleState::with_id(
                battle_id,
                format!("Fixture {seed}"),
                width,
                height,
                0,
            )),
            fractions: Vec::new(),
            seed: Some(seed),
            counter: 0,
        }
    }

    fn next_uuid(&mut self) -> Option<Uuid> {
        let seed = self.seed?;
        self.counter += 1;
        Some(Uuid::from_u128((u128::from(seed) << 64) | u128::from(self.counter)))
    }

    fn stamp(&mut self, event: Event) -> Event {
        if self.seed.is_some() {
            self.counter += 1;
            event.at(self.counter)
        } else {
            event
        }
    }

    fn apply(&mut self, event: Event) -> Result<()> {
        let event = self.stamp(event);
        self.manager.apply_event(event)
    }

    /// Submit `payload` on behalf of fraction `fraction`.
    pub fn submit(&mut self, fraction: usize, payload: EventPayload) -> Result<()> {
        let event = Event::fraction(self.battle_id(), self.fraction_id(fraction), payload);
        self.apply(event)
    }

    /// Submit a battle-scoped `payload`.
    pub fn submit_battle(&mut self, payload: EventPayload) -> Result<()> {
        let event = Event::battle(self.battle_id(), payload);
        self.apply(event)
    }

    /// Add a fraction, returning its index.
    ///
    /// # Panics
    ///
    /// Panics if the battle rejects the fraction.
    pub fn add_fraction(&mut self, name: &str) -> usize {
        let mut payload = AddFraction::new(name, format!("{name} player"), "#ffffff");
        if let Some(uuid) = self.next_uuid() {
            payload.fraction_id = FractionId::from_uuid(uuid);
            payload.auth_token = AuthToken::from(format!("token-{}", uuid.simple()));
        }
        let handle = FractionHandle {
            fraction_id: payload.fraction_id,
            token: payload.auth_token.clone(),
            ships: Vec::new(),
        };
        let event = Event::add_fraction(self.battle_id(), payload);
        self.apply(event)
            .unwrap_or_else(|err| panic!("fixture fraction {name} rejected: {err}"));
        self.fractions.push(handle);
        self.fractions.len() - 1
    }

    /// Add a ship with the standard loadout.
    ///
    /// # Panics
    ///
    /// Panics if the battle rejects the ship.
    pub fn add_ship(&mut self, fraction: usize, ship_type: ShipType, x: i32, y: i32) -> ShipId {
        self.add_ship_with_modules(fraction, ship_type, x, y, Vec::new())
    }

    /// Add a ship with an explicit loadout.
    ///
    /// # Panics
    ///
    /// Panics if the battle rejects the ship.
    pub fn add_ship_with_modules(
        &mut self,
        fraction: usize,
        ship_type: ShipType,
        x: i32,
        y: i32,
        modules: Vec<ModuleState>,
    ) -> ShipId {
        let number = self.fractions[fraction].ships.len() + 1;
        let name = format!("{} {number}", ship_type.display_name());
        let mut payload =
            AddFractionShip::new(name, ship_type, Vec2Fixed::from_ints(x, y)).with_modules(modules);
        if let Some(uuid) = self.next_uuid() {
            payload.ship_id = ShipId::from_uuid(uuid);
        }
        let ship_id = payload.ship_id;
        self.submit(fraction, EventPayload::AddFractionShip(payload))
            .unwrap_or_else(|err| panic!("fixture ship rejected: {err}"));
        self.fractions[fraction].ships.push(ship_id);
        ship_id
    }

    /// Start the battle.
    ///
    /// # Panics
    ///
    /// Panics if the battle cannot start.
    pub fn start(&mut self) {
        self.submit_battle(EventPayload::StartBattle)
            .unwrap_or_else(|err| panic!("fixture battle did not start: {err}"));
    }

    /// Queue a move for ship `ship` of fraction `fraction`.
    pub fn move_ship(&mut self, fraction: usize, ship: usize, x: i32, y: i32) -> Result<()> {
        let payload = AddShipMove {
            ship_id: self.ship_id(fraction, ship),
            target: Vec2Fixed::from_ints(x, y),
        };
        self.submit(fraction, EventPayload::AddShipMove(payload))
    }

    fn intent(&self, shooter: (usize, usize), target: (usize, usize)) -> ShotIntent {
        ShotIntent {
            shooter_ship_id: self.ship_id(shooter.0, shooter.1),
            target_fraction_id: self.fraction_id(target.0),
            target_ship_id: self.ship_id(target.0, target.1),
        }
    }

    /// Queue a laser shot from `(fraction, ship)` at `(fraction, ship)`.
    pub fn fire_laser(&mut self, shooter: (usize, usize), target: (usize, usize)) -> Result<()> {
        let intent = self.intent(shooter, target);
        self.submit(shooter.0, EventPayload::AddLaserShot(intent))
    }

    /// Queue a missile shot from `(fraction, ship)` at `(fraction, ship)`.
    pub fn fire_missile(&mut self, shooter: (usize, usize), target: (usize, usize)) -> Result<()> {
        let intent = self.intent(shooter, target);
        self.submit(shooter.0, EventPayload::AddMissileShot(intent))
    }

    /// Mark a fraction's turn as finished.
    pub fn finish_turn(&mut self, fraction: usize) -> Result<()> {
        self.submit(fraction, EventPayload::FinishTurn)
    }

    /// Resolve the current turn.
    pub fn end_turn(&mut self) -> Result<()> {
        self.submit_battle(EventPayload::EndOfTurn)
    }

    /// Apply one scripted step, returning whether the battle accepted it.
    ///
    /// Indices wrap around the fractions and ships that exist, so any
    /// generated script can be applied to any fixture.
    pub fn apply_step(&mut self, step: &ScriptStep) -> bool {
        if self.fractions.is_empty() {
            return false;
        }
        let pick = |fixture: &Self, fraction: usize, ship: usize| {
            let fraction = fraction % fixture.fractions.len();
            let ships = fixture.fractions[fraction].ships.len().max(1);
            (fraction, ship % ships)
        };

        let outcome = match *step {
            ScriptStep::Move { fraction, ship, x, y } => {
                let (f, s) = pick(self, fraction, ship);
                self.move_ship(f, s, x, y)
            }
            ScriptStep::Laser { shooter, target } => {
                let shooter = pick(self, shooter.0, shooter.1);
                let target = pick(self, target.0, target.1);
                self.fire_laser(shooter, target)
            }
            ScriptStep::Missile { shooter, target } => {
                let shooter = pick(self, shooter.0, shooter.1);
                let target = pick(self, target.0, target.1);
                self.fire_missile(shooter, target)
            }
            ScriptStep::FinishTurn { fraction } => {
                let (f, _) = pick(self, fraction, 0);
                self.finish_turn(f)
            }
            ScriptStep::EndTurn => self.end_turn(),
        };

        match outcome {
            Ok(()) => true,
            Err(err) => {
                tracing::debug!(?step, reason = err.reason_code(), "scripted step rejected");
                false
            }
        }
    }

    /// Battle identity.
    #[must_use]
    pub fn battle_id(&self) -> BattleId {
        self.manager.battle_id()
    }

    /// Handle of fraction `fraction`.
    #[must_use]
    pub fn fraction(&self, fraction: usize) -> &FractionHandle {
        &self.fractions[fraction]
    }

    /// Number of fractions added.
    #[must_use]
    pub fn fraction_count(&self) -> usize {
        self.fractions.len()
    }

    /// Identity of fraction `fraction`.
    #[must_use]
    pub fn fraction_id(&self, fraction: usize) -> FractionId {
        self.fractions[fraction].fraction_id
    }

    /// Identity of ship `ship` of fraction `fraction`.
    #[must_use]
    pub fn ship_id(&self, fraction: usize, ship: usize) -> ShipId {
        self.fractions[fraction].ships[ship]
    }

    /// Current state of ship `ship` of fraction `fraction`.
    ///
    /// # Panics
    ///
    /// Panics if the ship does not exist.
    #[must_use]
    pub fn ship(&self, fraction: usize, ship: usize) -> &ShipState {
        self.state()
            .ship(self.fraction_id(fraction), self.ship_id(fraction, ship))
            .unwrap_or_else(|| panic!("fixture ship {fraction}/{ship} missing"))
    }

    /// Current battle state.
    #[must_use]
    pub fn state(&self) -> &BattleState {
        self.manager.state()
    }

    /// Underlying manager.
    #[must_use]
    pub fn manager(&self) -> &BattleManager {
        &self.manager
    }

    /// Give up the fixture, keeping the manager.
    #[must_use]
    pub fn into_manager(self) -> BattleManager {
        self.manager
    }

    /// Log entry types of `turn`, in order.
    #[must_use]
    pub fn log_types(&self, turn: u32) -> Vec<TurnLogEntryType> {
        self.state()
            .log_for_turn(turn)
            .map(|entry| entry.entry_type)
            .collect()
    }

    /// Number of log entries of `entry_type` across the whole battle.
    #[must_use]
    pub fn count_log(&self, entry_type: TurnLogEntryType) -> usize {
        self.state()
            .battle_log
            .iter()
            .filter(|entry| entry.entry_type == entry_type)
            .count()
    }
}

/// Two started fractions, "Red" and "Blue", with one ship each.
#[must_use]
pub fn duel(ship_type: ShipType, red: (i32, i32), blue: (i32, i32)) -> BattleFixture {
    let mut fixture = BattleFixture::new(1000, 800);
    let r = fixture.add_fraction("Red");
    let b = fixture.add_fraction("Blue");
    fixture.add_ship(r, ship_type, red.0, red.1);
    fixture.add_ship(b, ship_type, blue.0, blue.1);
    fixture.start();
    fixture
}

/// A reproducible three-fraction battle with mixed fleets, already started.
#[must_use]
pub fn skirmish(seed: u64) -> BattleFixture {
    let mut fixture = BattleFixture::seeded(seed, 400, 300);
    let fleets = [
        ("Aurora", [(ShipType::Corvette, 40, 40), (ShipType::Cruiser, 60, 50)]),
        ("Basalt", [(ShipType::Destroyer, 80, 60), (ShipType::Battleship, 90, 80)]),
        ("Cinder", [(ShipType::Corvette, 50, 90), (ShipType::OrbitalFort, 70, 70)]),
    ];
    for (name, ships) in fleets {
        let fraction = fixture.add_fraction(name);
        for (ship_type, x, y) in ships {
            fixture.add_ship(fraction, ship_type, x, y);
        }
    }
    fixture.start();
    fixture
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duel_is_started() {
        let fixture = duel(ShipType::Corvette, (100, 100), (120, 120));
        assert_eq!(fixture.state().status, BattleStatus::InProgress);
        assert_eq!(fixture.state().turn_number, 1);
        assert_eq!(fixture.fraction_count(), 2);
        assert_eq!(fixture.ship(1, 0).position, Vec2Fixed::from_ints(120, 120));
    }

    #[test]
    fn test_seeded_fixtures_are_identical() {
        let a = skirmish(7);
        let b = skirmish(7);
        assert_eq!(a.state(), b.state());
        assert_ne!(a.state().battle_id, skirmish(8).state().battle_id);
    }

    #[test]
    fn test_script_indices_wrap() {
        let mut fixture = skirmish(1);
        let accepted = fixture.apply_step(&ScriptStep::Move {
            fraction: 3,
            ship: 2,
            x: 45,
            y: 45,
        });
        assert!(accepted);
        assert_eq!(fixture.state().pending_moves[0].ship_id, fixture.ship_id(0, 0));
    }

    #[test]
    fn test_fixed_helpers() {
        assert_eq!(fixed(3), I32F32::from_num(3));
        assert_eq!(fixed_f(0.5), I32F32::from_num(0.5));
    }
}
