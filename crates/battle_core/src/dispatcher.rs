//! Type-indexed routing of events to their handlers.
//!
//! Each [`EventKind`] is registered once, together with the battle phase its
//! handler requires. The phase gate lives here, in one place: a handler body
//! only runs once the battle is known to be in an admitted phase.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::battle::{BattleState, BattleStatus};
use crate::error::{BattleError, Result};
use crate::events::{Event, EventKind};
use crate::handlers;

/// Battle phase a handler requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PhaseRequirement {
    /// Only while fractions and ships are being set up.
    Preparation,
    /// Only while turns are being played.
    InProgress,
    /// In any phase (administrative events).
    Any,
}

impl PhaseRequirement {
    /// Whether a battle in `status` satisfies this requirement.
    #[must_use]
    pub const fn admits(self, status: BattleStatus) -> bool {
        match self {
            Self::Preparation => matches!(status, BattleStatus::Preparation),
            Self::InProgress => matches!(status, BattleStatus::InProgress),
            Self::Any => true,
        }
    }
}

/// Handler body: validate, then mutate the aggregate in place.
///
/// Must not mutate anything before it is certain to succeed.
pub type HandlerFn = fn(&Event, &mut BattleState) -> Result<()>;

/// A handler together with its phase gate.
#[derive(Clone, Copy)]
pub struct Registration {
    /// Phase the battle must be in.
    pub phase: PhaseRequirement,
    /// Handler body.
    pub handler: HandlerFn,
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("phase", &self.phase)
            .finish_non_exhaustive()
    }
}

/// Routing table from event type to handler.
#[derive(Debug, Clone, Default)]
pub struct EventDispatcher {
    routes: HashMap<EventKind, Registration>,
}

impl EventDispatcher {
    /// A dispatcher with no routes.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// The dispatcher wired with every battle handler.
    #[must_use]
    pub fn standard() -> Self {
        use PhaseRequirement::{Any, InProgress, Preparation};

        Self::empty()
            .register(EventKind::AddFraction, Preparation, handlers::add_fraction)
            .register(EventKind::UpdateFraction, Preparation, handlers::update_fraction)
            .register(EventKind::AddFractionShip, Preparation, handlers::add_fraction_ship)
            .register(EventKind::SetShipPosition, Preparation, handlers::set_ship_position)
            .register(EventKind::StartBattle, Preparation, handlers::start_battle)
            .register(EventKind::UpdateFractionShip, Any, handlers::update_fraction_ship)
            .register(EventKind::AddShipMove, InProgress, handlers::add_ship_move)
            .register(EventKind::AddLaserShot, InProgress, handlers::add_laser_shot)
            .register(EventKind::AddMissileShot, InProgress, handlers::add_missile_shot)
            .register(EventKind::FinishTurn, InProgress, handlers::finish_turn)
            .register(EventKind::EndOfTurn, InProgress, handlers::end_of_turn)
            .register(EventKind::DeleteBattle, Any, handlers::delete_battle)
    }

    /// Route `kind` to `handler` behind a `phase` gate.
    ///
    /// Each kind is registered once; a second registration is a wiring
    /// defect and is ignored in release builds.
    #[must_use]
    pub fn register(mut self, kind: EventKind, phase: PhaseRequirement, handler: HandlerFn) -> Self {
        debug_assert!(
            !self.routes.contains_key(&kind),
            "{kind:?} registered twice"
        );
        self.routes
            .entry(kind)
            .or_insert(Registration { phase, handler });
        self
    }

    /// Whether `kind` has a handler.
    #[must_use]
    pub fn is_registered(&self, kind: EventKind) -> bool {
        self.routes.contains_key(&kind)
    }

    /// Phase requirement registered for `kind`.
    #[must_use]
    pub fn phase_of(&self, kind: EventKind) -> Option<PhaseRequirement> {
        self.routes.get(&kind).map(|registration| registration.phase)
    }

    /// Apply `event` to `state`.
    ///
    /// On error the state is untouched. On success `last_updated` takes the
    /// event's timestamp.
    pub fn dispatch(&self, event: &Event, state: &mut BattleState) -> Result<()> {
        let kind = event.kind();

        if state.is_deleted {
            return Err(BattleError::BattleDeleted(state.battle_id));
        }

        let Some(registration) = self.routes.get(&kind) else {
            tracing::error!(?kind, "no handler registered for event type");
            return Err(BattleError::UnregisteredEventType(kind));
        };

        if !registration.phase.admits(state.status) {
            return Err(BattleError::InvalidPhase {
                event: kind,
                required: registration.phase,
                actual: state.status,
            });
        }

        (registration.handler)(event, state)?;
        state.last_updated = event.timestamp();

        tracing::debug!(
            battle = %state.battle_id,
            ?kind,
            event_id = %event.event_id(),
            turn = state.turn_number,
            "event applied"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{AddFraction, EventPayload};

    #[test]
    fn test_standard_registers_every_kind() {
        let dispatcher = EventDispatcher::standard();
        for kind in EventKind::ALL {
            assert!(dispatcher.is_registered(kind), "{kind:?} has no handler");
        }
    }

    #[test]
    fn test_phase_table() {
        let dispatcher = EventDispatcher::standard();
        assert_eq!(
            dispatcher.phase_of(EventKind::AddFraction),
            Some(PhaseRequirement::Preparation)
        );
        assert_eq!(
            dispatcher.phase_of(EventKind::EndOfTurn),
            Some(PhaseRequirement::InProgress)
        );
        assert_eq!(
            dispatcher.phase_of(EventKind::UpdateFractionShip),
            Some(PhaseRequirement::Any)
        );
    }

    #[test]
    fn test_unregistered_kind_fails_loudly() {
        let dispatcher = EventDispatcher::empty();
        let mut state = BattleState::new("Test", 100, 100);
        let event = Event::battle(state.battle_id, EventPayload::StartBattle);

        let err = dispatcher.dispatch(&event, &mut state).unwrap_err();
        assert!(matches!(err, BattleError::UnregisteredEventType(EventKind::StartBattle)));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_wrong_phase_is_rejected_without_mutation() {
        let dispatcher = EventDispatcher::standard();
        let mut state = BattleState::new("Test", 100, 100);
        state.status = BattleStatus::InProgress;
        state.turn_number = 4;
        let before = state.clone();

        let event = Event::add_fraction(state.battle_id, AddFraction::new("Red", "a", "#f00"));
        let err = dispatcher.dispatch(&event, &mut state).unwrap_err();

        assert!(matches!(err, BattleError::InvalidPhase { .. }));
        assert_eq!(state, before);
    }

    #[test]
    fn test_success_stamps_last_updated() {
        let dispatcher = EventDispatcher::standard();
        let mut state = BattleState::new("Test", 100, 100);
        let event =
            Event::add_fraction(state.battle_id, AddFraction::new("Red", "a", "#f00")).at(42);

        dispatcher.dispatch(&event, &mut state).unwrap();
        assert_eq!(state.last_updated, 42);
        assert_eq!(state.fractions.len(), 1);
    }
}
