//! Single point of entry for mutating a battle.
//!
//! [`BattleManager`] owns one [`BattleState`] and its append-only event log.
//! An event is appended only after its handler succeeded, so the log holds
//! exactly the events that shaped the state, each once, in apply order.

use tracing::{debug, error, warn};

use crate::battle::BattleState;
use crate::dispatcher::EventDispatcher;
use crate::error::{BattleError, Result};
use crate::events::Event;
use crate::ids::BattleId;

/// Owner of one battle aggregate and its event log.
#[derive(Debug, Clone)]
pub struct BattleManager {
    state: BattleState,
    events: Vec<Event>,
    dispatcher: EventDispatcher,
}

impl BattleManager {
    /// Manage a battle that has no history yet.
    #[must_use]
    pub fn new(state: BattleState) -> Self {
        Self::rehydrate(state, Vec::new())
    }

    /// Resume management of a persisted battle.
    ///
    /// `events` must be the log that produced `state`; use
    /// [`BattleManager::verify_replay`] to check that it does.
    #[must_use]
    pub fn rehydrate(state: BattleState, events: Vec<Event>) -> Self {
        Self {
            state,
            events,
            dispatcher: EventDispatcher::standard(),
        }
    }

    /// Rebuild a battle by applying `events` to `genesis` in order.
    ///
    /// Fails on the first event that is rejected.
    pub fn replay(genesis: BattleState, events: impl IntoIterator<Item = Event>) -> Result<Self> {
        let mut manager = Self::new(genesis);
        for event in events {
            manager.apply_event(event)?;
        }
        Ok(manager)
    }

    /// Apply one event.
    ///
    /// On success the event is appended to the log. On failure the state
    /// and log are left exactly as they were.
    pub fn apply_event(&mut self, event: Event) -> Result<()> {
        if event.battle_id() != self.state.battle_id {
            return Err(BattleError::WrongBattle {
                expected: self.state.battle_id,
                actual: event.battle_id(),
            });
        }

        match self.dispatcher.dispatch(&event, &mut self.state) {
            Ok(()) => {
                self.events.push(event);
                Ok(())
            }
            Err(err) => {
                if err.is_fatal() {
                    error!(battle = %self.state.battle_id, kind = ?event.kind(), %err, "event dispatch failed");
                } else {
                    debug!(battle = %self.state.battle_id, kind = ?event.kind(), reason = err.reason_code(), "event rejected");
                }
                Err(err)
            }
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> &BattleState {
        &self.state
    }

    /// Applied events, in order.
    #[must_use]
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Managed battle.
    #[must_use]
    pub const fn battle_id(&self) -> BattleId {
        self.state.battle_id
    }

    /// Give up ownership of the state and log.
    #[must_use]
    pub fn into_parts(self) -> (BattleState, Vec<Event>) {
        (self.state, self.events)
    }

    /// Rebuild the state from the genesis state and the log.
    pub fn replay_state(&self) -> Result<BattleState> {
        let mut state = self.state.genesis();
        for event in &self.events {
            self.dispatcher.dispatch(event, &mut state)?;
        }
        Ok(state)
    }

    /// Check that replaying the log reproduces the live state.
    pub fn verify_replay(&self) -> Result<()> {
        let replayed = self.replay_state()?;
        let expected_hash = self.state.state_hash();
        let actual_hash = replayed.state_hash();
        if replayed != self.state {
            warn!(battle = %self.state.battle_id, expected_hash, actual_hash, "replay diverged");
            return Err(BattleError::ReplayDivergence {
                expected_hash,
                actual_hash,
            });
        }
        Ok(())
    }
}
