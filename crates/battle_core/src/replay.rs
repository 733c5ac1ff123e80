//! Replay files for recording and stepping through battles.
//!
//! A replay stores the genesis state and the accepted event log. Because the
//! event log fully determines the battle, stepping the log over the genesis
//! state recreates every intermediate state exactly.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::battle::BattleState;
use crate::dispatcher::EventDispatcher;
use crate::error::{BattleError, Result};
use crate::events::Event;
use crate::manager::BattleManager;

/// Replay file format version for compatibility.
pub const REPLAY_VERSION: u32 = 1;

/// Complete replay data structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BattleReplay {
    /// Replay format version.
    pub version: u32,
    /// Empty battle the log starts from.
    pub genesis: BattleState,
    /// Accepted events in apply order.
    pub events: Vec<Event>,
    /// Hash of the state after the last event.
    pub final_hash: u64,
}

impl BattleReplay {
    /// Record everything a manager has applied so far.
    #[must_use]
    pub fn from_manager(manager: &BattleManager) -> Self {
        Self {
            version: REPLAY_VERSION,
            genesis: manager.state().genesis(),
            events: manager.events().to_vec(),
            final_hash: manager.state().state_hash(),
        }
    }

    /// Save the replay to a file.
    ///
    /// # Errors
    /// Returns an error if serialization or file writing fails.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let bytes = bincode::serialize(self)
            .map_err(|e| BattleError::Serialization(format!("Failed to serialize replay: {e}")))?;
        std::fs::write(path.as_ref(), bytes)
            .map_err(|e| BattleError::Serialization(format!("Failed to write replay file: {e}")))?;
        Ok(())
    }

    /// Load a replay from a file.
    ///
    /// # Errors
    /// Returns an error if file reading, deserialization or the version check fails.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref())
            .map_err(|e| BattleError::Serialization(format!("Failed to read replay file: {e}")))?;
        let replay: Self = bincode::deserialize(&bytes)
            .map_err(|e| BattleError::Serialization(format!("Failed to deserialize replay: {e}")))?;

        if replay.version != REPLAY_VERSION {
            return Err(BattleError::Serialization(format!(
                "Replay version mismatch: expected {REPLAY_VERSION}, got {}",
                replay.version
            )));
        }

        Ok(replay)
    }

    /// Number of recorded events.
    #[must_use]
    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    /// Number of turns resolved in the recording.
    #[must_use]
    pub fn turn_count(&self) -> usize {
        self.events
            .iter()
            .filter(|event| event.kind() == crate::events::EventKind::EndOfTurn)
            .count()
    }
}

/// Steps through a replay one event at a time.
#[derive(Debug)]
pub struct ReplayPlayer {
    replay: BattleReplay,
    state: BattleState,
    position: usize,
    dispatcher: EventDispatcher,
}

impl ReplayPlayer {
    /// Start at the genesis state.
    #[must_use]
    pub fn new(replay: BattleReplay) -> Self {
        let state = replay.genesis.clone();
        Self {
            replay,
            state,
            position: 0,
            dispatcher: EventDispatcher::standard(),
        }
    }

    /// Apply the next event.
    ///
    /// Returns `Ok(true)` while more events remain.
    ///
    /// # Errors
    /// Returns the handler error if a recorded event no longer applies.
    pub fn advance(&mut self) -> Result<bool> {
        if let Some(event) = self.replay.events.get(self.position) {
            self.dispatcher.dispatch(event, &mut self.state)?;
            self.position += 1;
        }
        Ok(!self.is_finished())
    }

    /// Jump to the state after the first `position` events.
    ///
    /// # Errors
    /// Returns the handler error if a recorded event no longer applies.
    pub fn seek(&mut self, position: usize) -> Result<()> {
        let target = position.min(self.replay.events.len());
        if target < self.position {
            self.state = self.replay.genesis.clone();
            self.position = 0;
        }
        while self.position < target {
            self.advance()?;
        }
        Ok(())
    }

    /// Events applied so far.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.position
    }

    /// State after the events applied so far.
    #[must_use]
    pub const fn state(&self) -> &BattleState {
        &self.state
    }

    /// The replay being played.
    #[must_use]
    pub const fn replay(&self) -> &BattleReplay {
        &self.replay
    }

    /// Whether every event has been applied.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.position >= self.replay.events.len()
    }

    /// Play to the end and compare against the recorded final hash.
    ///
    /// # Errors
    /// Returns [`BattleError::ReplayDivergence`] on mismatch.
    pub fn verify(&mut self) -> Result<()> {
        self.seek(self.replay.events.len())?;
        let actual_hash = self.state.state_hash();
        if actual_hash != self.replay.final_hash {
            return Err(BattleError::ReplayDivergence {
                expected_hash: self.replay.final_hash,
                actual_hash,
            });
        }
        Ok(())
    }

    /// Get progress as a percentage (0-100).
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn progress_percent(&self) -> f64 {
        if self.replay.events.is_empty() {
            100.0
        } else {
            (self.position as f64 / self.replay.events.len() as f64) * 100.0
        }
    }
}
