//! Battle notifications for subscribers.
//!
//! Notifications are fire-and-forget: a subscriber that falls behind by more
//! than the channel capacity sees `RecvError::Lagged` and skips ahead.

use battle_core::ids::{BattleId, FractionId};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

/// Something subscribers of a battle may want to react to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BattleNotification {
    /// A turn was resolved.
    TurnResolved {
        /// Battle that advanced.
        battle_id: BattleId,
        /// The turn that was resolved.
        turn: u32,
        /// Log entries written during resolution.
        entries: usize,
        /// Ships destroyed during resolution.
        destroyed: usize,
    },
    /// A fraction finished its turn; these are still outstanding.
    WaitingOn {
        /// Battle in question.
        battle_id: BattleId,
        /// Current turn.
        turn: u32,
        /// Undefeated fractions that have not finished.
        fractions: Vec<FractionId>,
    },
    /// The battle reached a final state.
    BattleFinished {
        /// Battle that ended.
        battle_id: BattleId,
        /// Surviving fraction, if any.
        winner: Option<FractionId>,
    },
}

impl BattleNotification {
    /// The battle this notification concerns.
    pub const fn battle_id(&self) -> BattleId {
        match self {
            Self::TurnResolved { battle_id, .. }
            | Self::WaitingOn { battle_id, .. }
            | Self::BattleFinished { battle_id, .. } => *battle_id,
        }
    }
}

/// Broadcast hub shared by every battle on the host.
#[derive(Debug, Clone)]
pub struct Notifier {
    sender: broadcast::Sender<BattleNotification>,
}

impl Notifier {
    /// A notifier buffering up to `capacity` notifications per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// A new receiver seeing every notification published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<BattleNotification> {
        self.sender.subscribe()
    }

    /// Publish to all current subscribers, returning how many received it.
    pub fn publish(&self, notification: BattleNotification) -> usize {
        match self.sender.send(notification) {
            Ok(receivers) => receivers,
            Err(broadcast::error::SendError(notification)) => {
                debug!(battle_id = %notification.battle_id(), "No subscribers for notification");
                0
            }
        }
    }
}
