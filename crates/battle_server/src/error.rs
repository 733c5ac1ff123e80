//! Error types for the battle host.

use battle_core::error::BattleError;
use battle_core::events::EventKind;
use battle_core::ids::{BattleId, FractionId};
use thiserror::Error;

use crate::scenario::ScenarioError;

/// Result type alias using [`ServerError`].
pub type Result<T> = std::result::Result<T, ServerError>;

/// Errors raised by the host around the battle engine.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The engine rejected the event.
    #[error(transparent)]
    Battle(#[from] BattleError),

    /// No battle with this id is loaded or stored.
    #[error("Battle {0} not found")]
    BattleNotFound(BattleId),

    /// The presented credential does not match the fraction.
    #[error("Not authorized to act for fraction {0}")]
    Unauthorized(FractionId),

    /// The event kind is reserved for operators.
    #[error("{0:?} cannot be submitted by a fraction")]
    Forbidden(EventKind),

    /// A configured capacity limit would be exceeded.
    #[error("Limit exceeded: {0}")]
    LimitExceeded(String),

    /// Persistence failure.
    #[error("Storage error: {0}")]
    Storage(String),

    /// File system failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed RON configuration.
    #[error("Failed to parse configuration: {0}")]
    Config(#[from] ron::error::SpannedError),

    /// Configuration values that cannot work together.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Projection serialization failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Unusable scenario.
    #[error(transparent)]
    Scenario(#[from] ScenarioError),
}

impl ServerError {
    /// Reclassify an error raised while writing to the store.
    ///
    /// Serialization failures become [`ServerError::Storage`]; I/O errors
    /// are kept as they are.
    #[must_use]
    pub fn persistence(self) -> Self {
        match self {
            Self::Storage(_) | Self::Io(_) => self,
            other => Self::Storage(other.to_string()),
        }
    }

    /// Whether the store may now disagree with the battle in memory.
    #[must_use]
    pub const fn is_persistence_failure(&self) -> bool {
        matches!(self, Self::Storage(_) | Self::Io(_))
    }

    /// Stable reason code, delegating to the engine for rejected events.
    #[must_use]
    pub const fn reason_code(&self) -> &'static str {
        match self {
            Self::Battle(err) => err.reason_code(),
            Self::BattleNotFound(_) => "battle_not_found",
            Self::Unauthorized(_) => "unauthorized",
            Self::Forbidden(_) => "forbidden",
            Self::LimitExceeded(_) => "limit_exceeded",
            Self::Storage(_) => "storage",
            Self::Io(_) => "io",
            Self::Config(_) | Self::InvalidConfig(_) => "config",
            Self::Json(_) => "json",
            Self::Scenario(_) => "scenario",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_codes_delegate_to_engine() {
        let err = ServerError::from(BattleError::UnregisteredEventType(EventKind::EndOfTurn));
        assert_eq!(err.reason_code(), "unregistered_event_type");
        assert_eq!(
            ServerError::Unauthorized(FractionId::new()).reason_code(),
            "unauthorized"
        );
    }

    #[test]
    fn test_store_serialization_errors_count_as_persistence_failures() {
        let err = ServerError::from(BattleError::Serialization("bad bytes".to_string()));
        assert!(!err.is_persistence_failure());
        let err = err.persistence();
        assert!(err.is_persistence_failure());
        assert_eq!(err.reason_code(), "storage");
    }
}
