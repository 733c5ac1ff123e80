//! Fraction credential checks.

use battle_core::battle::BattleState;
use battle_core::ids::FractionId;
use tracing::warn;

use crate::error::{Result, ServerError};

/// Check that `token` is the credential minted for `fraction_id`.
///
/// Unknown fractions and mismatched tokens fail identically, so a caller
/// cannot probe which fractions exist.
pub fn authorize(state: &BattleState, fraction_id: FractionId, token: &str) -> Result<()> {
    let authorized = state
        .fraction(fraction_id)
        .is_some_and(|fraction| fraction.auth_token.matches(token));

    if authorized {
        Ok(())
    } else {
        warn!(battle_id = %state.battle_id, %fraction_id, "Rejected fraction credential");
        Err(ServerError::Unauthorized(fraction_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use battle_core::events::{AddFraction, Event};
    use battle_core::manager::BattleManager;

    fn battle_with_fraction() -> (BattleState, AddFraction) {
        let mut manager = BattleManager::new(BattleState::new("Auth", 50, 50));
        let payload = AddFraction::new("Red", "ann", "#f00");
        manager
            .apply_event(Event::add_fraction(manager.battle_id(), payload.clone()))
            .unwrap();
        (manager.state().clone(), payload)
    }

    #[test]
    fn test_matching_token_is_accepted() {
        let (state, payload) = battle_with_fraction();
        assert!(authorize(&state, payload.fraction_id, payload.auth_token.expose()).is_ok());
    }

    #[test]
    fn test_wrong_token_is_rejected() {
        let (state, payload) = battle_with_fraction();
        assert!(matches!(
            authorize(&state, payload.fraction_id, "guess"),
            Err(ServerError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_unknown_fraction_is_rejected() {
        let (state, payload) = battle_with_fraction();
        assert!(matches!(
            authorize(&state, FractionId::new(), payload.auth_token.expose()),
            Err(ServerError::Unauthorized(_))
        ));
    }
}
