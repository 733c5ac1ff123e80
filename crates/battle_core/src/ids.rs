//! Identifiers for battles, fractions, ships and events.
//!
//! Every identifier is minted exactly once, when the battle or the event that
//! introduces the entity is constructed. Handlers never generate ids, so
//! replaying an event log reproduces the same identities.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Mint a fresh random identifier.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wrap an existing uuid.
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// The identifier as a 128-bit integer.
            #[must_use]
            pub const fn as_u128(&self) -> u128 {
                self.0.as_u128()
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

uuid_id!(
    /// Stable identity of a battle.
    BattleId
);
uuid_id!(
    /// Identity of a fraction within its battle.
    FractionId
);
uuid_id!(
    /// Identity of a ship within its fraction.
    ShipId
);
uuid_id!(
    /// Unique identity of a submitted event.
    EventId
);

/// Opaque per-fraction capability credential.
///
/// Minted once when the fraction is created and never reissued. It must not
/// leak into player-facing projections, so `Debug` redacts it.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AuthToken(String);

impl AuthToken {
    /// Mint a new token carrying 244 bits of randomness.
    #[must_use]
    pub fn generate() -> Self {
        Self(format!(
            "{}{}",
            Uuid::new_v4().simple(),
            Uuid::new_v4().simple()
        ))
    }

    /// The raw token string. Only authorization and admin views read this.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Compare against a presented credential without early exit.
    #[must_use]
    pub fn matches(&self, presented: &str) -> bool {
        let ours = self.0.as_bytes();
        let theirs = presented.as_bytes();
        if ours.len() != theirs.len() {
            return false;
        }
        ours.iter()
            .zip(theirs)
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }
}

impl From<String> for AuthToken {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthToken(<redacted>)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique() {
        assert_ne!(ShipId::new(), ShipId::new());
        assert_ne!(FractionId::new(), FractionId::new());
    }

    #[test]
    fn test_token_matches() {
        let token = AuthToken::generate();
        let copy = token.expose().to_string();
        assert!(token.matches(&copy));
        assert!(!token.matches("nope"));
        assert_eq!(token.expose().len(), 64);
    }

    #[test]
    fn test_token_debug_is_redacted() {
        let token = AuthToken::generate();
        let rendered = format!("{token:?}");
        assert!(!rendered.contains(token.expose()));
    }
}
