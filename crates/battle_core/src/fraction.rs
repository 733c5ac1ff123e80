//! Fractions: the competing players of a battle.

use serde::{Deserialize, Serialize};

use crate::ids::{AuthToken, FractionId, ShipId};
use crate::ship::ShipState;

/// One competing fraction and its fleet.
///
/// Owned exclusively by the battle that created it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FractionState {
    /// Fraction identity, fixed at creation.
    pub fraction_id: FractionId,
    /// Display name of the fraction.
    pub fraction_name: String,
    /// Name of the controlling player.
    pub player_name: String,
    /// Presentation color, e.g. `#3366ff`.
    pub fraction_color: String,
    /// Capability credential for order submission.
    pub auth_token: AuthToken,
    /// Set once every ship has been destroyed.
    pub is_defeated: bool,
    /// Whether the fraction has finished issuing orders this turn.
    pub turn_finished: bool,
    /// Fleet, in creation order.
    pub ships: Vec<ShipState>,
}

impl FractionState {
    /// A new fraction with an empty fleet.
    #[must_use]
    pub fn new(
        fraction_id: FractionId,
        fraction_name: impl Into<String>,
        player_name: impl Into<String>,
        fraction_color: impl Into<String>,
        auth_token: AuthToken,
    ) -> Self {
        Self {
            fraction_id,
            fraction_name: fraction_name.into(),
            player_name: player_name.into(),
            fraction_color: fraction_color.into(),
            auth_token,
            is_defeated: false,
            turn_finished: false,
            ships: Vec::new(),
        }
    }

    /// Look up one of this fraction's ships.
    #[must_use]
    pub fn ship(&self, ship_id: ShipId) -> Option<&ShipState> {
        self.ships.iter().find(|ship| ship.ship_id == ship_id)
    }

    /// Mutable lookup of one of this fraction's ships.
    pub fn ship_mut(&mut self, ship_id: ShipId) -> Option<&mut ShipState> {
        self.ships.iter_mut().find(|ship| ship.ship_id == ship_id)
    }

    /// Ships that have not been destroyed.
    pub fn alive_ships(&self) -> impl Iterator<Item = &ShipState> {
        self.ships.iter().filter(|ship| ship.is_alive())
    }

    /// True when every ship has zero hit points.
    ///
    /// A fraction that never fielded a ship is not considered wiped out.
    #[must_use]
    pub fn all_ships_destroyed(&self) -> bool {
        !self.ships.is_empty() && self.ships.iter().all(ShipState::is_destroyed)
    }
}
