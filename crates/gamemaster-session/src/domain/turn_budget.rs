//! Per-turn action economy.

use serde::{Deserialize, Serialize};

/// Walking speed in feet assumed for every combatant.
pub const DEFAULT_SPEED: u32 = 30;

/// What the active turn-taker has left this turn. Reset on every turn
/// advance while in combat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CombatTurnBudget {
    /// The action slot is spent.
    pub action_used: bool,
    /// The bonus action slot is spent.
    pub bonus_action_used: bool,
    /// Feet of movement left.
    pub movement_remaining: u32,
    /// The reaction slot is spent.
    pub reaction_used: bool,
}

impl CombatTurnBudget {
    /// A fresh budget for a combatant with the given speed.
    #[must_use]
    pub fn fresh(speed: u32) -> Self {
        Self {
            action_used: false,
            bonus_action_used: false,
            movement_remaining: speed,
            reaction_used: false,
        }
    }
}

impl Default for CombatTurnBudget {
    fn default() -> Self {
        Self::fresh(DEFAULT_SPEED)
    }
}
