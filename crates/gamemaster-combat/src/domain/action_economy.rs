//! Turn budget charging.
//!
//! `move` and `free_action` never spend the action slot; `dash` spends it
//! and doubles the movement left. Declared types the engine does not know
//! are charged as actions.

use gamemaster_core::error::DomainError;
use gamemaster_session::domain::turn_budget::CombatTurnBudget;
use serde::{Deserialize, Serialize};

/// How a declared action is charged against the turn budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "slot", rename_all = "snake_case")]
pub enum ActionType {
    /// Spends the action slot.
    Action,
    /// Spends the bonus action slot.
    BonusAction,
    /// Spends the reaction slot.
    Reaction,
    /// Spends movement.
    Move {
        /// Feet moved.
        feet: u32,
    },
    /// Spends nothing.
    FreeAction,
    /// Spends the action slot and doubles remaining movement.
    Dash,
}

impl ActionType {
    /// Classifies a declared action type. `move` reads its distance from
    /// the payload's `feet` field.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` for a `move` without a positive
    /// `feet` value.
    pub fn classify(declared_type: &str, payload: &serde_json::Value) -> Result<Self, DomainError> {
        let normalized = declared_type.trim().to_ascii_lowercase().replace('-', "_");
        Ok(match normalized.as_str() {
            "bonus_action" => Self::BonusAction,
            "reaction" | "opportunity_attack" => Self::Reaction,
            "free_action" | "speak" | "interact" => Self::FreeAction,
            "dash" => Self::Dash,
            "move" | "movement" => {
                let feet = payload
                    .get("feet")
                    .and_then(serde_json::Value::as_u64)
                    .and_then(|f| u32::try_from(f).ok())
                    .filter(|f| *f > 0)
                    .ok_or_else(|| {
                        DomainError::Validation("move requires a positive feet value".into())
                    })?;
                Self::Move { feet }
            }
            _ => Self::Action,
        })
    }
}

/// Charges `action` against `budget`.
///
/// # Errors
///
/// Returns `DomainError::ActionAlreadyUsed` if the relevant slot is spent
/// or no movement is left, and `DomainError::Validation` for a move longer
/// than the movement left.
pub fn consume_action(
    budget: CombatTurnBudget,
    action: ActionType,
) -> Result<CombatTurnBudget, DomainError> {
    let mut next = budget;
    match action {
        ActionType::Action => {
            if budget.action_used {
                return Err(DomainError::ActionAlreadyUsed("action".into()));
            }
            next.action_used = true;
        }
        ActionType::BonusAction => {
            if budget.bonus_action_used {
                return Err(DomainError::ActionAlreadyUsed("bonus action".into()));
            }
            next.bonus_action_used = true;
        }
        ActionType::Reaction => {
            if budget.reaction_used {
                return Err(DomainError::ActionAlreadyUsed("reaction".into()));
            }
            next.reaction_used = true;
        }
        ActionType::Move { feet } => {
            if budget.movement_remaining == 0 {
                return Err(DomainError::ActionAlreadyUsed("movement".into()));
            }
            if feet > budget.movement_remaining {
                return Err(DomainError::Validation(format!(
                    "cannot move {feet} ft with {} ft remaining",
                    budget.movement_remaining
                )));
            }
            next.movement_remaining -= feet;
        }
        ActionType::FreeAction => {}
        ActionType::Dash => {
            if budget.action_used {
                return Err(DomainError::ActionAlreadyUsed("action".into()));
            }
            next.action_used = true;
            next.movement_remaining = budget.movement_remaining.saturating_mul(2);
        }
    }
    Ok(next)
}

/// Gives back what [`consume_action`] charged. Only valid while nothing
/// else has touched the budget since the charge.
#[must_use]
pub fn refund_action(budget: CombatTurnBudget, action: ActionType) -> CombatTurnBudget {
    let mut next = budget;
    match action {
        ActionType::Action => next.action_used = false,
        ActionType::BonusAction => next.bonus_action_used = false,
        ActionType::Reaction => next.reaction_used = false,
        ActionType::Move { feet } => {
            next.movement_remaining = budget.movement_remaining.saturating_add(feet);
        }
        ActionType::FreeAction => {}
        ActionType::Dash => {
            next.action_used = false;
            next.movement_remaining = budget.movement_remaining / 2;
        }
    }
    next
}
