//! Game phase state machine.

use std::fmt;
use std::str::FromStr;

use gamemaster_core::error::DomainError;
use serde::{Deserialize, Serialize};

/// The authoritative phase of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GamePhase {
    /// Free exploration, roster turn order.
    Exploration,
    /// Initiative order with per-turn budgets.
    Combat,
    /// Conversation and negotiation.
    Social,
    /// Short or long rest.
    Rest,
}

impl GamePhase {
    /// The phase name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Exploration => "exploration",
            Self::Combat => "combat",
            Self::Social => "social",
            Self::Rest => "rest",
        }
    }

    /// Returns `true` if the state machine allows moving from `self` to
    /// `target`. Staying in the same phase is not a transition.
    #[must_use]
    pub fn can_transition_to(self, target: Self) -> bool {
        use GamePhase::{Combat, Exploration, Rest, Social};
        match (self, target) {
            (from, to) if from == to => false,
            (_, Rest) => true,
            (Exploration, Combat | Social)
            | (Combat, Social | Exploration)
            | (Social | Rest, Exploration) => true,
            _ => false,
        }
    }

    /// Fails unless the transition is allowed.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidTransition` for disallowed transitions.
    pub fn ensure_transition(self, target: Self) -> Result<(), DomainError> {
        if self.can_transition_to(target) {
            Ok(())
        } else {
            Err(DomainError::InvalidTransition {
                from: self.as_str().to_owned(),
                to: target.as_str().to_owned(),
            })
        }
    }
}

impl fmt::Display for GamePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GamePhase {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "exploration" => Ok(Self::Exploration),
            "combat" => Ok(Self::Combat),
            "social" => Ok(Self::Social),
            "rest" => Ok(Self::Rest),
            other => Err(DomainError::Validation(format!("unknown phase: {other}"))),
        }
    }
}
