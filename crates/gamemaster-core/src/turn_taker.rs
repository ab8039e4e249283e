//! Turn-taker identity.
//!
//! A turn-taker is either a player (identified by their user id) or an NPC
//! encounter participant. The variant is explicit so the phase machine can
//! tell non-player turns apart without a lookup or string parsing.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

const NPC_PREFIX: &str = "npc:";
const PLAYER_PREFIX: &str = "player:";

/// The single player or NPC entitled to act.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TurnTaker {
    /// A human player's turn.
    Player {
        /// The player's user identifier.
        user_id: Uuid,
    },
    /// An NPC encounter participant's turn.
    Npc {
        /// The encounter participant identifier.
        participant_id: Uuid,
    },
}

impl TurnTaker {
    /// Returns `true` if this is an NPC turn.
    #[must_use]
    pub fn is_npc(&self) -> bool {
        matches!(self, Self::Npc { .. })
    }

    /// Returns the user id for player turns.
    #[must_use]
    pub fn player_id(&self) -> Option<Uuid> {
        match self {
            Self::Player { user_id } => Some(*user_id),
            Self::Npc { .. } => None,
        }
    }

    /// Returns the participant id for NPC turns.
    #[must_use]
    pub fn npc_participant_id(&self) -> Option<Uuid> {
        match self {
            Self::Npc { participant_id } => Some(*participant_id),
            Self::Player { .. } => None,
        }
    }

    /// Returns `true` if this turn belongs to the given user.
    #[must_use]
    pub fn is_player(&self, user_id: Uuid) -> bool {
        self.player_id() == Some(user_id)
    }
}

impl fmt::Display for TurnTaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Player { user_id } => write!(f, "{PLAYER_PREFIX}{user_id}"),
            Self::Npc { participant_id } => write!(f, "{NPC_PREFIX}{participant_id}"),
        }
    }
}

impl FromStr for TurnTaker {
    type Err = DomainError;

    /// Parses the `player:<uuid>` / `npc:<uuid>` form produced by `Display`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse = |raw: &str| {
            Uuid::parse_str(raw)
                .map_err(|e| DomainError::Validation(format!("invalid turn-taker {s:?}: {e}")))
        };
        if let Some(rest) = s.strip_prefix(NPC_PREFIX) {
            Ok(Self::Npc {
                participant_id: parse(rest)?,
            })
        } else if let Some(rest) = s.strip_prefix(PLAYER_PREFIX) {
            Ok(Self::Player {
                user_id: parse(rest)?,
            })
        } else {
            Err(DomainError::Validation(format!(
                "invalid turn-taker {s:?}: expected player: or npc: prefix"
            )))
        }
    }
}
