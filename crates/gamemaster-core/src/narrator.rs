//! Narrator contract.
//!
//! The narrator is an external generation service. It receives the session,
//! actor, and action context and returns prose narration plus an optional
//! structured mechanical outcome, or a typed failure. Its wire format uses
//! camelCase field names.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::error::DomainError;

/// Which prompt family a request belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NarrationKind {
    /// A player-declared action.
    PlayerAction,
    /// An autonomous NPC turn during combat.
    EnemyTurn,
}

/// Everything the narrator needs to resolve one action.
#[derive(Debug, Clone, Serialize)]
pub struct NarrationRequest {
    /// Prompt family.
    pub kind: NarrationKind,
    /// The session the action belongs to.
    pub session_id: Uuid,
    /// Display name of whoever is acting.
    pub actor_name: String,
    /// The declared action type (e.g. `attack`, `persuade`).
    pub declared_type: String,
    /// Free-form action payload as submitted.
    pub payload: serde_json::Value,
    /// Session context: phase, round, combatants, live states.
    pub context: serde_json::Value,
}

/// Reference to an HP/condition target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TargetRef {
    /// A player character.
    Character {
        /// Character identifier.
        id: Uuid,
    },
    /// An NPC encounter participant.
    Npc {
        /// Encounter participant identifier.
        id: Uuid,
    },
}

/// A single hit-point change. Negative amounts are damage, positive are
/// healing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HpDelta {
    /// Who is affected.
    pub target: TargetRef,
    /// Signed change in hit points.
    pub amount: i32,
    /// Whether the damage came from a critical hit.
    #[serde(default)]
    pub critical: bool,
}

/// A condition added to or removed from a target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionChange {
    /// Who is affected.
    pub target: TargetRef,
    /// Condition name, e.g. `prone`.
    pub condition: String,
}

/// A roll the narrator wants from the actor before continuing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollRequest {
    /// What to roll, e.g. `dexterity_save`.
    pub roll_type: String,
    /// Difficulty class, if any.
    #[serde(default)]
    pub dc: Option<i32>,
    /// Optional reason shown to the player.
    #[serde(default)]
    pub reason: Option<String>,
}

/// Structured, non-prose effect of a resolved action.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MechanicalOutcome {
    /// Hit-point changes, applied in order.
    #[serde(default)]
    pub hp_deltas: Vec<HpDelta>,
    /// Conditions to add.
    #[serde(default)]
    pub conditions_added: Vec<ConditionChange>,
    /// Conditions to remove.
    #[serde(default)]
    pub conditions_removed: Vec<ConditionChange>,
    /// Experience awarded to the acting character.
    #[serde(default)]
    pub xp_delta: i64,
    /// A roll the actor must make next.
    #[serde(default)]
    pub roll_requested: Option<RollRequest>,
}

impl MechanicalOutcome {
    /// Returns `true` if applying this outcome changes no state.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hp_deltas.is_empty()
            && self.conditions_added.is_empty()
            && self.conditions_removed.is_empty()
            && self.xp_delta == 0
    }
}

/// Successful narrator response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NarratorResult {
    /// Prose narration.
    pub narration: String,
    /// Mechanical effect; absent for pure flavor text.
    #[serde(default)]
    pub mechanical_outcome: Option<MechanicalOutcome>,
}

/// Typed narrator failure. Neither variant is retried by the engine.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NarratorError {
    /// The provider answered with an error or an unusable result.
    #[error("provider error: {0}")]
    Provider(String),
    /// The provider could not be reached or timed out.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl From<NarratorError> for DomainError {
    fn from(err: NarratorError) -> Self {
        match err {
            NarratorError::Provider(msg) => DomainError::Provider(msg),
            NarratorError::ServiceUnavailable(msg) => DomainError::ServiceUnavailable(msg),
        }
    }
}

/// The external narration service.
#[async_trait]
pub trait Narrator: Send + Sync {
    /// Narrates one action. Implementations enforce their own timeout and
    /// report it as `ServiceUnavailable`.
    async fn narrate(&self, request: NarrationRequest) -> Result<NarratorResult, NarratorError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_without_outcome_parses_as_pure_narration() {
        let json = serde_json::json!({ "narration": "The tavern falls silent." });
        let result: NarratorResult = serde_json::from_value(json).unwrap();
        assert_eq!(result.narration, "The tavern falls silent.");
        assert!(result.mechanical_outcome.is_none());
    }

    #[test]
    fn test_outcome_parses_camel_case_fields() {
        let target = Uuid::new_v4();
        let json = serde_json::json!({
            "narration": "The goblin's blade bites deep.",
            "mechanicalOutcome": {
                "hpDeltas": [{ "target": { "type": "character", "id": target }, "amount": -7, "critical": true }],
                "conditionsAdded": [{ "target": { "type": "character", "id": target }, "condition": "prone" }],
                "xpDelta": 0
            }
        });
        let result: NarratorResult = serde_json::from_value(json).unwrap();
        let outcome = result.mechanical_outcome.unwrap();
        assert_eq!(outcome.hp_deltas[0].amount, -7);
        assert!(outcome.hp_deltas[0].critical);
        assert_eq!(outcome.hp_deltas[0].target, TargetRef::Character { id: target });
        assert_eq!(outcome.conditions_added[0].condition, "prone");
        assert!(outcome.conditions_removed.is_empty());
        assert!(outcome.roll_requested.is_none());
    }

    #[test]
    fn test_roll_request_alone_is_empty_outcome() {
        let outcome = MechanicalOutcome {
            roll_requested: Some(RollRequest {
                roll_type: "dexterity_save".to_owned(),
                dc: Some(13),
                reason: None,
            }),
            ..MechanicalOutcome::default()
        };
        assert!(outcome.is_empty());
    }

    #[test]
    fn test_narrator_error_maps_to_domain_error() {
        let err: DomainError = NarratorError::ServiceUnavailable("timeout".into()).into();
        assert!(matches!(err, DomainError::ServiceUnavailable(msg) if msg == "timeout"));
        let err: DomainError = NarratorError::Provider("bad json".into()).into();
        assert!(matches!(err, DomainError::Provider(_)));
    }
}
