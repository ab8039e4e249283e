//! Declared actions awaiting or past narration.

use chrono::{DateTime, Utc};
use gamemaster_combat::domain::action_economy::ActionType;
use gamemaster_core::narrator::RollRequest;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle of a declared action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    /// Waiting for the narrator.
    Pending,
    /// Narrated; the narrator asked the actor for a roll.
    AwaitingRoll,
    /// Narrated and applied.
    Resolved,
    /// The narrator failed; nothing was applied.
    Failed,
}

impl ActionStatus {
    /// Returns `true` once the narrator has answered, either way.
    #[must_use]
    pub fn is_settled(self) -> bool {
        self != Self::Pending
    }
}

/// The combat turn an action was charged against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnMarker {
    /// Round at submission.
    pub round: u32,
    /// Active index at submission.
    pub active_index: usize,
}

/// A declared action and, once settled, its result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingAction {
    /// Action identifier.
    pub action_id: Uuid,
    /// The session the action belongs to.
    pub session_id: Uuid,
    /// The declaring user.
    pub actor_id: Uuid,
    /// The actor's character; `None` for the DM.
    pub character_id: Option<Uuid>,
    /// The declared action type.
    pub declared_type: String,
    /// Free-form action details.
    pub payload: serde_json::Value,
    /// Current status.
    pub status: ActionStatus,
    /// Narration, once resolved.
    pub narration: Option<String>,
    /// Failure description, once failed.
    pub error: Option<String>,
    /// Roll the narrator requested, if any.
    pub roll_requested: Option<RollRequest>,
    /// Budget slot charged at submission, refunded on failure.
    pub budget_charge: Option<ActionType>,
    /// Turn the charge belongs to.
    pub turn_marker: Option<TurnMarker>,
    /// Submission time.
    pub created_at: DateTime<Utc>,
    /// Time of the last status change.
    pub updated_at: DateTime<Utc>,
}

impl PendingAction {
    /// Creates a pending action.
    #[must_use]
    pub fn new(
        session_id: Uuid,
        actor_id: Uuid,
        character_id: Option<Uuid>,
        declared_type: String,
        payload: serde_json::Value,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            action_id: Uuid::now_v7(),
            session_id,
            actor_id,
            character_id,
            declared_type,
            payload,
            status: ActionStatus::Pending,
            narration: None,
            error: None,
            roll_requested: None,
            budget_charge: None,
            turn_marker: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns `true` while the narrator has not answered.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.status == ActionStatus::Pending
    }

    /// Records the narration. A roll request leaves the action awaiting
    /// that roll.
    pub fn resolve(
        &mut self,
        narration: String,
        roll_requested: Option<RollRequest>,
        now: DateTime<Utc>,
    ) {
        self.status = if roll_requested.is_some() {
            ActionStatus::AwaitingRoll
        } else {
            ActionStatus::Resolved
        };
        self.narration = Some(narration);
        self.roll_requested = roll_requested;
        self.updated_at = now;
    }

    /// Records a narrator failure.
    pub fn fail(&mut self, error: String, now: DateTime<Utc>) {
        self.status = ActionStatus::Failed;
        self.error = Some(error);
        self.updated_at = now;
    }
}
