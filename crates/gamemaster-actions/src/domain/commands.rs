//! Commands for the Actions context.

use gamemaster_core::command::Command;
use uuid::Uuid;

/// Command to declare an action for narration.
#[derive(Debug, Clone)]
pub struct SubmitAction {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The session the action belongs to.
    pub session_id: Uuid,
    /// The declaring user: a roster player or the DM.
    pub actor_id: Uuid,
    /// The declared action type, e.g. `attack` or `dash`.
    pub declared_type: String,
    /// Free-form action details passed to the narrator.
    pub payload: serde_json::Value,
}

impl Command for SubmitAction {
    fn command_type(&self) -> &'static str {
        "actions.submit_action"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn actor_id(&self) -> Option<Uuid> {
        Some(self.actor_id)
    }
}

/// Command to narrate and apply a pending action. Issued by the engine.
#[derive(Debug, Clone)]
pub struct ResolveAction {
    /// The correlation ID of the submission.
    pub correlation_id: Uuid,
    /// The session the action belongs to.
    pub session_id: Uuid,
    /// The action to resolve.
    pub action_id: Uuid,
}

impl Command for ResolveAction {
    fn command_type(&self) -> &'static str {
        "actions.resolve_action"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to run one NPC turn. Issued by the engine, never by a client.
#[derive(Debug, Clone)]
pub struct ExecuteEnemyTurn {
    /// The correlation ID of the chain.
    pub correlation_id: Uuid,
    /// The session in combat.
    pub session_id: Uuid,
    /// The running encounter.
    pub encounter_id: Uuid,
    /// The NPC participant whose turn it is.
    pub participant_id: Uuid,
}

impl Command for ExecuteEnemyTurn {
    fn command_type(&self) -> &'static str {
        "actions.execute_enemy_turn"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}
