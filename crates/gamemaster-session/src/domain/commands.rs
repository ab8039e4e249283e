//! Commands for the Session context.

use gamemaster_core::command::Command;
use gamemaster_core::turn_taker::TurnTaker;
use uuid::Uuid;

use super::phase::GamePhase;

/// Command to move a session to another phase.
#[derive(Debug, Clone)]
pub struct ChangePhase {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The session to change.
    pub session_id: Uuid,
    /// The requesting user; must be the DM.
    pub actor_id: Uuid,
    /// The phase to enter.
    pub target_phase: GamePhase,
}

impl Command for ChangePhase {
    fn command_type(&self) -> &'static str {
        "session.change_phase"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn actor_id(&self) -> Option<Uuid> {
        Some(self.actor_id)
    }
}

/// Command to end the active turn.
#[derive(Debug, Clone)]
pub struct EndTurn {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The session whose turn ends.
    pub session_id: Uuid,
    /// The requesting user; the active player or the DM.
    pub actor_id: Uuid,
    /// The turn-taker the client believes is active. A mismatch means the
    /// client is stale and the request is rejected.
    pub expected_turn_taker: Option<TurnTaker>,
}

impl Command for EndTurn {
    fn command_type(&self) -> &'static str {
        "session.end_turn"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn actor_id(&self) -> Option<Uuid> {
        Some(self.actor_id)
    }
}

/// Command to rearrange the turn order.
#[derive(Debug, Clone)]
pub struct ReorderTurns {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The session to reorder.
    pub session_id: Uuid,
    /// The requesting user; must be the DM.
    pub actor_id: Uuid,
    /// The new order, a permutation of the current one.
    pub new_order: Vec<TurnTaker>,
}

impl Command for ReorderTurns {
    fn command_type(&self) -> &'static str {
        "session.reorder_turns"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn actor_id(&self) -> Option<Uuid> {
        Some(self.actor_id)
    }
}
