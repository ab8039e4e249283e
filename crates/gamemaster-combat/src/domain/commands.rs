//! Commands for the Combat context.

use gamemaster_core::command::Command;
use uuid::Uuid;

use super::encounter::EndCondition;

/// Command to start (or restart) combat in a session.
#[derive(Debug, Clone)]
pub struct InitiateCombat {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The campaign the session belongs to.
    pub campaign_id: Uuid,
    /// The session entering combat.
    pub session_id: Uuid,
    /// The requesting user; must be the DM.
    pub actor_id: Uuid,
    /// NPC stat blocks to enroll as enemies. Repeats enroll several copies.
    pub enemy_ids: Vec<Uuid>,
    /// An encounter to reactivate instead of creating a new one.
    pub existing_encounter_id: Option<Uuid>,
}

impl Command for InitiateCombat {
    fn command_type(&self) -> &'static str {
        "combat.initiate_combat"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn actor_id(&self) -> Option<Uuid> {
        Some(self.actor_id)
    }
}

/// Command to resolve a running encounter.
#[derive(Debug, Clone)]
pub struct ResolveCombatEnd {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The campaign the session belongs to.
    pub campaign_id: Uuid,
    /// The session the encounter runs in.
    pub session_id: Uuid,
    /// The requesting user; must be the DM.
    pub actor_id: Uuid,
    /// The encounter to resolve.
    pub encounter_id: Uuid,
    /// How combat ended.
    pub end_condition: EndCondition,
}

impl Command for ResolveCombatEnd {
    fn command_type(&self) -> &'static str {
        "combat.resolve_combat_end"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn actor_id(&self) -> Option<Uuid> {
        Some(self.actor_id)
    }
}
