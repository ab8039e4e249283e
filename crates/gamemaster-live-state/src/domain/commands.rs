//! Commands for the Live State context.

use gamemaster_core::command::Command;
use uuid::Uuid;

/// Command to roll a death saving throw for a dying character.
#[derive(Debug, Clone)]
pub struct ResolveDeathSave {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The session the character is in.
    pub session_id: Uuid,
    /// The dying character.
    pub character_id: Uuid,
    /// The user rolling: the character's player or the DM.
    pub actor_id: Uuid,
    /// A physical roll to use instead of the engine's d20.
    pub roll: Option<u32>,
}

impl Command for ResolveDeathSave {
    fn command_type(&self) -> &'static str {
        "live_state.resolve_death_save"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn actor_id(&self) -> Option<Uuid> {
        Some(self.actor_id)
    }
}
