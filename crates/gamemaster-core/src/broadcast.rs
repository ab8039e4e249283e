//! Broadcast gateway contract.
//!
//! State-change notifications are at-least-once and best-effort. The
//! engine's stored state is always the source of truth; a failed publish
//! never rolls back a committed mutation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::error::DomainError;

/// Event type for a turn advance.
pub const TURN_ADVANCED: &str = "turn-advanced";
/// Event type for a turn reorder.
pub const TURN_ORDER_CHANGED: &str = "turn-order-changed";
/// Event type for a phase change.
pub const GAME_PHASE_CHANGED: &str = "game-phase-changed";
/// Event type for narration of a resolved action.
pub const DM_NARRATION: &str = "dm-narration";
/// Event type for a settled action.
pub const ACTION_COMPLETED: &str = "action-completed";
/// Event type for a narrator failure on a player action.
pub const ACTION_FAILED: &str = "action-failed";
/// Event type for live state changes.
pub const LIVE_STATE_CHANGED: &str = "live-state-changed";
/// Event type for the start of an NPC turn.
pub const ENEMY_TURN_STARTED: &str = "enemy-turn-started";
/// Event type for the end of an NPC turn.
pub const ENEMY_TURN_COMPLETED: &str = "enemy-turn-completed";
/// Event type for a death saving throw.
pub const DEATH_SAVE_ROLLED: &str = "death-save-rolled";
/// Event type for a character death.
pub const CHARACTER_DIED: &str = "character-died";
/// Event type for a character stabilizing at 0 HP.
pub const CHARACTER_STABILIZED: &str = "character-stabilized";
/// Event type for the end of a combat encounter.
pub const COMBAT_ENDED: &str = "combat-ended";

/// A single notification for a session's connected clients.
#[derive(Debug, Clone, Serialize)]
pub struct BroadcastEvent {
    /// The session whose clients receive the event.
    pub session_id: Uuid,
    /// One of the event type constants in this module.
    pub event_type: &'static str,
    /// Event body.
    pub payload: serde_json::Value,
    /// When the engine produced the event.
    pub occurred_at: DateTime<Utc>,
}

impl BroadcastEvent {
    /// Builds an event from any serializable payload. Serialization of
    /// payloads built from derived `Serialize` types does not fail; if it
    /// ever does, the payload degrades to `null`.
    pub fn new(
        session_id: Uuid,
        event_type: &'static str,
        payload: &impl Serialize,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            session_id,
            event_type,
            payload: serde_json::to_value(payload).unwrap_or(serde_json::Value::Null),
            occurred_at,
        }
    }
}

/// Delivery side of the broadcast gateway.
#[async_trait]
pub trait BroadcastPublisher: Send + Sync {
    /// Delivers one event.
    async fn publish(&self, event: BroadcastEvent) -> Result<(), DomainError>;
}

/// Publishes each event in order, logging and swallowing failures.
pub async fn publish_all(publisher: &dyn BroadcastPublisher, events: Vec<BroadcastEvent>) {
    for event in events {
        let session_id = event.session_id;
        let event_type = event.event_type;
        if let Err(e) = publisher.publish(event).await {
            tracing::warn!(%session_id, event_type, error = %e, "broadcast publish failed");
        }
    }
}
