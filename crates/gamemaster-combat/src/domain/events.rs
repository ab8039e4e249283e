//! Broadcast payloads for the Combat context.

use chrono::{DateTime, Utc};
use gamemaster_core::broadcast::{BroadcastEvent, COMBAT_ENDED};
use serde::Serialize;
use uuid::Uuid;

use super::encounter::EndCondition;

/// Result of resolving an encounter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CombatEndResult {
    /// The resolved encounter.
    pub encounter_id: Uuid,
    /// Total experience handed out.
    pub reward_awarded: i64,
    /// Experience each survivor received.
    pub xp_per_survivor: i64,
    /// Characters that received experience.
    pub recipients: Vec<Uuid>,
    /// How combat ended.
    pub end_condition: EndCondition,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CombatEnded<'a> {
    session_id: Uuid,
    #[serde(flatten)]
    result: &'a CombatEndResult,
}

/// Builds a `combat-ended` event.
#[must_use]
pub fn combat_ended(
    session_id: Uuid,
    result: &CombatEndResult,
    now: DateTime<Utc>,
) -> BroadcastEvent {
    BroadcastEvent::new(
        session_id,
        COMBAT_ENDED,
        &CombatEnded { session_id, result },
        now,
    )
}
