//! Broadcast payloads for the Live State context.

use chrono::{DateTime, Utc};
use gamemaster_core::broadcast::{
    BroadcastEvent, CHARACTER_DIED, CHARACTER_STABILIZED, DEATH_SAVE_ROLLED, LIVE_STATE_CHANGED,
};
use serde::Serialize;
use uuid::Uuid;

use super::death::{DeathCause, DeathSaveResult, LifeStatus};
use super::live_state::{DeathSaves, LiveState};

/// Client-facing snapshot of a live state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveStateView {
    /// The character identifier.
    pub character_id: Uuid,
    /// Current hit points.
    pub hp_current: i32,
    /// Maximum hit points.
    pub hp_max: i32,
    /// Temporary hit points.
    pub hp_temporary: i32,
    /// Active conditions, sorted.
    pub conditions: Vec<String>,
    /// Death save tallies.
    pub death_saves: DeathSaves,
    /// Concentration spell, if any.
    pub concentration: Option<String>,
    /// Experience gained this session.
    pub xp_gained: i64,
    /// Derived life status.
    pub status: LifeStatus,
}

impl From<&LiveState> for LiveStateView {
    fn from(live: &LiveState) -> Self {
        Self {
            character_id: live.character_id,
            hp_current: live.hp_current,
            hp_max: live.hp_max,
            hp_temporary: live.hp_temporary,
            conditions: live.conditions.iter().cloned().collect(),
            death_saves: live.death_saves,
            concentration: live.concentration.clone(),
            xp_gained: live.xp_gained,
            status: live.life_status(),
        }
    }
}

/// Why live states changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeReason {
    /// A player action's mechanical outcome.
    ActionOutcome,
    /// An NPC turn's mechanical outcome.
    EnemyTurn,
    /// A death saving throw.
    DeathSave,
    /// End-of-combat experience.
    CombatReward,
    /// Enrollment in a new encounter.
    CombatStarted,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LiveStateChanged<'a> {
    session_id: Uuid,
    live_states: Vec<LiveStateView>,
    reason: ChangeReason,
    #[serde(skip_serializing_if = "Option::is_none")]
    action_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<&'a str>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DeathSaveRolled {
    session_id: Uuid,
    character_id: Uuid,
    #[serde(flatten)]
    result: DeathSaveResult,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CharacterDied {
    session_id: Uuid,
    character_id: Uuid,
    cause: DeathCause,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CharacterStabilized {
    session_id: Uuid,
    character_id: Uuid,
}

/// Builds a `live-state-changed` event. `action_id` links the change to a
/// resolved action; `source` names an acting NPC.
#[must_use]
pub fn live_state_changed(
    session_id: Uuid,
    live_states: &[LiveState],
    reason: ChangeReason,
    action_id: Option<Uuid>,
    source: Option<&str>,
    now: DateTime<Utc>,
) -> BroadcastEvent {
    BroadcastEvent::new(
        session_id,
        LIVE_STATE_CHANGED,
        &LiveStateChanged {
            session_id,
            live_states: live_states.iter().map(LiveStateView::from).collect(),
            reason,
            action_id,
            source,
        },
        now,
    )
}

/// Builds a `death-save-rolled` event.
#[must_use]
pub fn death_save_rolled(
    session_id: Uuid,
    character_id: Uuid,
    result: DeathSaveResult,
    now: DateTime<Utc>,
) -> BroadcastEvent {
    BroadcastEvent::new(
        session_id,
        DEATH_SAVE_ROLLED,
        &DeathSaveRolled {
            session_id,
            character_id,
            result,
        },
        now,
    )
}

/// Builds a `character-died` event.
#[must_use]
pub fn character_died(
    session_id: Uuid,
    character_id: Uuid,
    cause: DeathCause,
    now: DateTime<Utc>,
) -> BroadcastEvent {
    BroadcastEvent::new(
        session_id,
        CHARACTER_DIED,
        &CharacterDied {
            session_id,
            character_id,
            cause,
        },
        now,
    )
}

/// Builds a `character-stabilized` event.
#[must_use]
pub fn character_stabilized(
    session_id: Uuid,
    character_id: Uuid,
    now: DateTime<Utc>,
) -> BroadcastEvent {
    BroadcastEvent::new(
        session_id,
        CHARACTER_STABILIZED,
        &CharacterStabilized {
            session_id,
            character_id,
        },
        now,
    )
}
