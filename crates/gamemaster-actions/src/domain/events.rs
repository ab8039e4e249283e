//! Broadcast payloads for the Actions context.

use chrono::{DateTime, Utc};
use gamemaster_core::broadcast::{
    ACTION_COMPLETED, ACTION_FAILED, BroadcastEvent, DM_NARRATION, ENEMY_TURN_COMPLETED,
    ENEMY_TURN_STARTED,
};
use gamemaster_core::narrator::RollRequest;
use serde::Serialize;
use uuid::Uuid;

use super::pending_action::{ActionStatus, PendingAction};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DmNarration<'a> {
    session_id: Uuid,
    action_id: Uuid,
    actor_id: Uuid,
    character_id: Option<Uuid>,
    narration: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    roll_requested: Option<&'a RollRequest>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ActionSettled<'a> {
    session_id: Uuid,
    action_id: Uuid,
    status: ActionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EnemyTurn<'a> {
    session_id: Uuid,
    encounter_id: Uuid,
    participant_id: Uuid,
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    narration: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    skipped: Option<bool>,
}

/// Builds a `dm-narration` event for a resolved action.
#[must_use]
pub fn dm_narration(action: &PendingAction, now: DateTime<Utc>) -> BroadcastEvent {
    BroadcastEvent::new(
        action.session_id,
        DM_NARRATION,
        &DmNarration {
            session_id: action.session_id,
            action_id: action.action_id,
            actor_id: action.actor_id,
            character_id: action.character_id,
            narration: action.narration.as_deref().unwrap_or_default(),
            roll_requested: action.roll_requested.as_ref(),
        },
        now,
    )
}

/// Builds an `action-completed` event.
#[must_use]
pub fn action_completed(action: &PendingAction, now: DateTime<Utc>) -> BroadcastEvent {
    BroadcastEvent::new(
        action.session_id,
        ACTION_COMPLETED,
        &ActionSettled {
            session_id: action.session_id,
            action_id: action.action_id,
            status: action.status,
            error: None,
        },
        now,
    )
}

/// Builds an `action-failed` event.
#[must_use]
pub fn action_failed(action: &PendingAction, now: DateTime<Utc>) -> BroadcastEvent {
    BroadcastEvent::new(
        action.session_id,
        ACTION_FAILED,
        &ActionSettled {
            session_id: action.session_id,
            action_id: action.action_id,
            status: action.status,
            error: action.error.as_deref(),
        },
        now,
    )
}

/// Builds an `enemy-turn-started` event.
#[must_use]
pub fn enemy_turn_started(
    session_id: Uuid,
    encounter_id: Uuid,
    participant_id: Uuid,
    name: &str,
    now: DateTime<Utc>,
) -> BroadcastEvent {
    BroadcastEvent::new(
        session_id,
        ENEMY_TURN_STARTED,
        &EnemyTurn {
            session_id,
            encounter_id,
            participant_id,
            name,
            narration: None,
            skipped: None,
        },
        now,
    )
}

/// Builds an `enemy-turn-completed` event. `narration` is `None` when a
/// defeated NPC skipped its turn.
#[must_use]
pub fn enemy_turn_completed(
    session_id: Uuid,
    encounter_id: Uuid,
    participant_id: Uuid,
    name: &str,
    narration: Option<&str>,
    now: DateTime<Utc>,
) -> BroadcastEvent {
    BroadcastEvent::new(
        session_id,
        ENEMY_TURN_COMPLETED,
        &EnemyTurn {
            session_id,
            encounter_id,
            participant_id,
            name,
            narration,
            skipped: Some(narration.is_none()),
        },
        now,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dm_narration_includes_roll_request() {
        // Arrange
        let mut action = PendingAction::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Some(Uuid::new_v4()),
            "attack".into(),
            serde_json::Value::Null,
            Utc::now(),
        );
        action.resolve(
            "Roll to hit.".into(),
            Some(RollRequest {
                roll_type: "attack_roll".into(),
                dc: None,
                reason: None,
            }),
            Utc::now(),
        );

        // Act
        let event = dm_narration(&action, Utc::now());

        // Assert
        assert_eq!(event.event_type, DM_NARRATION);
        assert_eq!(event.payload["narration"], "Roll to hit.");
        assert_eq!(event.payload["rollRequested"]["rollType"], "attack_roll");
        assert_eq!(
            event.payload["characterId"],
            action.character_id.unwrap().to_string()
        );
    }

    #[test]
    fn test_action_failed_carries_error() {
        let mut action = PendingAction::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            None,
            "persuade".into(),
            serde_json::Value::Null,
            Utc::now(),
        );
        action.fail("service unavailable: down".into(), Utc::now());

        let event = action_failed(&action, Utc::now());

        assert_eq!(event.payload["status"], "failed");
        assert_eq!(event.payload["error"], "service unavailable: down");
    }

    #[test]
    fn test_skipped_enemy_turn_has_no_narration() {
        let event = enemy_turn_completed(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            "Goblin",
            None,
            Utc::now(),
        );
        assert_eq!(event.payload["skipped"], true);
        assert!(event.payload.get("narration").is_none());
    }
}
