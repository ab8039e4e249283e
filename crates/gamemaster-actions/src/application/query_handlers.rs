//! Query handlers for the Actions context.

use gamemaster_core::error::DomainError;
use gamemaster_core::state::StateStore;
use gamemaster_session::application::repository as session_repository;
use uuid::Uuid;

use crate::application::repository;
use crate::domain::pending_action::PendingAction;

/// Retrieves a declared action and its current status.
///
/// # Errors
///
/// Returns `DomainError::NotFound` if the session has no such action.
pub async fn get_action(
    session_id: Uuid,
    action_id: Uuid,
    store: &dyn StateStore,
) -> Result<PendingAction, DomainError> {
    repository::load_pending_action(store, session_id, action_id)
        .await?
        .ok_or_else(|| DomainError::not_found("action", action_id))
}

/// Every action still waiting for the narrator, across all sessions.
///
/// Follows the in-flight markers on each session's game state, so only one
/// action row per actor is read.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` if the rows cannot be read.
pub async fn list_unsettled_actions(
    store: &dyn StateStore,
) -> Result<Vec<PendingAction>, DomainError> {
    let mut unsettled = Vec::new();
    for state in session_repository::load_all_game_states(store).await? {
        for action_id in state.actions_in_flight.values() {
            if let Some(action) =
                repository::load_pending_action(store, state.session_id, *action_id).await?
                && action.is_pending()
            {
                unsettled.push(action);
            }
        }
    }
    Ok(unsettled)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use gamemaster_core::state::StateKey;
    use gamemaster_session::domain::game_state::GameState;
    use gamemaster_test_support::InMemoryStateStore;

    use super::*;

    #[tokio::test]
    async fn test_returns_stored_action() {
        let store = InMemoryStateStore::new();
        let action = PendingAction::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            None,
            "look".into(),
            serde_json::Value::Null,
            Utc::now(),
        );
        store.insert(
            StateKey::pending_action(action.session_id, action.action_id),
            &action,
        );

        let found = get_action(action.session_id, action.action_id, &store)
            .await
            .unwrap();

        assert_eq!(found, action);
    }

    #[tokio::test]
    async fn test_unknown_action_is_not_found() {
        let result = get_action(Uuid::new_v4(), Uuid::new_v4(), &InMemoryStateStore::new()).await;
        assert!(matches!(
            result,
            Err(DomainError::NotFound {
                entity: "action",
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_unsettled_actions_follow_in_flight_markers() {
        // Arrange
        let store = InMemoryStateStore::new();
        let session_id = Uuid::new_v4();
        let mut state = GameState::new(session_id, Uuid::new_v4(), Vec::new(), Utc::now());
        let pending = PendingAction::new(
            session_id,
            Uuid::new_v4(),
            None,
            "look".into(),
            serde_json::Value::Null,
            Utc::now(),
        );
        let mut settled = PendingAction::new(
            session_id,
            Uuid::new_v4(),
            None,
            "listen".into(),
            serde_json::Value::Null,
            Utc::now(),
        );
        settled.fail("timed out".into(), Utc::now());
        for action in [&pending, &settled] {
            state.claim_action(action.actor_id, action.action_id);
            store.insert(
                StateKey::pending_action(session_id, action.action_id),
                action,
            );
        }
        store.insert(StateKey::game_state(session_id), &state);

        // Act
        let unsettled = list_unsettled_actions(&store).await.unwrap();

        // Assert
        assert_eq!(unsettled, vec![pending]);
    }
}
