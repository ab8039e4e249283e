//! Query handlers for the Session context.

use gamemaster_core::clock::Clock;
use gamemaster_core::directory::CampaignDirectory;
use gamemaster_core::error::DomainError;
use gamemaster_core::state::StateStore;
use uuid::Uuid;

use crate::application::repository;
use crate::domain::game_state::GameState;

/// Retrieves a session's game state. A session nobody has acted in yet
/// reports the state it would be created with.
///
/// # Errors
///
/// Returns `DomainError::NotFound` if the session is unknown.
pub async fn get_game_state(
    session_id: Uuid,
    clock: &dyn Clock,
    store: &dyn StateStore,
    directory: &dyn CampaignDirectory,
) -> Result<GameState, DomainError> {
    match repository::load_game_state(store, session_id).await? {
        Some(state) => Ok(state),
        None => repository::initial_game_state(directory, session_id, clock.now()).await,
    }
}

#[cfg(test)]
mod tests {
    use gamemaster_core::state::StateKey;
    use gamemaster_core::turn_taker::TurnTaker;
    use gamemaster_test_support::{FixedClock, InMemoryStateStore, StaticDirectory, Table};

    use super::*;
    use crate::domain::phase::GamePhase;

    #[tokio::test]
    async fn test_unvisited_session_reports_roster_order_without_persisting() {
        // Arrange
        let table = Table::new(&["Wren", "Anselm"]);
        let store = InMemoryStateStore::new();

        // Act
        let state = get_game_state(
            table.session_id,
            &FixedClock::epoch(),
            &store,
            &table.directory(),
        )
        .await
        .unwrap();

        // Assert
        assert_eq!(state.phase, GamePhase::Exploration);
        assert_eq!(
            state.active_turn_taker,
            Some(TurnTaker::Player {
                user_id: table.player("Anselm").user_id
            })
        );
        assert!(
            store
                .load(&StateKey::game_state(table.session_id))
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_unknown_session_is_not_found() {
        let result = get_game_state(
            Uuid::new_v4(),
            &FixedClock::epoch(),
            &InMemoryStateStore::new(),
            &StaticDirectory::new(),
        )
        .await;
        assert!(matches!(
            result,
            Err(DomainError::NotFound {
                entity: "session",
                ..
            })
        ));
    }
}
