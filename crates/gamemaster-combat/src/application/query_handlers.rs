//! Query handlers for the Combat context.

use gamemaster_core::error::DomainError;
use gamemaster_core::state::StateStore;
use uuid::Uuid;

use crate::application::repository;
use crate::domain::encounter::Encounter;

/// Retrieves an encounter, running or completed.
///
/// # Errors
///
/// Returns `DomainError::NotFound` if the session has no such encounter.
pub async fn get_encounter(
    session_id: Uuid,
    encounter_id: Uuid,
    store: &dyn StateStore,
) -> Result<Encounter, DomainError> {
    repository::load_encounter(store, session_id, encounter_id)
        .await?
        .ok_or_else(|| DomainError::not_found("encounter", encounter_id))
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use gamemaster_core::state::StateKey;
    use gamemaster_test_support::InMemoryStateStore;

    use super::*;

    #[tokio::test]
    async fn test_returns_stored_encounter() {
        // Arrange
        let store = InMemoryStateStore::new();
        let encounter = Encounter::new(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), Utc::now());
        store.insert(
            StateKey::encounter(encounter.session_id, encounter.id),
            &encounter,
        );

        // Act
        let found = get_encounter(encounter.session_id, encounter.id, &store)
            .await
            .unwrap();

        // Assert
        assert_eq!(found, encounter);
    }

    #[tokio::test]
    async fn test_encounter_of_other_session_is_not_found() {
        let store = InMemoryStateStore::new();
        let encounter = Encounter::new(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), Utc::now());
        store.insert(
            StateKey::encounter(encounter.session_id, encounter.id),
            &encounter,
        );

        let result = get_encounter(Uuid::new_v4(), encounter.id, &store).await;

        assert!(matches!(
            result,
            Err(DomainError::NotFound {
                entity: "encounter",
                ..
            })
        ));
    }
}
