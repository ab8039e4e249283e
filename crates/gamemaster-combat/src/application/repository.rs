//! Typed access to encounter rows.

use gamemaster_core::error::DomainError;
use gamemaster_core::state::{self, StateKey, StateStore, StateTransaction};
use uuid::Uuid;

use crate::domain::encounter::Encounter;

/// Locks and reads an encounter.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` if the row cannot be read or decoded.
pub async fn lock_encounter(
    tx: &mut dyn StateTransaction,
    session_id: Uuid,
    encounter_id: Uuid,
) -> Result<Option<Encounter>, DomainError> {
    tx.lock(&StateKey::encounter(session_id, encounter_id))
        .await?
        .map(|row| state::decode(&row))
        .transpose()
}

/// Persists an encounter.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` if the row cannot be written.
pub async fn save_encounter(
    tx: &mut dyn StateTransaction,
    encounter: &Encounter,
) -> Result<(), DomainError> {
    let updated_at = encounter.ended_at.unwrap_or(encounter.started_at);
    tx.save(
        &StateKey::encounter(encounter.session_id, encounter.id),
        state::encode(encounter)?,
        updated_at,
    )
    .await?;
    Ok(())
}

/// Reads an encounter without locking.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` if the row cannot be read or decoded.
pub async fn load_encounter(
    store: &dyn StateStore,
    session_id: Uuid,
    encounter_id: Uuid,
) -> Result<Option<Encounter>, DomainError> {
    store
        .load(&StateKey::encounter(session_id, encounter_id))
        .await?
        .map(|row| state::decode(&row))
        .transpose()
}
