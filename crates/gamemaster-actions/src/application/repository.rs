//! Typed access to pending action rows.

use gamemaster_core::error::DomainError;
use gamemaster_core::state::{self, StateKey, StateStore, StateTransaction};
use uuid::Uuid;

use crate::domain::pending_action::PendingAction;

/// Locks and reads one action.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` if the row cannot be read or decoded.
pub async fn lock_pending_action(
    tx: &mut dyn StateTransaction,
    session_id: Uuid,
    action_id: Uuid,
) -> Result<Option<PendingAction>, DomainError> {
    tx.lock(&StateKey::pending_action(session_id, action_id))
        .await?
        .map(|row| state::decode(&row))
        .transpose()
}

/// Persists an action.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` if the row cannot be written.
pub async fn save_pending_action(
    tx: &mut dyn StateTransaction,
    action: &PendingAction,
) -> Result<(), DomainError> {
    tx.save(
        &StateKey::pending_action(action.session_id, action.action_id),
        state::encode(action)?,
        action.updated_at,
    )
    .await?;
    Ok(())
}

/// Reads one action without locking.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` if the row cannot be read or decoded.
pub async fn load_pending_action(
    store: &dyn StateStore,
    session_id: Uuid,
    action_id: Uuid,
) -> Result<Option<PendingAction>, DomainError> {
    store
        .load(&StateKey::pending_action(session_id, action_id))
        .await?
        .map(|row| state::decode(&row))
        .transpose()
}
