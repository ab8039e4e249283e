//! Typed access to live state rows.

use chrono::{DateTime, Utc};
use gamemaster_core::error::DomainError;
use gamemaster_core::state::{self, StateKey, StateKind, StateStore, StateTransaction};
use uuid::Uuid;

use crate::domain::live_state::LiveState;

/// Locks and reads one character's live state.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` if the row cannot be read or decoded.
pub async fn lock_live_state(
    tx: &mut dyn StateTransaction,
    session_id: Uuid,
    character_id: Uuid,
) -> Result<Option<LiveState>, DomainError> {
    tx.lock(&StateKey::live_state(session_id, character_id))
        .await?
        .map(|row| state::decode(&row))
        .transpose()
}

/// Locks and reads every live state in a session, ordered by character id.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` if the rows cannot be read or decoded.
pub async fn lock_live_states(
    tx: &mut dyn StateTransaction,
    session_id: Uuid,
) -> Result<Vec<LiveState>, DomainError> {
    tx.lock_scope(StateKind::LiveState, session_id)
        .await?
        .iter()
        .map(state::decode)
        .collect()
}

/// Persists a live state, stamping its update time.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` if the row cannot be written.
pub async fn save_live_state(
    tx: &mut dyn StateTransaction,
    live: &mut LiveState,
    now: DateTime<Utc>,
) -> Result<(), DomainError> {
    live.touch(now);
    let key = StateKey::live_state(live.session_id, live.character_id);
    tx.save(&key, state::encode(live)?, now).await?;
    Ok(())
}

/// Reads every live state in a session without locking.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` if the rows cannot be read or decoded.
pub async fn load_live_states(
    store: &dyn StateStore,
    session_id: Uuid,
) -> Result<Vec<LiveState>, DomainError> {
    store
        .load_scope(StateKind::LiveState, session_id)
        .await?
        .iter()
        .map(state::decode)
        .collect()
}
