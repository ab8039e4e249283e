//! Typed access to game state rows.

use chrono::{DateTime, Utc};
use gamemaster_core::directory::{self, CampaignDirectory};
use gamemaster_core::error::DomainError;
use gamemaster_core::state::{self, StateKey, StateKind, StateStore, StateTransaction};
use uuid::Uuid;

use crate::domain::game_state::GameState;
use crate::domain::turn_order;

/// Builds the state a session starts with: exploration, round 1, players
/// in roster order.
///
/// # Errors
///
/// Returns `DomainError::NotFound` if the session is unknown.
pub async fn initial_game_state(
    directory: &dyn CampaignDirectory,
    session_id: Uuid,
    now: DateTime<Utc>,
) -> Result<GameState, DomainError> {
    let campaign_id = directory::require_session_campaign(directory, session_id).await?;
    let roster = directory.active_roster(campaign_id).await?;
    Ok(GameState::new(
        session_id,
        campaign_id,
        turn_order::roster_order(&roster),
        now,
    ))
}

/// Locks and reads a session's game state.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` if the row cannot be read or decoded.
pub async fn lock_game_state(
    tx: &mut dyn StateTransaction,
    session_id: Uuid,
) -> Result<Option<GameState>, DomainError> {
    tx.lock(&StateKey::game_state(session_id))
        .await?
        .map(|row| state::decode(&row))
        .transpose()
}

/// Reads the game state of every session without locking.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` if the rows cannot be read or decoded.
pub async fn load_all_game_states(store: &dyn StateStore) -> Result<Vec<GameState>, DomainError> {
    store
        .load_kind(StateKind::GameState)
        .await?
        .iter()
        .map(state::decode)
        .collect()
}

/// Locks a session's game state, creating it on first use. The lock is
/// taken before the directory is consulted so that two first-time callers
/// serialize on the same row.
///
/// # Errors
///
/// Returns `DomainError::NotFound` if the session is unknown.
pub async fn lock_or_init_game_state(
    tx: &mut dyn StateTransaction,
    directory: &dyn CampaignDirectory,
    session_id: Uuid,
    now: DateTime<Utc>,
) -> Result<GameState, DomainError> {
    match lock_game_state(tx, session_id).await? {
        Some(state) => Ok(state),
        None => initial_game_state(directory, session_id, now).await,
    }
}

/// Persists a game state.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` if the row cannot be written.
pub async fn save_game_state(
    tx: &mut dyn StateTransaction,
    game_state: &GameState,
) -> Result<(), DomainError> {
    tx.save(
        &StateKey::game_state(game_state.session_id),
        state::encode(game_state)?,
        game_state.updated_at,
    )
    .await?;
    Ok(())
}

/// Reads a session's game state without locking.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` if the row cannot be read or decoded.
pub async fn load_game_state(
    store: &dyn StateStore,
    session_id: Uuid,
) -> Result<Option<GameState>, DomainError> {
    store
        .load(&StateKey::game_state(session_id))
        .await?
        .map(|row| state::decode(&row))
        .transpose()
}
