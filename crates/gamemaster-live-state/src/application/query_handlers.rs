//! Query handlers for the Live State context.

use gamemaster_core::error::DomainError;
use gamemaster_core::state::StateStore;
use uuid::Uuid;

use crate::application::repository;
use crate::domain::events::LiveStateView;

/// Lists the live states of every character in a session.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` if the rows cannot be read.
pub async fn get_live_states(
    session_id: Uuid,
    store: &dyn StateStore,
) -> Result<Vec<LiveStateView>, DomainError> {
    let states = repository::load_live_states(store, session_id).await?;
    Ok(states.iter().map(LiveStateView::from).collect())
}
