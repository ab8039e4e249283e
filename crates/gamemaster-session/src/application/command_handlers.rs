//! Command handlers for the Session context.
//!
//! Each handler checks authority, then locks the session's game state row,
//! applies the domain transition, commits, and publishes. Guard violations
//! are raised before anything is written.

use gamemaster_core::broadcast::{self, BroadcastPublisher};
use gamemaster_core::clock::Clock;
use gamemaster_core::command::Command;
use gamemaster_core::directory::{self, CampaignDirectory};
use gamemaster_core::error::DomainError;
use gamemaster_core::state::StateStore;
use tracing::info;

use crate::application::repository;
use crate::domain::commands::{ChangePhase, EndTurn, ReorderTurns};
use crate::domain::events;
use crate::domain::game_state::GameState;
use crate::domain::turn_order;

/// Handles the `ChangePhase` command. The new phase starts at round 1 with
/// the roster turn order.
///
/// # Errors
///
/// Returns `DomainError::Forbidden` for non-DM actors and
/// `DomainError::InvalidTransition` for disallowed transitions.
pub async fn handle_change_phase(
    command: &ChangePhase,
    clock: &dyn Clock,
    store: &dyn StateStore,
    directory: &dyn CampaignDirectory,
    publisher: &dyn BroadcastPublisher,
) -> Result<GameState, DomainError> {
    let campaign_id = directory::require_session_campaign(directory, command.session_id).await?;
    directory::require_dm(directory, campaign_id, command.actor_id, "changing phase").await?;
    let roster = directory.active_roster(campaign_id).await?;

    let now = clock.now();
    let mut tx = store.begin().await?;
    let mut state =
        repository::lock_or_init_game_state(tx.as_mut(), directory, command.session_id, now)
            .await?;
    let previous = state.phase;
    state.enter_phase(
        command.target_phase,
        turn_order::roster_order(&roster),
        None,
        now,
    )?;
    repository::save_game_state(tx.as_mut(), &state).await?;
    tx.commit().await?;

    info!(
        command_type = command.command_type(),
        correlation_id = %command.correlation_id(),
        session_id = %command.session_id,
        from = %previous,
        to = %state.phase,
        "phase changed"
    );

    broadcast::publish_all(
        publisher,
        vec![
            events::game_phase_changed(&state, previous, now),
            events::turn_advanced(&state, now),
        ],
    )
    .await;
    Ok(state)
}

/// Handles the `EndTurn` command: advances to the next turn-taker. The
/// returned state tells the caller whether an NPC is now up.
///
/// # Errors
///
/// Returns `DomainError::NotYourTurn` unless the actor is the active player
/// or the DM, or if the client's expected turn-taker is stale.
pub async fn handle_end_turn(
    command: &EndTurn,
    clock: &dyn Clock,
    store: &dyn StateStore,
    directory: &dyn CampaignDirectory,
    publisher: &dyn BroadcastPublisher,
) -> Result<GameState, DomainError> {
    let campaign_id = directory::require_session_campaign(directory, command.session_id).await?;
    let actor_is_dm = directory::is_dm(directory, campaign_id, command.actor_id).await?;

    let now = clock.now();
    let mut tx = store.begin().await?;
    let mut state =
        repository::lock_or_init_game_state(tx.as_mut(), directory, command.session_id, now)
            .await?;
    let active = state
        .active_turn_taker
        .ok_or_else(|| DomainError::Validation("turn order is empty".into()))?;
    if let Some(expected) = command.expected_turn_taker
        && expected != active
    {
        return Err(DomainError::NotYourTurn(format!(
            "turn already passed from {expected} to {active}"
        )));
    }
    if !actor_is_dm && !active.is_player(command.actor_id) {
        return Err(DomainError::NotYourTurn(format!(
            "it is {active}'s turn"
        )));
    }

    let advance = state.advance_turn(now)?;
    repository::save_game_state(tx.as_mut(), &state).await?;
    tx.commit().await?;

    info!(
        command_type = command.command_type(),
        correlation_id = %command.correlation_id(),
        session_id = %command.session_id,
        previous = %advance.previous,
        current = %advance.current,
        round = state.round,
        "turn ended"
    );

    broadcast::publish_all(publisher, vec![events::turn_advanced(&state, now)]).await;
    Ok(state)
}

/// Handles the `ReorderTurns` command.
///
/// # Errors
///
/// Returns `DomainError::Forbidden` for non-DM actors and
/// `DomainError::InvalidOrder` if the new order is not a permutation of the
/// current one.
pub async fn handle_reorder_turns(
    command: &ReorderTurns,
    clock: &dyn Clock,
    store: &dyn StateStore,
    directory: &dyn CampaignDirectory,
    publisher: &dyn BroadcastPublisher,
) -> Result<GameState, DomainError> {
    let campaign_id = directory::require_session_campaign(directory, command.session_id).await?;
    directory::require_dm(directory, campaign_id, command.actor_id, "reordering turns").await?;

    let now = clock.now();
    let mut tx = store.begin().await?;
    let mut state =
        repository::lock_or_init_game_state(tx.as_mut(), directory, command.session_id, now)
            .await?;
    state.reorder(command.new_order.clone(), now)?;
    repository::save_game_state(tx.as_mut(), &state).await?;
    tx.commit().await?;

    info!(
        command_type = command.command_type(),
        correlation_id = %command.correlation_id(),
        session_id = %command.session_id,
        "turn order changed"
    );

    broadcast::publish_all(publisher, vec![events::turn_order_changed(&state, now)]).await;
    Ok(state)
}
