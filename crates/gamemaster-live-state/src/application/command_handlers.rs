//! Command handlers for the Live State context.
//!
//! Death saves touch a single live state row, so unlike the session-wide
//! handlers they do not take the game state lock.

use std::sync::Mutex;

use gamemaster_core::broadcast::{self, BroadcastPublisher};
use gamemaster_core::clock::Clock;
use gamemaster_core::command::Command;
use gamemaster_core::directory::{self, CampaignDirectory};
use gamemaster_core::error::DomainError;
use gamemaster_core::rng::{self, DeterministicRng};
use gamemaster_core::state::StateStore;
use tracing::info;

use crate::application::repository;
use crate::domain::commands::ResolveDeathSave;
use crate::domain::death::{DeathCause, DeathSaveOutcome, DeathSaveResult};
use crate::domain::events::{self, ChangeReason};
use crate::domain::live_state::LiveState;

/// Handles the `ResolveDeathSave` command: checks authority, rolls (or
/// accepts) a d20, applies it to the locked live state, and publishes the
/// result.
///
/// The RNG `Mutex` is locked only around the roll, never across an await.
///
/// # Errors
///
/// Returns `DomainError::NotFound` for an unknown session or character,
/// `DomainError::Forbidden` unless the actor plays the character or is the
/// DM, and the death machine's guard errors for characters not dying.
pub async fn handle_resolve_death_save(
    command: &ResolveDeathSave,
    clock: &dyn Clock,
    rng: &Mutex<dyn DeterministicRng + Send>,
    store: &dyn StateStore,
    directory: &dyn CampaignDirectory,
    publisher: &dyn BroadcastPublisher,
) -> Result<DeathSaveResult, DomainError> {
    let campaign_id = directory::require_session_campaign(directory, command.session_id).await?;
    let roster = directory.active_roster(campaign_id).await?;
    let owner = roster
        .iter()
        .find(|entry| entry.character_id == command.character_id)
        .ok_or_else(|| DomainError::not_found("character", command.character_id))?;
    if owner.user_id != command.actor_id
        && !directory::is_dm(directory, campaign_id, command.actor_id).await?
    {
        return Err(DomainError::Forbidden(
            "only the character's player or the DM may roll death saves".into(),
        ));
    }

    let roll = match command.roll {
        Some(roll) => roll,
        None => rng::with_rng(rng, rng::roll_d20)?,
    };

    let now = clock.now();
    let mut tx = store.begin().await?;
    let mut live =
        repository::lock_live_state(tx.as_mut(), command.session_id, command.character_id)
            .await?
            .unwrap_or_else(|| {
                LiveState::new(
                    command.session_id,
                    command.character_id,
                    owner.hp_max_or_default(),
                    now,
                )
            });

    let result = live.resolve_death_save(roll)?;
    repository::save_live_state(tx.as_mut(), &mut live, now).await?;
    tx.commit().await?;

    info!(
        command_type = command.command_type(),
        correlation_id = %command.correlation_id(),
        session_id = %command.session_id,
        character_id = %command.character_id,
        roll,
        outcome = ?result.outcome,
        "death save resolved"
    );

    let mut published = vec![events::death_save_rolled(
        command.session_id,
        command.character_id,
        result,
        now,
    )];
    match result.outcome {
        DeathSaveOutcome::Dead => published.push(events::character_died(
            command.session_id,
            command.character_id,
            DeathCause::FailedDeathSaves,
            now,
        )),
        DeathSaveOutcome::Stabilized => published.push(events::character_stabilized(
            command.session_id,
            command.character_id,
            now,
        )),
        _ => {}
    }
    published.push(events::live_state_changed(
        command.session_id,
        std::slice::from_ref(&live),
        ChangeReason::DeathSave,
        None,
        None,
        now,
    ));
    broadcast::publish_all(publisher, published).await;

    Ok(result)
}
