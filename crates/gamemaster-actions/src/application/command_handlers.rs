//! Command handlers for the Actions context.
//!
//! Submission only records the action. Resolution and enemy turns call the
//! narrator with no transaction open, then lock and re-check the rows they
//! mutate before applying the result.

use chrono::{DateTime, Utc};
use gamemaster_combat::application::repository as combat_repository;
use gamemaster_combat::domain::action_economy::{self, ActionType};
use gamemaster_core::broadcast::{self, BroadcastEvent, BroadcastPublisher};
use gamemaster_core::clock::Clock;
use gamemaster_core::command::Command;
use gamemaster_core::directory::{self, CampaignDirectory, RosterEntry};
use gamemaster_core::error::DomainError;
use gamemaster_core::narrator::{NarrationKind, NarrationRequest, Narrator, NarratorResult};
use gamemaster_core::state::StateStore;
use gamemaster_core::turn_taker::TurnTaker;
use gamemaster_live_state::application::repository as live_repository;
use gamemaster_live_state::domain::events::{self as live_events, ChangeReason};
use gamemaster_live_state::domain::live_state::LiveState;
use gamemaster_session::application::repository as session_repository;
use gamemaster_session::domain::events as session_events;
use gamemaster_session::domain::game_state::GameState;
use gamemaster_session::domain::phase::GamePhase;
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::application::{context, repository};
use crate::domain::commands::{ExecuteEnemyTurn, ResolveAction, SubmitAction};
use crate::domain::events;
use crate::domain::outcome::{self, AppliedOutcome, OutcomeScope};
use crate::domain::pending_action::{PendingAction, TurnMarker};

/// Declared type sent to the narrator for NPC turns.
pub const ENEMY_TURN_DECLARED_TYPE: &str = "enemy_turn";

/// Handles the `SubmitAction` command: checks the actor, charges the turn
/// budget in combat, and records a pending action. The caller schedules
/// resolution.
///
/// # Errors
///
/// Returns `DomainError::Forbidden` unless the actor is the DM or an active
/// player, `DomainError::NotYourTurn` for players acting out of turn in
/// combat, `DomainError::ActionInFlight` while the actor has an unresolved
/// action, and `DomainError::ActionAlreadyUsed` when the budget slot is
/// spent.
pub async fn handle_submit_action(
    command: &SubmitAction,
    clock: &dyn Clock,
    store: &dyn StateStore,
    directory: &dyn CampaignDirectory,
) -> Result<PendingAction, DomainError> {
    let campaign_id = directory::require_session_campaign(directory, command.session_id).await?;
    let actor_is_dm = directory::is_dm(directory, campaign_id, command.actor_id).await?;
    let roster = directory.active_roster(campaign_id).await?;
    let character_id = roster
        .iter()
        .find(|entry| entry.user_id == command.actor_id)
        .map(|entry| entry.character_id);
    if !actor_is_dm && character_id.is_none() {
        return Err(DomainError::Forbidden(
            "only the DM or an active player may declare actions".into(),
        ));
    }
    if command.declared_type.trim().is_empty() {
        return Err(DomainError::Validation("declared type is required".into()));
    }

    let now = clock.now();
    let mut tx = store.begin().await?;
    let mut state =
        session_repository::lock_or_init_game_state(tx.as_mut(), directory, command.session_id, now)
            .await?;
    let charged = state.phase == GamePhase::Combat && !actor_is_dm;
    if charged
        && !state
            .active_turn_taker
            .is_some_and(|t| t.is_player(command.actor_id))
    {
        return Err(DomainError::NotYourTurn(
            "players may only act on their own turn in combat".into(),
        ));
    }

    if let Some(existing) = state.action_in_flight(command.actor_id) {
        let still_pending =
            repository::lock_pending_action(tx.as_mut(), command.session_id, existing)
                .await?
                .is_some_and(|a| a.is_pending());
        if still_pending {
            return Err(DomainError::ActionInFlight(existing));
        }
        warn!(
            session_id = %command.session_id,
            actor_id = %command.actor_id,
            action_id = %existing,
            "clearing stale in-flight marker"
        );
    }

    let mut action = PendingAction::new(
        command.session_id,
        command.actor_id,
        character_id,
        command.declared_type.clone(),
        command.payload.clone(),
        now,
    );
    if charged {
        let charge = ActionType::classify(&command.declared_type, &command.payload)?;
        let budget = state.combat_turn_budget.unwrap_or_default();
        state.combat_turn_budget = Some(action_economy::consume_action(budget, charge)?);
        action.budget_charge = Some(charge);
        action.turn_marker = Some(TurnMarker {
            round: state.round,
            active_index: state.active_index,
        });
    }
    state.claim_action(command.actor_id, action.action_id);
    state.updated_at = now;
    session_repository::save_game_state(tx.as_mut(), &state).await?;
    repository::save_pending_action(tx.as_mut(), &action).await?;
    tx.commit().await?;

    info!(
        command_type = command.command_type(),
        correlation_id = %command.correlation_id(),
        session_id = %command.session_id,
        action_id = %action.action_id,
        declared_type = %action.declared_type,
        "action submitted"
    );
    Ok(action)
}

/// Handles the `ResolveAction` command: narrates the action, then applies
/// the mechanical outcome, if any, in one transaction.
///
/// Returns `None` if the action was already settled. A narrator failure,
/// or an outcome naming targets the session does not have, settles the
/// action as failed and refunds its budget charge while the same turn is
/// still running. Any other error also settles the action as failed, on a
/// best-effort basis, before it is returned.
///
/// # Errors
///
/// Returns `DomainError::NotFound` for an unknown action and
/// `DomainError::Infrastructure` for storage and directory failures.
pub async fn handle_resolve_action(
    command: &ResolveAction,
    clock: &dyn Clock,
    store: &dyn StateStore,
    directory: &dyn CampaignDirectory,
    narrator: &dyn Narrator,
    publisher: &dyn BroadcastPublisher,
) -> Result<Option<PendingAction>, DomainError> {
    let result = resolve_action(command, clock, store, directory, narrator, publisher).await;
    if let Err(e) = &result
        && let Err(fail_error) = fail_action(command, e, clock, store, publisher).await
    {
        warn!(
            session_id = %command.session_id,
            action_id = %command.action_id,
            error = %fail_error,
            "could not mark action failed"
        );
    }
    result
}

/// Settles a still-pending action as failed without narrating it, for
/// resolution jobs that will never run.
///
/// Returns `None` if the action was already settled.
///
/// # Errors
///
/// Returns `DomainError::NotFound` for an unknown action and
/// `DomainError::Infrastructure` for storage failures.
pub async fn handle_abandon_action(
    command: &ResolveAction,
    reason: &str,
    clock: &dyn Clock,
    store: &dyn StateStore,
    publisher: &dyn BroadcastPublisher,
) -> Result<Option<PendingAction>, DomainError> {
    let error = DomainError::ServiceUnavailable(reason.to_owned());
    fail_action(command, &error, clock, store, publisher).await
}

async fn resolve_action(
    command: &ResolveAction,
    clock: &dyn Clock,
    store: &dyn StateStore,
    directory: &dyn CampaignDirectory,
    narrator: &dyn Narrator,
    publisher: &dyn BroadcastPublisher,
) -> Result<Option<PendingAction>, DomainError> {
    let action = repository::load_pending_action(store, command.session_id, command.action_id)
        .await?
        .ok_or_else(|| DomainError::not_found("action", command.action_id))?;
    if !action.is_pending() {
        warn!(
            session_id = %command.session_id,
            action_id = %command.action_id,
            "action already settled; skipping"
        );
        return Ok(None);
    }

    let campaign_id = directory::require_session_campaign(directory, command.session_id).await?;
    let roster = directory.active_roster(campaign_id).await?;
    let state = match session_repository::load_game_state(store, command.session_id).await? {
        Some(state) => state,
        None => {
            session_repository::initial_game_state(directory, command.session_id, clock.now())
                .await?
        }
    };
    let encounter = match state.active_encounter_id {
        Some(encounter_id) => {
            combat_repository::load_encounter(store, command.session_id, encounter_id).await?
        }
        None => None,
    };
    let live_states = live_repository::load_live_states(store, command.session_id).await?;

    let request = NarrationRequest {
        kind: NarrationKind::PlayerAction,
        session_id: command.session_id,
        actor_name: context::actor_name(&roster, action.actor_id),
        declared_type: action.declared_type.clone(),
        payload: action.payload.clone(),
        context: context::narration_context(&state, encounter.as_ref(), &live_states),
    };

    match narrator.narrate(request).await {
        Ok(result) => {
            match apply_narration(command, &result, &roster, clock, store, publisher).await {
                Err(DomainError::Validation(reason)) => {
                    let error = DomainError::Provider(format!("unusable mechanical outcome: {reason}"));
                    fail_action(command, &error, clock, store, publisher).await
                }
                other => other,
            }
        }
        Err(e) => fail_action(command, &DomainError::from(e), clock, store, publisher).await,
    }
}

async fn apply_narration(
    command: &ResolveAction,
    result: &NarratorResult,
    roster: &[RosterEntry],
    clock: &dyn Clock,
    store: &dyn StateStore,
    publisher: &dyn BroadcastPublisher,
) -> Result<Option<PendingAction>, DomainError> {
    let now = clock.now();
    let mut tx = store.begin().await?;
    let mut state = session_repository::lock_game_state(tx.as_mut(), command.session_id).await?;
    let mut encounter = match state.as_ref().and_then(|s| s.active_encounter_id) {
        Some(encounter_id) => {
            combat_repository::lock_encounter(tx.as_mut(), command.session_id, encounter_id)
                .await?
        }
        None => None,
    };
    let mut live_states = live_repository::lock_live_states(tx.as_mut(), command.session_id).await?;
    let mut action =
        repository::lock_pending_action(tx.as_mut(), command.session_id, command.action_id)
            .await?
            .ok_or_else(|| DomainError::not_found("action", command.action_id))?;
    if !action.is_pending() {
        return Ok(None);
    }

    let applied = match &result.mechanical_outcome {
        Some(mechanical) => {
            let mut scope = OutcomeScope {
                session_id: command.session_id,
                roster,
                live_states: &mut live_states,
                encounter: encounter.as_mut(),
                xp_recipient: action.character_id,
                now,
            };
            outcome::apply_outcome(mechanical, &mut scope)?
        }
        None => AppliedOutcome::default(),
    };
    let mut changed = applied.changed(&live_states);
    for live in &mut changed {
        live_repository::save_live_state(tx.as_mut(), live, now).await?;
    }
    if applied.npcs_changed
        && let Some(encounter) = &encounter
    {
        combat_repository::save_encounter(tx.as_mut(), encounter).await?;
    }
    let roll_requested = result
        .mechanical_outcome
        .as_ref()
        .and_then(|m| m.roll_requested.clone());
    action.resolve(result.narration.clone(), roll_requested, now);
    if let Some(state) = state.as_mut()
        && state.release_action(action.actor_id, action.action_id)
    {
        state.updated_at = now;
        session_repository::save_game_state(tx.as_mut(), state).await?;
    }
    repository::save_pending_action(tx.as_mut(), &action).await?;
    tx.commit().await?;

    info!(
        command_type = command.command_type(),
        correlation_id = %command.correlation_id(),
        session_id = %command.session_id,
        action_id = %action.action_id,
        status = ?action.status,
        changed = changed.len(),
        "action resolved"
    );

    let mut published = vec![events::dm_narration(&action, now)];
    published.extend(outcome_events(
        command.session_id,
        &changed,
        &applied,
        ChangeReason::ActionOutcome,
        Some(action.action_id),
        None,
        now,
    ));
    published.push(events::action_completed(&action, now));
    broadcast::publish_all(publisher, published).await;

    Ok(Some(action))
}

async fn fail_action(
    command: &ResolveAction,
    error: &DomainError,
    clock: &dyn Clock,
    store: &dyn StateStore,
    publisher: &dyn BroadcastPublisher,
) -> Result<Option<PendingAction>, DomainError> {
    let now = clock.now();
    let mut tx = store.begin().await?;
    let mut state = session_repository::lock_game_state(tx.as_mut(), command.session_id).await?;
    let mut action =
        repository::lock_pending_action(tx.as_mut(), command.session_id, command.action_id)
            .await?
            .ok_or_else(|| DomainError::not_found("action", command.action_id))?;
    if !action.is_pending() {
        return Ok(None);
    }

    action.fail(error.to_string(), now);
    if let Some(state) = state.as_mut() {
        let released = state.release_action(action.actor_id, action.action_id);
        let refunded = refund_budget(state, &action);
        if released || refunded {
            state.updated_at = now;
            session_repository::save_game_state(tx.as_mut(), state).await?;
        }
    }
    repository::save_pending_action(tx.as_mut(), &action).await?;
    tx.commit().await?;

    warn!(
        command_type = command.command_type(),
        correlation_id = %command.correlation_id(),
        session_id = %command.session_id,
        action_id = %action.action_id,
        error = %error,
        "action failed"
    );

    broadcast::publish_all(publisher, vec![events::action_failed(&action, now)]).await;
    Ok(Some(action))
}

/// Gives back the slot an action was charged if its turn is still running.
fn refund_budget(state: &mut GameState, action: &PendingAction) -> bool {
    let (Some(charge), Some(marker), Some(budget)) = (
        action.budget_charge,
        action.turn_marker,
        state.combat_turn_budget,
    ) else {
        return false;
    };
    let same_turn = state.phase == GamePhase::Combat
        && state.round == marker.round
        && state.active_index == marker.active_index
        && state
            .active_turn_taker
            .is_some_and(|t| t.is_player(action.actor_id));
    if same_turn {
        state.combat_turn_budget = Some(action_economy::refund_action(budget, charge));
    }
    same_turn
}

fn outcome_events(
    session_id: Uuid,
    changed: &[LiveState],
    applied: &AppliedOutcome,
    reason: ChangeReason,
    action_id: Option<Uuid>,
    source: Option<&str>,
    now: DateTime<Utc>,
) -> Vec<BroadcastEvent> {
    let mut published = Vec::new();
    if !changed.is_empty() {
        published.push(live_events::live_state_changed(
            session_id, changed, reason, action_id, source, now,
        ));
    }
    for (character_id, cause) in &applied.deaths {
        published.push(live_events::character_died(
            session_id,
            *character_id,
            *cause,
            now,
        ));
    }
    published
}

fn is_enemy_turn(state: &GameState, command: &ExecuteEnemyTurn) -> bool {
    state.phase == GamePhase::Combat
        && state.active_encounter_id == Some(command.encounter_id)
        && state.active_turn_taker
            == Some(TurnTaker::Npc {
                participant_id: command.participant_id,
            })
}

/// Handles the `ExecuteEnemyTurn` command: narrates the NPC's turn, applies
/// its outcome, and always advances the turn.
///
/// Returns the advanced game state so the caller can chain the next NPC,
/// or `None` if the turn was stale. A defeated NPC skips the narrator. A
/// narrator failure becomes a defensive stance with no outcome.
///
/// # Errors
///
/// Returns `DomainError::NotFound` if the encounter or participant is
/// missing and `DomainError::Infrastructure` for storage failures.
pub async fn handle_execute_enemy_turn(
    command: &ExecuteEnemyTurn,
    clock: &dyn Clock,
    store: &dyn StateStore,
    directory: &dyn CampaignDirectory,
    narrator: &dyn Narrator,
    publisher: &dyn BroadcastPublisher,
) -> Result<Option<GameState>, DomainError> {
    let Some(state) = session_repository::load_game_state(store, command.session_id).await? else {
        return Ok(None);
    };
    if !is_enemy_turn(&state, command) {
        warn!(
            session_id = %command.session_id,
            participant_id = %command.participant_id,
            "enemy turn is stale; skipping"
        );
        return Ok(None);
    }
    let encounter = combat_repository::load_encounter(store, command.session_id, command.encounter_id)
        .await?
        .ok_or_else(|| DomainError::not_found("encounter", command.encounter_id))?;
    let participant = encounter
        .participant(command.participant_id)
        .cloned()
        .ok_or_else(|| DomainError::not_found("participant", command.participant_id))?;

    let narration = if participant.is_defeated() {
        None
    } else {
        broadcast::publish_all(
            publisher,
            vec![events::enemy_turn_started(
                command.session_id,
                command.encounter_id,
                participant.id,
                &participant.name,
                clock.now(),
            )],
        )
        .await;
        let live_states = live_repository::load_live_states(store, command.session_id).await?;
        let request = NarrationRequest {
            kind: NarrationKind::EnemyTurn,
            session_id: command.session_id,
            actor_name: participant.name.clone(),
            declared_type: ENEMY_TURN_DECLARED_TYPE.to_owned(),
            payload: json!({
                "participantId": participant.id,
                "hitPoints": participant.hit_points,
                "armorClass": participant.armor_class,
            }),
            context: context::narration_context(&state, Some(&encounter), &live_states),
        };
        Some(match narrator.narrate(request).await {
            Ok(result) => result,
            Err(e) => {
                warn!(
                    session_id = %command.session_id,
                    participant_id = %participant.id,
                    error = %e,
                    "narrator failed; enemy takes a defensive stance"
                );
                NarratorResult {
                    narration: format!("{} hesitates and takes a defensive stance.", participant.name),
                    mechanical_outcome: None,
                }
            }
        })
    };

    let roster = directory.active_roster(state.campaign_id).await?;
    let now = clock.now();
    let mut tx = store.begin().await?;
    let Some(mut state) = session_repository::lock_game_state(tx.as_mut(), command.session_id).await?
    else {
        return Ok(None);
    };
    if !is_enemy_turn(&state, command) {
        warn!(
            session_id = %command.session_id,
            participant_id = %command.participant_id,
            "turn moved on during enemy narration; discarding"
        );
        return Ok(None);
    }
    let mut encounter =
        combat_repository::lock_encounter(tx.as_mut(), command.session_id, command.encounter_id)
            .await?
            .ok_or_else(|| DomainError::not_found("encounter", command.encounter_id))?;
    let mut live_states = live_repository::lock_live_states(tx.as_mut(), command.session_id).await?;

    let applied = match narration.as_ref().and_then(|r| r.mechanical_outcome.as_ref()) {
        Some(mechanical) => {
            let mut scope = OutcomeScope {
                session_id: command.session_id,
                roster: &roster,
                live_states: &mut live_states,
                encounter: Some(&mut encounter),
                xp_recipient: None,
                now,
            };
            outcome::apply_outcome(mechanical, &mut scope).unwrap_or_else(|e| {
                warn!(
                    session_id = %command.session_id,
                    participant_id = %command.participant_id,
                    error = %e,
                    "discarding unusable enemy outcome"
                );
                AppliedOutcome::default()
            })
        }
        None => AppliedOutcome::default(),
    };
    let mut changed = applied.changed(&live_states);
    for live in &mut changed {
        live_repository::save_live_state(tx.as_mut(), live, now).await?;
    }
    if applied.npcs_changed {
        combat_repository::save_encounter(tx.as_mut(), &encounter).await?;
    }
    let advance = state.advance_turn(now)?;
    session_repository::save_game_state(tx.as_mut(), &state).await?;
    tx.commit().await?;

    info!(
        command_type = command.command_type(),
        correlation_id = %command.correlation_id(),
        session_id = %command.session_id,
        participant_id = %participant.id,
        skipped = narration.is_none(),
        next = %advance.current,
        round = state.round,
        "enemy turn executed"
    );

    let mut published = vec![events::enemy_turn_completed(
        command.session_id,
        command.encounter_id,
        participant.id,
        &participant.name,
        narration.as_ref().map(|r| r.narration.as_str()),
        now,
    )];
    published.extend(outcome_events(
        command.session_id,
        &changed,
        &applied,
        ChangeReason::EnemyTurn,
        None,
        Some(&participant.name),
        now,
    ));
    published.push(session_events::turn_advanced(&state, now));
    broadcast::publish_all(publisher, published).await;

    Ok(Some(state))
}
