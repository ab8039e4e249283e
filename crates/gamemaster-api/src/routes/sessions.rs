//! Session routes: phase and turn control, action submission, death saves,
//! read models, and the per-session event stream.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Json, Router};
use gamemaster_actions::domain::commands::SubmitAction;
use gamemaster_actions::domain::pending_action::PendingAction;
use gamemaster_combat::domain::encounter::Encounter;
use gamemaster_core::broadcast::BroadcastEvent;
use gamemaster_core::turn_taker::TurnTaker;
use gamemaster_live_state::domain::commands::ResolveDeathSave;
use gamemaster_live_state::domain::death::DeathSaveResult;
use gamemaster_live_state::domain::events::LiveStateView;
use gamemaster_session::domain::commands::{ChangePhase, EndTurn, ReorderTurns};
use gamemaster_session::domain::game_state::GameState;
use gamemaster_session::domain::phase::GamePhase;
use serde::Deserialize;
use tokio::sync::broadcast;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::actor::Actor;
use crate::error::ApiError;
use crate::state::AppState;

/// Request body for POST /{session_id}/phase.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePhaseRequest {
    /// The phase to enter.
    pub target_phase: GamePhase,
}

/// Request body for POST /{session_id}/end-turn.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndTurnRequest {
    /// The turn the caller believes is active; a mismatch is rejected.
    #[serde(default)]
    pub expected_turn_taker: Option<TurnTaker>,
}

/// Request body for POST /{session_id}/turn-order.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReorderTurnsRequest {
    /// The full new order.
    pub new_order: Vec<TurnTaker>,
}

/// Request body for POST /{session_id}/actions.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitActionRequest {
    /// What the actor is doing, e.g. `attack` or `search`.
    pub declared_type: String,
    /// Free-form details passed to the narrator.
    #[serde(default)]
    pub payload: serde_json::Value,
}

/// Request body for POST /{session_id}/characters/{character_id}/death-save.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeathSaveRequest {
    /// A physical die result; the server rolls when absent.
    #[serde(default)]
    pub roll: Option<u32>,
}

/// GET /{session_id}/state
#[instrument(skip(state))]
async fn get_state(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<GameState>, ApiError> {
    Ok(Json(state.engine.game_state(session_id).await?))
}

/// POST /{session_id}/phase
#[instrument(skip(state, request), fields(target_phase = ?request.target_phase))]
async fn change_phase(
    State(state): State<AppState>,
    Actor(actor_id): Actor,
    Path(session_id): Path<Uuid>,
    Json(request): Json<ChangePhaseRequest>,
) -> Result<Json<GameState>, ApiError> {
    let command = ChangePhase {
        correlation_id: Uuid::new_v4(),
        session_id,
        actor_id,
        target_phase: request.target_phase,
    };
    info!(correlation_id = %command.correlation_id, "handling change_phase command");
    Ok(Json(state.engine.change_phase(&command).await?))
}

/// POST /{session_id}/end-turn
#[instrument(skip(state, request))]
async fn end_turn(
    State(state): State<AppState>,
    Actor(actor_id): Actor,
    Path(session_id): Path<Uuid>,
    Json(request): Json<EndTurnRequest>,
) -> Result<Json<GameState>, ApiError> {
    let command = EndTurn {
        correlation_id: Uuid::new_v4(),
        session_id,
        actor_id,
        expected_turn_taker: request.expected_turn_taker,
    };
    info!(correlation_id = %command.correlation_id, "handling end_turn command");
    Ok(Json(state.engine.end_turn(&command).await?))
}

/// POST /{session_id}/turn-order
#[instrument(skip(state, request))]
async fn reorder_turns(
    State(state): State<AppState>,
    Actor(actor_id): Actor,
    Path(session_id): Path<Uuid>,
    Json(request): Json<ReorderTurnsRequest>,
) -> Result<Json<GameState>, ApiError> {
    let command = ReorderTurns {
        correlation_id: Uuid::new_v4(),
        session_id,
        actor_id,
        new_order: request.new_order,
    };
    info!(correlation_id = %command.correlation_id, "handling reorder_turns command");
    Ok(Json(state.engine.reorder_turns(&command).await?))
}

/// POST /{session_id}/actions
///
/// Answers 202 as soon as the action is recorded; the narration arrives
/// on the event stream.
#[instrument(skip(state, request), fields(declared_type = %request.declared_type))]
async fn submit_action(
    State(state): State<AppState>,
    Actor(actor_id): Actor,
    Path(session_id): Path<Uuid>,
    Json(request): Json<SubmitActionRequest>,
) -> Result<(StatusCode, Json<PendingAction>), ApiError> {
    let command = SubmitAction {
        correlation_id: Uuid::new_v4(),
        session_id,
        actor_id,
        declared_type: request.declared_type,
        payload: request.payload,
    };
    info!(correlation_id = %command.correlation_id, "handling submit_action command");
    let action = state.engine.submit_action(&command).await?;
    Ok((StatusCode::ACCEPTED, Json(action)))
}

/// GET /{session_id}/actions/{action_id}
#[instrument(skip(state))]
async fn get_action(
    State(state): State<AppState>,
    Path((session_id, action_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<PendingAction>, ApiError> {
    Ok(Json(state.engine.action(session_id, action_id).await?))
}

/// GET /{session_id}/live-states
#[instrument(skip(state))]
async fn get_live_states(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<Vec<LiveStateView>>, ApiError> {
    Ok(Json(state.engine.live_states(session_id).await?))
}

/// POST /{session_id}/characters/{character_id}/death-save
#[instrument(skip(state, request))]
async fn death_save(
    State(state): State<AppState>,
    Actor(actor_id): Actor,
    Path((session_id, character_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<DeathSaveRequest>,
) -> Result<Json<DeathSaveResult>, ApiError> {
    let command = ResolveDeathSave {
        correlation_id: Uuid::new_v4(),
        session_id,
        character_id,
        actor_id,
        roll: request.roll,
    };
    info!(correlation_id = %command.correlation_id, "handling resolve_death_save command");
    Ok(Json(state.engine.resolve_death_save(&command).await?))
}

/// GET /{session_id}/encounters/{encounter_id}
#[instrument(skip(state))]
async fn get_encounter(
    State(state): State<AppState>,
    Path((session_id, encounter_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Encounter>, ApiError> {
    Ok(Json(state.engine.encounter(session_id, encounter_id).await?))
}

/// GET /{session_id}/events
async fn events(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Response {
    let receiver = state.gateway.subscribe();
    ws.on_upgrade(move |socket| forward_events(socket, receiver, session_id))
}

async fn forward_events(
    mut socket: WebSocket,
    mut events: broadcast::Receiver<BroadcastEvent>,
    session_id: Uuid,
) {
    info!(%session_id, "event stream opened");
    loop {
        tokio::select! {
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_)) | Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
            event = events.recv() => match event {
                Ok(event) if event.session_id == session_id => {
                    let Ok(text) = serde_json::to_string(&event) else {
                        continue;
                    };
                    if socket.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(%session_id, skipped, "event stream fell behind");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }
    info!(%session_id, "event stream closed");
}

/// Returns the router for session-scoped operations.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{session_id}/state", get(get_state))
        .route("/{session_id}/phase", post(change_phase))
        .route("/{session_id}/end-turn", post(end_turn))
        .route("/{session_id}/turn-order", post(reorder_turns))
        .route("/{session_id}/actions", post(submit_action))
        .route("/{session_id}/actions/{action_id}", get(get_action))
        .route("/{session_id}/live-states", get(get_live_states))
        .route(
            "/{session_id}/characters/{character_id}/death-save",
            post(death_save),
        )
        .route("/{session_id}/encounters/{encounter_id}", get(get_encounter))
        .route("/{session_id}/events", get(events))
}
