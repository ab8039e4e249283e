//! Campaign-scoped combat routes.

use axum::extract::{Path, State};
use axum::routing::post;
use axum::{Json, Router};
use gamemaster_combat::application::command_handlers::CombatStarted;
use gamemaster_combat::domain::commands::{InitiateCombat, ResolveCombatEnd};
use gamemaster_combat::domain::encounter::EndCondition;
use gamemaster_combat::domain::events::CombatEndResult;
use serde::Deserialize;
use tracing::{info, instrument};
use uuid::Uuid;

use super::actor::Actor;
use crate::error::ApiError;
use crate::state::AppState;

/// Request body for starting combat.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiateCombatRequest {
    /// NPC stat blocks to enroll.
    pub enemy_ids: Vec<Uuid>,
    /// Reactivates a previous encounter instead of creating one.
    #[serde(default)]
    pub existing_encounter_id: Option<Uuid>,
}

/// Request body for ending combat.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveCombatEndRequest {
    /// How the fight ended.
    pub end_condition: EndCondition,
}

/// POST /{campaign_id}/sessions/{session_id}/combat
#[instrument(skip(state, request), fields(enemies = request.enemy_ids.len()))]
async fn initiate_combat(
    State(state): State<AppState>,
    Actor(actor_id): Actor,
    Path((campaign_id, session_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<InitiateCombatRequest>,
) -> Result<Json<CombatStarted>, ApiError> {
    let command = InitiateCombat {
        correlation_id: Uuid::new_v4(),
        campaign_id,
        session_id,
        actor_id,
        enemy_ids: request.enemy_ids,
        existing_encounter_id: request.existing_encounter_id,
    };
    info!(correlation_id = %command.correlation_id, "handling initiate_combat command");
    Ok(Json(state.engine.initiate_combat(&command).await?))
}

/// POST /{campaign_id}/sessions/{session_id}/combat/{encounter_id}/end
#[instrument(skip(state, request), fields(end_condition = ?request.end_condition))]
async fn resolve_combat_end(
    State(state): State<AppState>,
    Actor(actor_id): Actor,
    Path((campaign_id, session_id, encounter_id)): Path<(Uuid, Uuid, Uuid)>,
    Json(request): Json<ResolveCombatEndRequest>,
) -> Result<Json<CombatEndResult>, ApiError> {
    let command = ResolveCombatEnd {
        correlation_id: Uuid::new_v4(),
        campaign_id,
        session_id,
        actor_id,
        encounter_id,
        end_condition: request.end_condition,
    };
    info!(correlation_id = %command.correlation_id, "handling resolve_combat_end command");
    Ok(Json(state.engine.resolve_combat_end(&command).await?))
}

/// Returns the router for combat operations.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/{campaign_id}/sessions/{session_id}/combat",
            post(initiate_combat),
        )
        .route(
            "/{campaign_id}/sessions/{session_id}/combat/{encounter_id}/end",
            post(resolve_combat_end),
        )
}
