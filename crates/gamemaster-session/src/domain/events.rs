//! Broadcast payloads for the Session context.

use chrono::{DateTime, Utc};
use gamemaster_core::broadcast::{
    BroadcastEvent, GAME_PHASE_CHANGED, TURN_ADVANCED, TURN_ORDER_CHANGED,
};
use serde::Serialize;
use uuid::Uuid;

use super::game_state::GameState;
use super::phase::GamePhase;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GameStateEnvelope<'a> {
    session_id: Uuid,
    game_state: &'a GameState,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PhaseChanged<'a> {
    session_id: Uuid,
    phase: GamePhase,
    previous_phase: GamePhase,
    game_state: &'a GameState,
}

/// Builds a `turn-advanced` event carrying the full game state.
#[must_use]
pub fn turn_advanced(state: &GameState, now: DateTime<Utc>) -> BroadcastEvent {
    BroadcastEvent::new(
        state.session_id,
        TURN_ADVANCED,
        &GameStateEnvelope {
            session_id: state.session_id,
            game_state: state,
        },
        now,
    )
}

/// Builds a `turn-order-changed` event carrying the full game state.
#[must_use]
pub fn turn_order_changed(state: &GameState, now: DateTime<Utc>) -> BroadcastEvent {
    BroadcastEvent::new(
        state.session_id,
        TURN_ORDER_CHANGED,
        &GameStateEnvelope {
            session_id: state.session_id,
            game_state: state,
        },
        now,
    )
}

/// Builds a `game-phase-changed` event.
#[must_use]
pub fn game_phase_changed(
    state: &GameState,
    previous_phase: GamePhase,
    now: DateTime<Utc>,
) -> BroadcastEvent {
    BroadcastEvent::new(
        state.session_id,
        GAME_PHASE_CHANGED,
        &PhaseChanged {
            session_id: state.session_id,
            phase: state.phase,
            previous_phase,
            game_state: state,
        },
        now,
    )
}
