//! Session context handed to the narrator.

use gamemaster_combat::domain::encounter::Encounter;
use gamemaster_core::directory::RosterEntry;
use gamemaster_live_state::domain::events::LiveStateView;
use gamemaster_live_state::domain::live_state::LiveState;
use gamemaster_session::domain::game_state::GameState;
use serde_json::{Value, json};
use uuid::Uuid;

/// Name used when the DM declares an action.
pub const DM_ACTOR_NAME: &str = "Dungeon Master";

/// The name the narrator sees for an actor: their character's name, or
/// the DM's.
#[must_use]
pub fn actor_name(roster: &[RosterEntry], actor_id: Uuid) -> String {
    roster
        .iter()
        .find(|entry| entry.user_id == actor_id)
        .map_or_else(|| DM_ACTOR_NAME.to_owned(), |entry| entry.character_name.clone())
}

/// Phase, round, turn, combatants, and live states as one JSON document.
#[must_use]
pub fn narration_context(
    state: &GameState,
    encounter: Option<&Encounter>,
    live_states: &[LiveState],
) -> Value {
    let combatants: Vec<Value> = encounter
        .map(|e| {
            e.participants
                .iter()
                .map(|p| {
                    json!({
                        "id": p.id,
                        "type": p.participant_type,
                        "name": p.name,
                        "initiative": p.initiative,
                        "hitPoints": p.hit_points,
                        "armorClass": p.armor_class,
                        "conditions": p.conditions,
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    json!({
        "phase": state.phase,
        "round": state.round,
        "activeTurnTaker": state.active_turn_taker,
        "combatants": combatants,
        "liveStates": live_states.iter().map(LiveStateView::from).collect::<Vec<_>>(),
    })
}
