//! Prompt construction and response parsing.

use gamemaster_core::narrator::{NarrationKind, NarrationRequest, NarratorError, NarratorResult};
use serde_json::json;

const OUTCOME_SHAPE: &str = r#"Reply with a single JSON object and nothing else:
{
  "narration": "<prose, second person for players>",
  "mechanicalOutcome": {
    "hpDeltas": [{ "target": { "type": "character" | "npc", "id": "<uuid>" }, "amount": <negative for damage>, "critical": <bool> }],
    "conditionsAdded": [{ "target": { "type": "character" | "npc", "id": "<uuid>" }, "condition": "<name>" }],
    "conditionsRemoved": [],
    "xpDelta": 0,
    "rollRequested": { "rollType": "<e.g. dexterity_save>", "dc": <int>, "reason": "<text>" }
  }
}
Omit "mechanicalOutcome" entirely when nothing changes mechanically. Only
target ids that appear in the context. Never add or remove the "dead" or
"unconscious" conditions."#;

const PLAYER_ACTION: &str = "You are the Dungeon Master of a tabletop role-playing game. \
A participant has declared an action. Adjudicate it fairly against the current \
scene, describe what happens, and report any mechanical effect.";

const ENEMY_TURN: &str = "You are the Dungeon Master of a tabletop role-playing game, \
playing an enemy combatant on its turn. Choose a sensible action for it given \
its hit points and the state of the fight, describe it, and report any \
mechanical effect on its targets.";

/// The system prompt for a request.
#[must_use]
pub fn system_prompt(kind: NarrationKind) -> String {
    let role = match kind {
        NarrationKind::PlayerAction => PLAYER_ACTION,
        NarrationKind::EnemyTurn => ENEMY_TURN,
    };
    format!("{role}\n\n{OUTCOME_SHAPE}")
}

/// The user message: the actor, the declared action, and the session
/// context as JSON.
#[must_use]
pub fn user_prompt(request: &NarrationRequest) -> String {
    json!({
        "actor": request.actor_name,
        "declaredType": request.declared_type,
        "payload": request.payload,
        "context": request.context,
    })
    .to_string()
}

/// Parses the model's message content.
///
/// Models sometimes wrap JSON in a Markdown code fence; the fence is
/// stripped before parsing.
///
/// # Errors
///
/// Returns `NarratorError::Provider` if the content is not a narration
/// object or the narration is blank.
pub fn parse_content(content: &str) -> Result<NarratorResult, NarratorError> {
    let trimmed = strip_fence(content.trim());
    let result: NarratorResult = serde_json::from_str(trimmed)
        .map_err(|e| NarratorError::Provider(format!("unparseable narration: {e}")))?;
    if result.narration.trim().is_empty() {
        return Err(NarratorError::Provider("empty narration".into()));
    }
    Ok(result)
}

fn strip_fence(content: &str) -> &str {
    let Some(rest) = content.strip_prefix("```") else {
        return content;
    };
    let body = rest.strip_prefix("json").unwrap_or(rest);
    body.strip_suffix("```").unwrap_or(body).trim()
}
