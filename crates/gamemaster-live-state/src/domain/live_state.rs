//! Session-scoped character state.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Condition marking a character at 0 HP who is still alive.
pub const UNCONSCIOUS: &str = "unconscious";
/// Terminal condition.
pub const DEAD: &str = "dead";

/// Returns `true` for conditions owned by the death and recovery machine.
/// External outcomes may not add or remove these.
#[must_use]
pub fn is_lifecycle_condition(condition: &str) -> bool {
    condition == UNCONSCIOUS || condition == DEAD
}

/// Death saving throw tallies, each in `0..=3`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeathSaves {
    /// Successful saves.
    pub successes: u8,
    /// Failed saves.
    pub failures: u8,
}

impl DeathSaves {
    /// The terminal marker stored on a dead character.
    pub const DEAD: Self = Self {
        successes: 0,
        failures: 3,
    };
}

/// Mutable per-session, per-character state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveState {
    /// The session this state belongs to.
    pub session_id: Uuid,
    /// The character this state belongs to.
    pub character_id: Uuid,
    /// Current hit points, never negative.
    pub hp_current: i32,
    /// Maximum hit points.
    pub hp_max: i32,
    /// Temporary hit points, absorbed before `hp_current`.
    pub hp_temporary: i32,
    /// Active conditions.
    pub conditions: BTreeSet<String>,
    /// Death saving throw tallies.
    pub death_saves: DeathSaves,
    /// The spell being concentrated on, if any.
    pub concentration: Option<String>,
    /// Experience gained this session, never negative.
    pub xp_gained: i64,
    /// Timestamp of the last mutation.
    pub updated_at: DateTime<Utc>,
}

impl LiveState {
    /// Creates a fresh live state at full hit points.
    #[must_use]
    pub fn new(session_id: Uuid, character_id: Uuid, hp_max: i32, now: DateTime<Utc>) -> Self {
        let hp_max = hp_max.max(1);
        Self {
            session_id,
            character_id,
            hp_current: hp_max,
            hp_max,
            hp_temporary: 0,
            conditions: BTreeSet::new(),
            death_saves: DeathSaves::default(),
            concentration: None,
            xp_gained: 0,
            updated_at: now,
        }
    }

    /// Returns `true` if the character carries the condition.
    #[must_use]
    pub fn has_condition(&self, condition: &str) -> bool {
        self.conditions.contains(condition)
    }

    /// Returns `true` if the character is dead.
    #[must_use]
    pub fn is_dead(&self) -> bool {
        self.has_condition(DEAD)
    }

    /// Returns `true` if the character is at 0 HP and alive.
    #[must_use]
    pub fn is_unconscious(&self) -> bool {
        self.has_condition(UNCONSCIOUS)
    }

    /// Adds a non-lifecycle condition. Returns `true` if it was not present.
    pub fn add_condition(&mut self, condition: &str) -> bool {
        if is_lifecycle_condition(condition) || self.is_dead() {
            return false;
        }
        self.conditions.insert(condition.to_owned())
    }

    /// Removes a non-lifecycle condition. Returns `true` if it was present.
    pub fn remove_condition(&mut self, condition: &str) -> bool {
        if is_lifecycle_condition(condition) {
            return false;
        }
        self.conditions.remove(condition)
    }

    /// Grants temporary hit points. Temporary HP does not stack; the larger
    /// pool wins.
    pub fn grant_temporary_hp(&mut self, amount: i32) {
        self.hp_temporary = self.hp_temporary.max(amount.max(0));
    }

    /// Adds experience, saturating at zero for negative deltas.
    pub fn award_xp(&mut self, delta: i64) {
        self.xp_gained = self.xp_gained.saturating_add(delta).max(0);
    }

    /// Sets the spell being concentrated on.
    pub fn set_concentration(&mut self, spell: Option<String>) {
        if !self.is_dead() {
            self.concentration = spell;
        }
    }

    pub(crate) fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}
