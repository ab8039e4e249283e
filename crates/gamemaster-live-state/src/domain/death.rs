//! Death and recovery state machine.
//!
//! A character is `alive` (HP > 0), `unconscious` (HP 0, rolling death
//! saves), `stable` (unconscious with three successes, no longer rolling),
//! or `dead` (terminal). Instant death and running out of saves are state
//! transitions, not errors.

use gamemaster_core::error::DomainError;
use serde::{Deserialize, Serialize};

use super::live_state::{DEAD, DeathSaves, LiveState, UNCONSCIOUS};

const SAVES_TO_RESOLVE: u8 = 3;

/// Coarse life status derived from a live state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifeStatus {
    /// HP above zero.
    Alive,
    /// At 0 HP and rolling death saves.
    Unconscious,
    /// At 0 HP with three successes.
    Stable,
    /// Terminal.
    Dead,
}

impl LifeStatus {
    /// The status name as used in error messages and views.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Alive => "alive",
            Self::Unconscious => "unconscious",
            Self::Stable => "stable",
            Self::Dead => "dead",
        }
    }
}

/// Why a character died.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeathCause {
    /// A single hit dealt at least maximum HP.
    InstantDeath,
    /// Third death save failure.
    FailedDeathSaves,
}

/// State transition caused by a damage application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DamageTransition {
    /// Temporary HP absorbed everything, or the target was already dead.
    None,
    /// HP dropped but stayed above zero.
    Wounded,
    /// HP reached zero; the character is now unconscious.
    KnockedOut,
    /// Already at 0 HP; automatic death save failures were recorded.
    DeathSaveFailures(u8),
    /// The character died.
    Died(DeathCause),
}

/// Outcome of a death saving throw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeathSaveOutcome {
    /// Natural 20: back to 1 HP.
    Conscious,
    /// Third success.
    Stabilized,
    /// Third failure.
    Dead,
    /// A success short of three.
    Success,
    /// A failure short of three.
    Failure,
}

/// Result of [`LiveState::resolve_death_save`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeathSaveResult {
    /// The natural d20 roll.
    pub roll: u32,
    /// What the roll did.
    pub outcome: DeathSaveOutcome,
    /// Tallies after the roll.
    pub death_saves: DeathSaves,
}

impl LiveState {
    /// Current life status.
    #[must_use]
    pub fn life_status(&self) -> LifeStatus {
        if self.is_dead() {
            LifeStatus::Dead
        } else if self.is_unconscious() && self.death_saves.successes >= SAVES_TO_RESOLVE {
            LifeStatus::Stable
        } else if self.is_unconscious() {
            LifeStatus::Unconscious
        } else {
            LifeStatus::Alive
        }
    }

    /// Applies damage. Temporary HP absorbs first; whatever reaches real HP
    /// is checked against the instant-death rule.
    pub fn apply_damage(&mut self, amount: i32, critical: bool) -> DamageTransition {
        if amount <= 0 || self.is_dead() {
            return DamageTransition::None;
        }
        let absorbed = self.hp_temporary.min(amount);
        self.hp_temporary -= absorbed;
        let remaining = amount - absorbed;
        if remaining == 0 {
            return DamageTransition::None;
        }

        if self.hp_current == 0 {
            return self.handle_hp_zero(remaining, critical);
        }

        self.hp_current = (self.hp_current - remaining).max(0);
        if self.hp_current > 0 {
            DamageTransition::Wounded
        } else {
            self.handle_hp_zero(remaining, critical)
        }
    }

    /// Decides what happens when damage lands on a character at 0 HP.
    pub fn handle_hp_zero(&mut self, damage: i32, critical: bool) -> DamageTransition {
        self.hp_current = 0;
        if damage >= self.hp_max {
            self.mark_dead();
            return DamageTransition::Died(DeathCause::InstantDeath);
        }
        if self.is_unconscious() {
            let count = if critical { 2 } else { 1 };
            return self.apply_death_save_failures(count);
        }
        self.conditions.insert(UNCONSCIOUS.to_owned());
        self.death_saves = DeathSaves::default();
        self.concentration = None;
        DamageTransition::KnockedOut
    }

    /// Records automatic death save failures, capped at three. A stable
    /// character who takes damage starts dying again.
    pub fn apply_death_save_failures(&mut self, count: u8) -> DamageTransition {
        if self.death_saves.successes >= SAVES_TO_RESOLVE {
            self.death_saves.successes = 0;
        }
        self.death_saves.failures = self
            .death_saves
            .failures
            .saturating_add(count)
            .min(SAVES_TO_RESOLVE);
        if self.death_saves.failures >= SAVES_TO_RESOLVE {
            self.mark_dead();
            DamageTransition::Died(DeathCause::FailedDeathSaves)
        } else {
            DamageTransition::DeathSaveFailures(count)
        }
    }

    /// Resolves a death saving throw for a dying character.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if `roll` is not a d20 result, and
    /// `DomainError::InvalidTransition` unless the character is unconscious
    /// and not yet stable.
    pub fn resolve_death_save(&mut self, roll: u32) -> Result<DeathSaveResult, DomainError> {
        if !(1..=20).contains(&roll) {
            return Err(DomainError::Validation(format!(
                "death save roll must be between 1 and 20, got {roll}"
            )));
        }
        let status = self.life_status();
        if status != LifeStatus::Unconscious {
            return Err(DomainError::InvalidTransition {
                from: status.as_str().to_owned(),
                to: "death_save".to_owned(),
            });
        }

        let outcome = match roll {
            20 => {
                self.hp_current = 1;
                self.handle_healing_at_zero();
                DeathSaveOutcome::Conscious
            }
            1 => self.add_failures(2),
            10..=19 => {
                self.death_saves.successes += 1;
                if self.death_saves.successes >= SAVES_TO_RESOLVE {
                    DeathSaveOutcome::Stabilized
                } else {
                    DeathSaveOutcome::Success
                }
            }
            _ => self.add_failures(1),
        };

        Ok(DeathSaveResult {
            roll,
            outcome,
            death_saves: self.death_saves,
        })
    }

    fn add_failures(&mut self, count: u8) -> DeathSaveOutcome {
        match self.apply_death_save_failures(count) {
            DamageTransition::Died(_) => DeathSaveOutcome::Dead,
            _ => DeathSaveOutcome::Failure,
        }
    }

    /// Heals up to maximum HP. Healing a character at 0 HP brings them back
    /// to consciousness. Returns `true` if the character regained
    /// consciousness.
    pub fn apply_healing(&mut self, amount: i32) -> bool {
        if amount <= 0 || self.is_dead() {
            return false;
        }
        let was_down = self.hp_current == 0;
        self.hp_current = self.hp_current.saturating_add(amount).min(self.hp_max);
        if was_down {
            self.handle_healing_at_zero();
        }
        was_down
    }

    /// Clears the dying state. Does not set HP; the caller patches it.
    pub fn handle_healing_at_zero(&mut self) {
        self.conditions.remove(UNCONSCIOUS);
        self.death_saves = DeathSaves::default();
    }

    /// Moves the character to the terminal dead state.
    pub fn mark_dead(&mut self) {
        self.hp_current = 0;
        self.hp_temporary = 0;
        self.conditions.remove(UNCONSCIOUS);
        self.conditions.insert(DEAD.to_owned());
        self.death_saves = DeathSaves::DEAD;
        self.concentration = None;
    }
}
