//! Applying a narrator's mechanical outcome to session state.
//!
//! Every target is checked before anything is touched, so an outcome is
//! either applied whole or rejected with nothing changed.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use gamemaster_combat::domain::encounter::{Encounter, EncounterParticipant, ParticipantType};
use gamemaster_core::directory::{DEFAULT_HIT_POINTS, RosterEntry};
use gamemaster_core::error::DomainError;
use gamemaster_core::narrator::{MechanicalOutcome, TargetRef};
use gamemaster_live_state::domain::death::{DamageTransition, DeathCause};
use gamemaster_live_state::domain::live_state::{LiveState, is_lifecycle_condition};
use uuid::Uuid;

/// Session state an outcome may touch.
pub struct OutcomeScope<'a> {
    /// The session being mutated.
    pub session_id: Uuid,
    /// Active roster, for creating missing live states.
    pub roster: &'a [RosterEntry],
    /// Locked live states; missing ones are appended.
    pub live_states: &'a mut Vec<LiveState>,
    /// The running encounter, if any.
    pub encounter: Option<&'a mut Encounter>,
    /// Character receiving the outcome's experience.
    pub xp_recipient: Option<Uuid>,
    /// Mutation time.
    pub now: DateTime<Utc>,
}

/// What applying an outcome changed.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AppliedOutcome {
    /// Characters whose live state changed.
    pub changed_characters: BTreeSet<Uuid>,
    /// Characters that died, in order.
    pub deaths: Vec<(Uuid, DeathCause)>,
    /// Whether any NPC participant changed.
    pub npcs_changed: bool,
}

impl AppliedOutcome {
    /// The changed live states, in character id order.
    #[must_use]
    pub fn changed(&self, live_states: &[LiveState]) -> Vec<LiveState> {
        live_states
            .iter()
            .filter(|l| self.changed_characters.contains(&l.character_id))
            .cloned()
            .collect()
    }
}

fn targets(outcome: &MechanicalOutcome) -> impl Iterator<Item = TargetRef> + '_ {
    outcome
        .hp_deltas
        .iter()
        .map(|d| d.target)
        .chain(outcome.conditions_added.iter().map(|c| c.target))
        .chain(outcome.conditions_removed.iter().map(|c| c.target))
}

impl OutcomeScope<'_> {
    fn knows_character(&self, character_id: Uuid) -> bool {
        self.live_states.iter().any(|l| l.character_id == character_id)
            || self.roster.iter().any(|r| r.character_id == character_id)
    }

    fn knows_npc(&self, participant_id: Uuid) -> bool {
        self.encounter
            .as_deref()
            .and_then(|e| e.participant(participant_id))
            .is_some_and(|p| p.participant_type == ParticipantType::Npc)
    }

    fn live_mut(&mut self, character_id: Uuid) -> &mut LiveState {
        let index = match self
            .live_states
            .iter()
            .position(|l| l.character_id == character_id)
        {
            Some(index) => index,
            None => {
                let hp_max = self
                    .roster
                    .iter()
                    .find(|r| r.character_id == character_id)
                    .map_or(DEFAULT_HIT_POINTS, RosterEntry::hp_max_or_default);
                self.live_states.push(LiveState::new(
                    self.session_id,
                    character_id,
                    hp_max,
                    self.now,
                ));
                self.live_states.len() - 1
            }
        };
        &mut self.live_states[index]
    }

    fn npc_mut(&mut self, participant_id: Uuid) -> Option<&mut EncounterParticipant> {
        self.encounter
            .as_deref_mut()
            .and_then(|e| e.participant_mut(participant_id))
    }
}

/// Applies `outcome` to the scope.
///
/// Negative HP deltas run the death machine for characters; positive ones
/// heal up to maximum. `dead` and `unconscious` condition changes are
/// ignored. Experience goes to the scope's recipient.
///
/// # Errors
///
/// Returns `DomainError::Validation` if the outcome names a character or
/// NPC not present in the session; nothing is applied in that case.
pub fn apply_outcome(
    outcome: &MechanicalOutcome,
    scope: &mut OutcomeScope<'_>,
) -> Result<AppliedOutcome, DomainError> {
    for target in targets(outcome) {
        let known = match target {
            TargetRef::Character { id } => scope.knows_character(id),
            TargetRef::Npc { id } => scope.knows_npc(id),
        };
        if !known {
            return Err(DomainError::Validation(format!(
                "outcome targets unknown {target:?}"
            )));
        }
    }

    let mut applied = AppliedOutcome::default();

    for delta in &outcome.hp_deltas {
        match delta.target {
            TargetRef::Character { id } => {
                let live = scope.live_mut(id);
                if delta.amount < 0 {
                    let transition = live.apply_damage(delta.amount.saturating_neg(), delta.critical);
                    if let DamageTransition::Died(cause) = transition {
                        applied.deaths.push((id, cause));
                    }
                } else {
                    live.apply_healing(delta.amount);
                }
                applied.changed_characters.insert(id);
            }
            TargetRef::Npc { id } => {
                if let Some(npc) = scope.npc_mut(id) {
                    npc.hit_points.apply_delta(delta.amount);
                    applied.npcs_changed = true;
                }
            }
        }
    }

    for (change, add) in outcome
        .conditions_added
        .iter()
        .map(|c| (c, true))
        .chain(outcome.conditions_removed.iter().map(|c| (c, false)))
    {
        if is_lifecycle_condition(&change.condition) {
            continue;
        }
        match change.target {
            TargetRef::Character { id } => {
                let live = scope.live_mut(id);
                let changed = if add {
                    live.add_condition(&change.condition)
                } else {
                    live.remove_condition(&change.condition)
                };
                if changed {
                    applied.changed_characters.insert(id);
                }
            }
            TargetRef::Npc { id } => {
                if let Some(npc) = scope.npc_mut(id) {
                    let changed = if add {
                        npc.conditions.insert(change.condition.clone())
                    } else {
                        npc.conditions.remove(&change.condition)
                    };
                    applied.npcs_changed |= changed;
                }
            }
        }
    }

    if outcome.xp_delta != 0
        && let Some(character_id) = scope.xp_recipient
        && scope.knows_character(character_id)
    {
        scope.live_mut(character_id).award_xp(outcome.xp_delta);
        applied.changed_characters.insert(character_id);
    }

    Ok(applied)
}

#[cfg(test)]
mod tests {
    use gamemaster_combat::domain::encounter::HitPoints;
    use gamemaster_core::narrator::{ConditionChange, HpDelta};

    use super::*;

    struct Fixture {
        session_id: Uuid,
        roster: Vec<RosterEntry>,
        live_states: Vec<LiveState>,
        encounter: Encounter,
        goblin_id: Uuid,
    }

    impl Fixture {
        fn new() -> Self {
            let session_id = Uuid::new_v4();
            let roster = vec![RosterEntry {
                user_id: Uuid::new_v4(),
                character_id: Uuid::new_v4(),
                character_name: "Aldric".into(),
                dexterity: 12,
                hp_max: Some(20),
            }];
            let goblin_id = Uuid::new_v4();
            let mut encounter = Encounter::new(Uuid::new_v4(), session_id, Uuid::new_v4(), Utc::now());
            encounter.participants.push(EncounterParticipant {
                id: goblin_id,
                participant_type: ParticipantType::Npc,
                reference_id: Uuid::new_v4(),
                user_id: None,
                name: "Goblin".into(),
                initiative: 12,
                hit_points: HitPoints::full(7),
                armor_class: 15,
                conditions: BTreeSet::new(),
                xp_reward: 50,
            });
            Self {
                session_id,
                roster,
                live_states: Vec::new(),
                encounter,
                goblin_id,
            }
        }

        fn aldric(&self) -> Uuid {
            self.roster[0].character_id
        }

        fn apply(&mut self, outcome: &MechanicalOutcome) -> Result<AppliedOutcome, DomainError> {
            let xp_recipient = Some(self.aldric());
            let mut scope = OutcomeScope {
                session_id: self.session_id,
                roster: &self.roster,
                live_states: &mut self.live_states,
                encounter: Some(&mut self.encounter),
                xp_recipient,
                now: Utc::now(),
            };
            apply_outcome(outcome, &mut scope)
        }
    }

    fn character(id: Uuid) -> TargetRef {
        TargetRef::Character { id }
    }

    #[test]
    fn test_damage_creates_missing_live_state_then_applies() {
        // Arrange
        let mut fx = Fixture::new();
        let aldric = fx.aldric();
        let outcome = MechanicalOutcome {
            hp_deltas: vec![HpDelta {
                target: character(aldric),
                amount: -6,
                critical: false,
            }],
            ..MechanicalOutcome::default()
        };

        // Act
        let applied = fx.apply(&outcome).unwrap();

        // Assert
        assert_eq!(fx.live_states.len(), 1);
        assert_eq!(fx.live_states[0].hp_current, 14);
        assert!(applied.changed_characters.contains(&aldric));
        assert!(applied.deaths.is_empty());
    }

    #[test]
    fn test_massive_damage_reports_instant_death() {
        let mut fx = Fixture::new();
        let aldric = fx.aldric();
        let outcome = MechanicalOutcome {
            hp_deltas: vec![HpDelta {
                target: character(aldric),
                amount: -40,
                critical: false,
            }],
            ..MechanicalOutcome::default()
        };

        let applied = fx.apply(&outcome).unwrap();

        assert_eq!(applied.deaths, vec![(aldric, DeathCause::InstantDeath)]);
        assert!(fx.live_states[0].is_dead());
    }

    #[test]
    fn test_npc_damage_updates_participant() {
        let mut fx = Fixture::new();
        let outcome = MechanicalOutcome {
            hp_deltas: vec![HpDelta {
                target: TargetRef::Npc { id: fx.goblin_id },
                amount: -9,
                critical: true,
            }],
            ..MechanicalOutcome::default()
        };

        let applied = fx.apply(&outcome).unwrap();

        assert!(applied.npcs_changed);
        let goblin = fx.encounter.participant(fx.goblin_id).unwrap();
        assert_eq!(goblin.hit_points.current, 0);
        assert!(goblin.is_defeated());
    }

    #[test]
    fn test_unknown_target_rejects_whole_outcome() {
        // Arrange
        let mut fx = Fixture::new();
        let aldric = fx.aldric();
        let outcome = MechanicalOutcome {
            hp_deltas: vec![
                HpDelta {
                    target: character(aldric),
                    amount: -5,
                    critical: false,
                },
                HpDelta {
                    target: character(Uuid::new_v4()),
                    amount: -5,
                    critical: false,
                },
            ],
            ..MechanicalOutcome::default()
        };

        // Act
        let result = fx.apply(&outcome);

        // Assert
        assert!(matches!(result, Err(DomainError::Validation(_))));
        assert!(fx.live_states.is_empty());
    }

    #[test]
    fn test_lifecycle_conditions_are_ignored() {
        let mut fx = Fixture::new();
        let aldric = fx.aldric();
        let outcome = MechanicalOutcome {
            conditions_added: vec![
                ConditionChange {
                    target: character(aldric),
                    condition: "dead".into(),
                },
                ConditionChange {
                    target: character(aldric),
                    condition: "prone".into(),
                },
            ],
            ..MechanicalOutcome::default()
        };

        fx.apply(&outcome).unwrap();

        let live = &fx.live_states[0];
        assert!(!live.is_dead());
        assert!(live.has_condition("prone"));
    }

    #[test]
    fn test_xp_goes_to_recipient() {
        let mut fx = Fixture::new();
        let outcome = MechanicalOutcome {
            xp_delta: 25,
            ..MechanicalOutcome::default()
        };

        let applied = fx.apply(&outcome).unwrap();

        assert_eq!(fx.live_states[0].xp_gained, 25);
        assert_eq!(applied.changed_characters.len(), 1);
    }

    #[test]
    fn test_healing_caps_at_maximum() {
        let mut fx = Fixture::new();
        let aldric = fx.aldric();
        let mut live = LiveState::new(fx.session_id, aldric, 20, Utc::now());
        live.hp_current = 15;
        fx.live_states.push(live);
        let outcome = MechanicalOutcome {
            hp_deltas: vec![HpDelta {
                target: character(aldric),
                amount: 12,
                critical: false,
            }],
            ..MechanicalOutcome::default()
        };

        fx.apply(&outcome).unwrap();

        assert_eq!(fx.live_states[0].hp_current, 20);
    }
}
