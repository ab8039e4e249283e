//! Combat encounters and their participants.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use gamemaster_core::turn_taker::TurnTaker;
use gamemaster_session::domain::turn_order::InitiativeEntry;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Whether an encounter is still running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncounterStatus {
    /// Combat is in progress.
    Active,
    /// Combat has been resolved. Kept for history.
    Completed,
}

/// How combat ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndCondition {
    /// The enemies were defeated.
    Victory,
    /// The party was defeated.
    Defeat,
    /// The party fled.
    Retreat,
    /// Combat ended by agreement.
    Negotiated,
}

/// Kind of combatant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantType {
    /// A player character.
    Character,
    /// A non-player combatant.
    Npc,
}

/// Hit point pool of a participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HitPoints {
    /// Maximum.
    pub max: i32,
    /// Current, never negative.
    pub current: i32,
    /// Temporary, absorbed first.
    pub temporary: i32,
}

impl HitPoints {
    /// A full pool.
    #[must_use]
    pub fn full(max: i32) -> Self {
        Self {
            max,
            current: max,
            temporary: 0,
        }
    }

    /// Applies a signed change: negative is damage, positive is healing.
    pub fn apply_delta(&mut self, amount: i32) {
        if amount < 0 {
            let damage = amount.saturating_neg();
            let absorbed = self.temporary.min(damage);
            self.temporary -= absorbed;
            self.current = (self.current - (damage - absorbed)).max(0);
        } else {
            self.current = self.current.saturating_add(amount).min(self.max);
        }
    }
}

/// One combatant enrolled in an encounter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncounterParticipant {
    /// Participant identifier, the NPC turn-taker id.
    pub id: Uuid,
    /// Character or NPC.
    pub participant_type: ParticipantType,
    /// Character id or NPC stat block id.
    pub reference_id: Uuid,
    /// The controlling player, for characters.
    pub user_id: Option<Uuid>,
    /// Display name, unique within the encounter.
    pub name: String,
    /// Rolled initiative.
    pub initiative: i32,
    /// Hit points at enrollment; kept current for NPCs.
    pub hit_points: HitPoints,
    /// Armor class.
    pub armor_class: i32,
    /// Active conditions.
    pub conditions: BTreeSet<String>,
    /// Experience awarded when an NPC is defeated.
    pub xp_reward: i64,
}

impl EncounterParticipant {
    /// The turn-taker this participant acts as.
    #[must_use]
    pub fn turn_taker(&self) -> Option<TurnTaker> {
        match self.participant_type {
            ParticipantType::Npc => Some(TurnTaker::Npc {
                participant_id: self.id,
            }),
            ParticipantType::Character => self.user_id.map(|user_id| TurnTaker::Player { user_id }),
        }
    }

    /// Returns `true` for an NPC at 0 HP.
    #[must_use]
    pub fn is_defeated(&self) -> bool {
        self.participant_type == ParticipantType::Npc && self.hit_points.current <= 0
    }
}

/// A combat encounter within a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Encounter {
    /// Encounter identifier.
    pub id: Uuid,
    /// The session the encounter runs in.
    pub session_id: Uuid,
    /// The campaign the session belongs to.
    pub campaign_id: Uuid,
    /// Running or resolved.
    pub status: EncounterStatus,
    /// A preset reward overriding the per-NPC sum.
    pub xp_reward: Option<i64>,
    /// Enrolled combatants.
    pub participants: Vec<EncounterParticipant>,
    /// How combat ended, once completed.
    pub end_condition: Option<EndCondition>,
    /// When combat was (last) activated.
    pub started_at: DateTime<Utc>,
    /// When combat was resolved.
    pub ended_at: Option<DateTime<Utc>>,
}

impl Encounter {
    /// Creates an empty active encounter.
    #[must_use]
    pub fn new(id: Uuid, session_id: Uuid, campaign_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            id,
            session_id,
            campaign_id,
            status: EncounterStatus::Active,
            xp_reward: None,
            participants: Vec::new(),
            end_condition: None,
            started_at: now,
            ended_at: None,
        }
    }

    /// Looks up a participant.
    #[must_use]
    pub fn participant(&self, participant_id: Uuid) -> Option<&EncounterParticipant> {
        self.participants.iter().find(|p| p.id == participant_id)
    }

    /// Looks up a participant for mutation.
    pub fn participant_mut(&mut self, participant_id: Uuid) -> Option<&mut EncounterParticipant> {
        self.participants.iter_mut().find(|p| p.id == participant_id)
    }

    /// Character participants.
    pub fn characters(&self) -> impl Iterator<Item = &EncounterParticipant> {
        self.participants
            .iter()
            .filter(|p| p.participant_type == ParticipantType::Character)
    }

    /// Initiative entries for the turn order resolver.
    #[must_use]
    pub fn initiative_entries(&self) -> Vec<InitiativeEntry> {
        self.participants
            .iter()
            .filter_map(|p| {
                p.turn_taker().map(|turn_taker| InitiativeEntry {
                    turn_taker,
                    name: p.name.clone(),
                    initiative: p.initiative,
                })
            })
            .collect()
    }

    /// The experience pool: the preset reward, or else the sum of rewards
    /// of defeated NPCs.
    #[must_use]
    pub fn reward_pool(&self) -> i64 {
        self.xp_reward.unwrap_or_else(|| {
            self.participants
                .iter()
                .filter(|p| p.is_defeated())
                .map(|p| p.xp_reward)
                .sum()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn npc(name: &str, current: i32, xp_reward: i64) -> EncounterParticipant {
        EncounterParticipant {
            id: Uuid::new_v4(),
            participant_type: ParticipantType::Npc,
            reference_id: Uuid::new_v4(),
            user_id: None,
            name: name.to_owned(),
            initiative: 10,
            hit_points: HitPoints {
                max: 10,
                current,
                temporary: 0,
            },
            armor_class: 12,
            conditions: BTreeSet::new(),
            xp_reward,
        }
    }

    fn encounter() -> Encounter {
        Encounter::new(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), Utc::now())
    }

    #[test]
    fn test_reward_pool_sums_defeated_npcs_only() {
        let mut enc = encounter();
        enc.participants = vec![npc("Goblin", 0, 50), npc("Goblin 2", 4, 50), npc("Orc", 0, 100)];
        assert_eq!(enc.reward_pool(), 150);
    }

    #[test]
    fn test_preset_reward_overrides_sum() {
        let mut enc = encounter();
        enc.participants = vec![npc("Goblin", 0, 50)];
        enc.xp_reward = Some(400);
        assert_eq!(enc.reward_pool(), 400);
    }

    #[test]
    fn test_hit_points_damage_clamps_and_uses_temporary_first() {
        let mut hp = HitPoints {
            max: 10,
            current: 6,
            temporary: 3,
        };
        hp.apply_delta(-5);
        assert_eq!(hp.temporary, 0);
        assert_eq!(hp.current, 4);
        hp.apply_delta(-40);
        assert_eq!(hp.current, 0);
        hp.apply_delta(25);
        assert_eq!(hp.current, 10);
    }

    #[test]
    fn test_npc_turn_taker_uses_participant_id() {
        let goblin = npc("Goblin", 7, 50);
        assert_eq!(
            goblin.turn_taker(),
            Some(TurnTaker::Npc {
                participant_id: goblin.id
            })
        );
    }
}
