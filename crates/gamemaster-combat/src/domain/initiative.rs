//! Initiative rolls and participant enrollment.

use std::collections::{BTreeSet, HashMap};

use gamemaster_core::directory::{NpcStatBlock, RosterEntry};
use gamemaster_core::rng::{self, DeterministicRng};
use uuid::Uuid;

use super::encounter::{EncounterParticipant, HitPoints, ParticipantType};

/// The ability modifier for a score, rounded down.
#[must_use]
pub fn dex_modifier(dexterity: i32) -> i32 {
    (dexterity - 10).div_euclid(2)
}

fn roll(rng: &mut dyn DeterministicRng, modifier: i32) -> i32 {
    i32::try_from(rng::roll_d20(rng)).unwrap_or(1) + modifier
}

/// Gives repeated enemy names a running number: `Goblin`, `Goblin 2`, ...
#[must_use]
pub fn numbered_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut seen: HashMap<&str, u32> = HashMap::new();
    names
        .into_iter()
        .map(|name| {
            let count = seen.entry(name).or_insert(0);
            *count += 1;
            if *count == 1 {
                name.to_owned()
            } else {
                format!("{name} {count}")
            }
        })
        .collect()
}

/// Enrolls players, then enemies, rolling initiative for each in that order.
///
/// Players roll d20 plus their dexterity modifier with the hit points they
/// currently have; enemies roll d20 plus their stat block modifier, if any,
/// at full hit points.
pub fn enroll(
    players: &[(RosterEntry, HitPoints)],
    enemies: &[NpcStatBlock],
    rng: &mut dyn DeterministicRng,
) -> Vec<EncounterParticipant> {
    let mut participants = Vec::with_capacity(players.len() + enemies.len());

    for (entry, hit_points) in players {
        participants.push(EncounterParticipant {
            id: entry.character_id,
            participant_type: ParticipantType::Character,
            reference_id: entry.character_id,
            user_id: Some(entry.user_id),
            name: entry.character_name.clone(),
            initiative: roll(rng, dex_modifier(entry.dexterity)),
            hit_points: *hit_points,
            armor_class: 10,
            conditions: BTreeSet::new(),
            xp_reward: 0,
        });
    }

    let names = numbered_names(enemies.iter().map(|e| e.name.as_str()));
    for (block, name) in enemies.iter().zip(names) {
        participants.push(EncounterParticipant {
            id: Uuid::new_v4(),
            participant_type: ParticipantType::Npc,
            reference_id: block.npc_id,
            user_id: None,
            name,
            initiative: roll(rng, block.initiative_modifier.unwrap_or(0)),
            hit_points: HitPoints::full(block.hit_points),
            armor_class: block.armor_class,
            conditions: BTreeSet::new(),
            xp_reward: block.xp_reward,
        });
    }

    participants
}

#[cfg(test)]
mod tests {
    use gamemaster_test_support::{MockRng, SequenceRng};

    use super::*;

    fn player(name: &str, dexterity: i32) -> (RosterEntry, HitPoints) {
        (
            RosterEntry {
                user_id: Uuid::new_v4(),
                character_id: Uuid::new_v4(),
                character_name: name.to_owned(),
                dexterity,
                hp_max: Some(12),
            },
            HitPoints::full(12),
        )
    }

    fn goblin(modifier: Option<i32>) -> NpcStatBlock {
        NpcStatBlock {
            npc_id: Uuid::new_v4(),
            name: "Goblin".into(),
            hit_points: 7,
            armor_class: 15,
            initiative_modifier: modifier,
            xp_reward: 50,
        }
    }

    #[test]
    fn test_dex_modifier_rounds_down() {
        assert_eq!(dex_modifier(10), 0);
        assert_eq!(dex_modifier(11), 0);
        assert_eq!(dex_modifier(14), 2);
        assert_eq!(dex_modifier(9), -1);
        assert_eq!(dex_modifier(1), -5);
    }

    #[test]
    fn test_numbered_names_counts_duplicates() {
        let names = numbered_names(["Goblin", "Orc", "Goblin", "Goblin"]);
        assert_eq!(names, vec!["Goblin", "Orc", "Goblin 2", "Goblin 3"]);
    }

    #[test]
    fn test_enroll_rolls_players_then_enemies() {
        // Arrange
        let players = vec![player("Aldric", 14), player("Brena", 8)];
        let enemies = vec![goblin(Some(2)), goblin(None)];
        let mut rng = SequenceRng::new(vec![15, 8, 12, 3]);

        // Act
        let participants = enroll(&players, &enemies, &mut rng);

        // Assert
        let initiatives: Vec<i32> = participants.iter().map(|p| p.initiative).collect();
        assert_eq!(initiatives, vec![17, 7, 14, 3]);
        assert_eq!(participants[2].name, "Goblin");
        assert_eq!(participants[3].name, "Goblin 2");
        assert_eq!(participants[3].hit_points, HitPoints::full(7));
        assert_eq!(participants[0].user_id, Some(players[0].0.user_id));
    }

    #[test]
    fn test_player_keeps_current_hit_points() {
        let (entry, _) = player("Corvin", 10);
        let wounded = HitPoints {
            max: 12,
            current: 3,
            temporary: 0,
        };

        let participants = enroll(&[(entry, wounded)], &[], &mut MockRng);

        assert_eq!(participants[0].hit_points.current, 3);
        assert_eq!(participants[0].initiative, 1);
    }
}
