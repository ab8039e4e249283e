//! Command handlers for the Combat context.
//!
//! Both handlers are DM-only and lock rows in the session-wide order: game
//! state, then encounter, then live states.

use std::sync::Mutex;

use gamemaster_core::broadcast::{self, BroadcastPublisher};
use gamemaster_core::clock::Clock;
use gamemaster_core::command::Command;
use gamemaster_core::directory::{self, CampaignDirectory};
use gamemaster_core::error::DomainError;
use gamemaster_core::rng::{self, DeterministicRng};
use gamemaster_core::state::StateStore;
use gamemaster_core::turn_taker::TurnTaker;
use gamemaster_live_state::application::repository as live_repository;
use gamemaster_live_state::domain::events::{self as live_events, ChangeReason};
use gamemaster_live_state::domain::live_state::LiveState;
use gamemaster_session::application::repository as session_repository;
use gamemaster_session::domain::events as session_events;
use gamemaster_session::domain::game_state::GameState;
use gamemaster_session::domain::phase::GamePhase;
use gamemaster_session::domain::turn_order;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::application::repository;
use crate::domain::commands::{InitiateCombat, ResolveCombatEnd};
use crate::domain::encounter::{Encounter, EncounterParticipant, EncounterStatus, HitPoints};
use crate::domain::events::{self, CombatEndResult};
use crate::domain::initiative;

/// Result of starting combat.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CombatStarted {
    /// The created or reactivated encounter.
    pub encounter_id: Uuid,
    /// The initiative order.
    pub turn_order: Vec<TurnTaker>,
    /// Enrolled combatants with their rolls.
    pub participants: Vec<EncounterParticipant>,
    /// The session state after entering combat.
    pub game_state: GameState,
}

async fn require_campaign_session(
    directory: &dyn CampaignDirectory,
    campaign_id: Uuid,
    session_id: Uuid,
) -> Result<(), DomainError> {
    let actual = directory::require_session_campaign(directory, session_id).await?;
    if actual == campaign_id {
        Ok(())
    } else {
        Err(DomainError::not_found("session", session_id))
    }
}

fn hit_points_of(live: &LiveState) -> HitPoints {
    HitPoints {
        max: live.hp_max,
        current: live.hp_current,
        temporary: live.hp_temporary,
    }
}

/// Handles the `InitiateCombat` command: enrolls the active roster and the
/// requested enemies, rolls initiative, and moves the session into combat.
///
/// # Errors
///
/// Returns `DomainError::NotFound` for an unknown session, NPC, or reused
/// encounter, `DomainError::Forbidden` for non-DM actors,
/// `DomainError::InvalidTransition` if the session cannot enter combat from
/// its current phase, and `DomainError::Validation` when reusing a
/// completed encounter.
pub async fn handle_initiate_combat(
    command: &InitiateCombat,
    clock: &dyn Clock,
    rng: &Mutex<dyn DeterministicRng + Send>,
    store: &dyn StateStore,
    directory: &dyn CampaignDirectory,
    publisher: &dyn BroadcastPublisher,
) -> Result<CombatStarted, DomainError> {
    require_campaign_session(directory, command.campaign_id, command.session_id).await?;
    directory::require_dm(directory, command.campaign_id, command.actor_id, "starting combat")
        .await?;
    let roster = directory.active_roster(command.campaign_id).await?;
    let mut enemies = Vec::with_capacity(command.enemy_ids.len());
    for npc_id in &command.enemy_ids {
        let block = directory
            .npc_stat_block(*npc_id)
            .await?
            .ok_or_else(|| DomainError::not_found("npc", npc_id))?;
        enemies.push(block);
    }

    let now = clock.now();
    let mut tx = store.begin().await?;
    let mut state = session_repository::lock_or_init_game_state(
        tx.as_mut(),
        directory,
        command.session_id,
        now,
    )
    .await?;
    state.phase.ensure_transition(GamePhase::Combat)?;

    let mut encounter = match command.existing_encounter_id {
        Some(encounter_id) => {
            let existing =
                repository::lock_encounter(tx.as_mut(), command.session_id, encounter_id)
                    .await?
                    .ok_or_else(|| DomainError::not_found("encounter", encounter_id))?;
            if existing.status == EncounterStatus::Completed {
                return Err(DomainError::Validation(format!(
                    "encounter {encounter_id} is already completed"
                )));
            }
            existing
        }
        None => Encounter::new(Uuid::new_v4(), command.session_id, command.campaign_id, now),
    };

    let mut stored = live_repository::lock_live_states(tx.as_mut(), command.session_id).await?;
    let mut created = Vec::new();
    let mut enrolled = Vec::with_capacity(roster.len());
    for entry in &roster {
        let live = match stored.iter().position(|l| l.character_id == entry.character_id) {
            Some(index) => stored.swap_remove(index),
            None => {
                let live = LiveState::new(
                    command.session_id,
                    entry.character_id,
                    entry.hp_max_or_default(),
                    now,
                );
                created.push(live.clone());
                live
            }
        };
        enrolled.push(live);
    }
    let players: Vec<_> = roster
        .iter()
        .cloned()
        .zip(enrolled.iter().map(hit_points_of))
        .collect();

    encounter.participants =
        rng::with_rng(rng, |r| initiative::enroll(&players, &enemies, r))?;
    encounter.status = EncounterStatus::Active;
    encounter.end_condition = None;
    encounter.started_at = now;
    encounter.ended_at = None;

    let order = turn_order::combat_order(&encounter.initiative_entries());
    let previous = state.phase;
    state.enter_phase(GamePhase::Combat, order, Some(encounter.id), now)?;

    session_repository::save_game_state(tx.as_mut(), &state).await?;
    repository::save_encounter(tx.as_mut(), &encounter).await?;
    for live in &mut created {
        live_repository::save_live_state(tx.as_mut(), live, now).await?;
    }
    tx.commit().await?;

    info!(
        command_type = command.command_type(),
        correlation_id = %command.correlation_id(),
        session_id = %command.session_id,
        encounter_id = %encounter.id,
        participants = encounter.participants.len(),
        "combat initiated"
    );

    broadcast::publish_all(
        publisher,
        vec![
            session_events::game_phase_changed(&state, previous, now),
            session_events::turn_advanced(&state, now),
            live_events::live_state_changed(
                command.session_id,
                &enrolled,
                ChangeReason::CombatStarted,
                None,
                None,
                now,
            ),
        ],
    )
    .await;

    Ok(CombatStarted {
        encounter_id: encounter.id,
        turn_order: state.turn_order.clone(),
        participants: encounter.participants,
        game_state: state,
    })
}

/// Handles the `ResolveCombatEnd` command: completes the encounter, splits
/// the experience pool evenly among characters still above 0 HP, and
/// returns the session to exploration.
///
/// # Errors
///
/// Returns `DomainError::NotFound` for an unknown session or encounter,
/// `DomainError::Forbidden` for non-DM actors, and
/// `DomainError::Validation` if the encounter is already completed.
pub async fn handle_resolve_combat_end(
    command: &ResolveCombatEnd,
    clock: &dyn Clock,
    store: &dyn StateStore,
    directory: &dyn CampaignDirectory,
    publisher: &dyn BroadcastPublisher,
) -> Result<CombatEndResult, DomainError> {
    require_campaign_session(directory, command.campaign_id, command.session_id).await?;
    directory::require_dm(directory, command.campaign_id, command.actor_id, "ending combat")
        .await?;
    let roster = directory.active_roster(command.campaign_id).await?;

    let now = clock.now();
    let mut tx = store.begin().await?;
    let mut state = session_repository::lock_game_state(tx.as_mut(), command.session_id).await?;
    let mut encounter =
        repository::lock_encounter(tx.as_mut(), command.session_id, command.encounter_id)
            .await?
            .ok_or_else(|| DomainError::not_found("encounter", command.encounter_id))?;
    if encounter.status == EncounterStatus::Completed {
        return Err(DomainError::Validation(format!(
            "encounter {} is already completed",
            command.encounter_id
        )));
    }

    let mut stored = live_repository::lock_live_states(tx.as_mut(), command.session_id).await?;
    let mut survivors = Vec::new();
    for participant in encounter.characters() {
        let live = match stored
            .iter()
            .position(|l| l.character_id == participant.reference_id)
        {
            Some(index) => stored.swap_remove(index),
            None => LiveState::new(
                command.session_id,
                participant.reference_id,
                participant.hit_points.max,
                now,
            ),
        };
        if live.hp_current > 0 {
            survivors.push(live);
        }
    }

    let pool = encounter.reward_pool().max(0);
    let survivor_count = i64::try_from(survivors.len()).unwrap_or(i64::MAX);
    let xp_per_survivor = if survivor_count > 0 {
        pool / survivor_count
    } else {
        0
    };
    if xp_per_survivor > 0 {
        for live in &mut survivors {
            live.award_xp(xp_per_survivor);
            live_repository::save_live_state(tx.as_mut(), live, now).await?;
        }
    }

    encounter.status = EncounterStatus::Completed;
    encounter.end_condition = Some(command.end_condition);
    encounter.ended_at = Some(now);
    repository::save_encounter(tx.as_mut(), &encounter).await?;

    let mut phase_change = None;
    if let Some(state) = state.as_mut()
        && state.phase == GamePhase::Combat
    {
        let previous = state.phase;
        state.enter_phase(
            GamePhase::Exploration,
            turn_order::roster_order(&roster),
            None,
            now,
        )?;
        session_repository::save_game_state(tx.as_mut(), state).await?;
        phase_change = Some(previous);
    }
    tx.commit().await?;

    let result = CombatEndResult {
        encounter_id: encounter.id,
        reward_awarded: xp_per_survivor * survivor_count,
        xp_per_survivor,
        recipients: if xp_per_survivor > 0 {
            survivors.iter().map(|l| l.character_id).collect()
        } else {
            Vec::new()
        },
        end_condition: command.end_condition,
    };

    info!(
        command_type = command.command_type(),
        correlation_id = %command.correlation_id(),
        session_id = %command.session_id,
        encounter_id = %encounter.id,
        reward_awarded = result.reward_awarded,
        survivors = survivors.len(),
        "combat resolved"
    );

    let mut published = vec![events::combat_ended(command.session_id, &result, now)];
    if xp_per_survivor > 0 {
        published.push(live_events::live_state_changed(
            command.session_id,
            &survivors,
            ChangeReason::CombatReward,
            None,
            None,
            now,
        ));
    }
    if let (Some(previous), Some(state)) = (phase_change, state.as_ref()) {
        published.push(session_events::game_phase_changed(state, previous, now));
        published.push(session_events::turn_advanced(state, now));
    }
    broadcast::publish_all(publisher, published).await;

    Ok(result)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use gamemaster_core::broadcast::{
        COMBAT_ENDED, GAME_PHASE_CHANGED, LIVE_STATE_CHANGED, TURN_ADVANCED,
    };
    use gamemaster_core::error::DomainError;
    use gamemaster_core::rng::DeterministicRng;
    use gamemaster_core::state::StateKey;
    use gamemaster_core::turn_taker::TurnTaker;
    use gamemaster_live_state::domain::live_state::LiveState;
    use gamemaster_session::domain::game_state::GameState;
    use gamemaster_session::domain::phase::GamePhase;
    use gamemaster_test_support::{
        FixedClock, InMemoryStateStore, MockRng, RecordingPublisher, SequenceRng, Table,
    };
    use uuid::Uuid;

    use super::*;
    use crate::domain::encounter::{EndCondition, ParticipantType};

    fn initiate(table: &Table, enemy_ids: Vec<Uuid>) -> InitiateCombat {
        InitiateCombat {
            correlation_id: Uuid::new_v4(),
            campaign_id: table.campaign_id,
            session_id: table.session_id,
            actor_id: table.dm_id,
            enemy_ids,
            existing_encounter_id: None,
        }
    }

    fn resolve(table: &Table, encounter_id: Uuid) -> ResolveCombatEnd {
        ResolveCombatEnd {
            correlation_id: Uuid::new_v4(),
            campaign_id: table.campaign_id,
            session_id: table.session_id,
            actor_id: table.dm_id,
            encounter_id,
            end_condition: EndCondition::Victory,
        }
    }

    async fn start_combat(
        table: &Table,
        store: &InMemoryStateStore,
        enemy_ids: Vec<Uuid>,
    ) -> CombatStarted {
        let rng = Mutex::new(MockRng);
        let rng_ref: &Mutex<dyn DeterministicRng + Send> = &rng;
        handle_initiate_combat(
            &initiate(table, enemy_ids),
            &FixedClock::epoch(),
            rng_ref,
            store,
            &table.directory(),
            &RecordingPublisher::new(),
        )
        .await
        .unwrap()
    }

    fn update_encounter(
        store: &InMemoryStateStore,
        table: &Table,
        encounter_id: Uuid,
        f: impl FnOnce(&mut Encounter),
    ) {
        let key = StateKey::encounter(table.session_id, encounter_id);
        let mut encounter: Encounter = store.get(&key).unwrap();
        f(&mut encounter);
        store.insert(key, &encounter);
    }

    fn set_hp(store: &InMemoryStateStore, table: &Table, name: &str, hp: i32) {
        let key = StateKey::live_state(table.session_id, table.player(name).character_id);
        let mut live: LiveState = store.get(&key).unwrap();
        live.hp_current = hp;
        store.insert(key, &live);
    }

    #[tokio::test]
    async fn test_initiative_orders_players_and_enemy() {
        // Arrange
        let mut table = Table::new(&["Aldric", "Brena"]);
        let goblin = table.add_npc("Goblin", 7, 50);
        let store = InMemoryStateStore::new();
        let publisher = RecordingPublisher::new();
        let rng = Mutex::new(SequenceRng::new(vec![15, 8, 12]));
        let rng_ref: &Mutex<dyn DeterministicRng + Send> = &rng;

        // Act
        let started = handle_initiate_combat(
            &initiate(&table, vec![goblin]),
            &FixedClock::epoch(),
            rng_ref,
            &store,
            &table.directory(),
            &publisher,
        )
        .await
        .unwrap();

        // Assert
        let npc = started
            .participants
            .iter()
            .find(|p| p.participant_type == ParticipantType::Npc)
            .unwrap();
        assert_eq!(
            started.turn_order,
            vec![
                TurnTaker::Player {
                    user_id: table.player("Aldric").user_id
                },
                TurnTaker::Npc {
                    participant_id: npc.id
                },
                TurnTaker::Player {
                    user_id: table.player("Brena").user_id
                },
            ]
        );
        let state: GameState = store.get(&StateKey::game_state(table.session_id)).unwrap();
        assert_eq!(state.phase, GamePhase::Combat);
        assert_eq!(state.round, 1);
        assert_eq!(state.active_encounter_id, Some(started.encounter_id));
        assert!(state.combat_turn_budget.is_some());
        assert_eq!(
            publisher.event_types(),
            vec![GAME_PHASE_CHANGED, TURN_ADVANCED, LIVE_STATE_CHANGED]
        );
    }

    #[tokio::test]
    async fn test_enrollment_uses_current_live_hit_points() {
        // Arrange
        let table = Table::new(&["Corvin"]);
        let store = InMemoryStateStore::new();
        let corvin = table.player("Corvin");
        let mut live = LiveState::new(
            table.session_id,
            corvin.character_id,
            20,
            FixedClock::epoch().0,
        );
        live.hp_current = 6;
        store.insert(
            StateKey::live_state(table.session_id, corvin.character_id),
            &live,
        );

        // Act
        let started = start_combat(&table, &store, Vec::new()).await;

        // Assert
        assert_eq!(started.participants[0].hit_points.current, 6);
        assert_eq!(started.participants[0].hit_points.max, 20);
    }

    #[tokio::test]
    async fn test_missing_live_state_is_created_at_full_hp() {
        let table = Table::new(&["Corvin"]);
        let store = InMemoryStateStore::new();

        start_combat(&table, &store, Vec::new()).await;

        let live: LiveState = store
            .get(&StateKey::live_state(
                table.session_id,
                table.player("Corvin").character_id,
            ))
            .unwrap();
        assert_eq!(live.hp_current, 20);
    }

    #[tokio::test]
    async fn test_non_dm_cannot_start_combat() {
        // Arrange
        let table = Table::new(&["Aldric"]);
        let store = InMemoryStateStore::new();
        let publisher = RecordingPublisher::new();
        let rng = Mutex::new(MockRng);
        let rng_ref: &Mutex<dyn DeterministicRng + Send> = &rng;
        let mut command = initiate(&table, Vec::new());
        command.actor_id = table.player("Aldric").user_id;

        // Act
        let result = handle_initiate_combat(
            &command,
            &FixedClock::epoch(),
            rng_ref,
            &store,
            &table.directory(),
            &publisher,
        )
        .await;

        // Assert
        assert!(matches!(result, Err(DomainError::Forbidden(_))));
        assert_eq!(store.commit_count(), 0);
        assert!(publisher.events().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_enemy_is_not_found() {
        let table = Table::new(&["Aldric"]);
        let store = InMemoryStateStore::new();
        let rng = Mutex::new(MockRng);
        let rng_ref: &Mutex<dyn DeterministicRng + Send> = &rng;

        let result = handle_initiate_combat(
            &initiate(&table, vec![Uuid::new_v4()]),
            &FixedClock::epoch(),
            rng_ref,
            &store,
            &table.directory(),
            &RecordingPublisher::new(),
        )
        .await;

        assert!(matches!(
            result,
            Err(DomainError::NotFound { entity: "npc", .. })
        ));
    }

    #[tokio::test]
    async fn test_session_of_other_campaign_is_not_found() {
        let table = Table::new(&["Aldric"]);
        let rng = Mutex::new(MockRng);
        let rng_ref: &Mutex<dyn DeterministicRng + Send> = &rng;
        let mut command = initiate(&table, Vec::new());
        command.campaign_id = Uuid::new_v4();

        let result = handle_initiate_combat(
            &command,
            &FixedClock::epoch(),
            rng_ref,
            &InMemoryStateStore::new(),
            &table.directory(),
            &RecordingPublisher::new(),
        )
        .await;

        assert!(matches!(
            result,
            Err(DomainError::NotFound {
                entity: "session",
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_cannot_start_combat_twice() {
        // Arrange
        let table = Table::new(&["Aldric"]);
        let store = InMemoryStateStore::new();
        start_combat(&table, &store, Vec::new()).await;
        let commits = store.commit_count();
        let rng = Mutex::new(MockRng);
        let rng_ref: &Mutex<dyn DeterministicRng + Send> = &rng;

        // Act
        let result = handle_initiate_combat(
            &initiate(&table, Vec::new()),
            &FixedClock::epoch(),
            rng_ref,
            &store,
            &table.directory(),
            &RecordingPublisher::new(),
        )
        .await;

        // Assert
        assert!(matches!(result, Err(DomainError::InvalidTransition { .. })));
        assert_eq!(store.commit_count(), commits);
    }

    #[tokio::test]
    async fn test_reward_split_among_survivors_with_floor() {
        // Arrange
        let mut table = Table::new(&["Aldric", "Brena", "Corvin", "Dara"]);
        let goblin = table.add_npc("Goblin", 7, 50);
        let orc = table.add_npc("Orc", 15, 50);
        let wolf = table.add_npc("Wolf", 11, 25);
        let store = InMemoryStateStore::new();
        let started = start_combat(&table, &store, vec![goblin, orc, wolf]).await;
        update_encounter(&store, &table, started.encounter_id, |enc| {
            for p in &mut enc.participants {
                if p.name != "Wolf" {
                    p.hit_points.current = 0;
                }
            }
        });
        set_hp(&store, &table, "Dara", 0);
        let publisher = RecordingPublisher::new();

        // Act
        let result = handle_resolve_combat_end(
            &resolve(&table, started.encounter_id),
            &FixedClock::epoch(),
            &store,
            &table.directory(),
            &publisher,
        )
        .await
        .unwrap();

        // Assert
        assert_eq!(result.xp_per_survivor, 33);
        assert_eq!(result.reward_awarded, 99);
        assert_eq!(result.recipients.len(), 3);
        for name in ["Aldric", "Brena", "Corvin"] {
            let live: LiveState = store
                .get(&StateKey::live_state(
                    table.session_id,
                    table.player(name).character_id,
                ))
                .unwrap();
            assert_eq!(live.xp_gained, 33);
        }
        let dara: LiveState = store
            .get(&StateKey::live_state(
                table.session_id,
                table.player("Dara").character_id,
            ))
            .unwrap();
        assert_eq!(dara.xp_gained, 0);
        assert_eq!(
            publisher.event_types(),
            vec![
                COMBAT_ENDED,
                LIVE_STATE_CHANGED,
                GAME_PHASE_CHANGED,
                TURN_ADVANCED
            ]
        );
    }

    #[tokio::test]
    async fn test_zero_survivors_award_nothing() {
        // Arrange
        let mut table = Table::new(&["Aldric"]);
        let goblin = table.add_npc("Goblin", 7, 50);
        let store = InMemoryStateStore::new();
        let started = start_combat(&table, &store, vec![goblin]).await;
        update_encounter(&store, &table, started.encounter_id, |enc| {
            enc.xp_reward = Some(200);
        });
        set_hp(&store, &table, "Aldric", 0);
        let publisher = RecordingPublisher::new();

        // Act
        let result = handle_resolve_combat_end(
            &resolve(&table, started.encounter_id),
            &FixedClock::epoch(),
            &store,
            &table.directory(),
            &publisher,
        )
        .await
        .unwrap();

        // Assert
        assert_eq!(result.reward_awarded, 0);
        assert!(result.recipients.is_empty());
        assert!(publisher.of_type(LIVE_STATE_CHANGED).is_empty());
        let live: LiveState = store
            .get(&StateKey::live_state(
                table.session_id,
                table.player("Aldric").character_id,
            ))
            .unwrap();
        assert_eq!(live.xp_gained, 0);
    }

    #[tokio::test]
    async fn test_combat_end_returns_to_exploration_and_completes_encounter() {
        let table = Table::new(&["Aldric", "Brena"]);
        let store = InMemoryStateStore::new();
        let started = start_combat(&table, &store, Vec::new()).await;

        handle_resolve_combat_end(
            &resolve(&table, started.encounter_id),
            &FixedClock::epoch(),
            &store,
            &table.directory(),
            &RecordingPublisher::new(),
        )
        .await
        .unwrap();

        let state: GameState = store.get(&StateKey::game_state(table.session_id)).unwrap();
        assert_eq!(state.phase, GamePhase::Exploration);
        assert!(state.combat_turn_budget.is_none());
        let encounter: Encounter = store
            .get(&StateKey::encounter(table.session_id, started.encounter_id))
            .unwrap();
        assert_eq!(encounter.status, EncounterStatus::Completed);
        assert_eq!(encounter.end_condition, Some(EndCondition::Victory));
    }

    #[tokio::test]
    async fn test_completed_encounter_cannot_be_resolved_again() {
        // Arrange
        let table = Table::new(&["Aldric"]);
        let store = InMemoryStateStore::new();
        let started = start_combat(&table, &store, Vec::new()).await;
        let command = resolve(&table, started.encounter_id);
        handle_resolve_combat_end(
            &command,
            &FixedClock::epoch(),
            &store,
            &table.directory(),
            &RecordingPublisher::new(),
        )
        .await
        .unwrap();

        // Act
        let result = handle_resolve_combat_end(
            &command,
            &FixedClock::epoch(),
            &store,
            &table.directory(),
            &RecordingPublisher::new(),
        )
        .await;

        // Assert
        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[tokio::test]
    async fn test_completed_encounter_cannot_be_reused() {
        // Arrange
        let table = Table::new(&["Aldric"]);
        let store = InMemoryStateStore::new();
        let started = start_combat(&table, &store, Vec::new()).await;
        handle_resolve_combat_end(
            &resolve(&table, started.encounter_id),
            &FixedClock::epoch(),
            &store,
            &table.directory(),
            &RecordingPublisher::new(),
        )
        .await
        .unwrap();
        let rng = Mutex::new(MockRng);
        let rng_ref: &Mutex<dyn DeterministicRng + Send> = &rng;
        let mut command = initiate(&table, Vec::new());
        command.existing_encounter_id = Some(started.encounter_id);

        // Act
        let result = handle_initiate_combat(
            &command,
            &FixedClock::epoch(),
            rng_ref,
            &store,
            &table.directory(),
            &RecordingPublisher::new(),
        )
        .await;

        // Assert
        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[tokio::test]
    async fn test_non_dm_cannot_end_combat() {
        let table = Table::new(&["Aldric"]);
        let store = InMemoryStateStore::new();
        let started = start_combat(&table, &store, Vec::new()).await;
        let mut command = resolve(&table, started.encounter_id);
        command.actor_id = table.player("Aldric").user_id;

        let result = handle_resolve_combat_end(
            &command,
            &FixedClock::epoch(),
            &store,
            &table.directory(),
            &RecordingPublisher::new(),
        )
        .await;

        assert!(matches!(result, Err(DomainError::Forbidden(_))));
    }
}
