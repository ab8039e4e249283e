//! The per-session game state aggregate.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use gamemaster_core::error::DomainError;
use gamemaster_core::turn_taker::TurnTaker;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::phase::GamePhase;
use super::turn_budget::CombatTurnBudget;
use super::turn_order;

/// The authoritative phase, turn order, and round of a session.
///
/// `active_turn_taker` always equals `turn_order[active_index]` when the
/// order is non-empty and is `None` otherwise. Every mutator keeps the two
/// in sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    /// The session identifier.
    pub session_id: Uuid,
    /// The campaign the session belongs to.
    pub campaign_id: Uuid,
    /// Current phase.
    pub phase: GamePhase,
    /// Current round, starting at 1.
    pub round: u32,
    /// Ordered turn-takers.
    pub turn_order: Vec<TurnTaker>,
    /// Index of the active turn-taker.
    pub active_index: usize,
    /// Mirror of `turn_order[active_index]`.
    pub active_turn_taker: Option<TurnTaker>,
    /// The active turn-taker's budget; present only in combat.
    pub combat_turn_budget: Option<CombatTurnBudget>,
    /// The running encounter; present only in combat.
    pub active_encounter_id: Option<Uuid>,
    /// Unsettled action of each actor, keyed by user. Written in the same
    /// transaction as the action row it points at.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub actions_in_flight: BTreeMap<Uuid, Uuid>,
    /// Timestamp of the last mutation.
    pub updated_at: DateTime<Utc>,
}

/// What a turn advance did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnAdvance {
    /// The turn-taker whose turn ended.
    pub previous: TurnTaker,
    /// The new active turn-taker.
    pub current: TurnTaker,
    /// Whether the index wrapped and a new round began.
    pub new_round: bool,
}

impl GameState {
    /// A fresh session state in exploration, round 1.
    #[must_use]
    pub fn new(
        session_id: Uuid,
        campaign_id: Uuid,
        turn_order: Vec<TurnTaker>,
        now: DateTime<Utc>,
    ) -> Self {
        let mut state = Self {
            session_id,
            campaign_id,
            phase: GamePhase::Exploration,
            round: 1,
            turn_order,
            active_index: 0,
            active_turn_taker: None,
            combat_turn_budget: None,
            active_encounter_id: None,
            actions_in_flight: BTreeMap::new(),
            updated_at: now,
        };
        state.sync_active();
        state
    }

    fn sync_active(&mut self) {
        self.active_turn_taker = self.turn_order.get(self.active_index).copied();
    }

    /// Returns `true` if the turn order contains at least one player.
    #[must_use]
    pub fn has_player_turns(&self) -> bool {
        self.turn_order.iter().any(|t| !t.is_npc())
    }

    /// The actor's unsettled action, if any.
    #[must_use]
    pub fn action_in_flight(&self, actor_id: Uuid) -> Option<Uuid> {
        self.actions_in_flight.get(&actor_id).copied()
    }

    /// Marks `action_id` as the actor's unsettled action.
    pub fn claim_action(&mut self, actor_id: Uuid, action_id: Uuid) {
        self.actions_in_flight.insert(actor_id, action_id);
    }

    /// Clears the actor's marker if it still points at `action_id`.
    /// Returns `true` if a marker was removed.
    pub fn release_action(&mut self, actor_id: Uuid, action_id: Uuid) -> bool {
        if self.action_in_flight(actor_id) == Some(action_id) {
            self.actions_in_flight.remove(&actor_id);
            true
        } else {
            false
        }
    }

    /// Moves to the next turn-taker, wrapping to a new round after the last
    /// one. Resets the turn budget in combat.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the turn order is empty.
    pub fn advance_turn(&mut self, now: DateTime<Utc>) -> Result<TurnAdvance, DomainError> {
        let previous = self
            .active_turn_taker
            .ok_or_else(|| DomainError::Validation("turn order is empty".into()))?;
        let next = (self.active_index + 1) % self.turn_order.len();
        let new_round = next == 0;
        if new_round {
            self.round += 1;
        }
        self.active_index = next;
        self.sync_active();
        if self.phase == GamePhase::Combat {
            self.combat_turn_budget = Some(CombatTurnBudget::default());
        }
        self.updated_at = now;
        Ok(TurnAdvance {
            previous,
            current: self.turn_order[next],
            new_round,
        })
    }

    /// Transitions to `target`, replacing the turn order and restarting at
    /// round 1. Entering combat creates a fresh budget; leaving it clears
    /// the budget and the encounter.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidTransition` for disallowed transitions.
    pub fn enter_phase(
        &mut self,
        target: GamePhase,
        turn_order: Vec<TurnTaker>,
        encounter_id: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        self.phase.ensure_transition(target)?;
        self.phase = target;
        self.turn_order = turn_order;
        self.round = 1;
        self.active_index = 0;
        self.sync_active();
        if target == GamePhase::Combat {
            self.combat_turn_budget = Some(CombatTurnBudget::default());
            self.active_encounter_id = encounter_id;
        } else {
            self.combat_turn_budget = None;
            self.active_encounter_id = None;
        }
        self.updated_at = now;
        Ok(())
    }

    /// Replaces the turn order with a permutation of itself. The active
    /// turn-taker stays active at its new position.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidOrder` unless `new_order` holds exactly
    /// the current turn-takers.
    pub fn reorder(
        &mut self,
        new_order: Vec<TurnTaker>,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        turn_order::validate_reorder(&self.turn_order, &new_order)?;
        let active_index = self
            .active_turn_taker
            .and_then(|active| new_order.iter().position(|t| *t == active))
            .unwrap_or(0);
        self.turn_order = new_order;
        self.active_index = active_index;
        self.sync_active();
        self.updated_at = now;
        Ok(())
    }
}
