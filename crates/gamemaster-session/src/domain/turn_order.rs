//! Turn order resolver.
//!
//! Pure functions that produce deterministic turn orders from combatants or
//! a campaign roster, and validate DM reorders.

use std::collections::BTreeMap;

use gamemaster_core::directory::RosterEntry;
use gamemaster_core::error::DomainError;
use gamemaster_core::turn_taker::TurnTaker;

/// A combatant as seen by the resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitiativeEntry {
    /// Who acts.
    pub turn_taker: TurnTaker,
    /// Display name, the tie-breaker.
    pub name: String,
    /// Rolled initiative.
    pub initiative: i32,
}

/// Orders combatants by initiative, highest first, then by name.
#[must_use]
pub fn combat_order(entries: &[InitiativeEntry]) -> Vec<TurnTaker> {
    let mut sorted: Vec<&InitiativeEntry> = entries.iter().collect();
    sorted.sort_by(|a, b| {
        b.initiative
            .cmp(&a.initiative)
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| a.turn_taker.cmp(&b.turn_taker))
    });
    sorted.into_iter().map(|e| e.turn_taker).collect()
}

/// Orders a campaign's active players by character name.
#[must_use]
pub fn roster_order(roster: &[RosterEntry]) -> Vec<TurnTaker> {
    let mut sorted: Vec<&RosterEntry> = roster.iter().collect();
    sorted.sort_by(|a, b| {
        a.character_name
            .cmp(&b.character_name)
            .then_with(|| a.user_id.cmp(&b.user_id))
    });
    sorted
        .into_iter()
        .map(|e| TurnTaker::Player { user_id: e.user_id })
        .collect()
}

/// Checks that `proposed` holds exactly the turn-takers of `current`.
///
/// # Errors
///
/// Returns `DomainError::InvalidOrder` if the multisets differ.
pub fn validate_reorder(current: &[TurnTaker], proposed: &[TurnTaker]) -> Result<(), DomainError> {
    fn counts(order: &[TurnTaker]) -> BTreeMap<TurnTaker, usize> {
        let mut map = BTreeMap::new();
        for taker in order {
            *map.entry(*taker).or_insert(0) += 1;
        }
        map
    }

    if current.len() != proposed.len() {
        return Err(DomainError::InvalidOrder(format!(
            "expected {} turn-takers, got {}",
            current.len(),
            proposed.len()
        )));
    }
    if counts(current) != counts(proposed) {
        return Err(DomainError::InvalidOrder(
            "turn-takers do not match the current turn order".into(),
        ));
    }
    Ok(())
}
