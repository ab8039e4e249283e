//! Row-locked state store abstraction.
//!
//! Session-scoped aggregates (game state, live state, encounters, pending
//! actions) are persisted as JSON documents keyed by [`StateKey`]. Every
//! mutation happens inside a [`StateTransaction`] that takes row locks with
//! `SELECT ... FOR UPDATE` semantics; dropping a transaction without
//! committing rolls it back.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::DomainError;

/// The kind of document stored under a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StateKind {
    /// One per session.
    GameState,
    /// One per session and character.
    LiveState,
    /// One per combat encounter.
    Encounter,
    /// One per declared action.
    PendingAction,
}

impl StateKind {
    /// The persisted name of this kind.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::GameState => "game_state",
            Self::LiveState => "live_state",
            Self::Encounter => "encounter",
            Self::PendingAction => "pending_action",
        }
    }

    /// Parses a persisted kind name.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` for unknown names.
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        match raw {
            "game_state" => Ok(Self::GameState),
            "live_state" => Ok(Self::LiveState),
            "encounter" => Ok(Self::Encounter),
            "pending_action" => Ok(Self::PendingAction),
            other => Err(DomainError::Infrastructure(format!(
                "unknown state kind: {other}"
            ))),
        }
    }
}

/// Identifies a single stored row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateKey {
    /// Document kind.
    pub kind: StateKind,
    /// Owning scope, always the session for the current kinds.
    pub scope_id: Uuid,
    /// Entity within the scope.
    pub entity_id: Uuid,
}

impl StateKey {
    /// Key of a session's game state row.
    #[must_use]
    pub fn game_state(session_id: Uuid) -> Self {
        Self {
            kind: StateKind::GameState,
            scope_id: session_id,
            entity_id: session_id,
        }
    }

    /// Key of a character's live state row within a session.
    #[must_use]
    pub fn live_state(session_id: Uuid, character_id: Uuid) -> Self {
        Self {
            kind: StateKind::LiveState,
            scope_id: session_id,
            entity_id: character_id,
        }
    }

    /// Key of an encounter row within a session.
    #[must_use]
    pub fn encounter(session_id: Uuid, encounter_id: Uuid) -> Self {
        Self {
            kind: StateKind::Encounter,
            scope_id: session_id,
            entity_id: encounter_id,
        }
    }

    /// Key of a pending action row within a session.
    #[must_use]
    pub fn pending_action(session_id: Uuid, action_id: Uuid) -> Self {
        Self {
            kind: StateKind::PendingAction,
            scope_id: session_id,
            entity_id: action_id,
        }
    }
}

impl fmt::Display for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.kind.as_str(),
            self.scope_id,
            self.entity_id
        )
    }
}

/// Stored representation of a state document.
#[derive(Debug, Clone)]
pub struct StoredState {
    /// The row key.
    pub key: StateKey,
    /// Serialized document.
    pub payload: serde_json::Value,
    /// Incremented on every save, starting at 1.
    pub version: i64,
    /// Timestamp of the last save.
    pub updated_at: DateTime<Utc>,
}

/// Store of session-scoped documents.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Opens a new transaction.
    async fn begin(&self) -> Result<Box<dyn StateTransaction>, DomainError>;

    /// Reads a row without locking it. Used by queries and by work that
    /// must not hold a lock while suspended.
    async fn load(&self, key: &StateKey) -> Result<Option<StoredState>, DomainError>;

    /// Reads every row of `kind` within a scope without locking, ordered by
    /// entity id.
    async fn load_scope(
        &self,
        kind: StateKind,
        scope_id: Uuid,
    ) -> Result<Vec<StoredState>, DomainError>;

    /// Reads every row of `kind` across all scopes without locking, ordered
    /// by scope and entity id. Meant for startup scans.
    async fn load_kind(&self, kind: StateKind) -> Result<Vec<StoredState>, DomainError>;
}

/// A unit of work holding row locks until commit or drop.
#[async_trait]
pub trait StateTransaction: Send {
    /// Locks and reads a single row. Returns `None` if the row does not
    /// exist yet.
    async fn lock(&mut self, key: &StateKey) -> Result<Option<StoredState>, DomainError>;

    /// Locks and reads every row of `kind` within a scope, in entity id
    /// order.
    async fn lock_scope(
        &mut self,
        kind: StateKind,
        scope_id: Uuid,
    ) -> Result<Vec<StoredState>, DomainError>;

    /// Inserts or replaces a row, returning its new version.
    async fn save(
        &mut self,
        key: &StateKey,
        payload: serde_json::Value,
        updated_at: DateTime<Utc>,
    ) -> Result<i64, DomainError>;

    /// Commits all saves and releases the locks.
    async fn commit(self: Box<Self>) -> Result<(), DomainError>;
}

/// Decodes a stored document into a typed value.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` if deserialization fails.
pub fn decode<T: serde::de::DeserializeOwned>(stored: &StoredState) -> Result<T, DomainError> {
    serde_json::from_value(stored.payload.clone()).map_err(|e| {
        DomainError::Infrastructure(format!("state deserialization failed for {}: {e}", stored.key))
    })
}

/// Encodes a typed value as a document payload.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` if serialization fails.
pub fn encode<T: serde::Serialize>(value: &T) -> Result<serde_json::Value, DomainError> {
    serde_json::to_value(value)
        .map_err(|e| DomainError::Infrastructure(format!("state serialization failed: {e}")))
}
