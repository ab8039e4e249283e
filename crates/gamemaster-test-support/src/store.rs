//! Test state stores: in-memory `StateStore` implementations for tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gamemaster_core::error::DomainError;
use gamemaster_core::state::{StateKey, StateKind, StateStore, StateTransaction, StoredState};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::OwnedMutexGuard;
use uuid::Uuid;

#[derive(Debug, Default)]
struct Inner {
    rows: Mutex<BTreeMap<StateKey, StoredState>>,
    row_locks: Mutex<HashMap<StateKey, Arc<tokio::sync::Mutex<()>>>>,
    commits: Mutex<usize>,
}

impl Inner {
    fn row_lock(&self, key: &StateKey) -> Arc<tokio::sync::Mutex<()>> {
        Arc::clone(
            self.row_locks
                .lock()
                .unwrap()
                .entry(*key)
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(()))),
        )
    }
}

/// A state store backed by a `BTreeMap` with real per-row locking.
///
/// Each locked row is guarded by an owned async mutex held until the
/// transaction commits or is dropped, so concurrent transactions serialize
/// the same way they would against `SELECT ... FOR UPDATE`. Writes are
/// staged and only become visible on commit.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStateStore {
    inner: Arc<Inner>,
}

impl InMemoryStateStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a row directly, bypassing locks.
    ///
    /// # Panics
    ///
    /// Panics if `value` cannot be serialized.
    pub fn insert<T: Serialize>(&self, key: StateKey, value: &T) {
        let mut rows = self.inner.rows.lock().unwrap();
        let version = rows.get(&key).map_or(0, |r| r.version) + 1;
        rows.insert(
            key,
            StoredState {
                key,
                payload: serde_json::to_value(value).unwrap(),
                version,
                updated_at: Utc::now(),
            },
        );
    }

    /// Reads and decodes a committed row.
    ///
    /// # Panics
    ///
    /// Panics if the stored payload does not decode as `T`.
    #[must_use]
    pub fn get<T: DeserializeOwned>(&self, key: &StateKey) -> Option<T> {
        self.inner
            .rows
            .lock()
            .unwrap()
            .get(key)
            .map(|row| serde_json::from_value(row.payload.clone()).unwrap())
    }

    /// Decodes every committed row of `kind` within a scope.
    ///
    /// # Panics
    ///
    /// Panics if a stored payload does not decode as `T`.
    #[must_use]
    pub fn all<T: DeserializeOwned>(&self, kind: StateKind, scope_id: Uuid) -> Vec<T> {
        self.inner
            .rows
            .lock()
            .unwrap()
            .values()
            .filter(|row| row.key.kind == kind && row.key.scope_id == scope_id)
            .map(|row| serde_json::from_value(row.payload.clone()).unwrap())
            .collect()
    }

    /// Committed version of a row, if it exists.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn version(&self, key: &StateKey) -> Option<i64> {
        self.inner.rows.lock().unwrap().get(key).map(|r| r.version)
    }

    /// Number of committed transactions.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn commit_count(&self) -> usize {
        *self.inner.commits.lock().unwrap()
    }

    /// Returns `true` if some open transaction holds the row lock.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn is_locked(&self, key: &StateKey) -> bool {
        self.inner
            .row_locks
            .lock()
            .unwrap()
            .get(key)
            .is_some_and(|lock| lock.try_lock().is_err())
    }
}

#[async_trait]
impl StateStore for InMemoryStateStore {
    async fn begin(&self) -> Result<Box<dyn StateTransaction>, DomainError> {
        Ok(Box::new(InMemoryTransaction {
            inner: Arc::clone(&self.inner),
            guards: HashMap::new(),
            staged: BTreeMap::new(),
        }))
    }

    async fn load(&self, key: &StateKey) -> Result<Option<StoredState>, DomainError> {
        Ok(self.inner.rows.lock().unwrap().get(key).cloned())
    }

    async fn load_scope(
        &self,
        kind: StateKind,
        scope_id: Uuid,
    ) -> Result<Vec<StoredState>, DomainError> {
        Ok(self
            .inner
            .rows
            .lock()
            .unwrap()
            .values()
            .filter(|row| row.key.kind == kind && row.key.scope_id == scope_id)
            .cloned()
            .collect())
    }

    async fn load_kind(&self, kind: StateKind) -> Result<Vec<StoredState>, DomainError> {
        Ok(self
            .inner
            .rows
            .lock()
            .unwrap()
            .values()
            .filter(|row| row.key.kind == kind)
            .cloned()
            .collect())
    }
}

struct InMemoryTransaction {
    inner: Arc<Inner>,
    guards: HashMap<StateKey, OwnedMutexGuard<()>>,
    staged: BTreeMap<StateKey, StoredState>,
}

impl InMemoryTransaction {
    async fn acquire(&mut self, key: &StateKey) {
        if self.guards.contains_key(key) {
            return;
        }
        let lock = self.inner.row_lock(key);
        let guard = lock.lock_owned().await;
        self.guards.insert(*key, guard);
    }

    fn read(&self, key: &StateKey) -> Option<StoredState> {
        self.staged
            .get(key)
            .cloned()
            .or_else(|| self.inner.rows.lock().unwrap().get(key).cloned())
    }
}

#[async_trait]
impl StateTransaction for InMemoryTransaction {
    async fn lock(&mut self, key: &StateKey) -> Result<Option<StoredState>, DomainError> {
        self.acquire(key).await;
        Ok(self.read(key))
    }

    async fn lock_scope(
        &mut self,
        kind: StateKind,
        scope_id: Uuid,
    ) -> Result<Vec<StoredState>, DomainError> {
        let mut keys: Vec<StateKey> = self
            .inner
            .rows
            .lock()
            .unwrap()
            .keys()
            .chain(self.staged.keys())
            .filter(|key| key.kind == kind && key.scope_id == scope_id)
            .copied()
            .collect();
        keys.sort();
        keys.dedup();

        let mut rows = Vec::with_capacity(keys.len());
        for key in keys {
            self.acquire(&key).await;
            if let Some(row) = self.read(&key) {
                rows.push(row);
            }
        }
        Ok(rows)
    }

    async fn save(
        &mut self,
        key: &StateKey,
        payload: serde_json::Value,
        updated_at: DateTime<Utc>,
    ) -> Result<i64, DomainError> {
        self.acquire(key).await;
        let version = self.read(key).map_or(0, |row| row.version) + 1;
        self.staged.insert(
            *key,
            StoredState {
                key: *key,
                payload,
                version,
                updated_at,
            },
        );
        Ok(version)
    }

    async fn commit(self: Box<Self>) -> Result<(), DomainError> {
        let this = *self;
        {
            let mut rows = this.inner.rows.lock().unwrap();
            for (key, row) in this.staged {
                rows.insert(key, row);
            }
        }
        *this.inner.commits.lock().unwrap() += 1;
        drop(this.guards);
        Ok(())
    }
}

/// A state store whose every operation fails with an infrastructure error.
#[derive(Debug)]
pub struct FailingStateStore;

#[async_trait]
impl StateStore for FailingStateStore {
    async fn begin(&self) -> Result<Box<dyn StateTransaction>, DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }

    async fn load(&self, _key: &StateKey) -> Result<Option<StoredState>, DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }

    async fn load_scope(
        &self,
        _kind: StateKind,
        _scope_id: Uuid,
    ) -> Result<Vec<StoredState>, DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }

    async fn load_kind(&self, _kind: StateKind) -> Result<Vec<StoredState>, DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_uncommitted_writes_are_discarded_on_drop() {
        // Arrange
        let store = InMemoryStateStore::new();
        let key = StateKey::game_state(Uuid::new_v4());

        // Act
        let mut tx = store.begin().await.unwrap();
        tx.save(&key, serde_json::json!({ "round": 1 }), Utc::now())
            .await
            .unwrap();
        drop(tx);

        // Assert
        assert!(store.load(&key).await.unwrap().is_none());
        assert!(!store.is_locked(&key));
    }

    #[tokio::test]
    async fn test_commit_publishes_writes_and_increments_version() {
        let store = InMemoryStateStore::new();
        let key = StateKey::game_state(Uuid::new_v4());
        store.insert(key, &serde_json::json!({ "round": 1 }));

        let mut tx = store.begin().await.unwrap();
        let version = tx
            .save(&key, serde_json::json!({ "round": 2 }), Utc::now())
            .await
            .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(version, 2);
        assert_eq!(store.version(&key), Some(2));
        assert_eq!(store.commit_count(), 1);
    }

    #[tokio::test]
    async fn test_second_lock_waits_for_first_transaction() {
        // Arrange
        let store = InMemoryStateStore::new();
        let key = StateKey::game_state(Uuid::new_v4());
        store.insert(key, &serde_json::json!({ "round": 1 }));
        let mut first = store.begin().await.unwrap();
        first.lock(&key).await.unwrap();

        // Act
        let contender = {
            let store = store.clone();
            tokio::spawn(async move {
                let mut second = store.begin().await.unwrap();
                second.lock(&key).await.unwrap().unwrap().payload
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());
        first
            .save(&key, serde_json::json!({ "round": 2 }), Utc::now())
            .await
            .unwrap();
        first.commit().await.unwrap();

        // Assert
        let seen = contender.await.unwrap();
        assert_eq!(seen["round"], 2);
    }

    #[tokio::test]
    async fn test_lock_scope_returns_rows_in_entity_order() {
        let store = InMemoryStateStore::new();
        let session_id = Uuid::new_v4();
        let mut ids = vec![Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4()];
        for id in &ids {
            store.insert(StateKey::live_state(session_id, *id), &serde_json::json!({}));
        }
        store.insert(
            StateKey::live_state(Uuid::new_v4(), Uuid::new_v4()),
            &serde_json::json!({}),
        );
        ids.sort();

        let mut tx = store.begin().await.unwrap();
        let rows = tx
            .lock_scope(StateKind::LiveState, session_id)
            .await
            .unwrap();

        let seen: Vec<Uuid> = rows.iter().map(|r| r.key.entity_id).collect();
        assert_eq!(seen, ids);
    }
}
