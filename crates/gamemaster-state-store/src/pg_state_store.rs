//! `PostgreSQL` implementation of the `StateStore` trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gamemaster_core::error::DomainError;
use gamemaster_core::state::{StateKey, StateKind, StateStore, StateTransaction, StoredState};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::db_error;

type StateRow = (String, Uuid, Uuid, serde_json::Value, i64, DateTime<Utc>);

const SELECT_COLUMNS: &str =
    "SELECT kind, scope_id, entity_id, payload, version, updated_at FROM engine_state";

fn to_stored(row: StateRow) -> Result<StoredState, DomainError> {
    let (kind, scope_id, entity_id, payload, version, updated_at) = row;
    Ok(StoredState {
        key: StateKey {
            kind: StateKind::parse(&kind)?,
            scope_id,
            entity_id,
        },
        payload,
        version,
        updated_at,
    })
}

fn to_stored_all(rows: Vec<StateRow>) -> Result<Vec<StoredState>, DomainError> {
    rows.into_iter().map(to_stored).collect()
}

/// PostgreSQL-backed state store.
#[derive(Debug, Clone)]
pub struct PgStateStore {
    pool: PgPool,
}

impl PgStateStore {
    /// Creates a new `PgStateStore`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StateStore for PgStateStore {
    async fn begin(&self) -> Result<Box<dyn StateTransaction>, DomainError> {
        let tx = self.pool.begin().await.map_err(db_error)?;
        Ok(Box::new(PgStateTransaction { tx }))
    }

    async fn load(&self, key: &StateKey) -> Result<Option<StoredState>, DomainError> {
        let row: Option<StateRow> = sqlx::query_as(&format!(
            "{SELECT_COLUMNS} WHERE kind = $1 AND scope_id = $2 AND entity_id = $3"
        ))
        .bind(key.kind.as_str())
        .bind(key.scope_id)
        .bind(key.entity_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;
        row.map(to_stored).transpose()
    }

    async fn load_scope(
        &self,
        kind: StateKind,
        scope_id: Uuid,
    ) -> Result<Vec<StoredState>, DomainError> {
        let rows: Vec<StateRow> = sqlx::query_as(&format!(
            "{SELECT_COLUMNS} WHERE kind = $1 AND scope_id = $2 ORDER BY entity_id"
        ))
        .bind(kind.as_str())
        .bind(scope_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;
        to_stored_all(rows)
    }

    async fn load_kind(&self, kind: StateKind) -> Result<Vec<StoredState>, DomainError> {
        let rows: Vec<StateRow> = sqlx::query_as(&format!(
            "{SELECT_COLUMNS} WHERE kind = $1 ORDER BY scope_id, entity_id"
        ))
        .bind(kind.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;
        to_stored_all(rows)
    }
}

/// An open database transaction. Dropping it without committing rolls it
/// back and releases every row lock.
pub struct PgStateTransaction {
    tx: Transaction<'static, Postgres>,
}

impl PgStateTransaction {
    async fn select_for_update(&mut self, key: &StateKey) -> Result<Option<StoredState>, DomainError> {
        let row: Option<StateRow> = sqlx::query_as(&format!(
            "{SELECT_COLUMNS} WHERE kind = $1 AND scope_id = $2 AND entity_id = $3 FOR UPDATE"
        ))
        .bind(key.kind.as_str())
        .bind(key.scope_id)
        .bind(key.entity_id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(db_error)?;
        row.map(to_stored).transpose()
    }
}

#[async_trait]
impl StateTransaction for PgStateTransaction {
    async fn lock(&mut self, key: &StateKey) -> Result<Option<StoredState>, DomainError> {
        if let Some(stored) = self.select_for_update(key).await? {
            return Ok(Some(stored));
        }
        // A missing row cannot be locked; serialize its creators on an
        // advisory lock held until the transaction ends, then look again.
        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
            .bind(key.to_string())
            .execute(&mut *self.tx)
            .await
            .map_err(db_error)?;
        self.select_for_update(key).await
    }

    async fn lock_scope(
        &mut self,
        kind: StateKind,
        scope_id: Uuid,
    ) -> Result<Vec<StoredState>, DomainError> {
        let rows: Vec<StateRow> = sqlx::query_as(&format!(
            "{SELECT_COLUMNS} WHERE kind = $1 AND scope_id = $2 ORDER BY entity_id FOR UPDATE"
        ))
        .bind(kind.as_str())
        .bind(scope_id)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(db_error)?;
        to_stored_all(rows)
    }

    async fn save(
        &mut self,
        key: &StateKey,
        payload: serde_json::Value,
        updated_at: DateTime<Utc>,
    ) -> Result<i64, DomainError> {
        let (version,): (i64,) = sqlx::query_as(
            "INSERT INTO engine_state (kind, scope_id, entity_id, payload, version, updated_at) \
             VALUES ($1, $2, $3, $4, 1, $5) \
             ON CONFLICT (kind, scope_id, entity_id) DO UPDATE \
             SET payload = EXCLUDED.payload, \
                 version = engine_state.version + 1, \
                 updated_at = EXCLUDED.updated_at \
             RETURNING version",
        )
        .bind(key.kind.as_str())
        .bind(key.scope_id)
        .bind(key.entity_id)
        .bind(payload)
        .bind(updated_at)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(db_error)?;
        tracing::debug!(%key, version, "state saved");
        Ok(version)
    }

    async fn commit(self: Box<Self>) -> Result<(), DomainError> {
        self.tx.commit().await.map_err(db_error)
    }
}
