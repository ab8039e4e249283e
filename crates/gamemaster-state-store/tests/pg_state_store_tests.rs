//! Integration tests for `PgStateStore`.

use std::time::Duration;

use chrono::Utc;
use gamemaster_core::state::{StateKey, StateKind, StateStore};
use gamemaster_state_store::PgStateStore;
use sqlx::PgPool;
use uuid::Uuid;

// --- load ---

#[sqlx::test(migrations = "../../migrations")]
async fn test_load_returns_none_for_missing_row(pool: PgPool) {
    let store = PgStateStore::new(pool);

    let loaded = store
        .load(&StateKey::game_state(Uuid::new_v4()))
        .await
        .unwrap();

    assert!(loaded.is_none());
}

// --- save + commit ---

#[sqlx::test(migrations = "../../migrations")]
async fn test_save_and_commit_makes_row_visible(pool: PgPool) {
    // Arrange
    let store = PgStateStore::new(pool);
    let key = StateKey::game_state(Uuid::new_v4());
    let payload = serde_json::json!({ "phase": "exploration", "round": 1 });

    // Act
    let mut tx = store.begin().await.unwrap();
    let version = tx.save(&key, payload.clone(), Utc::now()).await.unwrap();
    tx.commit().await.unwrap();

    // Assert
    assert_eq!(version, 1);
    let loaded = store.load(&key).await.unwrap().unwrap();
    assert_eq!(loaded.key, key);
    assert_eq!(loaded.payload, payload);
    assert_eq!(loaded.version, 1);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_each_save_increments_version(pool: PgPool) {
    let store = PgStateStore::new(pool);
    let key = StateKey::live_state(Uuid::new_v4(), Uuid::new_v4());

    for expected in 1..=3 {
        let mut tx = store.begin().await.unwrap();
        let version = tx
            .save(&key, serde_json::json!({ "hp": expected }), Utc::now())
            .await
            .unwrap();
        tx.commit().await.unwrap();
        assert_eq!(version, expected);
    }

    let loaded = store.load(&key).await.unwrap().unwrap();
    assert_eq!(loaded.payload["hp"], 3);
}

// --- rollback ---

#[sqlx::test(migrations = "../../migrations")]
async fn test_dropped_transaction_rolls_back(pool: PgPool) {
    // Arrange
    let store = PgStateStore::new(pool);
    let key = StateKey::encounter(Uuid::new_v4(), Uuid::new_v4());

    // Act
    {
        let mut tx = store.begin().await.unwrap();
        tx.save(&key, serde_json::json!({ "status": "active" }), Utc::now())
            .await
            .unwrap();
    }

    // Assert
    assert!(store.load(&key).await.unwrap().is_none());
}

// --- scopes ---

#[sqlx::test(migrations = "../../migrations")]
async fn test_scope_reads_only_matching_kind_and_scope(pool: PgPool) {
    // Arrange
    let store = PgStateStore::new(pool);
    let session_id = Uuid::new_v4();
    let mut tx = store.begin().await.unwrap();
    for _ in 0..3 {
        tx.save(
            &StateKey::live_state(session_id, Uuid::new_v4()),
            serde_json::json!({}),
            Utc::now(),
        )
        .await
        .unwrap();
    }
    tx.save(
        &StateKey::live_state(Uuid::new_v4(), Uuid::new_v4()),
        serde_json::json!({}),
        Utc::now(),
    )
    .await
    .unwrap();
    tx.save(&StateKey::game_state(session_id), serde_json::json!({}), Utc::now())
        .await
        .unwrap();
    tx.commit().await.unwrap();

    // Act
    let rows = store
        .load_scope(StateKind::LiveState, session_id)
        .await
        .unwrap();

    // Assert
    assert_eq!(rows.len(), 3);
    assert!(rows.windows(2).all(|w| w[0].key.entity_id < w[1].key.entity_id));
    assert!(rows.iter().all(|r| r.key.kind == StateKind::LiveState));
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_kind_scan_reads_every_scope(pool: PgPool) {
    // Arrange
    let store = PgStateStore::new(pool);
    let sessions = [Uuid::new_v4(), Uuid::new_v4()];
    let mut tx = store.begin().await.unwrap();
    for session_id in sessions {
        tx.save(&StateKey::game_state(session_id), serde_json::json!({}), Utc::now())
            .await
            .unwrap();
        tx.save(
            &StateKey::live_state(session_id, Uuid::new_v4()),
            serde_json::json!({}),
            Utc::now(),
        )
        .await
        .unwrap();
    }
    tx.commit().await.unwrap();

    // Act
    let rows = store.load_kind(StateKind::GameState).await.unwrap();

    // Assert
    let scopes: Vec<Uuid> = rows.iter().map(|r| r.key.scope_id).collect();
    let mut expected = sessions.to_vec();
    expected.sort();
    assert_eq!(scopes, expected);
    assert!(rows.iter().all(|r| r.key.kind == StateKind::GameState));
}

// --- locking ---

#[sqlx::test(migrations = "../../migrations")]
async fn test_lock_blocks_second_writer_until_commit(pool: PgPool) {
    // Arrange
    let store = PgStateStore::new(pool);
    let key = StateKey::game_state(Uuid::new_v4());
    let mut seed = store.begin().await.unwrap();
    seed.save(&key, serde_json::json!({ "round": 1 }), Utc::now())
        .await
        .unwrap();
    seed.commit().await.unwrap();

    let mut first = store.begin().await.unwrap();
    first.lock(&key).await.unwrap().unwrap();

    // Act
    let contender = {
        let store = store.clone();
        tokio::spawn(async move {
            let mut second = store.begin().await.unwrap();
            let row = second.lock(&key).await.unwrap().unwrap();
            second.commit().await.unwrap();
            row.payload
        })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;
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

#[sqlx::test(migrations = "../../migrations")]
async fn test_lock_missing_row_serializes_creators(pool: PgPool) {
    // Arrange
    let store = PgStateStore::new(pool);
    let key = StateKey::game_state(Uuid::new_v4());
    let mut first = store.begin().await.unwrap();
    assert!(first.lock(&key).await.unwrap().is_none());

    // Act
    let contender = {
        let store = store.clone();
        tokio::spawn(async move {
            let mut second = store.begin().await.unwrap();
            let row = second.lock(&key).await.unwrap();
            second.commit().await.unwrap();
            row.map(|r| r.version)
        })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!contender.is_finished());
    first
        .save(&key, serde_json::json!({ "round": 1 }), Utc::now())
        .await
        .unwrap();
    first.commit().await.unwrap();

    // Assert
    assert_eq!(contender.await.unwrap(), Some(1));
}
