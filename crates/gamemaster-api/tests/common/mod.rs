//! Shared test helpers for API integration tests.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use gamemaster_actions::application::engine::{ActionEngine, EngineDeps};
use gamemaster_api::gateway::ChannelPublisher;
use gamemaster_api::routes::actor::ACTOR_HEADER;
use gamemaster_api::state::AppState;
use gamemaster_state_store::{PgCampaignDirectory, PgStateStore};
use gamemaster_test_support::{FixedClock, ScriptedNarrator, SequenceRng};
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;
use uuid::Uuid;

/// Campaign rows inserted by [`seed_campaign`].
pub struct Seeded {
    pub campaign_id: Uuid,
    pub session_id: Uuid,
    pub dm_id: Uuid,
    /// `(user_id, character_id)` per character name, in insertion order.
    pub players: Vec<(Uuid, Uuid)>,
    pub goblin_id: Uuid,
}

/// Inserts a campaign with a DM, one session, the named characters (dex 10,
/// 20 hp) and a 7 hp goblin worth 50 XP.
pub async fn seed_campaign(pool: &PgPool, names: &[&str]) -> Seeded {
    let campaign_id = Uuid::new_v4();
    let session_id = Uuid::new_v4();
    let dm_id = Uuid::new_v4();
    sqlx::query("INSERT INTO campaigns (id, name, dm_user_id) VALUES ($1, 'The Sunken Keep', $2)")
        .bind(campaign_id)
        .bind(dm_id)
        .execute(pool)
        .await
        .unwrap();
    sqlx::query("INSERT INTO game_sessions (id, campaign_id) VALUES ($1, $2)")
        .bind(session_id)
        .bind(campaign_id)
        .execute(pool)
        .await
        .unwrap();

    let mut players = Vec::new();
    for name in names {
        let user_id = Uuid::new_v4();
        let character_id = Uuid::new_v4();
        sqlx::query("INSERT INTO characters (id, name, dexterity, hp_max) VALUES ($1, $2, 10, 20)")
            .bind(character_id)
            .bind(name)
            .execute(pool)
            .await
            .unwrap();
        sqlx::query(
            "INSERT INTO campaign_players (campaign_id, user_id, character_id) VALUES ($1, $2, $3)",
        )
        .bind(campaign_id)
        .bind(user_id)
        .bind(character_id)
        .execute(pool)
        .await
        .unwrap();
        players.push((user_id, character_id));
    }

    let goblin_id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO npcs (id, campaign_id, name, hit_points, armor_class, xp_reward) \
         VALUES ($1, $2, 'Goblin', 7, 12, 50)",
    )
    .bind(goblin_id)
    .bind(campaign_id)
    .execute(pool)
    .await
    .unwrap();

    Seeded {
        campaign_id,
        session_id,
        dm_id,
        players,
        goblin_id,
    }
}

/// Build the full app over `PostgreSQL` with a deterministic clock and dice.
pub fn build_test_app(pool: PgPool, narrator: ScriptedNarrator, rolls: Vec<u32>) -> Router {
    let gateway = ChannelPublisher::new(64);
    let engine = ActionEngine::start(EngineDeps {
        store: Arc::new(PgStateStore::new(pool.clone())),
        directory: Arc::new(PgCampaignDirectory::new(pool)),
        narrator: Arc::new(narrator),
        publisher: Arc::new(gateway.clone()),
        clock: Arc::new(FixedClock::epoch()),
        rng: Arc::new(Mutex::new(SequenceRng::new(rolls))),
    });
    gamemaster_api::app(AppState::new(engine, gateway))
}

async fn read(app: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();

    (status, json)
}

/// Send a POST request with a JSON body as `actor` and return the response.
pub async fn post_json(
    app: Router,
    uri: &str,
    actor: Uuid,
    body: &serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .header(ACTOR_HEADER, actor.to_string())
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap();
    read(app, request).await
}

/// Send a GET request and return the response.
pub async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    read(app, request).await
}
