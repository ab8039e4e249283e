//! `PostgreSQL` implementation of the `CampaignDirectory` trait.

use async_trait::async_trait;
use gamemaster_core::directory::{CampaignDirectory, NpcStatBlock, RosterEntry};
use gamemaster_core::error::DomainError;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db_error;

/// Read-only view of the campaign tables.
#[derive(Debug, Clone)]
pub struct PgCampaignDirectory {
    pool: PgPool,
}

impl PgCampaignDirectory {
    /// Creates a new `PgCampaignDirectory`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CampaignDirectory for PgCampaignDirectory {
    async fn session_campaign(&self, session_id: Uuid) -> Result<Option<Uuid>, DomainError> {
        let row: Option<(Uuid,)> =
            sqlx::query_as("SELECT campaign_id FROM game_sessions WHERE id = $1")
                .bind(session_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_error)?;
        Ok(row.map(|(campaign_id,)| campaign_id))
    }

    async fn campaign_dm(&self, campaign_id: Uuid) -> Result<Option<Uuid>, DomainError> {
        let row: Option<(Uuid,)> = sqlx::query_as("SELECT dm_user_id FROM campaigns WHERE id = $1")
            .bind(campaign_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(row.map(|(dm_user_id,)| dm_user_id))
    }

    async fn active_roster(&self, campaign_id: Uuid) -> Result<Vec<RosterEntry>, DomainError> {
        let rows: Vec<(Uuid, Uuid, String, i32, Option<i32>)> = sqlx::query_as(
            "SELECT cp.user_id, c.id, c.name, c.dexterity, c.hp_max \
             FROM campaign_players cp \
             JOIN characters c ON c.id = cp.character_id \
             WHERE cp.campaign_id = $1 AND cp.active \
             ORDER BY c.name, c.id",
        )
        .bind(campaign_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(rows
            .into_iter()
            .map(
                |(user_id, character_id, character_name, dexterity, hp_max)| RosterEntry {
                    user_id,
                    character_id,
                    character_name,
                    dexterity,
                    hp_max,
                },
            )
            .collect())
    }

    async fn npc_stat_block(&self, npc_id: Uuid) -> Result<Option<NpcStatBlock>, DomainError> {
        let row: Option<(Uuid, String, i32, i32, Option<i32>, i64)> = sqlx::query_as(
            "SELECT id, name, hit_points, armor_class, initiative_modifier, xp_reward \
             FROM npcs WHERE id = $1",
        )
        .bind(npc_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(row.map(
            |(npc_id, name, hit_points, armor_class, initiative_modifier, xp_reward)| {
                NpcStatBlock {
                    npc_id,
                    name,
                    hit_points,
                    armor_class,
                    initiative_modifier,
                    xp_reward,
                }
            },
        ))
    }
}
