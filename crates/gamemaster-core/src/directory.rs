//! Read-only campaign directory.
//!
//! Campaign rosters, NPC stat blocks, and session ownership are maintained
//! by other services; the engine only reads them.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// Hit points assumed for a character with no recorded maximum.
pub const DEFAULT_HIT_POINTS: i32 = 10;

/// An active player in a campaign and the character they play.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    /// The player's user identifier.
    pub user_id: Uuid,
    /// The player's character.
    pub character_id: Uuid,
    /// Character display name.
    pub character_name: String,
    /// Dexterity score, used for the initiative modifier.
    pub dexterity: i32,
    /// Maximum hit points from the character record, if known.
    pub hp_max: Option<i32>,
}

impl RosterEntry {
    /// Maximum hit points, falling back to [`DEFAULT_HIT_POINTS`].
    #[must_use]
    pub fn hp_max_or_default(&self) -> i32 {
        self.hp_max.unwrap_or(DEFAULT_HIT_POINTS)
    }
}

/// Combat statistics of an NPC.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NpcStatBlock {
    /// NPC identifier.
    pub npc_id: Uuid,
    /// Display name.
    pub name: String,
    /// Maximum hit points.
    pub hit_points: i32,
    /// Armor class.
    pub armor_class: i32,
    /// Initiative modifier; enemies roll a flat d20 when absent.
    pub initiative_modifier: Option<i32>,
    /// Experience awarded when defeated.
    pub xp_reward: i64,
}

/// Read access to campaign data owned by other services.
#[async_trait]
pub trait CampaignDirectory: Send + Sync {
    /// The campaign a session belongs to.
    async fn session_campaign(&self, session_id: Uuid) -> Result<Option<Uuid>, DomainError>;

    /// The user holding DM authority over a campaign.
    async fn campaign_dm(&self, campaign_id: Uuid) -> Result<Option<Uuid>, DomainError>;

    /// Active players of a campaign.
    async fn active_roster(&self, campaign_id: Uuid) -> Result<Vec<RosterEntry>, DomainError>;

    /// Stat block of an NPC.
    async fn npc_stat_block(&self, npc_id: Uuid) -> Result<Option<NpcStatBlock>, DomainError>;
}

/// Resolves the campaign a session belongs to.
///
/// # Errors
///
/// Returns `DomainError::NotFound` if the session is unknown.
pub async fn require_session_campaign(
    directory: &dyn CampaignDirectory,
    session_id: Uuid,
) -> Result<Uuid, DomainError> {
    directory
        .session_campaign(session_id)
        .await?
        .ok_or_else(|| DomainError::not_found("session", session_id))
}

/// Returns whether `actor_id` holds DM authority over the campaign.
///
/// # Errors
///
/// Returns `DomainError` if the directory lookup fails.
pub async fn is_dm(
    directory: &dyn CampaignDirectory,
    campaign_id: Uuid,
    actor_id: Uuid,
) -> Result<bool, DomainError> {
    Ok(directory.campaign_dm(campaign_id).await? == Some(actor_id))
}

/// Fails with `Forbidden` unless `actor_id` is the campaign's DM.
///
/// # Errors
///
/// Returns `DomainError::Forbidden` for non-DM actors.
pub async fn require_dm(
    directory: &dyn CampaignDirectory,
    campaign_id: Uuid,
    actor_id: Uuid,
    operation: &str,
) -> Result<(), DomainError> {
    if is_dm(directory, campaign_id, actor_id).await? {
        Ok(())
    } else {
        Err(DomainError::Forbidden(format!(
            "{operation} requires DM authority"
        )))
    }
}
