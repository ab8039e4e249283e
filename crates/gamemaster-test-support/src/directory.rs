//! Test directory: a fixed `CampaignDirectory` and a table fixture.

use std::collections::HashMap;

use async_trait::async_trait;
use gamemaster_core::directory::{CampaignDirectory, NpcStatBlock, RosterEntry};
use gamemaster_core::error::DomainError;
use uuid::Uuid;

/// A campaign directory holding fixed data.
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    sessions: HashMap<Uuid, Uuid>,
    dms: HashMap<Uuid, Uuid>,
    rosters: HashMap<Uuid, Vec<RosterEntry>>,
    npcs: HashMap<Uuid, NpcStatBlock>,
}

impl StaticDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a session under a campaign.
    #[must_use]
    pub fn with_session(mut self, session_id: Uuid, campaign_id: Uuid) -> Self {
        self.sessions.insert(session_id, campaign_id);
        self
    }

    /// Sets the DM of a campaign.
    #[must_use]
    pub fn with_dm(mut self, campaign_id: Uuid, dm_id: Uuid) -> Self {
        self.dms.insert(campaign_id, dm_id);
        self
    }

    /// Adds an active player to a campaign roster.
    #[must_use]
    pub fn with_player(mut self, campaign_id: Uuid, entry: RosterEntry) -> Self {
        self.rosters.entry(campaign_id).or_default().push(entry);
        self
    }

    /// Adds an NPC stat block.
    #[must_use]
    pub fn with_npc(mut self, npc: NpcStatBlock) -> Self {
        self.npcs.insert(npc.npc_id, npc);
        self
    }
}

#[async_trait]
impl CampaignDirectory for StaticDirectory {
    async fn session_campaign(&self, session_id: Uuid) -> Result<Option<Uuid>, DomainError> {
        Ok(self.sessions.get(&session_id).copied())
    }

    async fn campaign_dm(&self, campaign_id: Uuid) -> Result<Option<Uuid>, DomainError> {
        Ok(self.dms.get(&campaign_id).copied())
    }

    async fn active_roster(&self, campaign_id: Uuid) -> Result<Vec<RosterEntry>, DomainError> {
        Ok(self.rosters.get(&campaign_id).cloned().unwrap_or_default())
    }

    async fn npc_stat_block(&self, npc_id: Uuid) -> Result<Option<NpcStatBlock>, DomainError> {
        Ok(self.npcs.get(&npc_id).cloned())
    }
}

/// A session with a DM and a set of players, for handler tests.
#[derive(Debug, Clone)]
pub struct Table {
    /// The session under test.
    pub session_id: Uuid,
    /// The session's campaign.
    pub campaign_id: Uuid,
    /// The campaign's DM.
    pub dm_id: Uuid,
    /// Active players, in the order given to [`Table::new`].
    pub players: Vec<RosterEntry>,
    /// NPCs known to the directory.
    pub npcs: Vec<NpcStatBlock>,
}

impl Table {
    /// Creates a table whose players have the given character names,
    /// dexterity 10, and 20 maximum hit points.
    #[must_use]
    pub fn new(character_names: &[&str]) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            campaign_id: Uuid::new_v4(),
            dm_id: Uuid::new_v4(),
            players: character_names
                .iter()
                .map(|name| RosterEntry {
                    user_id: Uuid::new_v4(),
                    character_id: Uuid::new_v4(),
                    character_name: (*name).to_owned(),
                    dexterity: 10,
                    hp_max: Some(20),
                })
                .collect(),
            npcs: Vec::new(),
        }
    }

    /// Adds an NPC with the given name, hit points, and XP reward.
    pub fn add_npc(&mut self, name: &str, hit_points: i32, xp_reward: i64) -> Uuid {
        let npc_id = Uuid::new_v4();
        self.npcs.push(NpcStatBlock {
            npc_id,
            name: name.to_owned(),
            hit_points,
            armor_class: 12,
            initiative_modifier: None,
            xp_reward,
        });
        npc_id
    }

    /// The player whose character has the given name.
    ///
    /// # Panics
    ///
    /// Panics if no such player exists.
    #[must_use]
    pub fn player(&self, character_name: &str) -> &RosterEntry {
        self.players
            .iter()
            .find(|p| p.character_name == character_name)
            .unwrap()
    }

    /// Builds a directory describing this table.
    #[must_use]
    pub fn directory(&self) -> StaticDirectory {
        let mut directory = StaticDirectory::new()
            .with_session(self.session_id, self.campaign_id)
            .with_dm(self.campaign_id, self.dm_id);
        for player in &self.players {
            directory = directory.with_player(self.campaign_id, player.clone());
        }
        for npc in &self.npcs {
            directory = directory.with_npc(npc.clone());
        }
        directory
    }
}
