//! Gamemaster State Store: PostgreSQL persistence.
//!
//! Session state lives as JSON documents in one `engine_state` table, locked
//! row by row with `SELECT ... FOR UPDATE`. Campaign data owned by other
//! services is read through [`PgCampaignDirectory`].

pub mod pg_campaign_directory;
pub mod pg_state_store;

pub use pg_campaign_directory::PgCampaignDirectory;
pub use pg_state_store::PgStateStore;

/// Maps a database failure onto the domain's infrastructure error.
pub(crate) fn db_error(err: sqlx::Error) -> gamemaster_core::error::DomainError {
    gamemaster_core::error::DomainError::Infrastructure(format!("database error: {err}"))
}
