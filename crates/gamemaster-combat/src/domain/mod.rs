//! Domain layer for the Combat context.

pub mod action_economy;
pub mod commands;
pub mod encounter;
pub mod events;
pub mod initiative;
