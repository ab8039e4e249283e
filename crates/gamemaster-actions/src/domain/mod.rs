//! Domain layer for the Actions context.

pub mod commands;
pub mod events;
pub mod outcome;
pub mod pending_action;
