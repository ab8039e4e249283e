//! Application layer for the Session context.

pub mod command_handlers;
pub mod query_handlers;
pub mod repository;
