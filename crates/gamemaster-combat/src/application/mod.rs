//! Application layer for the Combat context.

pub mod command_handlers;
pub mod query_handlers;
pub mod repository;
