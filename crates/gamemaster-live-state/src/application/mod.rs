//! Application layer for the Live State context.

pub mod command_handlers;
pub mod query_handlers;
pub mod repository;
