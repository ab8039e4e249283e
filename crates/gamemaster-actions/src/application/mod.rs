//! Application layer for the Actions context.

pub mod command_handlers;
pub mod context;
pub mod engine;
pub mod query_handlers;
pub mod repository;
