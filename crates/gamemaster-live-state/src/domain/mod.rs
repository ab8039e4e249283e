//! Domain layer for the Live State context.

pub mod commands;
pub mod death;
pub mod events;
pub mod live_state;
