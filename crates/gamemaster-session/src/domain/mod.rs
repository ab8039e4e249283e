//! Domain layer for the Session context.

pub mod commands;
pub mod events;
pub mod game_state;
pub mod phase;
pub mod turn_budget;
pub mod turn_order;
