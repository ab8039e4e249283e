//! Shared application state.

use gamemaster_actions::application::engine::ActionEngine;

use crate::gateway::ChannelPublisher;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// The session engine.
    pub engine: ActionEngine,
    /// Event fan-out for WebSocket clients.
    pub gateway: ChannelPublisher,
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(engine: ActionEngine, gateway: ChannelPublisher) -> Self {
        Self { engine, gateway }
    }
}
