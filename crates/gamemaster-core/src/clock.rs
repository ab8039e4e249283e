//! Time source.
//!
//! Every persisted timestamp (`updatedAt`, `createdAt`, event `occurred_at`)
//! comes from a [`Clock`], so tests can pin the whole engine to one instant.

use std::sync::Arc;

use chrono::{DateTime, Utc};

/// Source of "now" for state mutations and events.
pub trait Clock: Send + Sync {
    /// The current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// Clock handle shared between request handlers and background jobs.
pub type SharedClock = Arc<dyn Clock>;

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
