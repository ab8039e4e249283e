//! Test publishers: recording and failing `BroadcastPublisher`s.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use gamemaster_core::broadcast::{BroadcastEvent, BroadcastPublisher};
use gamemaster_core::error::DomainError;

/// A publisher that records every event it is given.
#[derive(Debug, Clone, Default)]
pub struct RecordingPublisher {
    events: Arc<Mutex<Vec<BroadcastEvent>>>,
}

impl RecordingPublisher {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of all published events.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn events(&self) -> Vec<BroadcastEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Event types in publication order.
    #[must_use]
    pub fn event_types(&self) -> Vec<&'static str> {
        self.events().iter().map(|e| e.event_type).collect()
    }

    /// Published events of one type.
    #[must_use]
    pub fn of_type(&self, event_type: &str) -> Vec<BroadcastEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.event_type == event_type)
            .collect()
    }

    /// Waits until at least `count` events of `event_type` were published.
    ///
    /// # Panics
    ///
    /// Panics if they do not arrive within `timeout`.
    pub async fn wait_for(
        &self,
        event_type: &str,
        count: usize,
        timeout: Duration,
    ) -> Vec<BroadcastEvent> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let seen = self.of_type(event_type);
            if seen.len() >= count {
                return seen;
            }
            assert!(
                tokio::time::Instant::now() < deadline,
                "timed out waiting for {count} {event_type} events; saw {:?}",
                self.event_types()
            );
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

#[async_trait]
impl BroadcastPublisher for RecordingPublisher {
    async fn publish(&self, event: BroadcastEvent) -> Result<(), DomainError> {
        self.events.lock().unwrap().push(event);
        Ok(())
    }
}

/// A publisher whose every delivery fails.
#[derive(Debug)]
pub struct FailingPublisher;

#[async_trait]
impl BroadcastPublisher for FailingPublisher {
    async fn publish(&self, _event: BroadcastEvent) -> Result<(), DomainError> {
        Err(DomainError::Infrastructure("gateway closed".into()))
    }
}
