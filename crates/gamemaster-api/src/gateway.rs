//! In-process broadcast gateway.
//!
//! Every engine event goes onto one `tokio::sync::broadcast` channel; each
//! WebSocket connection subscribes and forwards the events of its session.

use async_trait::async_trait;
use gamemaster_core::broadcast::{BroadcastEvent, BroadcastPublisher};
use gamemaster_core::error::DomainError;
use tokio::sync::broadcast;

/// Fan-out publisher backed by a broadcast channel.
#[derive(Debug, Clone)]
pub struct ChannelPublisher {
    sender: broadcast::Sender<BroadcastEvent>,
}

impl ChannelPublisher {
    /// Creates a gateway buffering `capacity` events per subscriber.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero; configuration rejects that value.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Receives every event published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<BroadcastEvent> {
        self.sender.subscribe()
    }
}

#[async_trait]
impl BroadcastPublisher for ChannelPublisher {
    async fn publish(&self, event: BroadcastEvent) -> Result<(), DomainError> {
        // No connected clients is not a failure.
        if let Err(broadcast::error::SendError(event)) = self.sender.send(event) {
            tracing::debug!(
                session_id = %event.session_id,
                event_type = event.event_type,
                "no subscribers for event"
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use gamemaster_core::broadcast::{DM_NARRATION, TURN_ADVANCED};
    use serde_json::json;
    use uuid::Uuid;

    use super::*;

    #[tokio::test]
    async fn test_publish_without_subscribers_succeeds() {
        let gateway = ChannelPublisher::new(4);
        let event = BroadcastEvent::new(Uuid::new_v4(), TURN_ADVANCED, &json!({}), Utc::now());

        let result = gateway.publish(event).await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_subscribers_receive_events_in_order() {
        // Arrange
        let gateway = ChannelPublisher::new(4);
        let mut first = gateway.subscribe();
        let mut second = gateway.subscribe();
        let session_id = Uuid::new_v4();

        // Act
        for event_type in [DM_NARRATION, TURN_ADVANCED] {
            gateway
                .publish(BroadcastEvent::new(session_id, event_type, &json!({}), Utc::now()))
                .await
                .unwrap();
        }

        // Assert
        assert_eq!(first.recv().await.unwrap().event_type, DM_NARRATION);
        assert_eq!(first.recv().await.unwrap().event_type, TURN_ADVANCED);
        assert_eq!(second.recv().await.unwrap().event_type, DM_NARRATION);
    }
}
