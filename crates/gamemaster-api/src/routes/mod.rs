//! HTTP and WebSocket routes.

pub mod actor;
pub mod combat;
pub mod health;
pub mod sessions;

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use axum::Router;
    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode};
    use gamemaster_actions::application::engine::{ActionEngine, EngineDeps};
    use gamemaster_core::broadcast::BroadcastEvent;
    use gamemaster_test_support::{FixedClock, InMemoryStateStore, ScriptedNarrator, SequenceRng, Table};
    use serde_json::Value;
    use tokio::sync::broadcast;
    use tower::ServiceExt;
    use uuid::Uuid;

    use super::actor::ACTOR_HEADER;
    use crate::gateway::ChannelPublisher;
    use crate::state::AppState;

    /// Engine over an in-memory store with the table's campaign data.
    pub(crate) fn app_state(table: &Table, narrator: ScriptedNarrator, rolls: Vec<u32>) -> AppState {
        let gateway = ChannelPublisher::new(64);
        let engine = ActionEngine::start(EngineDeps {
            store: Arc::new(InMemoryStateStore::new()),
            directory: Arc::new(table.directory()),
            narrator: Arc::new(narrator),
            publisher: Arc::new(gateway.clone()),
            clock: Arc::new(FixedClock::epoch()),
            rng: Arc::new(Mutex::new(SequenceRng::new(rolls))),
        });
        AppState::new(engine, gateway)
    }

    /// Sends one request and returns the status and JSON body.
    pub(crate) async fn send(
        app: Router,
        method: Method,
        uri: &str,
        actor: Option<Uuid>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(actor) = actor {
            builder = builder.header(ACTOR_HEADER, actor.to_string());
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_vec(&body).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    /// Waits for the next event of `event_type`.
    pub(crate) async fn next_event(
        events: &mut broadcast::Receiver<BroadcastEvent>,
        event_type: &str,
    ) -> BroadcastEvent {
        tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                let event = events.recv().await.unwrap();
                if event.event_type == event_type {
                    return event;
                }
            }
        })
        .await
        .unwrap()
    }
}
