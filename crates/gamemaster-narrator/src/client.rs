//! OpenAI-compatible chat completions client.

use std::time::Duration;

use async_trait::async_trait;
use gamemaster_core::narrator::{NarrationRequest, Narrator, NarratorError, NarratorResult};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::prompt;

/// Default narrator base URL (a local Ollama).
pub const DEFAULT_NARRATOR_BASE_URL: &str = "http://localhost:11434";

/// Default model name.
pub const DEFAULT_NARRATOR_MODEL: &str = "llama3.1";

/// Default provider timeout.
pub const DEFAULT_NARRATOR_TIMEOUT: Duration = Duration::from_secs(60);

/// Narrator endpoint settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NarratorConfig {
    /// Base URL; `/v1/chat/completions` is appended.
    pub base_url: String,
    /// Model name sent with each request.
    pub model: String,
    /// Whole-request timeout. Exceeding it is `ServiceUnavailable`.
    pub timeout: Duration,
}

impl Default for NarratorConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_NARRATOR_BASE_URL.to_owned(),
            model: DEFAULT_NARRATOR_MODEL.to_owned(),
            timeout: DEFAULT_NARRATOR_TIMEOUT,
        }
    }
}

/// Narrator backed by a chat completions endpoint.
#[derive(Debug, Clone)]
pub struct HttpNarrator {
    client: Client,
    endpoint: String,
    model: String,
}

impl HttpNarrator {
    /// Builds a client for `config`.
    ///
    /// # Errors
    ///
    /// Returns `NarratorError::Provider` if the HTTP client cannot be
    /// constructed.
    pub fn new(config: &NarratorConfig) -> Result<Self, NarratorError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| NarratorError::Provider(format!("HTTP client setup failed: {e}")))?;
        Ok(Self {
            client,
            endpoint: format!(
                "{}/v1/chat/completions",
                config.base_url.trim_end_matches('/')
            ),
            model: config.model.clone(),
        })
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    response_format: ResponseFormat,
    temperature: f32,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    r#type: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

fn transport_error(err: &reqwest::Error) -> NarratorError {
    if err.is_timeout() || err.is_connect() {
        NarratorError::ServiceUnavailable(err.to_string())
    } else {
        NarratorError::Provider(err.to_string())
    }
}

fn status_error(status: StatusCode, body: &str) -> NarratorError {
    let message = format!("{status}: {body}");
    match status {
        StatusCode::TOO_MANY_REQUESTS
        | StatusCode::BAD_GATEWAY
        | StatusCode::SERVICE_UNAVAILABLE
        | StatusCode::GATEWAY_TIMEOUT => NarratorError::ServiceUnavailable(message),
        _ => NarratorError::Provider(message),
    }
}

#[async_trait]
impl Narrator for HttpNarrator {
    async fn narrate(&self, request: NarrationRequest) -> Result<NarratorResult, NarratorError> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system".into(),
                    content: prompt::system_prompt(request.kind),
                },
                ChatMessage {
                    role: "user".into(),
                    content: prompt::user_prompt(&request),
                },
            ],
            response_format: ResponseFormat {
                r#type: "json_object",
            },
            temperature: 0.7,
        };

        debug!(session_id = %request.session_id, kind = ?request.kind, "calling narrator");
        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let err = status_error(status, &text);
            warn!(session_id = %request.session_id, error = %err, "narrator returned an error");
            return Err(err);
        }

        let completion: ChatResponse = response
            .json()
            .await
            .map_err(|e| NarratorError::Provider(format!("invalid completion body: {e}")))?;
        let choice = completion
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| NarratorError::Provider("no choices in completion".into()))?;
        prompt::parse_content(&choice.message.content)
    }
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;

    use axum::http::StatusCode as AxumStatus;
    use axum::routing::post;
    use axum::{Json, Router};
    use gamemaster_core::narrator::NarrationKind;
    use serde_json::{Value, json};
    use uuid::Uuid;

    use super::*;

    async fn serve(router: Router) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });
        addr
    }

    fn narrator(addr: SocketAddr, timeout: Duration) -> HttpNarrator {
        HttpNarrator::new(&NarratorConfig {
            base_url: format!("http://{addr}/"),
            model: "test-model".into(),
            timeout,
        })
        .unwrap()
    }

    fn request() -> NarrationRequest {
        NarrationRequest {
            kind: NarrationKind::PlayerAction,
            session_id: Uuid::new_v4(),
            actor_name: "Aldric".into(),
            declared_type: "attack".into(),
            payload: json!({ "target": "goblin" }),
            context: json!({ "phase": "combat" }),
        }
    }

    fn completion(content: &str) -> Value {
        json!({ "choices": [{ "message": { "role": "assistant", "content": content } }] })
    }

    #[tokio::test]
    async fn test_successful_completion_is_parsed() {
        // Arrange
        let router = Router::new().route(
            "/v1/chat/completions",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["model"], "test-model");
                assert_eq!(body["response_format"]["type"], "json_object");
                assert_eq!(body["messages"][0]["role"], "system");
                Json(completion(
                    r#"{ "narration": "Your blade finds its mark.", "mechanicalOutcome": { "xpDelta": 5 } }"#,
                ))
            }),
        );
        let addr = serve(router).await;

        // Act
        let result = narrator(addr, Duration::from_secs(5))
            .narrate(request())
            .await
            .unwrap();

        // Assert
        assert_eq!(result.narration, "Your blade finds its mark.");
        assert_eq!(result.mechanical_outcome.unwrap().xp_delta, 5);
    }

    #[tokio::test]
    async fn test_overloaded_provider_is_unavailable() {
        let router = Router::new().route(
            "/v1/chat/completions",
            post(|| async { (AxumStatus::SERVICE_UNAVAILABLE, "overloaded") }),
        );
        let addr = serve(router).await;

        let err = narrator(addr, Duration::from_secs(5))
            .narrate(request())
            .await
            .unwrap_err();

        assert!(matches!(err, NarratorError::ServiceUnavailable(msg) if msg.contains("overloaded")));
    }

    #[tokio::test]
    async fn test_bad_request_is_provider_error() {
        let router = Router::new().route(
            "/v1/chat/completions",
            post(|| async { (AxumStatus::BAD_REQUEST, "unknown model") }),
        );
        let addr = serve(router).await;

        let err = narrator(addr, Duration::from_secs(5))
            .narrate(request())
            .await
            .unwrap_err();

        assert!(matches!(err, NarratorError::Provider(_)));
    }

    #[tokio::test]
    async fn test_timeout_is_unavailable() {
        let router = Router::new().route(
            "/v1/chat/completions",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Json(completion(r#"{ "narration": "Too late." }"#))
            }),
        );
        let addr = serve(router).await;

        let err = narrator(addr, Duration::from_millis(100))
            .narrate(request())
            .await
            .unwrap_err();

        assert!(matches!(err, NarratorError::ServiceUnavailable(_)));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_unavailable() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = narrator(addr, Duration::from_secs(5))
            .narrate(request())
            .await
            .unwrap_err();

        assert!(matches!(err, NarratorError::ServiceUnavailable(_)));
    }

    #[tokio::test]
    async fn test_empty_choices_is_provider_error() {
        let router = Router::new().route(
            "/v1/chat/completions",
            post(|| async { Json(json!({ "choices": [] })) }),
        );
        let addr = serve(router).await;

        let err = narrator(addr, Duration::from_secs(5))
            .narrate(request())
            .await
            .unwrap_err();

        assert_eq!(err, NarratorError::Provider("no choices in completion".into()));
    }
}
