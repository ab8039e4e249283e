//! Gamemaster API: error types.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use gamemaster_core::error::DomainError;
use serde::Serialize;
use thiserror::Error;

/// Startup and runtime errors for the API server.
#[derive(Debug, Error)]
pub enum AppError {
    /// A required environment variable is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// Database connection or pool error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A schema migration failed.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// The tracing pipeline could not be installed.
    #[error("telemetry error: {0}")]
    Telemetry(String),

    /// Actions left pending by a previous run could not be re-queued.
    #[error("recovery error: {0}")]
    Recovery(String),

    /// Network binding or I/O error.
    #[error("server error: {0}")]
    Server(#[from] std::io::Error),
}

/// JSON body returned for error responses.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable error code.
    pub error: &'static str,
    /// Human-readable error message.
    pub message: String,
}

/// HTTP-layer error that implements `IntoResponse`.
#[derive(Debug)]
pub enum ApiError {
    /// A handler failed.
    Domain(DomainError),
    /// The request carried no usable actor identity.
    Unauthenticated(String),
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        Self::Domain(err)
    }
}

fn classify(err: &DomainError) -> (StatusCode, &'static str) {
    match err {
        DomainError::NotFound { .. } => (StatusCode::NOT_FOUND, "not_found"),
        DomainError::Forbidden(_) => (StatusCode::FORBIDDEN, "forbidden"),
        DomainError::NotYourTurn(_) => (StatusCode::CONFLICT, "not_your_turn"),
        DomainError::InvalidTransition { .. } => (StatusCode::CONFLICT, "invalid_transition"),
        DomainError::InvalidOrder(_) => (StatusCode::UNPROCESSABLE_ENTITY, "invalid_order"),
        DomainError::ActionAlreadyUsed(_) => (StatusCode::CONFLICT, "action_already_used"),
        DomainError::ActionInFlight(_) => (StatusCode::CONFLICT, "action_in_flight"),
        DomainError::Provider(_) => (StatusCode::BAD_GATEWAY, "provider_error"),
        DomainError::ServiceUnavailable(_) => {
            (StatusCode::SERVICE_UNAVAILABLE, "service_unavailable")
        }
        DomainError::ConcurrencyConflict { .. } => (StatusCode::CONFLICT, "concurrency_conflict"),
        DomainError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
        DomainError::Infrastructure(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "infrastructure_error")
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, message) = match self {
            Self::Domain(err) => {
                let (status, code) = classify(&err);
                if status.is_server_error() {
                    tracing::error!(error = %err, "request failed");
                }
                (status, code, err.to_string())
            }
            Self::Unauthenticated(message) => (StatusCode::UNAUTHORIZED, "unauthenticated", message),
        };

        (status, Json(ErrorBody { error, message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn status_of(err: DomainError) -> StatusCode {
        ApiError::from(err).into_response().status()
    }

    #[test]
    fn test_not_found_maps_to_404() {
        assert_eq!(
            status_of(DomainError::not_found("session", Uuid::new_v4())),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_forbidden_maps_to_403() {
        assert_eq!(
            status_of(DomainError::Forbidden("dm only".into())),
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn test_turn_and_budget_conflicts_map_to_409() {
        for err in [
            DomainError::NotYourTurn("it is Brena's turn".into()),
            DomainError::InvalidTransition {
                from: "rest".into(),
                to: "combat".into(),
            },
            DomainError::ActionAlreadyUsed("action".into()),
            DomainError::ActionInFlight(Uuid::new_v4()),
            DomainError::ConcurrencyConflict {
                key: "game_state".into(),
                expected: 1,
                actual: 2,
            },
        ] {
            assert_eq!(status_of(err), StatusCode::CONFLICT);
        }
    }

    #[test]
    fn test_invalid_order_maps_to_422() {
        assert_eq!(
            status_of(DomainError::InvalidOrder("missing turn-taker".into())),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn test_narrator_errors_map_to_gateway_statuses() {
        assert_eq!(
            status_of(DomainError::Provider("bad json".into())),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_of(DomainError::ServiceUnavailable("timeout".into())),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_validation_maps_to_400() {
        assert_eq!(
            status_of(DomainError::Validation("bad input".into())),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_infrastructure_maps_to_500() {
        assert_eq!(
            status_of(DomainError::Infrastructure("db down".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_unauthenticated_maps_to_401() {
        let response = ApiError::Unauthenticated("missing x-actor-id".into()).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
