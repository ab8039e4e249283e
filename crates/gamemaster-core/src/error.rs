//! Domain error types.

use thiserror::Error;

/// Top-level domain error type.
///
/// Guard violations (`Forbidden`, `NotYourTurn`, `InvalidTransition`,
/// `InvalidOrder`, `ActionAlreadyUsed`, `ActionInFlight`) are always raised
/// before any state is mutated.
#[derive(Debug, Error)]
pub enum DomainError {
    /// A session, encounter, character, or action was not found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of entity that was looked up.
        entity: &'static str,
        /// The identifier that was looked up.
        id: String,
    },

    /// The actor lacks the authority required for the operation.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// A turn-scoped operation was attempted by someone other than the
    /// active turn-taker.
    #[error("not your turn: {0}")]
    NotYourTurn(String),

    /// A phase transition outside the allowed set.
    #[error("invalid transition from {from} to {to}")]
    InvalidTransition {
        /// The phase the session is in.
        from: String,
        /// The requested phase.
        to: String,
    },

    /// A turn reorder whose turn-takers do not match the current set.
    #[error("invalid turn order: {0}")]
    InvalidOrder(String),

    /// The relevant slot of the turn budget is already spent.
    #[error("{0} already used this turn")]
    ActionAlreadyUsed(String),

    /// The actor already has a declared action awaiting resolution.
    #[error("action {0} is still being resolved")]
    ActionInFlight(uuid::Uuid),

    /// The narrator returned an error.
    #[error("narrator provider error: {0}")]
    Provider(String),

    /// The narrator could not be reached or timed out.
    #[error("narrator unavailable: {0}")]
    ServiceUnavailable(String),

    /// A stored row changed underneath a writer.
    #[error("concurrency conflict on {key}: expected version {expected}, found {actual}")]
    ConcurrencyConflict {
        /// The row that had the conflict.
        key: String,
        /// The expected version.
        expected: i64,
        /// The actual version found.
        actual: i64,
    },

    /// A validation error in domain logic.
    #[error("validation error: {0}")]
    Validation(String),

    /// An infrastructure/persistence error.
    #[error("infrastructure error: {0}")]
    Infrastructure(String),
}

impl DomainError {
    /// Creates a `NotFound` error for the given entity kind and identifier.
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Returns `true` for errors caused by the caller rather than the engine.
    #[must_use]
    pub fn is_guard_violation(&self) -> bool {
        matches!(
            self,
            Self::Forbidden(_)
                | Self::NotYourTurn(_)
                | Self::InvalidTransition { .. }
                | Self::InvalidOrder(_)
                | Self::ActionAlreadyUsed(_)
                | Self::ActionInFlight(_)
                | Self::Validation(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_formats_entity_and_id() {
        let err = DomainError::not_found("session", "abc");
        assert_eq!(err.to_string(), "session not found: abc");
    }

    #[test]
    fn test_invalid_transition_formats_phases() {
        let err = DomainError::InvalidTransition {
            from: "rest".to_owned(),
            to: "combat".to_owned(),
        };
        assert_eq!(err.to_string(), "invalid transition from rest to combat");
    }

    #[test]
    fn test_guard_violations_are_classified() {
        assert!(DomainError::Forbidden("dm only".into()).is_guard_violation());
        assert!(DomainError::ActionAlreadyUsed("action".into()).is_guard_violation());
        assert!(!DomainError::Infrastructure("db down".into()).is_guard_violation());
        assert!(!DomainError::ServiceUnavailable("timeout".into()).is_guard_violation());
    }
}
