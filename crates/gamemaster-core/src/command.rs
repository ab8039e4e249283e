//! Command metadata shared by every engine operation.

use uuid::Uuid;

/// An engine operation's identity, used for tracing fields.
pub trait Command: Send + Sync + std::fmt::Debug {
    /// Dotted name, `<component>.<operation>`.
    fn command_type(&self) -> &'static str;

    /// Ties the request, its background jobs and their log lines together.
    fn correlation_id(&self) -> Uuid;

    /// The user issuing the command; `None` for jobs the engine schedules
    /// itself, such as action resolution and enemy turns.
    fn actor_id(&self) -> Option<Uuid> {
        None
    }
}
