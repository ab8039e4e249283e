//! Gamemaster: Live State bounded context.
//!
//! Responsible for session-scoped character state (hit points, conditions,
//! concentration, experience) and the death and recovery lifecycle:
//! unconsciousness, death saving throws, stabilization, and death.

pub mod application;
pub mod domain;
