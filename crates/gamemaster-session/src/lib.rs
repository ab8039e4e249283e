//! Gamemaster: Session bounded context.
//!
//! Responsible for the authoritative game phase of a session, its turn
//! order and round counter, and the per-turn combat budget.

pub mod application;
pub mod domain;
