//! Gamemaster: Action resolution pipeline.
//!
//! Accepts declared actions without waiting for the narrator, resolves them
//! on background tasks, runs NPC turns, and chains consecutive NPC turns
//! as separately scheduled jobs.

pub mod application;
pub mod domain;
