//! Gamemaster: Combat orchestration bounded context.
//!
//! Starts encounters with rolled initiative, charges declared actions
//! against the active turn budget, and resolves combat with an experience
//! reward split among survivors.

pub mod application;
pub mod domain;
