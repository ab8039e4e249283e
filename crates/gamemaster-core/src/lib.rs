//! Gamemaster Core: shared engine abstractions.
//!
//! This crate defines the traits and types every engine component depends
//! on: the state store, the campaign directory, the narrator and broadcast
//! contracts, turn-taker identity, and the clock/RNG seams. It contains no
//! infrastructure code.

pub mod broadcast;
pub mod clock;
pub mod command;
pub mod directory;
pub mod error;
pub mod narrator;
pub mod rng;
pub mod state;
pub mod turn_taker;
