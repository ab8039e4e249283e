//! Shared test doubles and fixtures for the Gamemaster session engine.

mod clock;
mod directory;
mod narrator;
mod publisher;
mod rng;
mod store;

pub use clock::FixedClock;
pub use directory::{StaticDirectory, Table};
pub use narrator::{DEFAULT_SCRIPTED_NARRATION, FailingNarrator, ScriptedNarrator};
pub use publisher::{FailingPublisher, RecordingPublisher};
pub use rng::{MockRng, SequenceRng};
pub use store::{FailingStateStore, InMemoryStateStore};
