//! Gamemaster Narrator: HTTP adapter for the narration service.
//!
//! Talks to any endpoint that speaks the OpenAI chat completions protocol
//! (Ollama, vLLM, hosted providers) and asks it for a JSON object holding
//! the narration and an optional mechanical outcome.

pub mod client;
pub mod prompt;

pub use client::{HttpNarrator, NarratorConfig};
