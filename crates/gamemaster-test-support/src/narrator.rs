//! Test narrators: scripted and failing `Narrator` implementations.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use gamemaster_core::narrator::{
    MechanicalOutcome, NarrationRequest, Narrator, NarratorError, NarratorResult,
};
use tokio::sync::Semaphore;

/// Narration returned once the script is exhausted.
pub const DEFAULT_SCRIPTED_NARRATION: &str = "The world holds its breath.";

/// A narrator that replays queued responses and records every request.
///
/// With [`ScriptedNarrator::gated`], each call blocks until the test
/// releases a permit, which lets a test observe engine state while a
/// narrator call is in flight.
#[derive(Debug, Clone, Default)]
pub struct ScriptedNarrator {
    script: Arc<Mutex<VecDeque<Result<NarratorResult, NarratorError>>>>,
    requests: Arc<Mutex<Vec<NarrationRequest>>>,
    gate: Option<Arc<Semaphore>>,
}

impl ScriptedNarrator {
    /// Creates a narrator with an empty script.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a narrator whose calls wait for [`ScriptedNarrator::release`].
    #[must_use]
    pub fn gated() -> Self {
        Self {
            gate: Some(Arc::new(Semaphore::new(0))),
            ..Self::default()
        }
    }

    /// Queues a pure narration with no mechanical outcome.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn narrate(self, narration: &str) -> Self {
        self.push(Ok(NarratorResult {
            narration: narration.to_owned(),
            mechanical_outcome: None,
        }))
    }

    /// Queues a narration with a mechanical outcome.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn outcome(self, narration: &str, outcome: MechanicalOutcome) -> Self {
        self.push(Ok(NarratorResult {
            narration: narration.to_owned(),
            mechanical_outcome: Some(outcome),
        }))
    }

    /// Queues a failure.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn fail(self, error: NarratorError) -> Self {
        self.push(Err(error))
    }

    fn push(self, response: Result<NarratorResult, NarratorError>) -> Self {
        self.script.lock().unwrap().push_back(response);
        self
    }

    /// Lets `calls` gated narrator calls proceed.
    pub fn release(&self, calls: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(calls);
        }
    }

    /// Returns a snapshot of all requests received.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn requests(&self) -> Vec<NarrationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Narrator for ScriptedNarrator {
    async fn narrate(&self, request: NarrationRequest) -> Result<NarratorResult, NarratorError> {
        self.requests.lock().unwrap().push(request);
        if let Some(gate) = &self.gate {
            gate.acquire()
                .await
                .map_err(|e| NarratorError::ServiceUnavailable(e.to_string()))?
                .forget();
        }
        self.script.lock().unwrap().pop_front().unwrap_or_else(|| {
            Ok(NarratorResult {
                narration: DEFAULT_SCRIPTED_NARRATION.to_owned(),
                mechanical_outcome: None,
            })
        })
    }
}

/// A narrator that always fails with the configured error.
#[derive(Debug, Clone)]
pub struct FailingNarrator(pub NarratorError);

#[async_trait]
impl Narrator for FailingNarrator {
    async fn narrate(&self, _request: NarrationRequest) -> Result<NarratorResult, NarratorError> {
        Err(self.0.clone())
    }
}
