//! Dice for tests.

use gamemaster_core::rng::DeterministicRng;

/// Always rolls the lowest face. For tests where the dice do not matter.
#[derive(Debug)]
pub struct MockRng;

impl DeterministicRng for MockRng {
    fn next_u32_range(&mut self, min: u32, _max: u32) -> u32 {
        min
    }

    fn next_f64(&mut self) -> f64 {
        0.0
    }
}

/// Rolls the given faces in order: initiative for players, then enemies,
/// then any death saves.
///
/// Running out of faces, or a face outside the requested die, panics the
/// caller. In a background job that surfaces as a turn that never
/// advances, so script every roll the test triggers.
#[derive(Debug)]
pub struct SequenceRng {
    faces: std::collections::VecDeque<u32>,
}

impl SequenceRng {
    /// Scripts the faces to roll.
    #[must_use]
    pub fn new(faces: Vec<u32>) -> Self {
        Self {
            faces: faces.into(),
        }
    }

    /// Faces not rolled yet.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.faces.len()
    }
}

impl DeterministicRng for SequenceRng {
    fn next_u32_range(&mut self, min: u32, max: u32) -> u32 {
        let face = self
            .faces
            .pop_front()
            .unwrap_or_else(|| panic!("no scripted roll left for a {min}..={max} die"));
        assert!(
            (min..=max).contains(&face),
            "scripted roll {face} does not fit a {min}..={max} die"
        );
        face
    }

    fn next_f64(&mut self) -> f64 {
        0.0
    }
}
