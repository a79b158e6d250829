use serde::{Deserialize, Serialize};

/// Width of the reference screen the model is asked to place coordinates on.
pub const REFERENCE_WIDTH: f64 = 1920.0;
/// Height of the reference screen the model is asked to place coordinates on.
pub const REFERENCE_HEIGHT: f64 = 1080.0;

/// A point in screen pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub x: f64,
    pub y: f64,
}

impl Coordinates {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// The placement used when a step arrives without coordinates.
    ///
    /// Steps are fanned out diagonally so consecutive defaults never overlap.
    pub fn default_for_index(index: usize) -> Self {
        Self {
            x: 400.0 + 100.0 * index as f64,
            y: 300.0 + 50.0 * index as f64,
        }
    }

    /// Clamps both axes to be non-negative.
    pub fn non_negative(self) -> Self {
        Self {
            x: self.x.max(0.0),
            y: self.y.max(0.0),
        }
    }
}

/// One unit of on-screen guidance.
///
/// `completed` starts out false and is flipped by the sequencer when the user
/// moves past the step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TutorialStep {
    pub id: String,
    pub command: String,
    pub description: String,
    pub coordinates: Coordinates,
    pub action: String,
    pub completed: bool,
}

impl TutorialStep {
    /// Creates a new, incomplete step.
    pub fn new(
        id: impl Into<String>,
        command: impl Into<String>,
        description: impl Into<String>,
        coordinates: Coordinates,
        action: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            command: command.into(),
            description: description.into(),
            coordinates,
            action: action.into(),
            completed: false,
        }
    }
}

/// The id given to the step at `index` when none was supplied.
pub fn default_step_id(index: usize) -> String {
    format!("step-{}", index + 1)
}
