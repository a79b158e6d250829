//! Overlay view model.
//!
//! Everything the browser needs to draw the highlight marker and instruction
//! card, derived from a [`TutorialSession`]. Step coordinates are advisory, so
//! positions are clamped to the viewport before they are handed out.

use crate::{
    sequencer::{Phase, TutorialSession},
    step::{Coordinates, REFERENCE_HEIGHT, REFERENCE_WIDTH},
};
use serde::{Deserialize, Serialize};

pub const CARD_WIDTH: f64 = 400.0;
pub const CARD_HEIGHT: f64 = 220.0;
/// Radius of the pulsing target marker.
pub const MARKER_RADIUS: f64 = 32.0;
const CARD_GAP: f64 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: REFERENCE_WIDTH,
            height: REFERENCE_HEIGHT,
        }
    }
}

impl Viewport {
    /// Rejects degenerate sizes by falling back to the reference screen.
    pub fn sanitized(self) -> Self {
        if self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
        {
            self
        } else {
            Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverlayView {
    pub step_number: usize,
    pub total_steps: usize,
    pub action: String,
    pub description: String,
    /// Center of the target marker.
    pub marker: Coordinates,
    /// Top-left corner of the instruction card.
    pub card: Coordinates,
    pub progress_label: String,
    pub progress_percent: f64,
    pub can_go_back: bool,
    pub completed: bool,
}

fn clamp_axis(value: f64, extent: f64) -> f64 {
    value.clamp(0.0, extent.max(0.0))
}

/// Builds the overlay for the session's current step, or `None` while idle.
pub fn present(session: &TutorialSession, viewport: Viewport) -> Option<OverlayView> {
    if session.phase() == Phase::Idle {
        return None;
    }
    let step = session.current_step()?;
    let viewport = viewport.sanitized();

    let marker = Coordinates::new(
        clamp_axis(step.coordinates.x, viewport.width),
        clamp_axis(step.coordinates.y, viewport.height),
    );
    let card = Coordinates::new(
        clamp_axis(
            marker.x + MARKER_RADIUS + CARD_GAP,
            viewport.width - CARD_WIDTH,
        ),
        clamp_axis(marker.y - CARD_HEIGHT / 2.0, viewport.height - CARD_HEIGHT),
    );

    Some(OverlayView {
        step_number: session.current_index() + 1,
        total_steps: session.len(),
        action: step.action.clone(),
        description: step.description.clone(),
        marker,
        card,
        progress_label: session.position_label().unwrap_or_default(),
        progress_percent: session.progress_percent(),
        can_go_back: session.phase() == Phase::Active && session.current_index() > 0,
        completed: session.phase() == Phase::Completed,
    })
}
