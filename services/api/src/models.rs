//! API Models
//!
//! Request and response bodies for the REST API, annotated for `utoipa`.

use serde::{Deserialize, Serialize};
use tutor_core::{
    resolver::ResolveOutcome,
    step::{Coordinates, TutorialStep},
};
use utoipa::{IntoParams, ToSchema};

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, Copy, PartialEq)]
pub struct CoordinatesBody {
    #[schema(example = 400.0)]
    pub x: f64,
    #[schema(example = 300.0)]
    pub y: f64,
}

impl From<Coordinates> for CoordinatesBody {
    fn from(c: Coordinates) -> Self {
        Self { x: c.x, y: c.y }
    }
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
pub struct TutorialStepBody {
    #[schema(example = "step-1")]
    pub id: String,
    pub command: String,
    pub description: String,
    pub coordinates: CoordinatesBody,
    #[schema(example = "Open Gallery App")]
    pub action: String,
    pub completed: bool,
}

impl From<TutorialStep> for TutorialStepBody {
    fn from(step: TutorialStep) -> Self {
        Self {
            id: step.id,
            command: step.command,
            description: step.description,
            coordinates: step.coordinates.into(),
            action: step.action,
            completed: step.completed,
        }
    }
}

fn into_bodies(steps: Vec<TutorialStep>) -> Vec<TutorialStepBody> {
    steps.into_iter().map(TutorialStepBody::from).collect()
}

/// Where a step list came from.
#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StepSource {
    Model,
    Fallback,
}

#[derive(Deserialize, ToSchema)]
pub struct ResolvePayload {
    #[schema(example = "How to delete a photo in gallery")]
    pub command: String,
}

#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct ResolveResponse {
    pub steps: Vec<TutorialStepBody>,
    pub source: StepSource,
    /// Why the model's answer was not used, when `source` is `fallback`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<String>,
}

impl From<ResolveOutcome> for ResolveResponse {
    fn from(outcome: ResolveOutcome) -> Self {
        match outcome {
            ResolveOutcome::Parsed(steps) => Self {
                steps: into_bodies(steps),
                source: StepSource::Model,
                fallback_reason: None,
            },
            ResolveOutcome::Fallback { reason, steps } => Self {
                steps: into_bodies(steps),
                source: StepSource::Fallback,
                fallback_reason: Some(reason.to_string()),
            },
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct GuidancePayload {
    #[schema(example = "Open Gallery App")]
    pub action: String,
    #[schema(example = "Tap on the Gallery or Photos app icon on your home screen")]
    pub description: String,
}

#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct GuidanceResponse {
    pub text: String,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct FallbackQuery {
    /// The command to generate rule-based steps for.
    pub command: String,
}

#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct StepsResponse {
    pub steps: Vec<TutorialStepBody>,
}

impl From<Vec<TutorialStep>> for StepsResponse {
    fn from(steps: Vec<TutorialStep>) -> Self {
        Self {
            steps: into_bodies(steps),
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct HealthResponse {
    #[schema(example = "ok")]
    pub status: String,
    /// False when no credential is configured and only rule-based steps are served.
    pub model_enabled: bool,
}

#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    pub message: String,
}
