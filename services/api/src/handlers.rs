//! Axum Handlers for the REST API
//!
//! Stateless access to command resolution and guidance, for clients that keep
//! tutorial state themselves. It uses `utoipa` doc comments to generate
//! OpenAPI documentation.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use std::sync::Arc;
use tracing::info;
use tutor_core::fallback::fallback_steps;

use crate::{
    models::{
        ErrorResponse, FallbackQuery, GuidancePayload, GuidanceResponse, HealthResponse,
        ResolvePayload, ResolveResponse, StepsResponse,
    },
    state::AppState,
};

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, Json(ErrorResponse { message })).into_response()
            }
        }
    }
}

fn required<'a>(value: &'a str, field: &str) -> Result<&'a str, ApiError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApiError::BadRequest(format!("`{}` must not be empty", field)));
    }
    Ok(trimmed)
}

/// Resolve a command into tutorial steps.
///
/// Always answers with a step list; `source` tells whether the model or the
/// rule-based generator produced it.
#[utoipa::path(
    post,
    path = "/tutorials/resolve",
    request_body = ResolvePayload,
    responses(
        (status = 200, description = "Steps resolved", body = ResolveResponse),
        (status = 400, description = "Blank command", body = ErrorResponse)
    )
)]
pub async fn resolve_command(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ResolvePayload>,
) -> Result<Json<ResolveResponse>, ApiError> {
    let command = required(&payload.command, "command")?;
    let outcome = state.resolver.resolve(command, state.credential()).await;
    info!(
        steps = outcome.steps().len(),
        fallback = outcome.is_fallback(),
        "Resolved command over REST"
    );
    Ok(Json(outcome.into()))
}

/// Generate a spoken instruction for one step.
#[utoipa::path(
    post,
    path = "/tutorials/guidance",
    request_body = GuidancePayload,
    responses(
        (status = 200, description = "Instruction generated", body = GuidanceResponse),
        (status = 400, description = "Blank action", body = ErrorResponse)
    )
)]
pub async fn generate_guidance(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<GuidancePayload>,
) -> Result<Json<GuidanceResponse>, ApiError> {
    let action = required(&payload.action, "action")?;
    let text = state
        .resolver
        .generate_guidance(action, payload.description.trim(), state.credential())
        .await;
    Ok(Json(GuidanceResponse { text }))
}

/// Get the rule-based steps for a command without contacting a model.
#[utoipa::path(
    get,
    path = "/tutorials/fallback",
    params(FallbackQuery),
    responses(
        (status = 200, description = "Rule-based steps", body = StepsResponse),
        (status = 400, description = "Blank command", body = ErrorResponse)
    )
)]
pub async fn get_fallback_steps(
    Query(query): Query<FallbackQuery>,
) -> Result<Json<StepsResponse>, ApiError> {
    let command = required(&query.command, "command")?;
    Ok(Json(fallback_steps(command).into()))
}

/// Liveness probe.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse)
    )
)]
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        model_enabled: !state.credential().trim().is_empty(),
    })
}
