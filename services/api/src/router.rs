//! Axum Router Configuration
//!
//! This module defines the complete HTTP routing for the application,
//! including the REST API, WebSocket endpoint, and OpenAPI documentation.

use crate::{
    handlers,
    models::{
        CoordinatesBody, ErrorResponse, GuidancePayload, GuidanceResponse, HealthResponse,
        ResolvePayload, ResolveResponse, StepSource, StepsResponse, TutorialStepBody,
    },
    state::AppState,
    ws::ws_handler,
};

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::resolve_command,
        handlers::generate_guidance,
        handlers::get_fallback_steps,
        handlers::health,
    ),
    components(
        schemas(
            TutorialStepBody, CoordinatesBody, StepSource, ResolvePayload, ResolveResponse,
            GuidancePayload, GuidanceResponse, StepsResponse, HealthResponse, ErrorResponse
        )
    ),
    tags(
        (name = "Tutor API", description = "Voice-driven on-screen tutorials")
    )
)]
pub struct ApiDoc;

/// Creates the main Axum router for the application.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    // Group all routes that require AppState into their own router.
    let api_router = Router::new()
        .route("/tutorials/resolve", post(handlers::resolve_command))
        .route("/tutorials/guidance", post(handlers::generate_guidance))
        .route("/tutorials/fallback", get(handlers::get_fallback_steps))
        .route("/health", get(handlers::health))
        .route("/ws", get(ws_handler))
        // Apply the state ONLY to this group of routes.
        .with_state(app_state);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(api_router)
}
