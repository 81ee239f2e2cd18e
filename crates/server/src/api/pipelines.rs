//! Trigger, status and reset handlers shared by every pipeline kind.

use axum::{extract::State, http::StatusCode, response::IntoResponse, response::Response, Json};
use serde::Serialize;
use std::sync::Arc;

use invoicer_core::{PipelineController, PipelineError, RunStatus, StatusSnapshot};

// ============================================================================
// Response Types
// ============================================================================

/// Returned when a run is admitted.
#[derive(Debug, Serialize)]
pub struct TriggerResponse {
    pub mensaje: String,
    pub estado: RunStatus,
}

/// Simple message response
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub mensaje: String,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Maps controller errors onto HTTP responses.
pub struct ApiError(PipelineError);

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            PipelineError::Conflict { .. } => StatusCode::CONFLICT,
        };
        (
            status,
            Json(ErrorResponse {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Queue a new run; it executes in the background.
pub async fn trigger(
    State(controller): State<Arc<PipelineController>>,
) -> Result<Json<TriggerResponse>, ApiError> {
    let snapshot = controller.start().await?;
    Ok(Json(TriggerResponse {
        mensaje: format!("{} started in the background", controller.kind().title()),
        estado: snapshot.status,
    }))
}

pub async fn status(State(controller): State<Arc<PipelineController>>) -> Json<StatusSnapshot> {
    Json(controller.status().await)
}

/// Return the pipeline to idle (refused while a run is executing).
pub async fn reset(
    State(controller): State<Arc<PipelineController>>,
) -> Result<Json<MessageResponse>, ApiError> {
    controller.reset().await?;
    Ok(Json(MessageResponse {
        mensaje: format!("{} status reset", controller.kind().title()),
    }))
}
