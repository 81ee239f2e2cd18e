use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::error;

use invoicer_core::{PipelineKind, SanitizedConfig};

use crate::metrics::{collect_dynamic_metrics, encode_metrics};
use crate::state::AppState;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Service banner listing the routes of the enabled pipelines.
#[derive(Debug, Serialize)]
pub struct RootResponse {
    pub mensaje: String,
    pub version: String,
    /// `"METHOD /path"` -> description
    pub endpoints: BTreeMap<String, String>,
}

pub async fn root(State(state): State<Arc<AppState>>) -> Json<RootResponse> {
    let mut endpoints = BTreeMap::new();
    for kind in PipelineKind::ALL {
        if state.controller(kind).is_none() {
            continue;
        }
        let route = kind.route();
        let title = kind.title().to_lowercase();
        endpoints.insert(format!("POST /{}", route), format!("Start {}", title));
        endpoints.insert(
            format!("GET /{}/status", route),
            format!("Get {} status", title),
        );
        endpoints.insert(
            format!("POST /{}/reset", route),
            format!("Reset {} status", title),
        );
    }
    endpoints.insert("GET /health".to_string(), "Liveness check".to_string());
    endpoints.insert(
        "GET /config".to_string(),
        "Effective configuration".to_string(),
    );
    endpoints.insert(
        "GET /metrics".to_string(),
        "Prometheus metrics".to_string(),
    );

    Json(RootResponse {
        mensaje: "Invoice pipeline API".to_string(),
        version: VERSION.to_string(),
        endpoints,
    })
}

pub async fn get_config(State(state): State<Arc<AppState>>) -> Json<SanitizedConfig> {
    Json(state.sanitized_config())
}

pub async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    collect_dynamic_metrics(&state).await;
    match encode_metrics() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        ),
        Err(e) => {
            error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(header::CONTENT_TYPE, "text/plain")],
                e.to_string(),
            )
        }
    }
}
