use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use invoicer_core::{PipelineController, PipelineKind};

use super::{handlers, middleware::metrics_middleware, pipelines};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let mut router = Router::new()
        // Service info
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        .route("/metrics", get(handlers::metrics))
        .with_state(Arc::clone(&state));

    // Disabled pipelines get no routes
    for kind in PipelineKind::ALL {
        if let Some(controller) = state.controller(kind) {
            router = router.merge(pipeline_routes(Arc::clone(controller)));
        }
    }

    router
        .route_layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
}

/// `/{route}`, `/{route}/status` and `/{route}/reset` for one pipeline.
fn pipeline_routes(controller: Arc<PipelineController>) -> Router {
    let base = format!("/{}", controller.kind().route());
    Router::new()
        .route(&base, post(pipelines::trigger))
        .route(&format!("{}/status", base), get(pipelines::status))
        .route(&format!("{}/reset", base), post(pipelines::reset))
        .with_state(controller)
}
