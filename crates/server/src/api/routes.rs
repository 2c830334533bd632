use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;

use super::{handlers, job};
use super::middleware::{metrics_middleware, session_middleware};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Job routes (require a session)
    let job_routes = Router::new()
        .route("/job", get(job::get_job).post(job::open_job))
        .route("/job/poll", post(job::poll_job))
        .route("/job/confirm", post(job::confirm_job))
        .route("/job/reset", post(job::reset_job))
        .route("/job/history", get(job::job_history))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            session_middleware,
        ));

    // API routes
    let api_routes = Router::new()
        // Health and config
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        .merge(job_routes);

    let router = Router::new()
        .nest("/api/v1", api_routes)
        .route("/metrics", get(handlers::metrics))
        .with_state(state.clone())
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http());

    match cors_layer(&state.config().server.cors_origins) {
        Some(cors) => router.layer(cors),
        None => router,
    }
}

/// CORS layer for the configured origins, if any parse.
fn cors_layer(origins: &[String]) -> Option<CorsLayer> {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    if origins.is_empty() {
        return None;
    }

    Some(
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]),
    )
}
