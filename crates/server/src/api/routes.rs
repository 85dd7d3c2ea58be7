use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::middleware::{auth_middleware, metrics_middleware};
use super::{handlers, jobs, media};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Everything except health requires the API key when one is configured
    let protected = Router::new()
        .route("/config", get(handlers::get_config))
        .route("/search", post(media::search))
        .route("/select", post(media::select))
        .route("/download", post(media::download))
        .route("/dispatch", post(media::dispatch))
        .route("/sessions/{user_id}", delete(media::clear_session))
        .route("/jobs/poll", post(jobs::poll_jobs))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let api_routes = Router::new()
        .route("/health", get(handlers::health))
        .merge(protected)
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/metrics", get(handlers::metrics))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
}
