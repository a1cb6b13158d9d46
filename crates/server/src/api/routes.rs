use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::{discovery, handlers, middleware as mw, pipeline, stats};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Gated by the configured authenticator
    let protected = Router::new()
        .route("/config", get(handlers::get_config))
        .route("/metrics", get(handlers::metrics))
        .route("/stats", get(stats::get_stats))
        // Pipeline stages
        .route("/ingest", post(pipeline::ingest))
        .route("/enrich", post(pipeline::enrich))
        .route("/score", post(pipeline::score))
        .route("/process", post(pipeline::process))
        .route("/run-batch", post(pipeline::run_batch))
        .route("/report", post(pipeline::report))
        // Search crawl
        .route("/discover", post(discovery::discover))
        .route(
            "/discover/state",
            get(discovery::get_state).delete(discovery::clear_state),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            mw::auth_middleware,
        ));

    let api_routes = Router::new()
        .route("/health", get(handlers::health))
        .merge(protected)
        .route_layer(middleware::from_fn(mw::metrics_middleware))
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
