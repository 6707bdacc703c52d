//! API routes.

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::limit::RequestBodyLimitLayer;

use crate::handlers::{confirm_upload, get_video, health, index_document, init_upload, ready, search};
use crate::metrics::metrics_middleware;
use crate::middleware::{
    cors_layer, rate_limit_middleware, request_id, request_logging, security_headers,
    IpRateLimiter,
};
use crate::state::AppState;

/// Create the API router.
pub fn create_router(
    state: AppState,
    rate_limiter: IpRateLimiter,
    metrics_handle: Option<PrometheusHandle>,
) -> Router {
    let video_routes = Router::new()
        .route("/videos/init-upload", post(init_upload))
        .route("/videos/:video_id/confirm", post(confirm_upload))
        .route("/videos/:video_id", get(get_video));

    let rag_routes = Router::new()
        .route("/rag/search", post(search))
        .route("/rag/index", post(index_document));

    let api_routes = Router::new()
        .merge(video_routes)
        .merge(rag_routes)
        .layer(middleware::from_fn_with_state(
            rate_limiter,
            rate_limit_middleware,
        ));

    let health_routes = Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready));

    let metrics_routes = match metrics_handle {
        Some(handle) => Router::new().route("/metrics", get(move || async move { handle.render() })),
        None => Router::new(),
    };

    Router::new()
        .merge(api_routes)
        .merge(health_routes)
        .merge(metrics_routes)
        .layer(RequestBodyLimitLayer::new(state.config.max_body_size))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(security_headers))
        .layer(middleware::from_fn(request_logging))
        .layer(middleware::from_fn(request_id))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}
