//! Axum router construction.

use axum::routing::get;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::context::AppContext;
use crate::routes;

/// Build the intake router.
pub fn build_router(ctx: AppContext) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(routes::health::health_check))
        .route(
            "/download",
            get(routes::download::enqueue_download).fallback(routes::download::method_not_allowed),
        )
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}
