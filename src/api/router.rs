use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use super::blog;
use super::health;
use super::keys;
use super::middleware::{logging_middleware, rate_limit_middleware};
use super::state::AppState;

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    // Only content generation is volume limited
    let limited = Router::new()
        .route("/generate-blog", post(blog::generate_blog))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ));

    Router::new()
        .route("/health", get(health::health_check))
        .route("/ready", get(health::ready_check))
        .route("/live", get(health::live_check))
        .route("/generate-api-key", post(keys::generate_api_key))
        .merge(limited)
        .with_state(state)
        .layer(middleware::from_fn(logging_middleware))
        .layer(TraceLayer::new_for_http())
}
