use axum::{middleware, routing::get, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::handlers::{health_check, resolve_link, RedirectState};
use super::middleware::record_request_start;
use super::open_app::open_app_page;

pub fn create_redirect_router(state: Arc<RedirectState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/_open", get(open_app_page))
        .route("/", get(resolve_link))
        .route("/{*path}", get(resolve_link))
        .layer(middleware::from_fn(record_request_start))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
