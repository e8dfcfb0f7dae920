pub mod health;

use axum::{extract::DefaultBodyLimit, routing::get, Router};

use crate::analysis::handlers as analysis;
use crate::rewrite::handlers as rewrite;
use crate::state::AppState;

/// Upload cap; axum's default is 2 MB.
const MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/check-env", get(health::check_env_handler))
        .route("/api/test", get(health::test_handler))
        .route(
            "/api/optimize",
            get(analysis::handle_optimize_usage).post(analysis::handle_optimize),
        )
        .route(
            "/api/rewrite-resume",
            get(rewrite::handle_rewrite_usage).post(rewrite::handle_rewrite_resume),
        )
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}
