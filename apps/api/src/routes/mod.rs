pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::intake::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route(
            "/upload_resume",
            post(handlers::handle_upload_resume).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .with_state(state)
}
