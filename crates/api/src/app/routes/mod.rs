use axum::{Router, routing::get};

pub mod jobs;
pub mod stream;
pub mod system;

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .nest("/jobs", jobs::router())
}
