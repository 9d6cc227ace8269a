//! Job submission, status polling, cancellation, and the active-job list.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde_json::json;

use careerforge_queue::JobPayload;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::UserContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_job))
        .route("/active", get(active_jobs))
        .route("/:job_id/status", get(job_status))
        .route("/:job_id/cancel", post(cancel_job))
}

/// POST /jobs
///
/// Body is the tagged job payload; the queue is derived from the job type.
/// Accepted means enqueued — completion arrives via polling or the stream.
pub async fn create_job(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<UserContext>,
    Json(payload): Json<JobPayload>,
) -> axum::response::Response {
    let queue = payload.job_type().queue();

    match services.create_job(queue, payload, user.user_id()) {
        Ok(receipt) => (StatusCode::ACCEPTED, Json(dto::receipt_body(&receipt))).into_response(),
        Err(e) => errors::queue_error_to_response(e),
    }
}

/// GET /jobs/:job_id/status
pub async fn job_status(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<UserContext>,
    Path(job_id): Path<String>,
) -> axum::response::Response {
    match services.job_status(&job_id, user.user_id()) {
        Ok(Some(status)) => (StatusCode::OK, Json(dto::status_body(&status))).into_response(),
        Ok(None) => errors::json_error(StatusCode::NOT_FOUND, "not_found", "job not found"),
        Err(e) => errors::queue_error_to_response(e),
    }
}

/// POST /jobs/:job_id/cancel
pub async fn cancel_job(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<UserContext>,
    Path(job_id): Path<String>,
) -> axum::response::Response {
    match services.cancel_job(&job_id, user.user_id()) {
        Ok(true) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "message": "job cancelled",
                "jobId": job_id,
            })),
        )
            .into_response(),
        Ok(false) => errors::json_error(
            StatusCode::BAD_REQUEST,
            "not_cancellable",
            "job cannot be cancelled (already finished or not found)",
        ),
        Err(e) => errors::queue_error_to_response(e),
    }
}

/// GET /jobs/active — the caller's queued and processing jobs.
pub async fn active_jobs(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<UserContext>,
) -> axum::response::Response {
    match services.user_active_jobs(user.user_id()) {
        Ok(jobs) => (
            StatusCode::OK,
            Json(json!({ "success": true, "jobs": jobs })),
        )
            .into_response(),
        Err(e) => errors::queue_error_to_response(e),
    }
}
