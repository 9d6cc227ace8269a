use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use careerforge_queue::QueueError;

/// Map registry errors onto the HTTP taxonomy: ownership → 403, bad input →
/// 400, store faults → 500, bus faults → 502. Not-found never reaches here
/// (the routes map `None` to 404 themselves).
pub fn queue_error_to_response(err: QueueError) -> axum::response::Response {
    match err {
        QueueError::Unauthorized => json_error(
            StatusCode::FORBIDDEN,
            "unauthorized",
            "job does not belong to the authenticated user",
        ),
        QueueError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        QueueError::Store(e) => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", e.to_string())
        }
        QueueError::Publish(msg) => json_error(StatusCode::BAD_GATEWAY, "publish_error", msg),
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "success": false,
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
