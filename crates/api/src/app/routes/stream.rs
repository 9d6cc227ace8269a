//! Real-time notification gateway (SSE).
//!
//! A persistent, authenticated server→client channel. The gateway holds no
//! job state — it filters the shared event broadcast down to the connected
//! user. Delivery is best-effort: a client that misses events recovers via
//! the status endpoint, which stays the source of truth.

use std::sync::Arc;

use axum::{
    Router,
    extract::{Extension, Query},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::get,
};
use chrono::Utc;
use serde::Deserialize;

use crate::app::services::{self, AppServices};
use crate::app::errors;
use crate::middleware::AuthState;

pub fn router() -> Router {
    Router::new().route("/jobs/stream", get(stream_jobs))
}

#[derive(Debug, Deserialize)]
pub struct StreamQuery {
    token: Option<String>,
}

/// GET /jobs/stream
///
/// Authenticates once at connect time — bearer header, or `?token=` for
/// EventSource clients, which cannot set headers. Only the token decides
/// whose events flow; a client guessing job ids sees nothing.
pub async fn stream_jobs(
    Extension(auth): Extension<AuthState>,
    Extension(svcs): Extension<Arc<AppServices>>,
    Query(query): Query<StreamQuery>,
    headers: HeaderMap,
) -> axum::response::Response {
    let Some(token) = bearer_or_query(&headers, &query) else {
        return errors::json_error(
            StatusCode::UNAUTHORIZED,
            "unauthorized",
            "authentication token required",
        );
    };

    let claims = match auth.jwt.validate(&token, Utc::now()) {
        Ok(claims) => claims,
        Err(_) => {
            return errors::json_error(
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "authentication failed",
            );
        }
    };

    tracing::debug!(user_id = %claims.sub, "notification client connected");
    services::user_sse_stream(&svcs, claims.sub).into_response()
}

fn bearer_or_query(headers: &HeaderMap, query: &StreamQuery) -> Option<String> {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .or_else(|| query.token.clone())
}
