use axum::{Json, extract::Extension};
use serde_json::json;

use crate::context::UserContext;

/// GET /health — liveness probe, unauthenticated.
pub async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// GET /whoami — echoes the identity the auth layer resolved.
pub async fn whoami(Extension(user): Extension<UserContext>) -> Json<serde_json::Value> {
    Json(json!({
        "user_id": user.user_id().to_string(),
        "email": user.email(),
    }))
}
