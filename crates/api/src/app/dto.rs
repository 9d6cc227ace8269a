//! Response body helpers.
//!
//! The request body for job creation is the tagged
//! [`careerforge_queue::JobPayload`] itself; no separate DTO is needed.

use serde_json::{Value as JsonValue, json};

use careerforge_queue::{JobReceipt, JobStatusResponse};

pub fn receipt_body(receipt: &JobReceipt) -> JsonValue {
    json!({
        "success": true,
        "jobId": receipt.job_id,
        "status": receipt.status,
    })
}

/// Flatten a status response under a `success` flag, mirroring the polling
/// contract: camelCase fields, epoch-millisecond timestamps, state-dependent
/// progress/result/failedReason.
pub fn status_body(status: &JobStatusResponse) -> JsonValue {
    let mut body = serde_json::to_value(status).unwrap_or_else(|_| json!({}));
    if let Some(obj) = body.as_object_mut() {
        obj.insert("success".to_string(), json!(true));
    }
    body
}
