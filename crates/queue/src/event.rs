//! Job lifecycle events published to the event bus.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use careerforge_core::{JobId, UserId};

use crate::types::{Job, JobProgress, QueueName};

/// Discrete lifecycle transitions, named as the wire-level event strings.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobEventKind {
    #[serde(rename = "job:created")]
    Created,
    #[serde(rename = "job:progress")]
    Progress,
    #[serde(rename = "job:completed")]
    Completed,
    #[serde(rename = "job:failed")]
    Failed,
    #[serde(rename = "job:cancelled")]
    Cancelled,
}

impl JobEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobEventKind::Created => "job:created",
            JobEventKind::Progress => "job:progress",
            JobEventKind::Completed => "job:completed",
            JobEventKind::Failed => "job:failed",
            JobEventKind::Cancelled => "job:cancelled",
        }
    }
}

/// An immutable lifecycle fact.
///
/// Fire-and-forget: a gateway that is not subscribed at publish time simply
/// misses it, and clients recover via the status query. `user_id` is the
/// routing key the gateway filters on; nothing the client supplies ever
/// overrides it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobEvent {
    #[serde(rename = "event")]
    pub kind: JobEventKind,
    pub job_id: String,
    pub user_id: UserId,
    pub queue_name: QueueName,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<JobProgress>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_reason: Option<String>,
}

impl JobEvent {
    fn base(kind: JobEventKind, id: &JobId, queue: QueueName) -> Self {
        Self {
            kind,
            job_id: id.to_string(),
            user_id: id.owner(),
            queue_name: queue,
            timestamp: Utc::now(),
            progress: None,
            result: None,
            failed_reason: None,
        }
    }

    pub fn created(job: &Job) -> Self {
        Self::base(JobEventKind::Created, &job.id, job.queue)
    }

    pub fn progress(id: &JobId, queue: QueueName, progress: JobProgress) -> Self {
        Self {
            progress: Some(progress),
            ..Self::base(JobEventKind::Progress, id, queue)
        }
    }

    pub fn completed(job: &Job) -> Self {
        Self {
            result: job.result.clone(),
            ..Self::base(JobEventKind::Completed, &job.id, job.queue)
        }
    }

    pub fn failed(job: &Job) -> Self {
        Self {
            failed_reason: job.failed_reason.clone(),
            ..Self::base(JobEventKind::Failed, &job.id, job.queue)
        }
    }

    pub fn cancelled(job: &Job) -> Self {
        Self::base(JobEventKind::Cancelled, &job.id, job.queue)
    }
}
