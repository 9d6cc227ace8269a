//! Job registry: the façade request handlers go through.
//!
//! The registry is the only component permitted to create, read, cancel, or
//! purge jobs. It is an explicit, constructed component — store and bus are
//! injected, so tests substitute in-memory fakes and deployments decide how
//! many instances live in a process.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use careerforge_core::{JobId, UserId};
use careerforge_events::EventBus;

use crate::event::JobEvent;
use crate::store::{JobStore, JobStoreError};
use crate::types::{Job, JobPayload, JobStatus, JobStatusResponse, QueueName, RetryPolicy};

/// Registry-level error.
///
/// Ownership violations are loud and distinct from not-found, so callers can
/// tell "not yours" from "doesn't exist". Store/bus faults pass through as
/// infrastructure errors for the HTTP layer to map to 5xx.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("unauthorized: job does not belong to user")]
    Unauthorized,

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("job store error: {0}")]
    Store(#[from] JobStoreError),

    #[error("event publish failed: {0}")]
    Publish(String),
}

/// What a caller gets back from job creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobReceipt {
    pub job_id: String,
    pub status: JobStatus,
}

/// The job registry (see module docs).
pub struct JobManager<S, B> {
    store: S,
    bus: B,
    retry: RetryPolicy,
}

impl<S, B> JobManager<S, B>
where
    S: JobStore,
    B: EventBus<JobEvent>,
{
    pub fn new(store: S, bus: B) -> Self {
        Self {
            store,
            bus,
            retry: RetryPolicy::default(),
        }
    }

    /// Override the retry policy applied to newly created jobs.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn publish(&self, event: JobEvent) -> Result<(), QueueError> {
        self.bus
            .publish(event)
            .map_err(|e| QueueError::Publish(format!("{e:?}")))
    }

    /// Create and enqueue a job on behalf of `user`.
    ///
    /// Never blocks on worker availability: one enqueue, one publish.
    pub fn create_job(
        &self,
        queue: QueueName,
        payload: JobPayload,
        user: UserId,
    ) -> Result<JobReceipt, QueueError> {
        let job_type = payload.job_type();
        if job_type.queue() != queue {
            return Err(QueueError::Validation(format!(
                "job type {job_type} does not belong on queue {queue}"
            )));
        }
        payload
            .validate()
            .map_err(|e| QueueError::Validation(e.to_string()))?;

        let id = JobId::new(user, job_type.as_str());
        let job = Job::new(id.clone(), queue, payload, self.retry.clone());

        self.store.enqueue(job.clone())?;
        self.publish(JobEvent::created(&job))?;

        info!(job_id = %id, queue = %queue, "job created");

        Ok(JobReceipt {
            job_id: id.to_string(),
            status: JobStatus::Queued,
        })
    }

    /// Ownership-scoped status query.
    ///
    /// The ownership check runs before any store lookup, so a caller probing
    /// someone else's id learns nothing — not even whether it exists.
    /// Returns `None` when the id matches no stored job (purged or never
    /// existed).
    pub fn job_status(
        &self,
        raw_id: &str,
        user: UserId,
    ) -> Result<Option<JobStatusResponse>, QueueError> {
        if !JobId::verify_ownership(raw_id, user) {
            return Err(QueueError::Unauthorized);
        }

        let Ok(id) = raw_id.parse::<JobId>() else {
            return Ok(None);
        };

        for queue in QueueName::ALL {
            if let Some(job) = self.store.get(queue, &id)? {
                return Ok(Some(Self::status_of(&job)));
            }
        }

        Ok(None)
    }

    /// Best-effort cancellation.
    ///
    /// `true` when a non-terminal job was cancelled; `false` when the job is
    /// already terminal or unknown. A worker mid-execution is not
    /// interrupted — its late settlement is dropped by the store.
    pub fn cancel_job(&self, raw_id: &str, user: UserId) -> Result<bool, QueueError> {
        if !JobId::verify_ownership(raw_id, user) {
            return Err(QueueError::Unauthorized);
        }

        let Ok(id) = raw_id.parse::<JobId>() else {
            return Ok(false);
        };

        for queue in QueueName::ALL {
            if let Some(cancelled) = self.store.cancel(queue, &id)? {
                self.publish(JobEvent::cancelled(&cancelled))?;
                info!(job_id = %id, queue = %queue, "job cancelled");
                return Ok(true);
            }
        }

        debug!(job_id = raw_id, "cancel ignored: job terminal or unknown");
        Ok(false)
    }

    /// All of `user`'s queued and processing jobs, across every queue.
    pub fn user_active_jobs(&self, user: UserId) -> Result<Vec<JobStatusResponse>, QueueError> {
        let mut active = Vec::new();

        for queue in QueueName::ALL {
            for job in self.store.list_active(queue)? {
                if job.id.owner() != user {
                    continue;
                }
                if let Some(status) = self.job_status(&job.id.to_string(), user)? {
                    active.push(status);
                }
            }
        }

        Ok(active)
    }

    /// Remove completed jobs older than `max_age_hours`. Runs off the
    /// request path, on a fixed interval.
    pub fn cleanup_old_jobs(&self, max_age_hours: i64) -> Result<usize, QueueError> {
        let cutoff = Utc::now() - chrono::Duration::hours(max_age_hours);
        let mut removed = 0;

        for queue in QueueName::ALL {
            removed += self.store.purge_completed_before(queue, cutoff)?;
        }

        if removed > 0 {
            info!(removed, max_age_hours, "cleaned up old jobs");
        }
        Ok(removed)
    }

    /// Map stored job state onto the public response shape, attaching
    /// progress/result/failure only where the current state warrants them.
    fn status_of(job: &Job) -> JobStatusResponse {
        JobStatusResponse {
            job_id: job.id.to_string(),
            status: job.status,
            created_at: job.created_at,
            started_at: job.started_at,
            completed_at: job.completed_at,
            progress: match job.status {
                JobStatus::Processing => job.progress.clone(),
                _ => None,
            },
            result: match job.status {
                JobStatus::Completed => job.result.clone(),
                _ => None,
            },
            failed_reason: match job.status {
                JobStatus::Failed => job.failed_reason.clone(),
                _ => None,
            },
        }
    }
}
