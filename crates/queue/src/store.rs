//! Queue store seam and in-memory implementation.
//!
//! The store is the single shared mutable resource in the system: claim,
//! progress, settle, and cancel all go through its atomic primitives, and no
//! component holds an in-process lock across store operations.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;

use careerforge_core::JobId;

use crate::types::{Job, JobProgress, JobStatus, QueueName};

/// Job store error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum JobStoreError {
    #[error("job not found: {0}")]
    NotFound(JobId),
    #[error("job already exists: {0}")]
    AlreadyExists(JobId),
    #[error("storage error: {0}")]
    Storage(String),
}

/// Result of a failure settlement: either the job was rescheduled for a
/// retry or it went terminal.
#[derive(Debug, Clone)]
pub struct FailureOutcome {
    pub job: Job,
    pub will_retry: bool,
}

/// Durable, shared job store abstraction (one logical store, many named
/// queues).
///
/// Settlement methods return `None` when the job is gone or already
/// terminal so that a worker finishing late — after a cancellation, say —
/// drops its outcome silently instead of resurrecting the job.
pub trait JobStore: Send + Sync {
    /// Enqueue a new job on its queue.
    fn enqueue(&self, job: Job) -> Result<JobId, JobStoreError>;

    /// Fetch a job by id from one queue.
    fn get(&self, queue: QueueName, id: &JobId) -> Result<Option<Job>, JobStoreError>;

    /// Atomically claim the next ready job: oldest queued job whose backoff
    /// delay (if any) has elapsed. Marks it processing and bumps `attempts`.
    fn claim_next(&self, queue: QueueName) -> Result<Option<Job>, JobStoreError>;

    /// Advisory progress side-channel for an in-flight job. Writes are
    /// ignored unless the job is currently processing.
    fn update_progress(
        &self,
        queue: QueueName,
        id: &JobId,
        progress: JobProgress,
    ) -> Result<(), JobStoreError>;

    /// Settle a processing job as completed with its result payload.
    fn settle_success(
        &self,
        queue: QueueName,
        id: &JobId,
        result: JsonValue,
    ) -> Result<Option<Job>, JobStoreError>;

    /// Settle a processing job as failed; the job's retry policy decides
    /// whether it is rescheduled or goes terminal.
    fn settle_failure(
        &self,
        queue: QueueName,
        id: &JobId,
        reason: String,
    ) -> Result<Option<FailureOutcome>, JobStoreError>;

    /// Cancel a non-terminal job, leaving a readable `cancelled` record.
    /// Returns `None` when the job is terminal or unknown.
    fn cancel(&self, queue: QueueName, id: &JobId) -> Result<Option<Job>, JobStoreError>;

    /// All queued and processing jobs on a queue (delayed retries included).
    fn list_active(&self, queue: QueueName) -> Result<Vec<Job>, JobStoreError>;

    /// Remove completed jobs created before `cutoff`; returns the count.
    fn purge_completed_before(
        &self,
        queue: QueueName,
        cutoff: DateTime<Utc>,
    ) -> Result<usize, JobStoreError>;
}

impl<S> JobStore for Arc<S>
where
    S: JobStore + ?Sized,
{
    fn enqueue(&self, job: Job) -> Result<JobId, JobStoreError> {
        (**self).enqueue(job)
    }

    fn get(&self, queue: QueueName, id: &JobId) -> Result<Option<Job>, JobStoreError> {
        (**self).get(queue, id)
    }

    fn claim_next(&self, queue: QueueName) -> Result<Option<Job>, JobStoreError> {
        (**self).claim_next(queue)
    }

    fn update_progress(
        &self,
        queue: QueueName,
        id: &JobId,
        progress: JobProgress,
    ) -> Result<(), JobStoreError> {
        (**self).update_progress(queue, id, progress)
    }

    fn settle_success(
        &self,
        queue: QueueName,
        id: &JobId,
        result: JsonValue,
    ) -> Result<Option<Job>, JobStoreError> {
        (**self).settle_success(queue, id, result)
    }

    fn settle_failure(
        &self,
        queue: QueueName,
        id: &JobId,
        reason: String,
    ) -> Result<Option<FailureOutcome>, JobStoreError> {
        (**self).settle_failure(queue, id, reason)
    }

    fn cancel(&self, queue: QueueName, id: &JobId) -> Result<Option<Job>, JobStoreError> {
        (**self).cancel(queue, id)
    }

    fn list_active(&self, queue: QueueName) -> Result<Vec<Job>, JobStoreError> {
        (**self).list_active(queue)
    }

    fn purge_completed_before(
        &self,
        queue: QueueName,
        cutoff: DateTime<Utc>,
    ) -> Result<usize, JobStoreError> {
        (**self).purge_completed_before(queue, cutoff)
    }
}

/// In-memory job store for tests/dev.
///
/// Durable deployments substitute a broker-backed implementation of the same
/// trait; the registry and worker pool only see the seam.
#[derive(Debug, Default)]
pub struct InMemoryJobStore {
    queues: RwLock<HashMap<QueueName, HashMap<JobId, Job>>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(
        &self,
    ) -> Result<std::sync::RwLockReadGuard<'_, HashMap<QueueName, HashMap<JobId, Job>>>, JobStoreError>
    {
        self.queues
            .read()
            .map_err(|_| JobStoreError::Storage("store lock poisoned".into()))
    }

    fn write(
        &self,
    ) -> Result<std::sync::RwLockWriteGuard<'_, HashMap<QueueName, HashMap<JobId, Job>>>, JobStoreError>
    {
        self.queues
            .write()
            .map_err(|_| JobStoreError::Storage("store lock poisoned".into()))
    }
}

#[cfg(test)]
impl InMemoryJobStore {
    /// Rewrite a job's creation time (retention tests only).
    pub(crate) fn backdate(&self, queue: QueueName, id: &JobId, created_at: DateTime<Utc>) {
        let mut queues = self.queues.write().unwrap();
        if let Some(job) = queues.entry(queue).or_default().get_mut(id) {
            job.created_at = created_at;
        }
    }
}

impl JobStore for InMemoryJobStore {
    fn enqueue(&self, job: Job) -> Result<JobId, JobStoreError> {
        let mut queues = self.write()?;
        let jobs = queues.entry(job.queue).or_default();
        if jobs.contains_key(&job.id) {
            return Err(JobStoreError::AlreadyExists(job.id.clone()));
        }
        let id = job.id.clone();
        jobs.insert(id.clone(), job);
        Ok(id)
    }

    fn get(&self, queue: QueueName, id: &JobId) -> Result<Option<Job>, JobStoreError> {
        let queues = self.read()?;
        Ok(queues.get(&queue).and_then(|jobs| jobs.get(id)).cloned())
    }

    fn claim_next(&self, queue: QueueName) -> Result<Option<Job>, JobStoreError> {
        let mut queues = self.write()?;
        let Some(jobs) = queues.get_mut(&queue) else {
            return Ok(None);
        };

        let now = Utc::now();
        // Oldest ready job wins (FIFO among claimable jobs).
        let next = jobs
            .values()
            .filter(|j| j.is_ready(now))
            .min_by_key(|j| j.created_at)
            .map(|j| j.id.clone());

        if let Some(id) = next {
            if let Some(job) = jobs.get_mut(&id) {
                job.mark_processing();
                return Ok(Some(job.clone()));
            }
        }

        Ok(None)
    }

    fn update_progress(
        &self,
        queue: QueueName,
        id: &JobId,
        progress: JobProgress,
    ) -> Result<(), JobStoreError> {
        let mut queues = self.write()?;
        let job = queues
            .get_mut(&queue)
            .and_then(|jobs| jobs.get_mut(id))
            .ok_or_else(|| JobStoreError::NotFound(id.clone()))?;

        // Advisory: a write that races a settlement is simply dropped.
        if job.status == JobStatus::Processing {
            job.progress = Some(progress);
        }
        Ok(())
    }

    fn settle_success(
        &self,
        queue: QueueName,
        id: &JobId,
        result: JsonValue,
    ) -> Result<Option<Job>, JobStoreError> {
        let mut queues = self.write()?;
        let Some(job) = queues.get_mut(&queue).and_then(|jobs| jobs.get_mut(id)) else {
            return Ok(None);
        };

        if job.status != JobStatus::Processing {
            // Late completion of a cancelled (or otherwise settled) job.
            return Ok(None);
        }

        job.mark_completed(result);
        Ok(Some(job.clone()))
    }

    fn settle_failure(
        &self,
        queue: QueueName,
        id: &JobId,
        reason: String,
    ) -> Result<Option<FailureOutcome>, JobStoreError> {
        let mut queues = self.write()?;
        let Some(job) = queues.get_mut(&queue).and_then(|jobs| jobs.get_mut(id)) else {
            return Ok(None);
        };

        if job.status != JobStatus::Processing {
            return Ok(None);
        }

        job.mark_failed(reason);
        Ok(Some(FailureOutcome {
            will_retry: job.status == JobStatus::Queued,
            job: job.clone(),
        }))
    }

    fn cancel(&self, queue: QueueName, id: &JobId) -> Result<Option<Job>, JobStoreError> {
        let mut queues = self.write()?;
        let Some(job) = queues.get_mut(&queue).and_then(|jobs| jobs.get_mut(id)) else {
            return Ok(None);
        };

        if job.status.is_terminal() {
            return Ok(None);
        }

        job.mark_cancelled();
        Ok(Some(job.clone()))
    }

    fn list_active(&self, queue: QueueName) -> Result<Vec<Job>, JobStoreError> {
        let queues = self.read()?;
        let mut jobs: Vec<Job> = queues
            .get(&queue)
            .map(|jobs| {
                jobs.values()
                    .filter(|j| matches!(j.status, JobStatus::Queued | JobStatus::Processing))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        jobs.sort_by_key(|j| j.created_at);
        Ok(jobs)
    }

    fn purge_completed_before(
        &self,
        queue: QueueName,
        cutoff: DateTime<Utc>,
    ) -> Result<usize, JobStoreError> {
        let mut queues = self.write()?;
        let Some(jobs) = queues.get_mut(&queue) else {
            return Ok(0);
        };

        let before = jobs.len();
        jobs.retain(|_, j| !(j.status == JobStatus::Completed && j.created_at < cutoff));
        Ok(before - jobs.len())
    }
}
