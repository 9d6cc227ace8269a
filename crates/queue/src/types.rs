//! Core job types and policies.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use careerforge_ai::{
    CareerInsightsRequest, ResumeGenerationRequest, ResumeOptimizationRequest, SkillGapRequest,
};
use careerforge_core::{DomainError, JobId};

/// Named queues, one per job-type family.
///
/// Each queue is serviced by its own worker slots; a stuck handler in one
/// queue never blocks another.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QueueName {
    ResumeOptimization,
    SkillGapAnalysis,
    CareerInsights,
    ResumeGeneration,
}

impl QueueName {
    pub const ALL: [QueueName; 4] = [
        QueueName::ResumeOptimization,
        QueueName::SkillGapAnalysis,
        QueueName::CareerInsights,
        QueueName::ResumeGeneration,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QueueName::ResumeOptimization => "resume-optimization",
            QueueName::SkillGapAnalysis => "skill-gap-analysis",
            QueueName::CareerInsights => "career-insights",
            QueueName::ResumeGeneration => "resume-generation",
        }
    }
}

impl core::fmt::Display for QueueName {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The specific handler a job invokes. 1:1 with its queue family.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobType {
    ResumeOptimization,
    SkillGapAnalysis,
    CareerInsights,
    ResumeGeneration,
}

impl JobType {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::ResumeOptimization => "resume-optimization",
            JobType::SkillGapAnalysis => "skill-gap-analysis",
            JobType::CareerInsights => "career-insights",
            JobType::ResumeGeneration => "resume-generation",
        }
    }

    /// The queue this job type is enqueued on.
    pub fn queue(&self) -> QueueName {
        match self {
            JobType::ResumeOptimization => QueueName::ResumeOptimization,
            JobType::SkillGapAnalysis => QueueName::SkillGapAnalysis,
            JobType::CareerInsights => QueueName::CareerInsights,
            JobType::ResumeGeneration => QueueName::ResumeGeneration,
        }
    }
}

impl core::fmt::Display for JobType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Handler-specific job input, tagged by job type.
///
/// This is exactly the JSON body a client submits: `{"type":
/// "resume-optimization", "resume_text": ..., ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum JobPayload {
    ResumeOptimization(ResumeOptimizationRequest),
    SkillGapAnalysis(SkillGapRequest),
    CareerInsights(CareerInsightsRequest),
    ResumeGeneration(ResumeGenerationRequest),
}

impl JobPayload {
    pub fn job_type(&self) -> JobType {
        match self {
            JobPayload::ResumeOptimization(_) => JobType::ResumeOptimization,
            JobPayload::SkillGapAnalysis(_) => JobType::SkillGapAnalysis,
            JobPayload::CareerInsights(_) => JobType::CareerInsights,
            JobPayload::ResumeGeneration(_) => JobType::ResumeGeneration,
        }
    }

    /// Request-path validation: reject inputs a handler could never serve.
    pub fn validate(&self) -> Result<(), DomainError> {
        match self {
            JobPayload::ResumeOptimization(req) => {
                if req.resume_text.trim().is_empty() {
                    return Err(DomainError::validation("resume text is required"));
                }
                if req.target_role.trim().is_empty() {
                    return Err(DomainError::validation("target role is required"));
                }
            }
            JobPayload::SkillGapAnalysis(req) => {
                if req.target_role.trim().is_empty() {
                    return Err(DomainError::validation("target role is required"));
                }
                if req.current_skills.is_empty() {
                    return Err(DomainError::validation("current skills are required"));
                }
            }
            JobPayload::CareerInsights(req) => {
                if req.domain.trim().is_empty() {
                    return Err(DomainError::validation("domain is required"));
                }
            }
            JobPayload::ResumeGeneration(req) => {
                if !req.resume.is_object() {
                    return Err(DomainError::validation("resume data is required"));
                }
            }
        }
        Ok(())
    }
}

/// Externally observable job status.
///
/// Transitions are monotonic: `queued → processing → {completed | failed}`,
/// with `cancelled` reachable from any non-terminal state. A retry puts the
/// job back in the claimable set; that is observed as `queued` again but is
/// an internal worker concern, not a state-machine edge of its own.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }
}

impl core::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// Advisory in-flight progress: percentage plus a human-readable stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobProgress {
    pub percent: u8,
    pub stage: String,
}

impl JobProgress {
    pub fn new(percent: u8, stage: impl Into<String>) -> Self {
        Self {
            percent: percent.min(100),
            stage: stage.into(),
        }
    }
}

/// Retry configuration: exponential backoff, doubling per attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempt budget (first run included).
    pub max_attempts: u32,
    /// Delay before the first retry; doubles each retry after that.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
        }
    }

    /// Backoff before retry number `attempt` (1-indexed): `base * 2^(n-1)`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let factor = 2u32.saturating_pow(attempt - 1);
        self.base_delay.saturating_mul(factor)
    }
}

/// The unit of asynchronous work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub queue: QueueName,
    pub payload: JobPayload,
    pub status: JobStatus,
    pub progress: Option<JobProgress>,
    pub result: Option<JsonValue>,
    pub failed_reason: Option<String>,
    pub retry: RetryPolicy,
    /// Number of times a worker has claimed this job.
    pub attempts: u32,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Earliest claimable instant; set for backoff after a failed attempt.
    pub scheduled_at: Option<DateTime<Utc>>,
}

impl Job {
    pub fn new(id: JobId, queue: QueueName, payload: JobPayload, retry: RetryPolicy) -> Self {
        Self {
            id,
            queue,
            payload,
            status: JobStatus::Queued,
            progress: None,
            result: None,
            failed_reason: None,
            retry,
            attempts: 0,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            scheduled_at: None,
        }
    }

    /// Whether a worker may claim this job right now.
    pub fn is_ready(&self, now: DateTime<Utc>) -> bool {
        self.status == JobStatus::Queued && self.scheduled_at.is_none_or(|at| now >= at)
    }

    /// Claim transition: queued → processing.
    ///
    /// `started_at` is stamped once, on the first claim only.
    pub fn mark_processing(&mut self) {
        self.status = JobStatus::Processing;
        self.attempts += 1;
        self.progress = None;
        self.scheduled_at = None;
        self.started_at.get_or_insert_with(Utc::now);
    }

    /// Settle transition: processing → completed.
    pub fn mark_completed(&mut self, result: JsonValue) {
        self.status = JobStatus::Completed;
        self.result = Some(result);
        self.progress = None;
        self.completed_at = Some(Utc::now());
    }

    /// Failure transition.
    ///
    /// With budget remaining the job goes back to the claimable set after an
    /// exponential backoff delay; otherwise it is terminally failed with the
    /// last error as its reason.
    pub fn mark_failed(&mut self, reason: String) {
        self.progress = None;
        if self.attempts < self.retry.max_attempts {
            let delay = self.retry.delay_for_attempt(self.attempts);
            self.status = JobStatus::Queued;
            self.scheduled_at =
                Some(Utc::now() + chrono::Duration::from_std(delay).unwrap_or_default());
        } else {
            self.status = JobStatus::Failed;
            self.failed_reason = Some(reason);
            self.completed_at = Some(Utc::now());
        }
    }

    /// Cancel transition, valid from any non-terminal state.
    pub fn mark_cancelled(&mut self) {
        self.status = JobStatus::Cancelled;
        self.progress = None;
    }
}

/// Public status view assembled by the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatusResponse {
    pub job_id: String,
    pub status: JobStatus,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "chrono::serde::ts_milliseconds_option"
    )]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "chrono::serde::ts_milliseconds_option"
    )]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<JobProgress>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use careerforge_core::UserId;

    fn payload() -> JobPayload {
        JobPayload::CareerInsights(CareerInsightsRequest {
            domain: "Software Engineering".into(),
            current_role: None,
            experience_level: None,
            location: None,
        })
    }

    fn job(retry: RetryPolicy) -> Job {
        let id = JobId::new(UserId::new(), JobType::CareerInsights.as_str());
        Job::new(id, QueueName::CareerInsights, payload(), retry)
    }

    #[test]
    fn backoff_doubles_per_attempt() {
        let policy = RetryPolicy::new(3, Duration::from_secs(2));

        assert_eq!(policy.delay_for_attempt(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_secs(4));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_secs(8));
    }

    #[test]
    fn lifecycle_success_path() {
        let mut job = job(RetryPolicy::default());
        assert_eq!(job.status, JobStatus::Queued);
        assert!(job.is_ready(Utc::now()));

        job.mark_processing();
        assert_eq!(job.status, JobStatus::Processing);
        assert_eq!(job.attempts, 1);
        let started = job.started_at.expect("started_at stamped on claim");

        job.mark_completed(serde_json::json!({"ok": true}));
        assert_eq!(job.status, JobStatus::Completed);
        assert!(job.result.is_some());
        assert!(job.completed_at.is_some());
        assert_eq!(job.started_at, Some(started));
    }

    #[test]
    fn failure_with_budget_reschedules_with_backoff() {
        let mut job = job(RetryPolicy::new(3, Duration::from_secs(2)));

        job.mark_processing();
        job.mark_failed("boom".into());

        assert_eq!(job.status, JobStatus::Queued);
        assert!(job.failed_reason.is_none());
        let at = job.scheduled_at.expect("backoff scheduled");
        assert!(at > Utc::now());
        assert!(!job.is_ready(Utc::now()));
    }

    #[test]
    fn failure_with_exhausted_budget_is_terminal() {
        let mut job = job(RetryPolicy::new(2, Duration::from_millis(1)));

        job.mark_processing();
        job.mark_failed("first".into());
        job.mark_processing();
        job.mark_failed("second".into());

        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.failed_reason.as_deref(), Some("second"));
        assert_eq!(job.attempts, 2);
        assert!(job.status.is_terminal());
    }

    #[test]
    fn started_at_is_stamped_once_across_retries() {
        let mut job = job(RetryPolicy::new(3, Duration::from_millis(1)));

        job.mark_processing();
        let first = job.started_at;
        job.mark_failed("boom".into());
        job.mark_processing();

        assert_eq!(job.started_at, first);
        assert_eq!(job.attempts, 2);
    }

    #[test]
    fn payload_round_trips_through_tagged_json() {
        let body = serde_json::json!({
            "type": "resume-optimization",
            "resume_text": "Rust, Tokio, and ten years of backend work",
            "target_role": "Backend Engineer",
        });

        let payload: JobPayload = serde_json::from_value(body).unwrap();
        assert_eq!(payload.job_type(), JobType::ResumeOptimization);
        assert_eq!(payload.job_type().queue(), QueueName::ResumeOptimization);
        assert!(payload.validate().is_ok());
    }

    #[test]
    fn payload_validation_rejects_empty_inputs() {
        let payload = JobPayload::SkillGapAnalysis(SkillGapRequest {
            target_role: "ML Engineer".into(),
            industry: "AI".into(),
            current_skills: vec![],
        });
        assert!(payload.validate().is_err());
    }
}
