//! Career analysis handlers.
//!
//! Each handler adapts one [`CareerFlows`] call to the pool: staged progress
//! reporting around the long-running analysis, then a result envelope the UI
//! renders directly. Handlers must stay idempotent — at-least-once delivery
//! means the same payload can run more than once across retries.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde_json::{Value as JsonValue, json};

use careerforge_ai::CareerFlows;
use careerforge_events::EventBus;
use careerforge_queue::{JobEvent, JobPayload, JobStore, JobType};

use crate::pool::{ProgressSink, WorkerPool};

/// Wrap an analysis output in the result shape stored on the job.
fn envelope(data: JsonValue, started: Instant) -> JsonValue {
    json!({
        "success": true,
        "data": data,
        "processingTimeMs": started.elapsed().as_millis() as u64,
        "completedAt": Utc::now().timestamp_millis(),
    })
}

/// Register a handler for every career job type.
pub fn register_career_handlers<S, B>(pool: &mut WorkerPool<S, B>, flows: Arc<dyn CareerFlows>)
where
    S: JobStore + Clone + Send + 'static,
    B: EventBus<JobEvent> + Clone + Send + 'static,
{
    {
        let flows = flows.clone();
        pool.register_handler(JobType::ResumeOptimization, move |job, progress| {
            let JobPayload::ResumeOptimization(req) = &job.payload else {
                anyhow::bail!("payload does not match resume-optimization handler");
            };
            let started = Instant::now();

            progress.report(10, "initializing");
            progress.report(30, "ai-analysis");
            let data = flows.optimize_resume(req.clone())?;
            progress.report(90, "finalizing");

            Ok(envelope(data, started))
        });
    }

    {
        let flows = flows.clone();
        pool.register_handler(JobType::SkillGapAnalysis, move |job, progress| {
            let JobPayload::SkillGapAnalysis(req) = &job.payload else {
                anyhow::bail!("payload does not match skill-gap-analysis handler");
            };
            let started = Instant::now();

            progress.report(20, "data-fetching");
            progress.report(50, "ai-analysis");
            let data = flows.analyze_skill_gap(req.clone())?;
            progress.report(95, "finalizing");

            Ok(envelope(data, started))
        });
    }

    {
        let flows = flows.clone();
        pool.register_handler(JobType::CareerInsights, move |job, progress| {
            let JobPayload::CareerInsights(req) = &job.payload else {
                anyhow::bail!("payload does not match career-insights handler");
            };
            let started = Instant::now();

            progress.report(15, "data-fetching");
            progress.report(40, "ai-analysis");
            let data = flows.career_insights(req.clone())?;
            progress.report(95, "finalizing");

            Ok(envelope(data, started))
        });
    }

    pool.register_handler(JobType::ResumeGeneration, move |job, progress| {
        let JobPayload::ResumeGeneration(req) = &job.payload else {
            anyhow::bail!("payload does not match resume-generation handler");
        };
        let started = Instant::now();

        progress.report(10, "initializing");
        progress.report(40, "ai-analysis");
        let data = flows.generate_resume(req.clone())?;
        progress.report(90, "finalizing");

        Ok(envelope(data, started))
    });
}
