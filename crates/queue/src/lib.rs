//! Background job queue core: job model, store seam, and registry.
//!
//! ## Design
//!
//! - Jobs are user-owned; the owner is encoded in the job id itself
//! - One named queue per job-type family, serviced independently
//! - Retry with exponential backoff, bounded by an attempt budget
//! - Lifecycle transitions publish fire-and-forget events on a bus
//! - The store is the single source of truth; events are a latency
//!   optimization, never authoritative
//!
//! ## Components
//!
//! - `Job` / `JobPayload` / `RetryPolicy`: the data model
//! - `JobStore`: persistence seam (in-memory impl for dev/tests; durable
//!   deployments inject their own)
//! - `JobManager`: the registry — the only component that creates, reads,
//!   cancels, or purges jobs
//! - `JobEvent`: the lifecycle fact published to the event bus

pub mod event;
pub mod manager;
pub mod store;
pub mod types;

#[cfg(feature = "redis")]
pub mod redis_bus;

pub use event::{JobEvent, JobEventKind};
pub use manager::{JobManager, JobReceipt, QueueError};
pub use store::{FailureOutcome, InMemoryJobStore, JobStore, JobStoreError};
pub use types::{
    Job, JobPayload, JobProgress, JobStatus, JobStatusResponse, JobType, QueueName, RetryPolicy,
};

#[cfg(feature = "redis")]
pub use redis_bus::{RedisBusError, RedisJobEventBus};
