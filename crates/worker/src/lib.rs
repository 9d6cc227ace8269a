//! `careerforge-worker` — detached execution of queued jobs.
//!
//! A pool of independent claim loops, one set per queue, each running a
//! single job at a time: claim, execute the matching handler, settle. The
//! store's retry policy drives backoff on transient failure; the pool never
//! propagates handler errors to callers.

pub mod handlers;
pub mod pool;

pub use handlers::register_career_handlers;
pub use pool::{JobHandlerFn, ProgressSink, WorkerPool, WorkerPoolConfig, WorkerPoolHandle};
