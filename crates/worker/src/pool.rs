//! Worker pool with per-queue claim loops and retry-aware settlement.

use std::collections::HashMap;
use std::sync::{Arc, mpsc};
use std::thread;
use std::time::Duration;

use serde_json::Value as JsonValue;
use tracing::{debug, error, info, warn};

use careerforge_core::JobId;
use careerforge_events::EventBus;
use careerforge_queue::{Job, JobEvent, JobProgress, JobStore, JobType, QueueName};

/// Progress side-channel handed to a running handler.
///
/// Advisory: fast handlers may never call it, and a failed write is logged
/// and forgotten rather than failing the job.
pub trait ProgressSink {
    fn report(&self, percent: u8, stage: &str);
}

/// Handler function for one job type.
pub type JobHandlerFn =
    Box<dyn Fn(&Job, &dyn ProgressSink) -> anyhow::Result<JsonValue> + Send + Sync>;

/// Pool configuration.
#[derive(Debug, Clone)]
pub struct WorkerPoolConfig {
    /// Worker slots (threads) per registered queue.
    pub slots_per_queue: usize,
    /// How long an idle slot sleeps between claim attempts.
    pub poll_interval: Duration,
    /// Name prefix for worker threads / logs.
    pub name: String,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            slots_per_queue: 2,
            poll_interval: Duration::from_millis(100),
            name: "worker".to_string(),
        }
    }
}

impl WorkerPoolConfig {
    pub fn with_slots_per_queue(mut self, slots: usize) -> Self {
        self.slots_per_queue = slots.max(1);
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

/// Handle keeping the pool's threads alive.
///
/// Dropping the handle disconnects the shutdown channels, which the claim
/// loops treat as a stop signal; call [`WorkerPoolHandle::shutdown`] to also
/// wait for in-flight jobs to settle.
#[derive(Debug)]
pub struct WorkerPoolHandle {
    shutdowns: Vec<mpsc::Sender<()>>,
    joins: Vec<thread::JoinHandle<()>>,
}

impl WorkerPoolHandle {
    /// Request a graceful stop and wait for every slot to finish its
    /// current job.
    pub fn shutdown(mut self) {
        for tx in &self.shutdowns {
            let _ = tx.send(());
        }
        for join in self.joins.drain(..) {
            let _ = join.join();
        }
    }

    /// Number of worker slots the pool started with.
    pub fn slots(&self) -> usize {
        self.joins.len()
    }
}

/// Background job worker pool.
///
/// Each registered job type gets its own claim loops on its own queue — a
/// stuck handler in one queue cannot block another queue's workers.
pub struct WorkerPool<S, B> {
    store: S,
    bus: B,
    handlers: HashMap<JobType, JobHandlerFn>,
}

impl<S, B> WorkerPool<S, B>
where
    S: JobStore + Clone + Send + 'static,
    B: EventBus<JobEvent> + Clone + Send + 'static,
{
    pub fn new(store: S, bus: B) -> Self {
        Self {
            store,
            bus,
            handlers: HashMap::new(),
        }
    }

    /// Register the handler invoked for jobs of `job_type`.
    pub fn register_handler<F>(&mut self, job_type: JobType, handler: F)
    where
        F: Fn(&Job, &dyn ProgressSink) -> anyhow::Result<JsonValue> + Send + Sync + 'static,
    {
        self.handlers.insert(job_type, Box::new(handler));
    }

    /// Start the pool's threads.
    pub fn spawn(self, config: WorkerPoolConfig) -> WorkerPoolHandle {
        let WorkerPool {
            store,
            bus,
            handlers,
        } = self;

        let mut shutdowns = Vec::new();
        let mut joins = Vec::new();

        for (job_type, handler) in handlers {
            let queue = job_type.queue();
            let handler = Arc::new(handler);

            for slot in 0..config.slots_per_queue.max(1) {
                let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
                let label = format!("{}-{}-{}", config.name, queue, slot);

                let store = store.clone();
                let bus = bus.clone();
                let handler = handler.clone();
                let poll_interval = config.poll_interval;

                let join = thread::Builder::new()
                    .name(label.clone())
                    .spawn(move || {
                        worker_loop(label, queue, handler, store, bus, poll_interval, shutdown_rx);
                    })
                    .expect("failed to spawn worker thread");

                shutdowns.push(shutdown_tx);
                joins.push(join);
            }
        }

        WorkerPoolHandle { shutdowns, joins }
    }
}

fn worker_loop<S, B>(
    label: String,
    queue: QueueName,
    handler: Arc<JobHandlerFn>,
    store: S,
    bus: B,
    poll_interval: Duration,
    shutdown_rx: mpsc::Receiver<()>,
) where
    S: JobStore,
    B: EventBus<JobEvent>,
{
    info!(worker = %label, queue = %queue, "worker started");

    loop {
        match shutdown_rx.try_recv() {
            Ok(()) | Err(mpsc::TryRecvError::Disconnected) => break,
            Err(mpsc::TryRecvError::Empty) => {}
        }

        match store.claim_next(queue) {
            Ok(Some(job)) => run_job(&label, queue, &handler, &store, &bus, job),
            Ok(None) => thread::sleep(poll_interval),
            Err(e) => {
                error!(worker = %label, error = %e, "failed to claim job");
                thread::sleep(poll_interval);
            }
        }
    }

    info!(worker = %label, queue = %queue, "worker stopped");
}

fn run_job<S, B>(label: &str, queue: QueueName, handler: &JobHandlerFn, store: &S, bus: &B, job: Job)
where
    S: JobStore,
    B: EventBus<JobEvent>,
{
    debug!(worker = label, job_id = %job.id, attempt = job.attempts, "claimed job");

    let sink = StoreProgressSink {
        store,
        bus,
        queue,
        id: &job.id,
    };

    match handler(&job, &sink) {
        Ok(result) => match store.settle_success(queue, &job.id, result) {
            Ok(Some(done)) => {
                publish(bus, JobEvent::completed(&done));
                info!(worker = label, job_id = %job.id, "job completed");
            }
            Ok(None) => {
                // Job was cancelled (or otherwise settled) while we ran.
                debug!(worker = label, job_id = %job.id, "late completion dropped");
            }
            Err(e) => error!(worker = label, job_id = %job.id, error = %e, "failed to settle job"),
        },
        Err(err) => match store.settle_failure(queue, &job.id, err.to_string()) {
            Ok(Some(outcome)) if outcome.will_retry => {
                warn!(
                    worker = label,
                    job_id = %job.id,
                    attempt = outcome.job.attempts,
                    error = %err,
                    "job attempt failed; retry scheduled"
                );
            }
            Ok(Some(outcome)) => {
                publish(bus, JobEvent::failed(&outcome.job));
                warn!(
                    worker = label,
                    job_id = %job.id,
                    attempts = outcome.job.attempts,
                    error = %err,
                    "job failed; retry budget exhausted"
                );
            }
            Ok(None) => {
                debug!(worker = label, job_id = %job.id, "late failure dropped");
            }
            Err(e) => error!(worker = label, job_id = %job.id, error = %e, "failed to settle job"),
        },
    }
}

fn publish<B: EventBus<JobEvent>>(bus: &B, event: JobEvent) {
    if let Err(err) = bus.publish(event) {
        warn!(?err, "failed to publish job event");
    }
}

/// Progress reporter wired to the store side-channel and the event bus.
struct StoreProgressSink<'a, S, B> {
    store: &'a S,
    bus: &'a B,
    queue: QueueName,
    id: &'a JobId,
}

impl<S, B> ProgressSink for StoreProgressSink<'_, S, B>
where
    S: JobStore,
    B: EventBus<JobEvent>,
{
    fn report(&self, percent: u8, stage: &str) {
        let progress = JobProgress::new(percent, stage);

        if let Err(e) = self
            .store
            .update_progress(self.queue, self.id, progress.clone())
        {
            warn!(job_id = %self.id, error = %e, "failed to record job progress");
        }

        publish(self.bus, JobEvent::progress(self.id, self.queue, progress));
    }
}
