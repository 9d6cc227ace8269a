//! Infrastructure wiring: store, bus, registry, worker pool, and the
//! realtime bridge feeding the notification gateway.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use tokio::sync::broadcast;
use tokio_stream::{StreamExt, wrappers::BroadcastStream};

use careerforge_ai::LocalCareerFlows;
use careerforge_core::UserId;
use careerforge_events::{EventBus, InMemoryEventBus};
use careerforge_queue::{
    InMemoryJobStore, JobEvent, JobManager, JobPayload, JobReceipt, JobStatusResponse, QueueError,
    QueueName, RetryPolicy,
};
use careerforge_worker::{WorkerPool, WorkerPoolConfig, WorkerPoolHandle, register_career_handlers};

use crate::config::ApiConfig;

#[cfg(feature = "redis")]
use careerforge_queue::RedisJobEventBus;

type Store = Arc<InMemoryJobStore>;
type InMemoryManager = JobManager<Store, Arc<InMemoryEventBus<JobEvent>>>;
#[cfg(feature = "redis")]
type RedisBusManager = JobManager<Store, Arc<RedisJobEventBus>>;

pub enum AppServices {
    InMemory {
        manager: Arc<InMemoryManager>,
        realtime_tx: broadcast::Sender<JobEvent>,
        /// Keeps the pool's threads alive for the life of the app.
        _worker: Option<Arc<WorkerPoolHandle>>,
    },
    #[cfg(feature = "redis")]
    RedisBus {
        manager: Arc<RedisBusManager>,
        realtime_tx: broadcast::Sender<JobEvent>,
        _worker: Option<Arc<WorkerPoolHandle>>,
    },
}

pub fn build_services(config: &ApiConfig) -> AppServices {
    if config.use_redis_bus {
        #[cfg(feature = "redis")]
        {
            return build_redis_bus_services(config);
        }
        #[cfg(not(feature = "redis"))]
        {
            tracing::warn!(
                "USE_REDIS_BUS=true but the redis feature is not enabled; using the in-memory bus"
            );
        }
    }

    build_in_memory_services(config)
}

fn build_in_memory_services(config: &ApiConfig) -> AppServices {
    let bus: Arc<InMemoryEventBus<JobEvent>> = Arc::new(InMemoryEventBus::new());
    let (manager, realtime_tx, worker) = wire(config, bus);
    AppServices::InMemory {
        manager,
        realtime_tx,
        _worker: worker,
    }
}

#[cfg(feature = "redis")]
fn build_redis_bus_services(config: &ApiConfig) -> AppServices {
    let bus = Arc::new(
        RedisJobEventBus::new(&config.redis_url).expect("failed to create Redis event bus"),
    );
    let (manager, realtime_tx, worker) = wire(config, bus);
    AppServices::RedisBus {
        manager,
        realtime_tx,
        _worker: worker,
    }
}

/// Shared wiring: store + registry, the in-process worker pool (a
/// deployment choice — the pool only sees the store/bus seams), and the
/// bus→broadcast bridge the SSE gateway fans out from.
fn wire<B>(
    config: &ApiConfig,
    bus: B,
) -> (
    Arc<JobManager<Store, B>>,
    broadcast::Sender<JobEvent>,
    Option<Arc<WorkerPoolHandle>>,
)
where
    B: EventBus<JobEvent> + Clone + Send + 'static,
{
    let store: Store = Arc::new(InMemoryJobStore::new());
    let retry = RetryPolicy::new(config.max_attempts, config.backoff_base);
    let manager = Arc::new(JobManager::new(store.clone(), bus.clone()).with_retry_policy(retry));

    let worker = config.worker_enabled.then(|| {
        let mut pool = WorkerPool::new(store.clone(), bus.clone());
        register_career_handlers(&mut pool, Arc::new(LocalCareerFlows::new()));

        let handle = pool.spawn(
            WorkerPoolConfig::default()
                .with_slots_per_queue(config.worker_slots)
                .with_name("careerforge-worker"),
        );
        tracing::info!(slots = handle.slots(), "worker pool started");
        Arc::new(handle)
    });

    // Bridge: bus subscription -> lossy broadcast for SSE connections.
    let (realtime_tx, _realtime_rx) = broadcast::channel::<JobEvent>(256);
    {
        let sub = bus.subscribe();
        let realtime_tx = realtime_tx.clone();
        tokio::task::spawn_blocking(move || {
            loop {
                match sub.recv() {
                    Ok(event) => {
                        // No subscribers is fine; events are fire-and-forget.
                        let _ = realtime_tx.send(event);
                    }
                    Err(_) => break,
                }
            }
        });
    }

    (manager, realtime_tx, worker)
}

impl AppServices {
    pub fn create_job(
        &self,
        queue: QueueName,
        payload: JobPayload,
        user: UserId,
    ) -> Result<JobReceipt, QueueError> {
        match self {
            AppServices::InMemory { manager, .. } => manager.create_job(queue, payload, user),
            #[cfg(feature = "redis")]
            AppServices::RedisBus { manager, .. } => manager.create_job(queue, payload, user),
        }
    }

    pub fn job_status(
        &self,
        raw_id: &str,
        user: UserId,
    ) -> Result<Option<JobStatusResponse>, QueueError> {
        match self {
            AppServices::InMemory { manager, .. } => manager.job_status(raw_id, user),
            #[cfg(feature = "redis")]
            AppServices::RedisBus { manager, .. } => manager.job_status(raw_id, user),
        }
    }

    pub fn cancel_job(&self, raw_id: &str, user: UserId) -> Result<bool, QueueError> {
        match self {
            AppServices::InMemory { manager, .. } => manager.cancel_job(raw_id, user),
            #[cfg(feature = "redis")]
            AppServices::RedisBus { manager, .. } => manager.cancel_job(raw_id, user),
        }
    }

    pub fn user_active_jobs(&self, user: UserId) -> Result<Vec<JobStatusResponse>, QueueError> {
        match self {
            AppServices::InMemory { manager, .. } => manager.user_active_jobs(user),
            #[cfg(feature = "redis")]
            AppServices::RedisBus { manager, .. } => manager.user_active_jobs(user),
        }
    }

    pub fn cleanup_old_jobs(&self, max_age_hours: i64) -> Result<usize, QueueError> {
        match self {
            AppServices::InMemory { manager, .. } => manager.cleanup_old_jobs(max_age_hours),
            #[cfg(feature = "redis")]
            AppServices::RedisBus { manager, .. } => manager.cleanup_old_jobs(max_age_hours),
        }
    }

    pub fn realtime_tx(&self) -> &broadcast::Sender<JobEvent> {
        match self {
            AppServices::InMemory { realtime_tx, .. } => realtime_tx,
            #[cfg(feature = "redis")]
            AppServices::RedisBus { realtime_tx, .. } => realtime_tx,
        }
    }
}

/// Build the per-connection SSE stream for `user` (used by `/jobs/stream`).
///
/// The stream holds no job state: it filters the shared broadcast down to
/// the authenticated user's events. Lossy by design — a lagging client just
/// misses events and falls back to status polling.
pub fn user_sse_stream(
    services: &AppServices,
    user: UserId,
) -> Sse<impl tokio_stream::Stream<Item = Result<SseEvent, Infallible>> + use<>> {
    let rx = services.realtime_tx().subscribe();
    let stream = BroadcastStream::new(rx).filter_map(move |msg| match msg {
        Ok(event) if event.user_id == user => {
            let data = serde_json::to_string(&event).unwrap_or_else(|_| "{}".to_string());
            Some(Ok(SseEvent::default().event(event.kind.as_str()).data(data)))
        }
        _ => None,
    });

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}
