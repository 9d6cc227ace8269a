//! Environment-driven configuration.
//!
//! Every knob the deployment owns: bind address, auth secret, CORS origin,
//! worker sizing, retry/backoff, and the retention sweep. Defaults favour
//! local development.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Address the HTTP server binds.
    pub bind_addr: SocketAddr,
    /// HS256 secret the bearer tokens are verified against.
    pub jwt_secret: String,
    /// Origin allowed to call the API from a browser.
    pub allowed_origin: String,
    /// Whether to run the worker pool inside this process.
    pub worker_enabled: bool,
    /// Worker slots per queue.
    pub worker_slots: usize,
    /// Attempt budget for every job.
    pub max_attempts: u32,
    /// Backoff before the first retry (doubles per retry).
    pub backoff_base: Duration,
    /// Completed jobs older than this are swept.
    pub retention_hours: i64,
    /// How often the retention sweep runs.
    pub cleanup_interval: Duration,
    /// Distribute job events over Redis pub/sub instead of in-process
    /// (requires the `redis` feature).
    pub use_redis_bus: bool,
    pub redis_url: String,
}

impl ApiConfig {
    pub fn from_env() -> Self {
        let jwt_secret = std::env::var("JWT_SECRET").unwrap_or_else(|_| {
            tracing::warn!("JWT_SECRET not set; using insecure dev default");
            "dev-secret".to_string()
        });

        let port: u16 = env_parse("PORT", 8080);

        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], port)),
            jwt_secret,
            allowed_origin: std::env::var("CORS_ORIGIN")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            worker_enabled: env_parse("WORKER_ENABLED", true),
            worker_slots: env_parse("WORKER_CONCURRENCY", 5),
            max_attempts: env_parse("JOB_MAX_ATTEMPTS", 3),
            backoff_base: Duration::from_millis(env_parse("JOB_BACKOFF_MS", 2000)),
            retention_hours: env_parse("JOB_RETENTION_HOURS", 24),
            cleanup_interval: Duration::from_secs(env_parse("JOB_CLEANUP_INTERVAL_SECS", 3600)),
            use_redis_bus: env_parse("USE_REDIS_BUS", false),
            redis_url: std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
        }
    }

    /// Local-development defaults with an explicit secret. Used by tests and
    /// example setups; production goes through [`ApiConfig::from_env`].
    pub fn dev(jwt_secret: impl Into<String>) -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            jwt_secret: jwt_secret.into(),
            allowed_origin: "http://localhost:3000".to_string(),
            worker_enabled: true,
            worker_slots: 1,
            max_attempts: 3,
            backoff_base: Duration::from_millis(50),
            retention_hours: 24,
            cleanup_interval: Duration::from_secs(3600),
            use_redis_bus: false,
            redis_url: "redis://localhost:6379".to_string(),
        }
    }
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, "unparseable env var; using default");
            default
        }),
        Err(_) => default,
    }
}
