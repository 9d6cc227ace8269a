//! Redis pub/sub-backed event bus (optional).
//!
//! Note: Redis pub/sub is not durable — an event published while the
//! gateway is offline is gone. That is the contract here: the queue store
//! stays authoritative and clients fall back to status polling, so the bus
//! only needs to be fast, not reliable.

use std::sync::mpsc;
use std::thread;

use redis::Commands;

use careerforge_events::{EventBus, Subscription};

use crate::event::JobEvent;

/// Well-known channel carrying every job lifecycle event.
pub const JOBS_CHANNEL: &str = "jobs";

#[derive(Debug)]
pub enum RedisBusError {
    Redis(String),
    Serialize(String),
}

/// Redis pub/sub bus for JSON-encoded job events.
#[derive(Debug, Clone)]
pub struct RedisJobEventBus {
    client: redis::Client,
    channel: String,
}

impl RedisJobEventBus {
    pub fn new(redis_url: impl AsRef<str>) -> Result<Self, RedisBusError> {
        Self::with_channel(redis_url, JOBS_CHANNEL)
    }

    pub fn with_channel(
        redis_url: impl AsRef<str>,
        channel: impl Into<String>,
    ) -> Result<Self, RedisBusError> {
        let client = redis::Client::open(redis_url.as_ref())
            .map_err(|e| RedisBusError::Redis(e.to_string()))?;
        Ok(Self {
            client,
            channel: channel.into(),
        })
    }
}

impl EventBus<JobEvent> for RedisJobEventBus {
    type Error = RedisBusError;

    fn publish(&self, message: JobEvent) -> Result<(), Self::Error> {
        let payload = serde_json::to_string(&message)
            .map_err(|e| RedisBusError::Serialize(e.to_string()))?;

        let mut conn = self
            .client
            .get_connection()
            .map_err(|e| RedisBusError::Redis(e.to_string()))?;

        let _: i64 = conn
            .publish(&self.channel, payload)
            .map_err(|e| RedisBusError::Redis(e.to_string()))?;

        Ok(())
    }

    fn subscribe(&self) -> Subscription<JobEvent> {
        let (tx, rx) = mpsc::channel();

        let client = self.client.clone();
        let channel = self.channel.clone();

        // Background thread that receives pub/sub messages and forwards them.
        thread::spawn(move || {
            let mut conn = match client.get_connection() {
                Ok(c) => c,
                Err(_) => return,
            };

            let mut pubsub = conn.as_pubsub();
            if pubsub.subscribe(channel).is_err() {
                return;
            }

            loop {
                let msg = match pubsub.get_message() {
                    Ok(m) => m,
                    Err(_) => return,
                };

                let payload: String = match msg.get_payload() {
                    Ok(p) => p,
                    Err(_) => continue,
                };

                let event: JobEvent = match serde_json::from_str(&payload) {
                    Ok(e) => e,
                    Err(_) => continue,
                };

                if tx.send(event).is_err() {
                    return;
                }
            }
        });

        Subscription::new(rx)
    }
}
