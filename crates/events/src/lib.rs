//! `careerforge-events` — lightweight pub/sub plumbing.
//!
//! Carries job lifecycle notifications between the registry, the worker
//! pool, and the notification gateway. The bus is a transport, not a store:
//! delivery is fire-and-forget and the queue store stays the source of
//! truth for job state.

pub mod bus;
pub mod in_memory_bus;

pub use bus::{EventBus, Subscription};
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
