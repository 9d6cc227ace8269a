//! `careerforge-observability` — process-wide logging/tracing setup.

mod tracing_init;

pub use tracing_init::init;
