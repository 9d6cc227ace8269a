//! `careerforge-core` — domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure
//! concerns): strongly-typed identifiers and the domain error model shared
//! by the queue, worker, and API layers.

pub mod error;
pub mod id;

pub use error::{DomainError, DomainResult};
pub use id::{JobId, UserId};
