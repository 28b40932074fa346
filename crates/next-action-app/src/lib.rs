//! Application layer logic for next-action.
//!
//! This crate wires the reconciliation core to a change sink: configuration
//! loading, startup label resolution and the per-cycle sync service.

pub mod config;
pub mod error;
pub mod service;
pub mod sink;

// Re-exports for convenience
pub use config::{Config, ConfigOverrides, LabelNames};
pub use error::ServiceError;
pub use service::{CycleReport, SyncService, resolve_labels};
pub use sink::ChangeSink;
