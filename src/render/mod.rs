//! Render jobs: state machine, staged pipeline and the manager that schedules them.

/// Manager configuration.
pub mod config;
/// Job snapshots, stages and metrics.
pub mod job;
/// Job table and scheduling.
pub mod manager;
pub(crate) mod pipeline;
mod scheduler;
/// Per-job temporary trees.
pub mod workspace;
