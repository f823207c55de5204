// src/exec/mod.rs

//! Process execution layer.
//!
//! This module is responsible for actually running the git invocations
//! handed out by the core, using `tokio::process::Command`, and reporting
//! back to the orchestration runtime via `RuntimeEvent`s.
//!
//! - [`executor_loop`] owns the main executor loop which manages processes,
//!   at most one per task group.
//! - [`task_runner`] handles one process: output streaming, exit and
//!   cancellation.
//! - [`backend`] provides the `ExecutorBackend` trait and a concrete
//!   `RealExecutorBackend` that the runtime uses in production, and which
//!   tests can replace with a fake implementation.

pub mod backend;
pub mod executor_loop;
pub mod task_runner;

pub use backend::{ExecutorBackend, RealExecutorBackend};
pub use executor_loop::{spawn_executor, ExecutorRequest};
pub use task_runner::CANCELLED_OUTPUT;
