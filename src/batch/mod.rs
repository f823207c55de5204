// src/batch/mod.rs

//! A batch is every task group of one run, with the coordinator deciding
//! when each of them may start.

pub mod coordinator;
pub mod summary;

pub use coordinator::{BatchOptions, Coordinator};
pub use summary::BatchSummary;
