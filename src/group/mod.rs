// src/group/mod.rs

//! Task groups and the runner driving them.
//!
//! - [`task_group`] is the ordered, per-repository sequence of tasks.
//! - [`precondition`] gates when a group may start.
//! - [`runner`] executes a group one task at a time and runs the failure
//!   recovery protocol (abort / continue / retry / finish).
//! - [`outcome`] holds the values a runner reports upward.

pub mod outcome;
pub mod precondition;
pub mod runner;
pub mod task_group;

pub use outcome::{GroupOutcome, TaskReport};
pub use precondition::{GroupLookup, Precondition, PreconditionKind, PreconditionState};
pub use runner::{GroupRunner, RunnerPhase};
pub use task_group::TaskGroup;
