// src/task/mod.rs

//! Tasks: one asynchronous git invocation each.
//!
//! - [`state`] holds the `Task` lifecycle state machine
//!   (`NotStarted → Started → Successful | Errored`).
//! - [`git`] builds the git command line and decorates failure output.
//! - [`scheduled`] describes an invocation handed to the executor.

pub mod git;
pub mod scheduled;
pub mod state;

pub use git::GitCommand;
pub use scheduled::ScheduledTask;
pub use state::{AbortAction, Task, TaskCompletion, TaskState, ABORTED_BEFORE_START};
