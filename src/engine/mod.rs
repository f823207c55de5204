// src/engine/mod.rs

//! Orchestration engine for repobatch.
//!
//! This module ties together:
//! - the batch coordinator (which groups may start, and when)
//! - the main runtime event loop that reacts to:
//!   - task output and task completion events
//!   - user decisions after a failed task
//!   - abort requests and shutdown signals
//!
//! The pure core state machine lives in [`core`]; the async/IO shell is
//! implemented in [`runtime`].

use crate::decision::UserChoice;
use crate::types::{GroupId, TaskKey};

/// How a task process ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecOutcome {
    /// `None` when the process was killed or could not be spawned.
    pub exit_code: Option<i32>,
    /// Combined stdout/stderr of the process.
    pub output: String,
}

impl ExecOutcome {
    pub fn new(exit_code: Option<i32>, output: impl Into<String>) -> Self {
        Self {
            exit_code,
            output: output.into(),
        }
    }

    pub fn succeeded(output: impl Into<String>) -> Self {
        Self::new(Some(0), output)
    }

    pub fn failed(exit_code: i32, output: impl Into<String>) -> Self {
        Self::new(Some(exit_code), output)
    }

    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Events flowing into the runtime from the executor, the decision backend
/// and signal handlers.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    /// One line of output from a running task attempt.
    TaskOutput {
        key: TaskKey,
        attempt: u64,
        line: String,
    },
    /// A task process exited (or was killed).
    TaskCompleted {
        key: TaskKey,
        attempt: u64,
        outcome: ExecOutcome,
    },
    /// The user answered the question pending on `group`.
    UserChoice { group: GroupId, choice: UserChoice },
    /// Abort one task group.
    AbortGroup { group: GroupId },
    /// Abort every group of the batch (e.g. first Ctrl-C).
    AbortAll,
    /// Periodic wake-up used to re-evaluate waiting preconditions.
    Tick,
    /// Stop immediately (e.g. second Ctrl-C).
    ShutdownRequested,
}

pub mod core;
pub mod event_handlers;
pub mod runtime;

pub use core::CoreRuntime;
pub use event_handlers::{CoreCommand, CoreStep};
pub use runtime::Runtime;
