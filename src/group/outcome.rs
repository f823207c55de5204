// src/group/outcome.rs

use crate::task::TaskState;
use crate::types::{GroupId, TaskKey};

/// Result of one task attempt, as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskReport {
    pub key: TaskKey,
    pub attempt: u64,
    pub desc: String,
    pub repo: String,
    pub cmd_line: String,
    /// Success as emitted by the task (masked by `ignore_failure`).
    pub success: bool,
    /// Real state of the task after this attempt.
    pub state: TaskState,
    pub output: String,
    /// The group was being aborted when this attempt finished.
    pub aborted: bool,
}

/// Final result of a task group, reported exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupOutcome {
    pub group: GroupId,
    pub desc: String,
    pub repo: String,
    /// `error_count == 0` and not aborted.
    pub success: bool,
    pub aborted: bool,
    /// The group never ran because its precondition errored.
    pub blocked: bool,
    pub done_count: usize,
    pub error_count: usize,
}
