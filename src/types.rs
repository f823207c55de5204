use std::fmt;

use serde::Deserialize;

/// What a group runner does when one of its tasks fails.
///
/// - `Ask`: stop and ask the user whether to continue, retry, abort or
///   finish (default behaviour).
/// - `Stop`: finalize the group immediately as failed. Used for unattended
///   runs where nobody is around to answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    Ask,
    Stop,
}

impl Default for FailurePolicy {
    fn default() -> Self {
        FailurePolicy::Ask
    }
}

impl FailurePolicy {
    pub fn asks_user(self) -> bool {
        matches!(self, FailurePolicy::Ask)
    }
}

/// Index of a task group inside the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupId(pub usize);

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "g{}", self.0)
    }
}

/// Position of a task: its group plus its index in the group sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskKey {
    pub group: GroupId,
    pub index: usize,
}

impl TaskKey {
    pub fn new(group: GroupId, index: usize) -> Self {
        Self { group, index }
    }
}

impl fmt::Display for TaskKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/t{}", self.group, self.index)
    }
}
