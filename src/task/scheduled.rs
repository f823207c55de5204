// src/task/scheduled.rs

use std::ffi::OsString;
use std::path::PathBuf;

use crate::types::TaskKey;

/// Description of a git invocation that the core wants the executor to run
/// now.
#[derive(Debug, Clone)]
pub struct ScheduledTask {
    pub key: TaskKey,
    /// Run counter of the task. Completions carrying an older attempt are
    /// stale (the task was retried) and get dropped by the runner.
    pub attempt: u64,
    pub desc: String,
    pub repo: String,
    pub program: PathBuf,
    pub args: Vec<OsString>,
    /// Display form, `git <args…>` without the `-C` prefix.
    pub cmd_line: String,
}
