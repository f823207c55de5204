// src/task/state.rs

//! Task lifecycle state machine.

use std::fmt;
use std::path::Path;

use tracing::{debug, error, warn};

use crate::engine::ExecOutcome;
use crate::errors::{RepobatchError, Result};
use crate::repo::RepoRef;
use crate::task::git::{self, GitCommand};
use crate::task::scheduled::ScheduledTask;
use crate::types::TaskKey;

/// Output of the completion synthesized when a task is aborted before it
/// ever started.
pub const ABORTED_BEFORE_START: &str = "Aborted before started.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    NotStarted,
    Started,
    Successful,
    Errored,
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskState::NotStarted => "NotStarted",
            TaskState::Started => "Started",
            TaskState::Successful => "Successful",
            TaskState::Errored => "Errored",
        };
        f.write_str(s)
    }
}

/// Completion notification, produced exactly once per `run()`.
///
/// `success` is the value seen by whoever drives the task. For a task with
/// `ignore_failure`, a failed run still reports `success = true` here while
/// [`Task::state`] stays `Errored`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskCompletion {
    pub success: bool,
    pub output: String,
}

/// What `Task::abort` did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbortAction {
    /// The task never started; it is now `Errored` and this is its
    /// synthesized completion.
    Completed(TaskCompletion),
    /// The task is running: the executor must cancel this attempt, and the
    /// cancelled process will complete the task through the normal path.
    CancelRequested { attempt: u64 },
    /// Already finished, nothing to abort.
    AlreadyDone,
}

/// One git command to run against a repository.
#[derive(Debug, Clone)]
pub struct Task {
    desc: String,
    repo: RepoRef,
    command: GitCommand,
    ignore_failure: bool,
    state: TaskState,
    attempt: u64,
    last_output: Option<String>,
}

impl Task {
    /// Create a task. An empty description defaults to the command line.
    pub fn new(desc: impl Into<String>, repo: RepoRef, command: GitCommand) -> Self {
        let desc = desc.into();
        let desc = if desc.is_empty() {
            command.cmd_line()
        } else {
            desc
        };

        Self {
            desc,
            repo,
            command,
            ignore_failure: false,
            state: TaskState::NotStarted,
            attempt: 0,
            last_output: None,
        }
    }

    /// Shorthand for a git task running inside the repository.
    pub fn git<I, S>(desc: impl Into<String>, repo: RepoRef, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(desc, repo, GitCommand::new(args))
    }

    pub fn with_ignore_failure(mut self, ignore: bool) -> Self {
        self.ignore_failure = ignore;
        self
    }

    /// Run without the `-C <repo>` prefix.
    pub fn outside_repo(mut self) -> Self {
        self.command = self.command.outside_repo();
        self
    }

    pub fn desc(&self) -> &str {
        &self.desc
    }

    pub fn repo(&self) -> &RepoRef {
        &self.repo
    }

    pub fn command(&self) -> &GitCommand {
        &self.command
    }

    pub fn cmd_line(&self) -> String {
        self.command.cmd_line()
    }

    pub fn ignore_failure(&self) -> bool {
        self.ignore_failure
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    /// Number of times `run()` was accepted.
    pub fn attempt(&self) -> u64 {
        self.attempt
    }

    /// Output of the last finished attempt, kept for diagnostics.
    pub fn last_output(&self) -> Option<&str> {
        self.last_output.as_deref()
    }

    pub fn is_done(&self) -> bool {
        matches!(self.state, TaskState::Successful | TaskState::Errored)
    }

    pub fn is_started(&self) -> bool {
        !matches!(self.state, TaskState::NotStarted)
    }

    pub fn is_successful(&self) -> bool {
        self.state == TaskState::Successful
    }

    pub fn is_errored(&self) -> bool {
        self.state == TaskState::Errored
    }

    /// Start the task and return the invocation to hand to the executor.
    ///
    /// A running task is rejected without any state change. A finished task
    /// is reset and started again (retry).
    pub fn run(&mut self, git: &Path, key: TaskKey) -> Result<ScheduledTask> {
        debug!(task = %self, %key, "Task::run");

        if self.state == TaskState::Started {
            error!(task = %self, %key, "trying to start an already started task");
            return Err(RepobatchError::TaskAlreadyStarted(self.to_string()));
        }

        git::ensure_executable(git)?;

        if self.is_done() {
            debug!(task = %self, %key, "restarting a finished task");
            self.state = TaskState::NotStarted;
        }

        self.state = TaskState::Started;
        self.attempt += 1;
        self.last_output = None;

        Ok(ScheduledTask {
            key,
            attempt: self.attempt,
            desc: self.desc.clone(),
            repo: self.repo.name().to_string(),
            program: git.to_path_buf(),
            args: self.command.full_args(&self.repo),
            cmd_line: self.command.cmd_line(),
        })
    }

    /// Record the result of the running attempt.
    ///
    /// Returns `None` (and changes nothing) if the task is not running, so a
    /// late or duplicate report can never produce a second completion.
    pub fn complete(&mut self, success: bool, output: String) -> Option<TaskCompletion> {
        if self.state != TaskState::Started {
            warn!(task = %self, success, "completion for a task that is not running; ignoring");
            return None;
        }
        Some(self.finish(success, output))
    }

    /// Record a process exit. Failed runs get the git failure notes appended.
    pub fn complete_exit(&mut self, outcome: ExecOutcome) -> Option<TaskCompletion> {
        let success = outcome.success();
        let output = if success {
            outcome.output
        } else {
            git::decorate_failure_output(outcome.output, self.ignore_failure)
        };
        self.complete(success, output)
    }

    /// Abort the task. See [`AbortAction`] for the three cases.
    pub fn abort(&mut self) -> AbortAction {
        debug!(task = %self, "Task::abort");
        match self.state {
            TaskState::NotStarted => {
                self.state = TaskState::Errored;
                self.last_output = Some(ABORTED_BEFORE_START.to_string());
                AbortAction::Completed(TaskCompletion {
                    success: false,
                    output: ABORTED_BEFORE_START.to_string(),
                })
            }
            TaskState::Started => AbortAction::CancelRequested {
                attempt: self.attempt,
            },
            TaskState::Successful | TaskState::Errored => AbortAction::AlreadyDone,
        }
    }

    fn finish(&mut self, success: bool, output: String) -> TaskCompletion {
        self.state = if success {
            TaskState::Successful
        } else {
            TaskState::Errored
        };
        self.last_output = Some(output.clone());
        debug!(task = %self, success, "task done");

        let reported = if !success && self.ignore_failure {
            debug!(task = %self, "ignoring failure as requested; reporting success");
            true
        } else {
            success
        };

        TaskCompletion {
            success: reported,
            output,
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Task<repo={}, cmd={}, state={}>",
            self.repo.name(),
            self.command.cmd_line(),
            self.state
        )
    }
}
