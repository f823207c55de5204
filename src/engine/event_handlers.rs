// src/engine/event_handlers.rs

//! Event handling logic for the core runtime.

use tracing::{debug, info};

use crate::batch::{BatchSummary, Coordinator};
use crate::decision::{Question, UserChoice};
use crate::engine::ExecOutcome;
use crate::group::{GroupOutcome, TaskReport};
use crate::repo::RepoRef;
use crate::task::ScheduledTask;
use crate::types::{GroupId, TaskKey};

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone)]
pub enum CoreCommand {
    /// Send this task attempt to the executor.
    Dispatch(ScheduledTask),
    /// Kill the process of this attempt; it still reports a completion.
    Cancel { key: TaskKey, attempt: u64 },
    /// Present a question to the user.
    AskUser(Question),
    /// Progressive output of the running attempt.
    TaskOutput {
        key: TaskKey,
        repo: String,
        line: String,
    },
    /// A task attempt finished.
    TaskReported(TaskReport),
    /// A group reported its final outcome.
    GroupFinished(GroupOutcome),
    /// Re-read repository metadata after a group is done with it.
    RefreshRepo(RepoRef),
    /// Every group of the batch finished.
    BatchFinished(BatchSummary),
    /// Request that the process exits.
    RequestExit,
}

/// Decision returned by the core after handling a single `RuntimeEvent`.
#[derive(Debug, Clone)]
pub struct CoreStep {
    /// Commands the IO shell should execute (dispatch, cancel, ask, report).
    pub commands: Vec<CoreCommand>,
    /// Whether the outer runtime loop should keep running.
    pub keep_running: bool,
}

impl CoreStep {
    pub fn running(commands: Vec<CoreCommand>) -> Self {
        Self {
            commands,
            keep_running: true,
        }
    }
}

/// Handle a task process exit.
///
/// The completion is routed to the group owning the task; the group
/// ignores it if it belongs to an older attempt.
pub fn handle_task_completed(
    coordinator: &mut Coordinator,
    key: TaskKey,
    attempt: u64,
    outcome: ExecOutcome,
) -> Vec<CoreCommand> {
    debug!(%key, attempt, exit_code = ?outcome.exit_code, "handling task completion");

    match coordinator.runner_mut(key.group) {
        Some(runner) => runner.on_task_completed(key.index, attempt, outcome),
        None => {
            debug!(%key, "completion for unknown group; ignoring");
            Vec::new()
        }
    }
}

pub fn handle_task_output(
    coordinator: &Coordinator,
    key: TaskKey,
    attempt: u64,
    line: String,
) -> Vec<CoreCommand> {
    coordinator
        .runner(key.group)
        .map(|runner| runner.on_task_output(key.index, attempt, line))
        .unwrap_or_default()
}

pub fn handle_user_choice(
    coordinator: &mut Coordinator,
    group: GroupId,
    choice: UserChoice,
) -> Vec<CoreCommand> {
    match coordinator.runner_mut(group) {
        Some(runner) => runner.resolve_choice(choice),
        None => {
            debug!(%group, %choice, "choice for unknown group; ignoring");
            Vec::new()
        }
    }
}

pub fn handle_abort_group(coordinator: &mut Coordinator, group: GroupId) -> Vec<CoreCommand> {
    info!(%group, "abort requested for task group");
    match coordinator.runner_mut(group) {
        Some(runner) => runner.abort(),
        None => Vec::new(),
    }
}

/// Abort every group that has not finished yet, including the ones still
/// waiting on their precondition.
pub fn handle_abort_all(coordinator: &mut Coordinator) -> Vec<CoreCommand> {
    info!("abort requested for the whole batch");
    coordinator
        .runners_mut()
        .flat_map(|runner| runner.abort())
        .collect()
}
