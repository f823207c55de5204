// src/group/runner.rs

//! Sequential execution of one task group.
//!
//! ```text
//! Idle ──run──▶ Running ──task ok──▶ Running (next task) ──last ok──▶ Finished
//!                  │
//!                  └─task failed──▶ AwaitingChoice ──continue/retry──▶ Running
//!                                        └──────────abort/finish──────▶ Finished
//! ```
//!
//! The runner is synchronous and performs no IO: every method returns the
//! [`CoreCommand`]s the runtime shell must execute (dispatch a task, cancel
//! one, ask the user, report, refresh the repository).

use std::path::PathBuf;

use tracing::{debug, error, info, warn};

use crate::decision::{ChoiceSet, Question, UserChoice};
use crate::engine::{CoreCommand, ExecOutcome};
use crate::group::outcome::{GroupOutcome, TaskReport};
use crate::group::task_group::TaskGroup;
use crate::task::{AbortAction, TaskCompletion};
use crate::types::{FailurePolicy, GroupId, TaskKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerPhase {
    Idle,
    /// A task of the group is in flight.
    Running,
    /// A task failed; waiting for one of these choices.
    AwaitingChoice(ChoiceSet),
    /// The outcome has been reported.
    Finished,
}

/// Drives a [`TaskGroup`] through its tasks and reports its outcome once.
#[derive(Debug)]
pub struct GroupRunner {
    id: GroupId,
    group: TaskGroup,
    git: PathBuf,
    policy: FailurePolicy,
    phase: RunnerPhase,
    /// Index of the current (or last) task; `None` before the first start.
    task_idx: Option<usize>,
    done_count: usize,
    error_count: usize,
    abort_requested: bool,
    outcome: Option<GroupOutcome>,
}

impl GroupRunner {
    pub fn new(id: GroupId, group: TaskGroup, git: impl Into<PathBuf>, policy: FailurePolicy) -> Self {
        Self {
            id,
            group,
            git: git.into(),
            policy,
            phase: RunnerPhase::Idle,
            task_idx: None,
            done_count: 0,
            error_count: 0,
            abort_requested: false,
            outcome: None,
        }
    }

    pub fn id(&self) -> GroupId {
        self.id
    }

    pub fn group(&self) -> &TaskGroup {
        &self.group
    }

    /// Mutable access for appending tasks before the group starts.
    pub fn group_mut(&mut self) -> &mut TaskGroup {
        &mut self.group
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    pub fn phase(&self) -> RunnerPhase {
        self.phase
    }

    pub fn task_idx(&self) -> Option<usize> {
        self.task_idx
    }

    pub fn done_count(&self) -> usize {
        self.done_count
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }

    pub fn outcome(&self) -> Option<&GroupOutcome> {
        self.outcome.as_ref()
    }

    pub fn is_started(&self) -> bool {
        self.phase != RunnerPhase::Idle
    }

    pub fn is_finished(&self) -> bool {
        self.phase == RunnerPhase::Finished
    }

    /// Every task completed, or an abort was requested.
    pub fn is_done(&self) -> bool {
        self.done_count >= self.group.len() || self.abort_requested
    }

    /// Start the group with its first task.
    pub fn run(&mut self) -> Vec<CoreCommand> {
        if self.phase != RunnerPhase::Idle {
            warn!(group = %self.id, phase = ?self.phase, "GroupRunner::run on a group that already started");
            return Vec::new();
        }

        info!(group = %self.id, repo = %self.group.repo(), desc = %self.group.desc(), "starting task group");

        if self.group.is_empty() {
            return self.finalize();
        }

        self.start_next_task(false)
    }

    /// Feed the exit of a dispatched task attempt.
    ///
    /// Completions for another task, an older attempt, or a group that is
    /// not running are stale and ignored.
    pub fn on_task_completed(&mut self, index: usize, attempt: u64, outcome: ExecOutcome) -> Vec<CoreCommand> {
        if self.phase != RunnerPhase::Running || self.task_idx != Some(index) {
            debug!(group = %self.id, index, attempt, phase = ?self.phase, "stale task completion; ignoring");
            return Vec::new();
        }

        let Some(task) = self.group.task_mut(index) else {
            return Vec::new();
        };

        if task.attempt() != attempt {
            debug!(
                group = %self.id,
                index,
                attempt,
                current_attempt = task.attempt(),
                "completion from a previous attempt; ignoring"
            );
            return Vec::new();
        }

        match task.complete_exit(outcome) {
            Some(completion) => self.after_completion(index, completion),
            None => Vec::new(),
        }
    }

    /// Forward a line of progressive output from the running attempt.
    pub fn on_task_output(&self, index: usize, attempt: u64, line: String) -> Vec<CoreCommand> {
        let current = self.phase == RunnerPhase::Running
            && self.task_idx == Some(index)
            && self.group.task(index).is_some_and(|t| t.attempt() == attempt);

        if !current {
            return Vec::new();
        }

        vec![CoreCommand::TaskOutput {
            key: TaskKey::new(self.id, index),
            repo: self.group.repo().name().to_string(),
            line,
        }]
    }

    /// Apply the user's answer to the pending question.
    ///
    /// A choice that was not offered leaves the question pending. Once an
    /// abort has been requested, any answer resolves as `Abort`.
    pub fn resolve_choice(&mut self, choice: UserChoice) -> Vec<CoreCommand> {
        let RunnerPhase::AwaitingChoice(options) = self.phase else {
            debug!(group = %self.id, %choice, phase = ?self.phase, "no pending question; ignoring choice");
            return Vec::new();
        };

        if !self.abort_requested && !options.contains(choice) {
            warn!(group = %self.id, %choice, %options, "choice not offered; question stays pending");
            return Vec::new();
        }

        debug!(group = %self.id, %choice, abort_requested = self.abort_requested, "handling user choice");
        self.phase = RunnerPhase::Running;

        if self.abort_requested {
            return self.abort_now();
        }

        match choice {
            UserChoice::Abort => self.abort_now(),
            UserChoice::Continue => self.start_next_task(false),
            UserChoice::Retry => self.start_next_task(true),
            UserChoice::Finish => self.finalize(),
        }
    }

    /// Abort the group.
    ///
    /// - pending question: resolved as `Abort`;
    /// - finished: nothing happens and the reported outcome stands;
    /// - never started: finalized right away, nothing ran;
    /// - running: the in-flight attempt is cancelled and its completion
    ///   finalizes the group.
    pub fn abort(&mut self) -> Vec<CoreCommand> {
        debug!(group = %self.id, phase = ?self.phase, "GroupRunner::abort");

        match self.phase {
            RunnerPhase::Finished => {
                debug!(group = %self.id, "group already finished; abort has no effect");
                Vec::new()
            }
            RunnerPhase::AwaitingChoice(_) => {
                self.abort_requested = true;
                self.resolve_choice(UserChoice::Abort)
            }
            RunnerPhase::Idle => {
                self.abort_requested = true;
                self.abort_now()
            }
            RunnerPhase::Running => {
                if self.abort_requested {
                    debug!(group = %self.id, "abort already in progress");
                    return Vec::new();
                }
                self.abort_requested = true;
                self.group.abort();
                self.cancel_in_flight()
            }
        }
    }

    /// Mark the group as never runnable (its precondition errored).
    pub fn block(&mut self) -> Vec<CoreCommand> {
        if self.phase != RunnerPhase::Idle {
            warn!(group = %self.id, phase = ?self.phase, "cannot block a group that already started");
            return Vec::new();
        }

        warn!(group = %self.id, repo = %self.group.repo(), "precondition errored; task group will not run");
        self.group.abort();
        self.group.close();
        self.phase = RunnerPhase::Finished;

        let outcome = GroupOutcome {
            blocked: true,
            ..self.build_outcome()
        };
        self.outcome = Some(outcome.clone());
        vec![CoreCommand::GroupFinished(outcome)]
    }

    fn start_next_task(&mut self, retrying: bool) -> Vec<CoreCommand> {
        let index = if retrying {
            // Forget the failed attempt; the same task runs again from scratch.
            self.done_count = self.done_count.saturating_sub(1);
            self.error_count = self.error_count.saturating_sub(1);
            self.task_idx.unwrap_or(0)
        } else {
            self.task_idx.map_or(0, |i| i + 1)
        };
        let key = TaskKey::new(self.id, index);

        let Some(task) = self.group.task_mut(index) else {
            error!(group = %self.id, index, "no task left to start; finalizing group");
            return self.finalize();
        };

        self.task_idx = Some(index);

        match task.run(&self.git, key) {
            Ok(scheduled) => {
                self.phase = RunnerPhase::Running;
                vec![CoreCommand::Dispatch(scheduled)]
            }
            Err(err) => {
                error!(group = %self.id, %key, error = %err, "could not start task");
                let completion = TaskCompletion {
                    success: false,
                    output: err.to_string(),
                };
                let mut commands = vec![CoreCommand::TaskReported(self.report(index, &completion))];
                self.done_count += 1;
                self.error_count += 1;
                commands.extend(self.finalize());
                commands
            }
        }
    }

    fn after_completion(&mut self, index: usize, completion: TaskCompletion) -> Vec<CoreCommand> {
        let mut commands = vec![CoreCommand::TaskReported(self.report(index, &completion))];

        self.done_count += 1;
        if !completion.success {
            self.error_count += 1;
        }

        debug!(
            group = %self.id,
            index,
            success = completion.success,
            done = self.done_count,
            errors = self.error_count,
            "task of group completed"
        );

        if !completion.success && !self.abort_requested {
            if !self.policy.asks_user() {
                info!(group = %self.id, index, "task failed and group does not ask; finalizing");
                commands.extend(self.finalize());
                return commands;
            }

            let options = if self.is_done() {
                ChoiceSet::LAST_TASK
            } else {
                ChoiceSet::MORE_TASKS
            };
            self.phase = RunnerPhase::AwaitingChoice(options);
            commands.push(CoreCommand::AskUser(self.question(index, options, completion.output)));
            return commands;
        }

        if self.is_done() {
            commands.extend(self.finalize());
        } else {
            commands.extend(self.start_next_task(false));
        }
        commands
    }

    fn cancel_in_flight(&mut self) -> Vec<CoreCommand> {
        let in_flight = self
            .task_idx
            .filter(|&i| self.group.task(i).is_some_and(|t| t.is_started() && !t.is_done()));

        let Some(index) = in_flight else {
            error!(group = %self.id, "group is running but no task is in flight; finalizing");
            return self.finalize();
        };

        let Some(task) = self.group.task_mut(index) else {
            return self.finalize();
        };

        match task.abort() {
            AbortAction::CancelRequested { attempt } => {
                info!(group = %self.id, index, attempt, "cancelling running task");
                vec![CoreCommand::Cancel {
                    key: TaskKey::new(self.id, index),
                    attempt,
                }]
            }
            AbortAction::Completed(completion) => self.after_completion(index, completion),
            AbortAction::AlreadyDone => self.finalize(),
        }
    }

    fn abort_now(&mut self) -> Vec<CoreCommand> {
        self.group.abort();
        self.finalize()
    }

    fn finalize(&mut self) -> Vec<CoreCommand> {
        self.done_count = self.group.len();
        self.phase = RunnerPhase::Finished;
        self.group.close();

        let outcome = self.build_outcome();
        info!(
            group = %self.id,
            repo = %self.group.repo(),
            success = outcome.success,
            aborted = outcome.aborted,
            errors = outcome.error_count,
            "task group finished"
        );
        self.outcome = Some(outcome.clone());

        vec![
            CoreCommand::GroupFinished(outcome),
            CoreCommand::RefreshRepo(self.group.repo().clone()),
        ]
    }

    fn build_outcome(&self) -> GroupOutcome {
        let aborted = self.group.is_aborted();
        GroupOutcome {
            group: self.id,
            desc: self.group.desc().to_string(),
            repo: self.group.repo().name().to_string(),
            success: self.error_count == 0 && !aborted,
            aborted,
            blocked: false,
            done_count: self.done_count,
            error_count: self.error_count,
        }
    }

    fn report(&self, index: usize, completion: &TaskCompletion) -> TaskReport {
        let task = &self.group.tasks()[index];
        TaskReport {
            key: TaskKey::new(self.id, index),
            attempt: task.attempt(),
            desc: task.desc().to_string(),
            repo: self.group.repo().name().to_string(),
            cmd_line: task.cmd_line(),
            success: completion.success,
            state: task.state(),
            output: completion.output.clone(),
            aborted: self.abort_requested,
        }
    }

    fn question(&self, index: usize, options: ChoiceSet, output: String) -> Question {
        let task = &self.group.tasks()[index];
        Question {
            group: self.id,
            group_desc: self.group.desc().to_string(),
            repo: self.group.repo().name().to_string(),
            task: TaskKey::new(self.id, index),
            task_desc: task.desc().to_string(),
            cmd_line: task.cmd_line(),
            output,
            options,
        }
    }
}
