// src/group/task_group.rs

use std::fmt;

use tracing::warn;

use crate::fs::FileSystem;
use crate::group::precondition::{GroupLookup, Precondition, PreconditionState};
use crate::repo::RepoRef;
use crate::task::{GitCommand, Task};

/// Several tasks to run in order on one repository.
///
/// The group only aggregates task state. Sequencing, failure handling and
/// cancellation of the running task belong to
/// [`GroupRunner`](crate::group::GroupRunner).
#[derive(Debug, Clone)]
pub struct TaskGroup {
    desc: String,
    repo: RepoRef,
    tasks: Vec<Task>,
    precondition: Option<Precondition>,
    aborted: bool,
    /// Set by the runner once the group reported its outcome, which may
    /// happen before every task ran (stop policy, finish choice).
    closed: bool,
}

impl TaskGroup {
    pub fn new(desc: impl Into<String>, repo: RepoRef) -> Self {
        Self {
            desc: desc.into(),
            repo,
            tasks: Vec::new(),
            precondition: None,
            aborted: false,
            closed: false,
        }
    }

    pub fn with_tasks(mut self, tasks: impl IntoIterator<Item = Task>) -> Self {
        self.tasks.extend(tasks);
        self
    }

    pub fn with_precondition(mut self, precondition: Precondition) -> Self {
        self.precondition = Some(precondition);
        self
    }

    pub fn append_task(&mut self, task: Task) {
        if self.is_started() {
            warn!(group = %self, task = %task, "appending a task to a group that already started");
        }
        self.tasks.push(task);
    }

    /// Append a git task targeting this group's repository.
    pub fn append_git_task<I, S>(&mut self, desc: impl Into<String>, args: I, run_inside_repo: bool)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let command = GitCommand::new(args).with_run_inside_repo(run_inside_repo);
        self.append_task(Task::new(desc, self.repo.clone(), command));
    }

    pub fn desc(&self) -> &str {
        &self.desc
    }

    pub fn repo(&self) -> &RepoRef {
        &self.repo
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn task(&self, index: usize) -> Option<&Task> {
        self.tasks.get(index)
    }

    pub(crate) fn task_mut(&mut self, index: usize) -> Option<&mut Task> {
        self.tasks.get_mut(index)
    }

    pub fn precondition(&self) -> Option<&Precondition> {
        self.precondition.as_ref()
    }

    /// `Fulfilled` when there is no precondition, otherwise whatever the
    /// precondition says right now.
    pub fn precondition_state<L>(&self, groups: &L, fs: &dyn FileSystem) -> PreconditionState
    where
        L: GroupLookup + ?Sized,
    {
        match &self.precondition {
            None => PreconditionState::Fulfilled,
            Some(pre) => pre.evaluate(groups, fs),
        }
    }

    /// All tasks done, or the group was aborted or closed by its runner.
    pub fn is_finished(&self) -> bool {
        self.aborted || self.closed || self.tasks.iter().all(Task::is_done)
    }

    pub fn is_successful(&self) -> bool {
        !self.aborted && self.tasks.iter().all(Task::is_successful)
    }

    pub fn is_errored(&self) -> bool {
        self.aborted || self.tasks.iter().any(Task::is_errored)
    }

    pub fn is_started(&self) -> bool {
        self.tasks.iter().any(Task::is_started)
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted
    }

    /// Mark the group as aborted. Terminal; does not touch running tasks.
    pub fn abort(&mut self) {
        self.aborted = true;
    }

    pub(crate) fn close(&mut self) {
        self.closed = true;
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

impl fmt::Display for TaskGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TaskGroup<desc={}, repo={}, tasks={}>",
            self.desc,
            self.repo.name(),
            self.tasks.len()
        )
    }
}
