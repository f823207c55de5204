// src/batch/coordinator.rs

//! Holds every group runner of a batch and starts groups as their
//! preconditions allow.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info};

use crate::batch::summary::BatchSummary;
use crate::config::BatchConfig;
use crate::engine::CoreCommand;
use crate::errors::{RepobatchError, Result};
use crate::fs::FileSystem;
use crate::group::{
    GroupLookup, GroupRunner, Precondition, PreconditionKind, PreconditionState, TaskGroup,
};
use crate::repo::{RepoInfo, RepoRef};
use crate::task::{GitCommand, Task};
use crate::types::{FailurePolicy, GroupId};

/// Run-time selection applied on top of a batch file.
#[derive(Debug, Clone, Default)]
pub struct BatchOptions {
    /// Only run these groups (all groups when empty). A dependency on a
    /// group left out of the selection blocks the dependent group.
    pub only_groups: Vec<String>,
    /// Never ask the user: every group uses [`FailurePolicy::Stop`].
    pub force_stop: bool,
}

#[derive(Debug)]
pub struct Coordinator {
    runners: Vec<GroupRunner>,
    names: Vec<String>,
    git: PathBuf,
    fs: Arc<dyn FileSystem>,
}

impl GroupLookup for Coordinator {
    fn group(&self, id: GroupId) -> Option<&TaskGroup> {
        self.runners.get(id.0).map(GroupRunner::group)
    }
}

impl Coordinator {
    pub fn new(git: impl Into<PathBuf>, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            runners: Vec::new(),
            names: Vec::new(),
            git: git.into(),
            fs,
        }
    }

    /// Build the batch described by a validated config.
    ///
    /// Groups get their ids in config order (sorted by name).
    pub fn from_config(cfg: &BatchConfig, options: &BatchOptions, fs: Arc<dyn FileSystem>) -> Result<Self> {
        if let Some(unknown) = options
            .only_groups
            .iter()
            .find(|name| !cfg.group.contains_key(name.as_str()))
        {
            return Err(RepobatchError::GroupNotFound(unknown.clone()));
        }

        let selected: Vec<&String> = cfg
            .group
            .keys()
            .filter(|name| options.only_groups.is_empty() || options.only_groups.contains(*name))
            .collect();

        let ids: HashMap<&str, GroupId> = selected
            .iter()
            .copied()
            .enumerate()
            .map(|(i, name)| (name.as_str(), GroupId(i)))
            .collect();

        let repos: HashMap<&str, RepoRef> = cfg
            .repo
            .iter()
            .map(|(name, repo)| (name.as_str(), RepoInfo::shared(name.clone(), repo.path.clone())))
            .collect();

        let mut coordinator = Self::new(cfg.config.git.clone(), fs);

        for name in selected {
            let group_cfg = &cfg.group[name];
            let repo = repos.get(group_cfg.repo.as_str()).cloned().ok_or_else(|| {
                RepobatchError::ConfigError(format!(
                    "group '{}' refers to unknown repo '{}'",
                    name, group_cfg.repo
                ))
            })?;

            let tasks = group_cfg.task.iter().map(|t| {
                let command = GitCommand::new(t.args.iter().cloned()).with_run_inside_repo(t.run_inside_repo);
                Task::new(t.desc.clone().unwrap_or_default(), repo.clone(), command)
                    .with_ignore_failure(t.ignore_failure)
            });

            let desc = group_cfg.desc.clone().unwrap_or_else(|| name.clone());
            let mut group = TaskGroup::new(desc, repo.clone()).with_tasks(tasks);

            let precondition = match (&group_cfg.after, &group_cfg.after_started) {
                (Some(dep), _) => Some((PreconditionKind::AfterFinished, dep)),
                (None, Some(dep)) => Some((PreconditionKind::AfterStartedAndDirExists, dep)),
                (None, None) => None,
            };
            if let Some((kind, dep)) = precondition {
                let dependency = ids.get(dep.as_str()).copied();
                if dependency.is_none() {
                    info!(group = %name, %dep, "dependency is not part of this batch; group will be blocked");
                }
                group = group.with_precondition(Precondition::new(kind, dependency));
            }

            let policy = if options.force_stop {
                FailurePolicy::Stop
            } else {
                cfg.policy_for(group_cfg)
            };

            coordinator.add_named_group(name.clone(), group, policy);
        }

        Ok(coordinator)
    }

    /// Add a group; preconditions may refer to groups added before or after.
    pub fn add_group(&mut self, group: TaskGroup, policy: FailurePolicy) -> GroupId {
        let name = group.desc().to_string();
        self.add_named_group(name, group, policy)
    }

    fn add_named_group(&mut self, name: String, group: TaskGroup, policy: FailurePolicy) -> GroupId {
        let id = GroupId(self.runners.len());
        debug!(group = %id, %name, tasks = group.len(), ?policy, "adding task group");
        self.runners.push(GroupRunner::new(id, group, self.git.clone(), policy));
        self.names.push(name);
        id
    }

    pub fn len(&self) -> usize {
        self.runners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runners.is_empty()
    }

    pub fn git(&self) -> &std::path::Path {
        &self.git
    }

    pub fn group_id(&self, name: &str) -> Option<GroupId> {
        self.names.iter().position(|n| n == name).map(GroupId)
    }

    pub fn group_name(&self, id: GroupId) -> Option<&str> {
        self.names.get(id.0).map(String::as_str)
    }

    pub fn runner(&self, id: GroupId) -> Option<&GroupRunner> {
        self.runners.get(id.0)
    }

    pub fn runner_mut(&mut self, id: GroupId) -> Option<&mut GroupRunner> {
        self.runners.get_mut(id.0)
    }

    pub fn runners(&self) -> impl Iterator<Item = &GroupRunner> {
        self.runners.iter()
    }

    pub fn runners_mut(&mut self) -> impl Iterator<Item = &mut GroupRunner> {
        self.runners.iter_mut()
    }

    /// One scheduling pass.
    ///
    /// Evaluates the preconditions of idle groups until nothing changes:
    /// fulfilled groups start, errored ones are blocked for good. Starting
    /// or blocking a group can fulfil another precondition, hence the loop.
    pub fn schedule(&mut self) -> Vec<CoreCommand> {
        let mut commands = Vec::new();

        loop {
            let mut progressed = false;

            for idx in 0..self.runners.len() {
                if self.runners[idx].is_started() {
                    continue;
                }

                let state = self.runners[idx]
                    .group()
                    .precondition_state(&*self, self.fs.as_ref());

                match state {
                    PreconditionState::Fulfilled => {
                        commands.extend(self.runners[idx].run());
                        progressed = true;
                    }
                    PreconditionState::Errored => {
                        commands.extend(self.runners[idx].block());
                        progressed = true;
                    }
                    PreconditionState::NotFulfilled => {}
                }
            }

            if !progressed {
                break;
            }
        }

        commands
    }

    /// Every group finished or was blocked.
    pub fn is_complete(&self) -> bool {
        self.runners.iter().all(GroupRunner::is_finished)
    }

    /// Outcomes of the groups that finished so far, in id order.
    pub fn summary(&self) -> BatchSummary {
        let outcomes: Vec<_> = self
            .runners
            .iter()
            .filter_map(|r| r.outcome().cloned())
            .collect();
        let unfinished = self.runners.len() - outcomes.len();
        BatchSummary::from_outcomes(outcomes, unfinished)
    }
}
