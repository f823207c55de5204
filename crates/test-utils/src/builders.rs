#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::PathBuf;

use repobatch::config::{
    BatchConfig, ConfigSection, GroupConfig, RawBatchConfig, RepoConfig, TaskConfig,
};
use repobatch::group::TaskGroup;
use repobatch::repo::{RepoInfo, RepoRef};
use repobatch::task::Task;
use repobatch::types::FailurePolicy;

/// Repository named `name` located at `/work/<name>`.
pub fn test_repo(name: &str) -> RepoRef {
    RepoInfo::shared(name, format!("/work/{name}"))
}

/// A group on `repo` with one git task (run inside the repo) per entry of
/// `commands`.
pub fn git_group(desc: &str, repo: &RepoRef, commands: &[&[&str]]) -> TaskGroup {
    TaskGroup::new(desc, repo.clone()).with_tasks(
        commands
            .iter()
            .map(|args| Task::git("", repo.clone(), args.iter().copied())),
    )
}

/// Builder for `BatchConfig` to simplify test setup.
pub struct BatchConfigBuilder {
    config: RawBatchConfig,
}

impl BatchConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: RawBatchConfig {
                config: ConfigSection::default(),
                repo: BTreeMap::new(),
                group: BTreeMap::new(),
            },
        }
    }

    pub fn with_repo(mut self, name: &str, path: impl Into<PathBuf>) -> Self {
        self.config
            .repo
            .insert(name.to_string(), RepoConfig { path: path.into() });
        self
    }

    pub fn with_group(mut self, name: &str, group: GroupConfig) -> Self {
        self.config.group.insert(name.to_string(), group);
        self
    }

    pub fn with_on_failure(mut self, policy: FailurePolicy) -> Self {
        self.config.config.on_failure = policy;
        self
    }

    pub fn with_git(mut self, git: impl Into<PathBuf>) -> Self {
        self.config.config.git = git.into();
        self
    }

    pub fn build_raw(self) -> RawBatchConfig {
        self.config
    }

    pub fn build(self) -> BatchConfig {
        BatchConfig::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for BatchConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `GroupConfig`.
pub struct GroupConfigBuilder {
    group: GroupConfig,
}

impl GroupConfigBuilder {
    pub fn new(repo: &str) -> Self {
        Self {
            group: GroupConfig {
                desc: None,
                repo: repo.to_string(),
                on_failure: None,
                after: None,
                after_started: None,
                task: Vec::new(),
            },
        }
    }

    pub fn desc(mut self, desc: &str) -> Self {
        self.group.desc = Some(desc.to_string());
        self
    }

    pub fn on_failure(mut self, policy: FailurePolicy) -> Self {
        self.group.on_failure = Some(policy);
        self
    }

    pub fn after(mut self, group: &str) -> Self {
        self.group.after = Some(group.to_string());
        self
    }

    pub fn after_started(mut self, group: &str) -> Self {
        self.group.after_started = Some(group.to_string());
        self
    }

    pub fn task(mut self, task: TaskConfig) -> Self {
        self.group.task.push(task);
        self
    }

    /// Shorthand for a task with default options.
    pub fn git(self, args: &[&str]) -> Self {
        self.task(TaskConfigBuilder::new(args).build())
    }

    pub fn build(self) -> GroupConfig {
        self.group
    }
}

/// Builder for `TaskConfig`.
pub struct TaskConfigBuilder {
    task: TaskConfig,
}

impl TaskConfigBuilder {
    pub fn new(args: &[&str]) -> Self {
        Self {
            task: TaskConfig {
                desc: None,
                args: args.iter().map(|a| a.to_string()).collect(),
                ignore_failure: false,
                run_inside_repo: true,
            },
        }
    }

    pub fn desc(mut self, desc: &str) -> Self {
        self.task.desc = Some(desc.to_string());
        self
    }

    pub fn ignore_failure(mut self) -> Self {
        self.task.ignore_failure = true;
        self
    }

    pub fn outside_repo(mut self) -> Self {
        self.task.run_inside_repo = false;
        self
    }

    pub fn build(self) -> TaskConfig {
        self.task
    }
}
