// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::types::FailurePolicy;

/// Top-level batch file as read from TOML, before validation.
///
/// ```toml
/// [config]
/// on_failure = "ask"
///
/// [repo.core]
/// path = "/work/core"
///
/// [group.pull_core]
/// repo = "core"
///
/// [[group.pull_core.task]]
/// args = ["pull", "--ff-only"]
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct RawBatchConfig {
    #[serde(default)]
    pub config: ConfigSection,

    /// Repositories from `[repo.<name>]`.
    #[serde(default)]
    pub repo: BTreeMap<String, RepoConfig>,

    /// Task groups from `[group.<name>]`, keyed by group name.
    #[serde(default)]
    pub group: BTreeMap<String, GroupConfig>,
}

/// Validated batch file. Only built through `TryFrom<RawBatchConfig>`.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub config: ConfigSection,
    pub repo: BTreeMap<String, RepoConfig>,
    pub group: BTreeMap<String, GroupConfig>,
}

impl BatchConfig {
    pub(crate) fn new_unchecked(
        config: ConfigSection,
        repo: BTreeMap<String, RepoConfig>,
        group: BTreeMap<String, GroupConfig>,
    ) -> Self {
        Self {
            config,
            repo,
            group,
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.config.poll_interval_ms)
    }

    /// Effective failure policy of a group.
    pub fn policy_for(&self, group: &GroupConfig) -> FailurePolicy {
        group.on_failure.unwrap_or(self.config.on_failure)
    }
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Git executable used for every task.
    #[serde(default = "default_git")]
    pub git: PathBuf,

    /// Default failure policy for groups that do not override it.
    #[serde(default)]
    pub on_failure: FailurePolicy,

    /// How often waiting preconditions are re-evaluated.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_git() -> PathBuf {
    PathBuf::from("git")
}

fn default_poll_interval_ms() -> u64 {
    200
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            git: default_git(),
            on_failure: FailurePolicy::default(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

/// `[repo.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct RepoConfig {
    pub path: PathBuf,
}

/// `[group.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct GroupConfig {
    /// Defaults to the group name.
    #[serde(default)]
    pub desc: Option<String>,

    /// Name of a `[repo.<name>]` entry.
    pub repo: String,

    #[serde(default)]
    pub on_failure: Option<FailurePolicy>,

    /// Start only once this group is finished.
    #[serde(default)]
    pub after: Option<String>,

    /// Start once this group started and its repository directory exists.
    #[serde(default)]
    pub after_started: Option<String>,

    #[serde(default)]
    pub task: Vec<TaskConfig>,
}

impl GroupConfig {
    /// The group this one waits for, if any.
    pub fn dependency(&self) -> Option<&str> {
        self.after.as_deref().or(self.after_started.as_deref())
    }
}

/// `[[group.<name>.task]]` entry: one git invocation.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskConfig {
    /// Defaults to the command line.
    #[serde(default)]
    pub desc: Option<String>,

    /// Arguments passed to git.
    pub args: Vec<String>,

    #[serde(default)]
    pub ignore_failure: bool,

    /// Prefix the command with `-C <repo path>`. Disable for `clone` and
    /// `ls-remote`.
    #[serde(default = "default_run_inside_repo")]
    pub run_inside_repo: bool,
}

fn default_run_inside_repo() -> bool {
    true
}
