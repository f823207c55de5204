// src/decision/mod.rs

//! User decisions after a failed task.
//!
//! When a task fails and its group is configured to ask, the core emits a
//! [`Question`]. A [`DecisionBackend`] presents it and later feeds exactly one
//! [`UserChoice`] back into the runtime as a `RuntimeEvent::UserChoice`.

pub mod console;

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;

use crate::errors::Result;
use crate::types::{GroupId, TaskKey};

pub use console::{spawn_prompter, spawn_prompter_on, ConsoleDecisionBackend};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UserChoice {
    /// Abort the sequence of tasks.
    Abort,
    /// Ignore the error and run the next task.
    Continue,
    /// Run the failed task again.
    Retry,
    /// Accept the result and finish the group (last task only).
    Finish,
}

impl UserChoice {
    pub const ALL: [UserChoice; 4] = [
        UserChoice::Abort,
        UserChoice::Continue,
        UserChoice::Retry,
        UserChoice::Finish,
    ];

    fn bit(self) -> u8 {
        match self {
            UserChoice::Abort => 0x01,
            UserChoice::Continue => 0x02,
            UserChoice::Retry => 0x04,
            UserChoice::Finish => 0x08,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            UserChoice::Abort => "abort",
            UserChoice::Continue => "continue",
            UserChoice::Retry => "retry",
            UserChoice::Finish => "finish",
        }
    }
}

impl fmt::Display for UserChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for UserChoice {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "a" | "abort" => Ok(UserChoice::Abort),
            "c" | "continue" => Ok(UserChoice::Continue),
            "r" | "retry" => Ok(UserChoice::Retry),
            "f" | "finish" | "ok" => Ok(UserChoice::Finish),
            other => Err(format!(
                "invalid choice: {other} (expected abort, continue, retry or finish)"
            )),
        }
    }
}

/// Set of choices offered for one question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChoiceSet(u8);

impl ChoiceSet {
    /// Offered when more tasks remain after the failed one.
    pub const MORE_TASKS: ChoiceSet = ChoiceSet(0x01 | 0x02 | 0x04);
    /// Offered when the failed task was the last one.
    pub const LAST_TASK: ChoiceSet = ChoiceSet(0x01 | 0x04 | 0x08);

    pub fn empty() -> Self {
        ChoiceSet(0)
    }

    pub fn with(mut self, choice: UserChoice) -> Self {
        self.0 |= choice.bit();
        self
    }

    pub fn contains(&self, choice: UserChoice) -> bool {
        self.0 & choice.bit() != 0
    }

    pub fn iter(&self) -> impl Iterator<Item = UserChoice> + '_ {
        UserChoice::ALL.into_iter().filter(|c| self.contains(*c))
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

impl FromIterator<UserChoice> for ChoiceSet {
    fn from_iter<I: IntoIterator<Item = UserChoice>>(iter: I) -> Self {
        iter.into_iter().fold(ChoiceSet::empty(), ChoiceSet::with)
    }
}

impl fmt::Display for ChoiceSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let labels: Vec<_> = self.iter().map(UserChoice::label).collect();
        f.write_str(&labels.join("/"))
    }
}

/// A failed task waiting for the user's decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub group: GroupId,
    pub group_desc: String,
    pub repo: String,
    pub task: TaskKey,
    pub task_desc: String,
    pub cmd_line: String,
    pub output: String,
    pub options: ChoiceSet,
}

/// Presents questions to the user.
///
/// `ask` must return quickly: the answer is delivered later through the
/// runtime event channel, never as the future's output.
pub trait DecisionBackend: Send {
    fn ask(&mut self, question: Question) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}
