// src/batch/summary.rs

use std::fmt;

use crate::group::GroupOutcome;

/// Final tally of a batch, built from the outcome of every group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub groups: Vec<GroupOutcome>,
    pub succeeded: usize,
    /// Finished with at least one failed task.
    pub failed: usize,
    pub aborted: usize,
    /// Never ran because a precondition errored.
    pub blocked: usize,
    /// Still running or waiting when the batch was stopped.
    pub unfinished: usize,
}

impl BatchSummary {
    pub fn from_outcomes(groups: Vec<GroupOutcome>, unfinished: usize) -> Self {
        let mut summary = Self {
            unfinished,
            ..Self::default()
        };

        for outcome in &groups {
            if outcome.blocked {
                summary.blocked += 1;
            } else if outcome.aborted {
                summary.aborted += 1;
            } else if outcome.success {
                summary.succeeded += 1;
            } else {
                summary.failed += 1;
            }
        }

        summary.groups = groups;
        summary
    }

    pub fn total(&self) -> usize {
        self.groups.len() + self.unfinished
    }

    /// Every group ran to completion without errors.
    pub fn is_success(&self) -> bool {
        self.succeeded == self.total()
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} group(s): {} succeeded, {} failed, {} aborted, {} blocked",
            self.total(),
            self.succeeded,
            self.failed,
            self.aborted,
            self.blocked
        )?;
        if self.unfinished > 0 {
            write!(f, ", {} unfinished", self.unfinished)?;
        }
        Ok(())
    }
}
