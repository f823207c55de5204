// src/group/precondition.rs

//! Start conditions between task groups.
//!
//! A precondition is re-evaluated on every scheduling pass; it is never
//! pushed by events. That is what lets "the clone created the directory"
//! unblock a dependent group while the clone is still running.

use tracing::trace;

use crate::fs::FileSystem;
use crate::group::task_group::TaskGroup;
use crate::types::GroupId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreconditionState {
    /// Not yet; proceed with other groups and come back later.
    NotFulfilled,
    Fulfilled,
    /// Will never be fulfilled. The dependent group must not run.
    Errored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreconditionKind {
    /// The other group is finished (successfully, with errors, or aborted).
    AfterFinished,
    /// The other group started and its repository directory exists, or it
    /// is already finished.
    AfterStartedAndDirExists,
}

/// Read access to groups by id, used while evaluating preconditions.
pub trait GroupLookup {
    fn group(&self, id: GroupId) -> Option<&TaskGroup>;
}

impl GroupLookup for [TaskGroup] {
    fn group(&self, id: GroupId) -> Option<&TaskGroup> {
        self.get(id.0)
    }
}

/// A predicate paired with the group it depends on.
///
/// `dependency` is `None` when the referenced group could not be resolved
/// (e.g. it was filtered out of the batch); such a precondition is always
/// `Errored`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Precondition {
    kind: PreconditionKind,
    dependency: Option<GroupId>,
}

impl Precondition {
    pub fn new(kind: PreconditionKind, dependency: Option<GroupId>) -> Self {
        Self { kind, dependency }
    }

    pub fn after_finished(group: GroupId) -> Self {
        Self::new(PreconditionKind::AfterFinished, Some(group))
    }

    pub fn after_started_and_dir_exists(group: GroupId) -> Self {
        Self::new(PreconditionKind::AfterStartedAndDirExists, Some(group))
    }

    pub fn kind(&self) -> PreconditionKind {
        self.kind
    }

    pub fn dependency(&self) -> Option<GroupId> {
        self.dependency
    }

    pub fn evaluate<L>(&self, groups: &L, fs: &dyn FileSystem) -> PreconditionState
    where
        L: GroupLookup + ?Sized,
    {
        let Some(other) = self.dependency.and_then(|id| groups.group(id)) else {
            return PreconditionState::Errored;
        };

        let state = match self.kind {
            PreconditionKind::AfterFinished => {
                if other.is_finished() {
                    PreconditionState::Fulfilled
                } else {
                    PreconditionState::NotFulfilled
                }
            }
            PreconditionKind::AfterStartedAndDirExists => {
                // A finished or aborted dependency is fine even if the
                // directory is gone.
                if other.is_finished() {
                    PreconditionState::Fulfilled
                } else if !other.is_started() {
                    PreconditionState::NotFulfilled
                } else if !fs.has_checkout(other.repo().fullpath()) {
                    PreconditionState::NotFulfilled
                } else {
                    PreconditionState::Fulfilled
                }
            }
        };

        trace!(kind = ?self.kind, dependency = ?self.dependency, ?state, "precondition evaluated");
        state
    }
}
