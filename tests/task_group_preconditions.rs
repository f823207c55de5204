// tests/task_group_preconditions.rs

use std::path::Path;

use repobatch::engine::ExecOutcome;
use repobatch::fs::mock::MockFileSystem;
use repobatch::group::{Precondition, PreconditionKind, PreconditionState, TaskGroup};
use repobatch::repo::RepoRef;
use repobatch::task::Task;
use repobatch::types::{GroupId, TaskKey};
use repobatch_test_utils::{git_group, init_tracing, test_repo};

fn started_task(repo: &RepoRef, group: GroupId) -> Task {
    let mut task = Task::git("clone", repo.clone(), ["clone", "url"]).outside_repo();
    task.run(Path::new("git"), TaskKey::new(group, 0)).unwrap();
    task
}

fn finished_task(repo: &RepoRef, group: GroupId, success: bool) -> Task {
    let mut task = started_task(repo, group);
    let outcome = if success {
        ExecOutcome::succeeded("")
    } else {
        ExecOutcome::failed(1, "")
    };
    task.complete_exit(outcome).unwrap();
    task
}

#[test]
fn test_no_precondition_is_fulfilled() {
    let fs = MockFileSystem::new();
    let group = git_group("pull", &test_repo("core"), &[&["pull"]]);

    let groups: Vec<TaskGroup> = Vec::new();
    assert_eq!(
        group.precondition_state(groups.as_slice(), &fs),
        PreconditionState::Fulfilled
    );
}

#[test]
fn test_after_finished_waits_for_dependency() {
    init_tracing();
    let fs = MockFileSystem::new();
    let repo = test_repo("core");
    let pre = Precondition::after_finished(GroupId(0));

    let running = vec![TaskGroup::new("clone", repo.clone()).with_tasks([started_task(&repo, GroupId(0))])];
    assert_eq!(pre.evaluate(running.as_slice(), &fs), PreconditionState::NotFulfilled);

    let failed = vec![TaskGroup::new("clone", repo.clone()).with_tasks([finished_task(&repo, GroupId(0), false)])];
    assert_eq!(pre.evaluate(failed.as_slice(), &fs), PreconditionState::Fulfilled);
}

#[test]
fn test_after_finished_accepts_aborted_dependency() {
    let fs = MockFileSystem::new();
    let repo = test_repo("core");
    let mut dep = git_group("pull", &repo, &[&["pull"], &["push"]]);
    dep.abort();

    let groups = vec![dep];
    let pre = Precondition::after_finished(GroupId(0));
    assert_eq!(pre.evaluate(groups.as_slice(), &fs), PreconditionState::Fulfilled);
}

#[test]
fn test_started_and_dir_exists_sequence() {
    init_tracing();
    let fs = MockFileSystem::new();
    let repo = test_repo("core");
    let pre = Precondition::after_started_and_dir_exists(GroupId(0));

    // Dependency not started yet.
    let idle = vec![git_group("clone", &repo, &[&["clone", "url"]])];
    assert_eq!(pre.evaluate(idle.as_slice(), &fs), PreconditionState::NotFulfilled);

    // Clone started but the directory is not there yet.
    let running = vec![TaskGroup::new("clone", repo.clone()).with_tasks([started_task(&repo, GroupId(0))])];
    assert_eq!(pre.evaluate(running.as_slice(), &fs), PreconditionState::NotFulfilled);

    // Clone created the directory while still running.
    fs.add_dir("/work/core");
    assert_eq!(pre.evaluate(running.as_slice(), &fs), PreconditionState::Fulfilled);

    // A finished dependency is enough even when the directory is gone.
    fs.remove("/work/core");
    let finished = vec![TaskGroup::new("clone", repo.clone()).with_tasks([finished_task(&repo, GroupId(0), false)])];
    assert_eq!(pre.evaluate(finished.as_slice(), &fs), PreconditionState::Fulfilled);
}

#[test]
fn test_plain_file_is_not_a_checkout() {
    let fs = MockFileSystem::new();
    let repo = test_repo("core");
    let pre = Precondition::after_started_and_dir_exists(GroupId(0));
    let running = vec![TaskGroup::new("clone", repo.clone()).with_tasks([started_task(&repo, GroupId(0))])];

    fs.add_file("/work/core", "not a directory");
    assert_eq!(pre.evaluate(running.as_slice(), &fs), PreconditionState::NotFulfilled);
}

#[test]
fn test_missing_dependency_is_errored() {
    let fs = MockFileSystem::new();
    let groups = vec![git_group("pull", &test_repo("core"), &[&["pull"]])];

    let unresolved = Precondition::new(PreconditionKind::AfterFinished, None);
    assert_eq!(unresolved.evaluate(groups.as_slice(), &fs), PreconditionState::Errored);

    let out_of_range = Precondition::after_started_and_dir_exists(GroupId(7));
    assert_eq!(out_of_range.evaluate(groups.as_slice(), &fs), PreconditionState::Errored);
}

#[test]
fn test_group_aggregates_task_state() {
    let repo = test_repo("core");

    let all_ok = TaskGroup::new("sync", repo.clone()).with_tasks([
        finished_task(&repo, GroupId(0), true),
        finished_task(&repo, GroupId(0), true),
    ]);
    assert!(all_ok.is_finished());
    assert!(all_ok.is_successful());
    assert!(!all_ok.is_errored());

    let one_failed = TaskGroup::new("sync", repo.clone()).with_tasks([
        finished_task(&repo, GroupId(0), true),
        finished_task(&repo, GroupId(0), false),
    ]);
    assert!(one_failed.is_finished());
    assert!(!one_failed.is_successful());
    assert!(one_failed.is_errored());

    let mut half_done = TaskGroup::new("sync", repo.clone()).with_tasks([
        finished_task(&repo, GroupId(0), true),
        Task::git("push", repo.clone(), ["push"]),
    ]);
    assert!(half_done.is_started());
    assert!(!half_done.is_finished());

    half_done.abort();
    assert!(half_done.is_aborted());
    assert!(half_done.is_finished());
    assert!(!half_done.is_successful());
    assert!(half_done.is_errored());
}

#[test]
fn test_append_git_task() {
    let repo = test_repo("core");
    let mut group = TaskGroup::new("switch", repo);

    group.append_git_task("", ["checkout", "main"], true);
    group.append_git_task("list remote", ["ls-remote", "origin"], false);

    assert_eq!(group.len(), 2);
    assert_eq!(group.tasks()[0].desc(), "git checkout main");
    assert!(group.tasks()[0].command().runs_inside_repo());
    assert_eq!(group.tasks()[1].desc(), "list remote");
    assert!(!group.tasks()[1].command().runs_inside_repo());
    assert_eq!(group.to_string(), "TaskGroup<desc=switch, repo=core, tasks=2>");
}
