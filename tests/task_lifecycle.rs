// tests/task_lifecycle.rs

use std::ffi::OsString;
use std::path::Path;

use repobatch::engine::ExecOutcome;
use repobatch::errors::RepobatchError;
use repobatch::task::git::{GIT_FAILURE_NOTE, IGNORED_FAILURE_NOTE};
use repobatch::task::{AbortAction, Task, TaskState, ABORTED_BEFORE_START};
use repobatch::types::{GroupId, TaskKey};
use repobatch_test_utils::{init_tracing, test_repo};

fn key() -> TaskKey {
    TaskKey::new(GroupId(0), 0)
}

fn git() -> &'static Path {
    Path::new("git")
}

#[test]
fn test_run_moves_to_started_and_builds_invocation() {
    init_tracing();
    let repo = test_repo("core");
    let mut task = Task::git("fetch all", repo, ["fetch", "--all"]);

    let scheduled = task.run(git(), key()).expect("run should be accepted");

    assert_eq!(task.state(), TaskState::Started);
    assert!(task.is_started());
    assert!(!task.is_done());
    assert_eq!(scheduled.attempt, 1);
    assert_eq!(scheduled.repo, "core");
    assert_eq!(scheduled.cmd_line, "git fetch --all");
    assert_eq!(
        scheduled.args,
        vec![
            OsString::from("-C"),
            OsString::from("/work/core"),
            OsString::from("fetch"),
            OsString::from("--all"),
        ]
    );
}

#[test]
fn test_outside_repo_has_no_dash_c() {
    let repo = test_repo("core");
    let mut task = Task::git("clone", repo, ["clone", "url", "/work/core"]).outside_repo();

    let scheduled = task.run(git(), key()).unwrap();
    assert_eq!(scheduled.args.first(), Some(&OsString::from("clone")));
    assert_eq!(scheduled.args.len(), 3);
}

#[test]
fn test_double_run_is_rejected_without_state_change() {
    init_tracing();
    let mut task = Task::git("pull", test_repo("core"), ["pull"]);

    task.run(git(), key()).unwrap();
    let err = task.run(git(), key()).unwrap_err();

    assert!(matches!(err, RepobatchError::TaskAlreadyStarted(_)));
    assert_eq!(task.state(), TaskState::Started);
    assert_eq!(task.attempt(), 1);
}

#[test]
fn test_empty_git_executable_fails_before_start() {
    let mut task = Task::git("pull", test_repo("core"), ["pull"]);

    let err = task.run(Path::new(""), key()).unwrap_err();

    assert!(matches!(err, RepobatchError::GitExecutableMissing));
    assert_eq!(task.state(), TaskState::NotStarted);
    assert_eq!(task.attempt(), 0);
}

#[test]
fn test_completion_is_emitted_once() {
    let mut task = Task::git("pull", test_repo("core"), ["pull"]);
    task.run(git(), key()).unwrap();

    let first = task.complete_exit(ExecOutcome::succeeded("Already up to date."));
    let second = task.complete_exit(ExecOutcome::failed(1, "late"));

    let first = first.expect("first completion");
    assert!(first.success);
    assert_eq!(first.output, "Already up to date.");
    assert!(second.is_none());
    assert!(task.is_successful());
    assert_eq!(task.last_output(), Some("Already up to date."));
}

#[test]
fn test_failure_output_gets_git_note() {
    let mut task = Task::git("pull", test_repo("core"), ["pull"]);
    task.run(git(), key()).unwrap();

    let completion = task
        .complete_exit(ExecOutcome::failed(128, "fatal: not a git repository"))
        .unwrap();

    assert!(!completion.success);
    assert_eq!(
        completion.output,
        format!("fatal: not a git repository\n{GIT_FAILURE_NOTE}")
    );
    assert!(task.is_errored());
}

#[test]
fn test_failure_with_empty_output_has_only_the_note() {
    let mut task = Task::git("pull", test_repo("core"), ["pull"]);
    task.run(git(), key()).unwrap();

    let completion = task.complete_exit(ExecOutcome::failed(1, "")).unwrap();
    assert_eq!(completion.output, GIT_FAILURE_NOTE);
}

#[test]
fn test_ignore_failure_keeps_both_signals() {
    let mut task = Task::git("delete branch", test_repo("core"), ["branch", "-d", "old"])
        .with_ignore_failure(true);
    task.run(git(), key()).unwrap();

    let completion = task
        .complete_exit(ExecOutcome::failed(1, "error: branch 'old' not found."))
        .unwrap();

    // The driver sees a success...
    assert!(completion.success);
    // ...while the task itself knows it failed.
    assert_eq!(task.state(), TaskState::Errored);
    assert!(!task.is_successful());
    assert!(completion.output.ends_with(&format!("{GIT_FAILURE_NOTE}\n{IGNORED_FAILURE_NOTE}")));
}

#[test]
fn test_abort_not_started_synthesizes_failure() {
    let mut task = Task::git("pull", test_repo("core"), ["pull"]).with_ignore_failure(true);

    let action = task.abort();

    match action {
        AbortAction::Completed(completion) => {
            assert!(!completion.success);
            assert_eq!(completion.output, ABORTED_BEFORE_START);
        }
        other => panic!("unexpected abort action: {other:?}"),
    }
    assert_eq!(task.state(), TaskState::Errored);
}

#[test]
fn test_abort_running_requests_cancel_of_current_attempt() {
    let mut task = Task::git("pull", test_repo("core"), ["pull"]);
    task.run(git(), key()).unwrap();

    assert_eq!(task.abort(), AbortAction::CancelRequested { attempt: 1 });
    // Still running until the executor reports the killed process.
    assert_eq!(task.state(), TaskState::Started);

    let completion = task.complete_exit(ExecOutcome::new(None, "Aborted!")).unwrap();
    assert!(!completion.success);
    assert_eq!(task.abort(), AbortAction::AlreadyDone);
}

#[test]
fn test_finished_task_can_run_again() {
    let mut task = Task::git("pull", test_repo("core"), ["pull"]);
    task.run(git(), key()).unwrap();
    task.complete_exit(ExecOutcome::failed(1, "network down")).unwrap();

    let scheduled = task.run(git(), key()).unwrap();

    assert_eq!(scheduled.attempt, 2);
    assert_eq!(task.state(), TaskState::Started);
    assert_eq!(task.last_output(), None);
}

#[test]
fn test_default_description_and_display() {
    let task = Task::git("", test_repo("core"), ["checkout", "main", "--"]);

    assert_eq!(task.desc(), "git checkout main --");
    assert_eq!(
        task.to_string(),
        "Task<repo=core, cmd=git checkout main --, state=NotStarted>"
    );
}
