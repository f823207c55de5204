// tests/console_output.rs

use std::sync::Arc;

use tokio::sync::mpsc;

use repobatch::batch::Coordinator;
use repobatch::engine::{CoreRuntime, Runtime, RuntimeEvent};
use repobatch::fs::mock::MockFileSystem;
use repobatch::group::{TaskGroup, TaskReport};
use repobatch::report::{ConsoleReporter, Reporter};
use repobatch::task::git::{GIT_FAILURE_NOTE, IGNORED_FAILURE_NOTE};
use repobatch::task::{Task, TaskState};
use repobatch::types::{FailurePolicy, GroupId, TaskKey};
use repobatch_test_utils::{
    init_tracing, test_repo, with_timeout, ScriptedDecisions, ScriptedExecutor, SharedBuffer,
};

fn key(group: usize, index: usize) -> TaskKey {
    TaskKey::new(GroupId(group), index)
}

fn count(haystack: &str, needle: &str) -> usize {
    haystack.matches(needle).count()
}

#[tokio::test]
async fn test_failure_notes_reach_console_under_stop_policy() {
    init_tracing();
    let (tx, rx) = mpsc::channel::<RuntimeEvent>(64);

    let core = test_repo("core");
    let docs = test_repo("docs");
    let mut coordinator = Coordinator::new("git", Arc::new(MockFileSystem::new()));
    coordinator.add_group(
        TaskGroup::new("sync core", core.clone()).with_tasks([
            Task::git("fetch", core.clone(), ["fetch"]),
            Task::git("pull", core.clone(), ["pull"]),
        ]),
        FailurePolicy::Stop,
    );
    coordinator.add_group(
        TaskGroup::new("prune docs", docs.clone())
            .with_tasks([Task::git("drop branch", docs.clone(), ["branch", "-d", "old"]).with_ignore_failure(true)]),
        FailurePolicy::Stop,
    );

    let executor = ScriptedExecutor::new(tx.clone())
        .with_failure(key(0, 0), "fatal: unable to access remote")
        .with_failure(key(1, 0), "error: branch 'old' not found.");
    let buffer = SharedBuffer::new();

    let runtime = Runtime::new(CoreRuntime::new(coordinator), rx, executor, ScriptedDecisions::silent(tx.clone()))
        .with_reporter(ConsoleReporter::with_writer(buffer.clone()));

    let summary = with_timeout(runtime.run()).await.unwrap();
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.succeeded, 1);

    let out = buffer.contents();

    // Headers show the command as configured, without the `-C` prefix.
    assert!(out.lines().any(|l| l == "[core] > git fetch"));
    assert!(!out.contains("-C /work/core"));

    // Streamed lines are printed once; the notes that never streamed follow.
    assert_eq!(count(&out, "[core]   fatal: unable to access remote"), 1);
    assert_eq!(count(&out, &format!("[core]   {GIT_FAILURE_NOTE}")), 1);
    assert!(out.contains("[core] fetch: FAILED"));
    assert!(!out.contains("[core] > git pull"));

    assert_eq!(count(&out, "[docs]   error: branch 'old' not found."), 1);
    assert!(out.contains(&format!("[docs]   {GIT_FAILURE_NOTE}")));
    assert!(out.contains(&format!("[docs]   {IGNORED_FAILURE_NOTE}")));
    assert!(out.contains("[docs] drop branch: failed (ignored)"));
}

#[test]
fn test_unstreamed_failure_output_is_printed_in_full() {
    let buffer = SharedBuffer::new();
    let mut reporter = ConsoleReporter::with_writer(buffer.clone());

    reporter.task_finished(&TaskReport {
        key: key(2, 0),
        attempt: 1,
        desc: "clone".to_string(),
        repo: "site".to_string(),
        cmd_line: "git clone url".to_string(),
        success: false,
        state: TaskState::Errored,
        output: format!("spawning \"git\" for task g2/t0: No such file or directory\n{GIT_FAILURE_NOTE}"),
        aborted: false,
    });

    let out = buffer.contents();
    assert!(out.contains("[site]   spawning \"git\" for task g2/t0: No such file or directory"));
    assert!(out.contains(&format!("[site]   {GIT_FAILURE_NOTE}")));
    assert!(out.ends_with("[site] clone: FAILED\n"));
}

#[test]
fn test_successful_task_output_is_not_repeated() {
    let buffer = SharedBuffer::new();
    let mut reporter = ConsoleReporter::with_writer(buffer.clone());

    reporter.task_output(key(0, 0), "core", "Already up to date.");
    reporter.task_finished(&TaskReport {
        key: key(0, 0),
        attempt: 1,
        desc: "pull".to_string(),
        repo: "core".to_string(),
        cmd_line: "git pull".to_string(),
        success: true,
        state: TaskState::Successful,
        output: "Already up to date.".to_string(),
        aborted: false,
    });

    assert_eq!(
        buffer.contents(),
        "[core]   Already up to date.\n[core] pull: ok\n"
    );
}
