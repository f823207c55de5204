// tests/group_runner.rs

use repobatch::decision::{ChoiceSet, UserChoice};
use repobatch::engine::{CoreCommand, ExecOutcome};
use repobatch::group::{GroupOutcome, GroupRunner, RunnerPhase, TaskGroup};
use repobatch::task::{ScheduledTask, TaskState};
use repobatch::types::{FailurePolicy, GroupId};
use repobatch_test_utils::{git_group, init_tracing, test_repo};

fn runner(tasks: &[&[&str]], policy: FailurePolicy) -> GroupRunner {
    let group = git_group("sync core", &test_repo("core"), tasks);
    GroupRunner::new(GroupId(0), group, "git", policy)
}

fn dispatched(commands: &[CoreCommand]) -> Vec<ScheduledTask> {
    commands
        .iter()
        .filter_map(|c| match c {
            CoreCommand::Dispatch(t) => Some(t.clone()),
            _ => None,
        })
        .collect()
}

fn finished(commands: &[CoreCommand]) -> Vec<GroupOutcome> {
    commands
        .iter()
        .filter_map(|c| match c {
            CoreCommand::GroupFinished(o) => Some(o.clone()),
            _ => None,
        })
        .collect()
}

fn asked_options(commands: &[CoreCommand]) -> Option<ChoiceSet> {
    commands.iter().find_map(|c| match c {
        CoreCommand::AskUser(q) => Some(q.options),
        _ => None,
    })
}

fn ok() -> ExecOutcome {
    ExecOutcome::succeeded("done")
}

fn fail() -> ExecOutcome {
    ExecOutcome::failed(1, "fatal: boom")
}

#[test]
fn test_all_tasks_succeed() {
    init_tracing();
    let mut r = runner(&[&["fetch"], &["pull"]], FailurePolicy::Ask);

    let cmds = r.run();
    let first = dispatched(&cmds);
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].key.index, 0);
    assert_eq!(r.phase(), RunnerPhase::Running);

    let cmds = r.on_task_completed(0, 1, ok());
    let second = dispatched(&cmds);
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].key.index, 1);
    assert!(finished(&cmds).is_empty());

    let cmds = r.on_task_completed(1, 1, ok());
    let outcomes = finished(&cmds);
    assert_eq!(outcomes.len(), 1);
    assert!(outcomes[0].success);
    assert_eq!(outcomes[0].done_count, 2);
    assert_eq!(outcomes[0].error_count, 0);
    assert!(cmds.iter().any(|c| matches!(c, CoreCommand::RefreshRepo(repo) if repo.name() == "core")));

    assert_eq!(r.phase(), RunnerPhase::Finished);
    assert!(r.group().is_successful());
    assert_eq!(r.done_count(), 2);
}

#[test]
fn test_stop_policy_finalizes_on_first_failure() {
    init_tracing();
    let mut r = runner(&[&["fetch"], &["pull"]], FailurePolicy::Stop);
    r.run();

    let cmds = r.on_task_completed(0, 1, fail());

    assert!(dispatched(&cmds).is_empty());
    assert!(asked_options(&cmds).is_none());
    let outcome = &finished(&cmds)[0];
    assert!(!outcome.success);
    assert_eq!(outcome.error_count, 1);
    assert_eq!(r.group().tasks()[1].state(), TaskState::NotStarted);
    // Closed by the runner even though a task never ran.
    assert!(r.group().is_finished());
}

#[test]
fn test_continue_after_failure_runs_next_task() {
    init_tracing();
    let mut r = runner(&[&["fetch"], &["pull"]], FailurePolicy::Ask);
    r.run();

    let cmds = r.on_task_completed(0, 1, fail());
    assert_eq!(asked_options(&cmds), Some(ChoiceSet::MORE_TASKS));
    assert_eq!(r.phase(), RunnerPhase::AwaitingChoice(ChoiceSet::MORE_TASKS));

    let cmds = r.resolve_choice(UserChoice::Continue);
    assert_eq!(dispatched(&cmds)[0].key.index, 1);

    let cmds = r.on_task_completed(1, 1, ok());
    let outcome = &finished(&cmds)[0];
    assert!(!outcome.success);
    assert_eq!(outcome.error_count, 1);
    assert_eq!(outcome.done_count, 2);
}

#[test]
fn test_retry_reruns_only_the_failed_task() {
    init_tracing();
    let mut r = runner(&[&["pull"]], FailurePolicy::Ask);
    r.run();

    let cmds = r.on_task_completed(0, 1, fail());
    assert_eq!(asked_options(&cmds), Some(ChoiceSet::LAST_TASK));

    let cmds = r.resolve_choice(UserChoice::Retry);
    let retried = dispatched(&cmds);
    assert_eq!(retried.len(), 1);
    assert_eq!(retried[0].key.index, 0);
    assert_eq!(retried[0].attempt, 2);
    assert_eq!(r.done_count(), 0);
    assert_eq!(r.error_count(), 0);

    let cmds = r.on_task_completed(0, 2, ok());
    let outcome = &finished(&cmds)[0];
    assert!(outcome.success);
    assert_eq!(outcome.done_count, 1);
    assert_eq!(outcome.error_count, 0);
}

#[test]
fn test_stale_completion_after_retry_is_ignored() {
    init_tracing();
    let mut r = runner(&[&["pull"], &["push"]], FailurePolicy::Ask);
    r.run();
    r.on_task_completed(0, 1, fail());
    r.resolve_choice(UserChoice::Retry);

    // Duplicate report of the first attempt.
    let cmds = r.on_task_completed(0, 1, fail());
    assert!(cmds.is_empty());
    assert_eq!(r.phase(), RunnerPhase::Running);
    assert_eq!(r.error_count(), 0);

    // Completion for a task that is not the current one.
    assert!(r.on_task_completed(1, 1, ok()).is_empty());
}

#[test]
fn test_finish_choice_on_last_task_keeps_tally() {
    let mut r = runner(&[&["fetch"], &["pull"]], FailurePolicy::Ask);
    r.run();
    r.on_task_completed(0, 1, ok());

    let cmds = r.on_task_completed(1, 1, fail());
    assert_eq!(asked_options(&cmds), Some(ChoiceSet::LAST_TASK));

    let cmds = r.resolve_choice(UserChoice::Finish);
    let outcome = &finished(&cmds)[0];
    assert!(!outcome.success);
    assert!(!outcome.aborted);
    assert_eq!(outcome.error_count, 1);
}

#[test]
fn test_choice_not_offered_keeps_question_pending() {
    let mut r = runner(&[&["fetch"], &["pull"]], FailurePolicy::Ask);
    r.run();
    r.on_task_completed(0, 1, fail());

    // Finish is only offered on the last task.
    assert!(r.resolve_choice(UserChoice::Finish).is_empty());
    assert_eq!(r.phase(), RunnerPhase::AwaitingChoice(ChoiceSet::MORE_TASKS));

    let cmds = r.resolve_choice(UserChoice::Abort);
    let outcome = &finished(&cmds)[0];
    assert!(outcome.aborted);
    assert!(!outcome.success);
}

#[test]
fn test_choice_without_question_is_ignored() {
    let mut r = runner(&[&["fetch"]], FailurePolicy::Ask);
    r.run();
    assert!(r.resolve_choice(UserChoice::Continue).is_empty());
    assert_eq!(r.phase(), RunnerPhase::Running);
}

#[test]
fn test_abort_running_group_cancels_in_flight_task() {
    init_tracing();
    let mut r = runner(&[&["fetch"], &["pull"]], FailurePolicy::Ask);
    r.run();

    let cmds = r.abort();
    assert!(matches!(
        cmds.as_slice(),
        [CoreCommand::Cancel { key, attempt: 1 }] if key.index == 0
    ));
    assert_eq!(r.phase(), RunnerPhase::Running);

    // A second abort while the cancel is in flight does nothing.
    assert!(r.abort().is_empty());

    // The killed process reports; no question, the group finalizes.
    let cmds = r.on_task_completed(0, 1, ExecOutcome::new(None, "Aborted!"));
    assert!(asked_options(&cmds).is_none());
    assert!(dispatched(&cmds).is_empty());
    let outcome = &finished(&cmds)[0];
    assert!(outcome.aborted);
    assert!(!outcome.success);
    assert_eq!(r.group().tasks()[1].state(), TaskState::NotStarted);
}

#[test]
fn test_abort_after_successful_task_stops_before_next() {
    let mut r = runner(&[&["fetch"], &["pull"]], FailurePolicy::Ask);
    r.run();
    r.abort();

    // The in-flight task managed to succeed before being killed.
    let cmds = r.on_task_completed(0, 1, ok());
    assert!(dispatched(&cmds).is_empty());
    let outcome = &finished(&cmds)[0];
    assert!(outcome.aborted);
    assert_eq!(outcome.error_count, 0);
    assert!(!outcome.success);
}

#[test]
fn test_abort_while_question_pending_resolves_as_abort() {
    let mut r = runner(&[&["fetch"], &["pull"]], FailurePolicy::Ask);
    r.run();
    r.on_task_completed(0, 1, fail());

    let cmds = r.abort();
    let outcome = &finished(&cmds)[0];
    assert!(outcome.aborted);
    assert_eq!(r.phase(), RunnerPhase::Finished);

    // A late answer from the prompt is ignored.
    assert!(r.resolve_choice(UserChoice::Continue).is_empty());
}

#[test]
fn test_abort_finished_group_keeps_outcome() {
    let mut r = runner(&[&["fetch"]], FailurePolicy::Ask);
    r.run();
    r.on_task_completed(0, 1, ok());
    let before = r.outcome().cloned().unwrap();

    assert!(r.abort().is_empty());

    assert_eq!(r.outcome(), Some(&before));
    assert!(before.success);
    assert!(!r.group().is_aborted());
}

#[test]
fn test_abort_idle_group_runs_nothing() {
    let mut r = runner(&[&["fetch"], &["pull"]], FailurePolicy::Ask);

    let cmds = r.abort();

    assert!(dispatched(&cmds).is_empty());
    let outcome = &finished(&cmds)[0];
    assert!(outcome.aborted);
    assert_eq!(outcome.error_count, 0);
    assert!(r.group().tasks().iter().all(|t| t.state() == TaskState::NotStarted));
    assert!(r.run().is_empty());
}

#[test]
fn test_block_reports_blocked_outcome_without_refresh() {
    let mut r = runner(&[&["pull"]], FailurePolicy::Ask);

    let cmds = r.block();

    assert_eq!(cmds.len(), 1);
    let outcome = &finished(&cmds)[0];
    assert!(outcome.blocked);
    assert!(outcome.aborted);
    assert!(!outcome.success);
    assert!(r.group().is_finished());
}

#[test]
fn test_ignored_failure_does_not_ask_or_count() {
    let repo = test_repo("core");
    let group = TaskGroup::new("cleanup", repo.clone()).with_tasks([
        repobatch::task::Task::git("", repo.clone(), ["branch", "-d", "old"]).with_ignore_failure(true),
        repobatch::task::Task::git("", repo, ["gc"]),
    ]);
    let mut r = GroupRunner::new(GroupId(3), group, "git", FailurePolicy::Ask);
    r.run();

    let cmds = r.on_task_completed(0, 1, fail());
    assert!(asked_options(&cmds).is_none());
    assert_eq!(dispatched(&cmds)[0].key.index, 1);

    let cmds = r.on_task_completed(1, 1, ok());
    let outcome = &finished(&cmds)[0];
    assert!(outcome.success);
    assert_eq!(outcome.error_count, 0);
    // The masked task still records its real state.
    assert_eq!(r.group().tasks()[0].state(), TaskState::Errored);
}

#[test]
fn test_missing_git_executable_fails_group() {
    init_tracing();
    let group = git_group("sync", &test_repo("core"), &[&["pull"]]);
    let mut r = GroupRunner::new(GroupId(0), group, "", FailurePolicy::Ask);

    let cmds = r.run();

    assert!(dispatched(&cmds).is_empty());
    let outcome = &finished(&cmds)[0];
    assert!(!outcome.success);
    assert_eq!(outcome.error_count, 1);
    assert!(cmds.iter().any(|c| matches!(c, CoreCommand::TaskReported(rep) if !rep.success)));
}

#[test]
fn test_output_forwarded_only_for_current_attempt() {
    let mut r = runner(&[&["pull"]], FailurePolicy::Ask);
    r.run();

    let cmds = r.on_task_output(0, 1, "Updating 1a2b..3c4d".to_string());
    assert!(matches!(
        cmds.as_slice(),
        [CoreCommand::TaskOutput { repo, line, .. }] if repo == "core" && line == "Updating 1a2b..3c4d"
    ));

    assert!(r.on_task_output(0, 7, "stale".to_string()).is_empty());
}
