// src/exec/executor_loop.rs

//! Main executor loop that manages running git processes.

use std::collections::HashMap;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::engine::RuntimeEvent;
use crate::exec::task_runner::run_task;
use crate::task::ScheduledTask;
use crate::types::{GroupId, TaskKey};

/// Request sent to the executor loop.
#[derive(Debug)]
pub enum ExecutorRequest {
    Run(ScheduledTask),
    Cancel { key: TaskKey, attempt: u64 },
}

/// Internal handle for a currently-running process.
///
/// - `cancel` is used by the executor to request that the process be killed.
/// - `handle` is the Tokio task that is actually running the command.
struct ActiveTask {
    key: TaskKey,
    attempt: u64,
    cancel: Option<oneshot::Sender<()>>,
    handle: tokio::task::JoinHandle<()>,
}

/// Spawn the background executor loop.
///
/// The returned sender is what `RealExecutorBackend` uses. Each dispatched
/// attempt runs in its own Tokio task, and **per task group there is never
/// more than one process running at the same time**.
pub fn spawn_executor(runtime_tx: mpsc::Sender<RuntimeEvent>) -> mpsc::Sender<ExecutorRequest> {
    let (tx, mut rx) = mpsc::channel::<ExecutorRequest>(32);

    tokio::spawn(async move {
        info!("executor loop started");

        let mut active: HashMap<GroupId, ActiveTask> = HashMap::new();

        while let Some(request) = rx.recv().await {
            match request {
                ExecutorRequest::Run(task) => handle_scheduled_task(task, &mut active, &runtime_tx),
                ExecutorRequest::Cancel { key, attempt } => handle_cancel(key, attempt, &mut active),
            }
        }

        info!("executor loop finished (channel closed)");
    });

    tx
}

/// Handle a newly dispatched attempt.
fn handle_scheduled_task(
    task: ScheduledTask,
    active: &mut HashMap<GroupId, ActiveTask>,
    runtime_tx: &mpsc::Sender<RuntimeEvent>,
) {
    let group = task.key.group;

    // The runner dispatches the next task only after the previous completion
    // arrived, so a tokio task still listed here is just winding down.
    if let Some(existing) = active.get_mut(&group) {
        if !existing.handle.is_finished() {
            debug!(
                task = %task.key,
                attempt = task.attempt,
                previous = %existing.key,
                previous_attempt = existing.attempt,
                "previous runner of this group not reaped yet; releasing it"
            );
            cancel_active(existing);
        }
    }

    let (cancel_tx, cancel_rx) = oneshot::channel::<()>();
    let rt_tx = runtime_tx.clone();
    let key = task.key;
    let attempt = task.attempt;

    let handle = tokio::spawn(async move {
        run_task(task, rt_tx, cancel_rx).await;
        debug!(task = %key, attempt, "task runner future finished");
    });

    active.insert(
        group,
        ActiveTask {
            key,
            attempt,
            cancel: Some(cancel_tx),
            handle,
        },
    );
}

fn handle_cancel(key: TaskKey, attempt: u64, active: &mut HashMap<GroupId, ActiveTask>) {
    match active.get_mut(&key.group) {
        Some(existing) if existing.key == key && existing.attempt == attempt => {
            info!(task = %key, attempt, "cancelling running process");
            cancel_active(existing);
        }
        _ => {
            debug!(task = %key, attempt, "no matching process to cancel");
        }
    }
}

fn cancel_active(existing: &mut ActiveTask) {
    if let Some(cancel) = existing.cancel.take() {
        if cancel.send(()).is_err() {
            debug!(
                task = %existing.key,
                attempt = existing.attempt,
                "process already finished while cancelling"
            );
        }
    } else {
        debug!(
            task = %existing.key,
            attempt = existing.attempt,
            "cancellation already requested"
        );
    }
}
