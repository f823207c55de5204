// src/exec/task_runner.rs

//! Individual git process runner.

use std::process::Stdio;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use crate::engine::{ExecOutcome, RuntimeEvent};
use crate::task::ScheduledTask;

/// Appended to the output of a process killed on request.
pub const CANCELLED_OUTPUT: &str = "Aborted!";

/// Run one attempt, streaming its output and emitting exactly one
/// `TaskCompleted` event.
///
/// - stdout and stderr lines are forwarded as `TaskOutput` events and
///   collected into the combined output.
/// - If the cancel channel fires, the child process is killed and the
///   attempt still completes, as a failure with `Aborted!` appended.
/// - If the process cannot be spawned, a failed completion carrying the
///   error text is sent.
pub async fn run_task(
    task: ScheduledTask,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    cancel_rx: oneshot::Receiver<()>,
) {
    let key = task.key;
    let attempt = task.attempt;

    if let Err(err) = run_task_inner(task, &runtime_tx, cancel_rx).await {
        error!(task = %key, attempt, error = %err, "task execution error");
        let _ = runtime_tx
            .send(RuntimeEvent::TaskCompleted {
                key,
                attempt,
                outcome: ExecOutcome::new(None, format!("{err:#}")),
            })
            .await;
    }
}

async fn run_task_inner(
    task: ScheduledTask,
    runtime_tx: &mpsc::Sender<RuntimeEvent>,
    mut cancel_rx: oneshot::Receiver<()>,
) -> Result<()> {
    info!(
        task = %task.key,
        attempt = task.attempt,
        repo = %task.repo,
        cmd = %task.cmd_line,
        "starting git process"
    );

    let mut cmd = Command::new(&task.program);
    cmd.args(&task.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd
        .spawn()
        .with_context(|| format!("spawning {:?} for task {}", task.program, task.key))?;

    // Both streams feed one channel so the combined output keeps the order
    // in which lines arrived.
    let (line_tx, mut line_rx) = mpsc::unbounded_channel::<String>();
    if let Some(stdout) = child.stdout.take() {
        spawn_line_reader(stdout, line_tx.clone());
    }
    if let Some(stderr) = child.stderr.take() {
        spawn_line_reader(stderr, line_tx.clone());
    }
    drop(line_tx);

    let mut lines: Vec<String> = Vec::new();
    let mut lines_done = false;
    let mut status = None;
    let mut cancel_armed = true;
    let mut cancelled = false;

    // A killed git may leave helpers holding the pipes open; once cancelled
    // we stop waiting for output as soon as the process itself is gone.
    while status.is_none() || (!lines_done && !cancelled) {
        tokio::select! {
            line = line_rx.recv(), if !lines_done => match line {
                Some(line) => {
                    let _ = runtime_tx
                        .send(RuntimeEvent::TaskOutput {
                            key: task.key,
                            attempt: task.attempt,
                            line: line.clone(),
                        })
                        .await;
                    lines.push(line);
                }
                None => lines_done = true,
            },

            res = child.wait(), if status.is_none() => {
                let exit = res.with_context(|| format!("waiting for process of task {}", task.key))?;
                status = Some(exit);
            }

            cancel = &mut cancel_rx, if cancel_armed => {
                cancel_armed = false;
                match cancel {
                    Ok(()) => {
                        info!(
                            task = %task.key,
                            attempt = task.attempt,
                            "cancellation requested for running attempt; killing process"
                        );
                        cancelled = true;
                        if let Err(e) = child.start_kill() {
                            warn!(
                                task = %task.key,
                                attempt = task.attempt,
                                error = %e,
                                "failed to kill child process on cancellation"
                            );
                        }
                    }
                    Err(_) => {
                        debug!(
                            task = %task.key,
                            attempt = task.attempt,
                            "cancel channel closed without explicit cancellation"
                        );
                    }
                }
            }
        }
    }

    let mut output = lines.join("\n");
    let exit_code = match status {
        Some(exit) if !cancelled => exit.code(),
        _ => None,
    };

    if cancelled {
        if !output.is_empty() {
            output.push('\n');
        }
        output.push_str(CANCELLED_OUTPUT);
    }

    info!(
        task = %task.key,
        attempt = task.attempt,
        exit_code = ?exit_code,
        cancelled,
        "git process exited"
    );

    runtime_tx
        .send(RuntimeEvent::TaskCompleted {
            key: task.key,
            attempt: task.attempt,
            outcome: ExecOutcome::new(exit_code, output),
        })
        .await
        .with_context(|| format!("sending TaskCompleted event for task {} to runtime", task.key))?;

    Ok(())
}

fn spawn_line_reader<R>(reader: R, tx: mpsc::UnboundedSender<String>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if tx.send(line).is_err() {
                break;
            }
        }
    });
}
