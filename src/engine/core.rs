// src/engine/core.rs

//! Pure core runtime state machine.
//!
//! This module contains a synchronous, deterministic "core runtime" that
//! consumes [`RuntimeEvent`]s and produces:
//! - an updated batch state
//! - a list of "commands" describing what the IO shell should do next
//!
//! The async/IO-heavy shell (`engine::runtime::Runtime`) is responsible for:
//! - reading events from channels
//! - sending `ScheduledTask`s to the executor
//! - presenting questions and reports
//!
//! The core is unit tested without any Tokio, channels or processes; the
//! only outside state it reads is the [`FileSystem`](crate::fs::FileSystem)
//! held by the coordinator.

use tracing::{debug, info};

use crate::batch::{BatchSummary, Coordinator};
use crate::engine::event_handlers::{
    handle_abort_all, handle_abort_group, handle_task_completed, handle_task_output,
    handle_user_choice, CoreCommand, CoreStep,
};
use crate::engine::RuntimeEvent;

/// Pure core runtime state.
///
/// It owns the coordinator and remembers whether the end of the batch was
/// already reported. It has **no** channels, no Tokio types, and does not
/// spawn anything.
#[derive(Debug)]
pub struct CoreRuntime {
    coordinator: Coordinator,
    finished: bool,
}

impl CoreRuntime {
    pub fn new(coordinator: Coordinator) -> Self {
        Self {
            coordinator,
            finished: false,
        }
    }

    pub fn coordinator(&self) -> &Coordinator {
        &self.coordinator
    }

    /// Whether the batch end was reported.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn summary(&self) -> BatchSummary {
        self.coordinator.summary()
    }

    /// Initial scheduling pass: start every group whose precondition is
    /// already fulfilled.
    pub fn start(&mut self) -> CoreStep {
        info!(groups = self.coordinator.len(), "starting batch");
        self.finish_step(Vec::new())
    }

    /// Handle a single runtime event, updating core state and returning the
    /// resulting commands for the IO shell.
    pub fn step(&mut self, event: RuntimeEvent) -> CoreStep {
        let commands = match event {
            RuntimeEvent::TaskOutput { key, attempt, line } => {
                handle_task_output(&self.coordinator, key, attempt, line)
            }
            RuntimeEvent::TaskCompleted {
                key,
                attempt,
                outcome,
            } => handle_task_completed(&mut self.coordinator, key, attempt, outcome),
            RuntimeEvent::UserChoice { group, choice } => {
                handle_user_choice(&mut self.coordinator, group, choice)
            }
            RuntimeEvent::AbortGroup { group } => handle_abort_group(&mut self.coordinator, group),
            RuntimeEvent::AbortAll => handle_abort_all(&mut self.coordinator),
            RuntimeEvent::Tick => Vec::new(),
            RuntimeEvent::ShutdownRequested => {
                info!("shutdown requested; stopping without waiting for running tasks");
                return CoreStep {
                    commands: vec![CoreCommand::RequestExit],
                    keep_running: false,
                };
            }
        };

        self.finish_step(commands)
    }

    /// Re-evaluate waiting groups and detect the end of the batch.
    fn finish_step(&mut self, mut commands: Vec<CoreCommand>) -> CoreStep {
        if self.finished {
            return CoreStep {
                commands,
                keep_running: false,
            };
        }

        commands.extend(self.coordinator.schedule());

        if self.coordinator.is_complete() {
            self.finished = true;
            let summary = self.coordinator.summary();
            debug!(?summary, "batch complete");
            commands.push(CoreCommand::BatchFinished(summary));
            commands.push(CoreCommand::RequestExit);
            return CoreStep {
                commands,
                keep_running: false,
            };
        }

        CoreStep::running(commands)
    }
}
