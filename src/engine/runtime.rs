// src/engine/runtime.rs

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::batch::BatchSummary;
use crate::decision::DecisionBackend;
use crate::errors::Result;
use crate::exec::ExecutorBackend;
use crate::repo::{NoopRefresher, RepoRefresher};
use crate::report::{LogReporter, Reporter};
use crate::task::ScheduledTask;

use super::core::CoreRuntime;
use super::{CoreCommand, CoreStep, RuntimeEvent};

/// Drives the batch coordinator in response to `RuntimeEvent`s, and
/// delegates process execution to an `ExecutorBackend` and questions to a
/// `DecisionBackend`.
///
/// This is a pure IO shell around `CoreRuntime`, which contains all the
/// runtime semantics.
pub struct Runtime<E: ExecutorBackend> {
    core: CoreRuntime,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    executor: E,
    decisions: Box<dyn DecisionBackend>,
    refresher: Arc<dyn RepoRefresher>,
    reporter: Box<dyn Reporter>,
    poll_interval: Duration,
    refreshes: JoinSet<()>,
    summary: Option<BatchSummary>,
}

impl<E: ExecutorBackend> fmt::Debug for Runtime<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .field("poll_interval", &self.poll_interval)
            .finish_non_exhaustive()
    }
}

impl<E: ExecutorBackend> Runtime<E> {
    pub fn new(
        core: CoreRuntime,
        event_rx: mpsc::Receiver<RuntimeEvent>,
        executor: E,
        decisions: impl DecisionBackend + 'static,
    ) -> Self {
        Self {
            core,
            event_rx,
            executor,
            decisions: Box::new(decisions),
            refresher: Arc::new(NoopRefresher),
            reporter: Box::new(LogReporter),
            poll_interval: Duration::from_millis(200),
            refreshes: JoinSet::new(),
            summary: None,
        }
    }

    pub fn with_refresher(mut self, refresher: impl RepoRefresher + 'static) -> Self {
        self.refresher = Arc::new(refresher);
        self
    }

    pub fn with_reporter(mut self, reporter: impl Reporter + 'static) -> Self {
        self.reporter = Box::new(reporter);
        self
    }

    /// How often waiting preconditions are re-evaluated without any event.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Main event loop.
    ///
    /// - Starts every group whose precondition is already fulfilled.
    /// - Consumes `RuntimeEvent`s from `event_rx`, plus a periodic `Tick`.
    /// - Feeds them into the core runtime.
    /// - Executes commands returned by the core (dispatch, cancel, ask...).
    ///
    /// Returns the batch summary once every group finished, or the partial
    /// summary after a shutdown request.
    pub async fn run(mut self) -> Result<BatchSummary> {
        info!("repobatch runtime started");

        let step = self.core.start();
        let mut keep_running = self.execute_step(step).await?;

        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        while keep_running {
            let event = tokio::select! {
                received = self.event_rx.recv() => match received {
                    Some(e) => e,
                    None => {
                        info!("runtime event channel closed; exiting");
                        break;
                    }
                },
                _ = ticker.tick() => RuntimeEvent::Tick,
            };

            if !matches!(event, RuntimeEvent::Tick | RuntimeEvent::TaskOutput { .. }) {
                debug!(?event, "runtime received event");
            }

            // Feed the event into the pure core and get commands back.
            let step = self.core.step(event);
            keep_running = self.execute_step(step).await?;

            if !keep_running {
                info!("core requested exit; stopping runtime");
            }
        }

        self.wait_for_refreshes().await;

        info!("runtime exiting");
        Ok(self.summary.take().unwrap_or_else(|| self.core.summary()))
    }

    async fn execute_step(&mut self, step: CoreStep) -> Result<bool> {
        let mut dispatch = Vec::new();

        for command in step.commands {
            match command {
                CoreCommand::Dispatch(task) => dispatch.push(task),
                other => {
                    // Keep dispatch order relative to cancels and questions.
                    self.spawn_ready(std::mem::take(&mut dispatch)).await?;
                    self.execute_command(other).await?;
                }
            }
        }
        self.spawn_ready(dispatch).await?;

        Ok(step.keep_running)
    }

    /// Execute a single command from the core.
    async fn execute_command(&mut self, command: CoreCommand) -> Result<()> {
        match command {
            CoreCommand::Dispatch(task) => {
                self.spawn_ready(vec![task]).await?;
            }
            CoreCommand::Cancel { key, attempt } => {
                debug!(task = %key, attempt, "cancelling task attempt");
                self.executor.cancel_task(key, attempt).await?;
            }
            CoreCommand::AskUser(question) => {
                self.reporter.question(&question);
                self.decisions.ask(question).await?;
            }
            CoreCommand::TaskOutput { key, repo, line } => {
                self.reporter.task_output(key, &repo, &line);
            }
            CoreCommand::TaskReported(report) => {
                self.reporter.task_finished(&report);
            }
            CoreCommand::GroupFinished(outcome) => {
                self.reporter.group_finished(&outcome);
            }
            CoreCommand::RefreshRepo(repo) => {
                let refresh = self.refresher.refresh(repo.clone());
                self.refreshes.spawn(async move {
                    if let Err(err) = refresh.await {
                        warn!(repo = %repo, error = %err, "repository refresh failed");
                    }
                });
            }
            CoreCommand::BatchFinished(summary) => {
                self.reporter.batch_finished(&summary);
                self.summary = Some(summary);
            }
            CoreCommand::RequestExit => {
                // The core already returns keep_running=false along with this.
                debug!("core issued RequestExit command");
            }
        }
        Ok(())
    }

    async fn spawn_ready(&mut self, tasks: Vec<ScheduledTask>) -> Result<()> {
        if tasks.is_empty() {
            return Ok(());
        }

        for task in &tasks {
            self.reporter.task_started(task);
        }

        let keys: Vec<_> = tasks.iter().map(|t| t.key.to_string()).collect();
        debug!(?keys, "spawning ready tasks");

        self.executor.spawn_ready_tasks(tasks).await
    }

    async fn wait_for_refreshes(&mut self) {
        while let Some(res) = self.refreshes.join_next().await {
            if let Err(err) = res {
                warn!(error = %err, "repository refresh task panicked or was cancelled");
            }
        }
    }
}
