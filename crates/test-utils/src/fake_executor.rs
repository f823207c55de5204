use std::collections::{HashMap, HashSet, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use repobatch::engine::{ExecOutcome, RuntimeEvent};
use repobatch::errors::Result;
use repobatch::exec::{ExecutorBackend, CANCELLED_OUTPUT};
use repobatch::task::ScheduledTask;
use repobatch::types::TaskKey;

#[derive(Default)]
struct ScriptState {
    outcomes: HashMap<TaskKey, VecDeque<ExecOutcome>>,
    held: HashSet<TaskKey>,
    running: HashMap<TaskKey, u64>,
    executed: Vec<ScheduledTask>,
    cancelled: Vec<(TaskKey, u64)>,
}

/// A fake executor that:
/// - records which attempts were dispatched and cancelled
/// - reports each attempt's output lines and completion right away, using
///   the scripted outcome for its key (success by default)
/// - keeps "held" attempts running until they are cancelled.
pub struct ScriptedExecutor {
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    state: Arc<Mutex<ScriptState>>,
}

/// Read access to what a [`ScriptedExecutor`] did, usable after the
/// executor moved into the runtime.
#[derive(Clone)]
pub struct ExecutorProbe {
    state: Arc<Mutex<ScriptState>>,
}

impl ScriptedExecutor {
    pub fn new(runtime_tx: mpsc::Sender<RuntimeEvent>) -> Self {
        Self {
            runtime_tx,
            state: Arc::new(Mutex::new(ScriptState::default())),
        }
    }

    /// Queue the outcome of the next attempt of `key`.
    pub fn with_outcome(self, key: TaskKey, outcome: ExecOutcome) -> Self {
        self.state
            .lock()
            .unwrap()
            .outcomes
            .entry(key)
            .or_default()
            .push_back(outcome);
        self
    }

    pub fn with_failure(self, key: TaskKey, output: &str) -> Self {
        self.with_outcome(key, ExecOutcome::failed(1, output))
    }

    /// Attempts of `key` never exit on their own.
    pub fn with_hold(self, key: TaskKey) -> Self {
        self.state.lock().unwrap().held.insert(key);
        self
    }

    pub fn probe(&self) -> ExecutorProbe {
        ExecutorProbe {
            state: Arc::clone(&self.state),
        }
    }
}

impl ExecutorProbe {
    pub fn executed(&self) -> Vec<ScheduledTask> {
        self.state.lock().unwrap().executed.clone()
    }

    pub fn executed_keys(&self) -> Vec<TaskKey> {
        self.executed().iter().map(|t| t.key).collect()
    }

    pub fn cancelled(&self) -> Vec<(TaskKey, u64)> {
        self.state.lock().unwrap().cancelled.clone()
    }

    /// Whether a held attempt of `key` is still running.
    pub fn is_running(&self, key: TaskKey) -> bool {
        self.state.lock().unwrap().running.contains_key(&key)
    }
}

impl ExecutorBackend for ScriptedExecutor {
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<ScheduledTask>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let tx = self.runtime_tx.clone();

        let mut events = Vec::new();
        {
            let mut state = self.state.lock().unwrap();
            for t in tasks {
                state.executed.push(t.clone());

                if state.held.contains(&t.key) {
                    state.running.insert(t.key, t.attempt);
                    continue;
                }

                let outcome = state
                    .outcomes
                    .get_mut(&t.key)
                    .and_then(VecDeque::pop_front)
                    .unwrap_or_else(|| ExecOutcome::succeeded(format!("{} done", t.cmd_line)));

                for line in outcome.output.lines() {
                    events.push(RuntimeEvent::TaskOutput {
                        key: t.key,
                        attempt: t.attempt,
                        line: line.to_string(),
                    });
                }
                events.push(RuntimeEvent::TaskCompleted {
                    key: t.key,
                    attempt: t.attempt,
                    outcome,
                });
            }
        }

        Box::pin(async move {
            for event in events {
                tx.send(event).await.map_err(anyhow::Error::from)?;
            }
            Ok(())
        })
    }

    fn cancel_task(
        &mut self,
        key: TaskKey,
        attempt: u64,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let tx = self.runtime_tx.clone();

        let event = {
            let mut state = self.state.lock().unwrap();
            state.cancelled.push((key, attempt));
            match state.running.get(&key) {
                Some(&running) if running == attempt => {
                    state.running.remove(&key);
                    Some(RuntimeEvent::TaskCompleted {
                        key,
                        attempt,
                        outcome: ExecOutcome::new(None, CANCELLED_OUTPUT),
                    })
                }
                _ => None,
            }
        };

        Box::pin(async move {
            if let Some(event) = event {
                tx.send(event).await.map_err(anyhow::Error::from)?;
            }
            Ok(())
        })
    }
}
