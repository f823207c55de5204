use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use repobatch::batch::BatchSummary;
use repobatch::decision::{DecisionBackend, Question, UserChoice};
use repobatch::engine::RuntimeEvent;
use repobatch::errors::Result;
use repobatch::group::{GroupOutcome, TaskReport};
use repobatch::report::Reporter;
use repobatch::task::ScheduledTask;
use repobatch::types::TaskKey;

/// Decision backend answering questions from a fixed list.
///
/// Questions asked after the list ran out stay unanswered, so a test can
/// answer them (or abort the group) itself.
pub struct ScriptedDecisions {
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    answers: VecDeque<UserChoice>,
    asked: Arc<Mutex<Vec<Question>>>,
}

impl ScriptedDecisions {
    pub fn new(runtime_tx: mpsc::Sender<RuntimeEvent>, answers: impl IntoIterator<Item = UserChoice>) -> Self {
        Self {
            runtime_tx,
            answers: answers.into_iter().collect(),
            asked: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Never answers anything.
    pub fn silent(runtime_tx: mpsc::Sender<RuntimeEvent>) -> Self {
        Self::new(runtime_tx, Vec::new())
    }

    /// Shared list of every question asked so far.
    pub fn asked(&self) -> Arc<Mutex<Vec<Question>>> {
        Arc::clone(&self.asked)
    }
}

impl DecisionBackend for ScriptedDecisions {
    fn ask(&mut self, question: Question) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let tx = self.runtime_tx.clone();
        let group = question.group;
        self.asked.lock().unwrap().push(question);
        let answer = self.answers.pop_front();

        Box::pin(async move {
            if let Some(choice) = answer {
                tx.send(RuntimeEvent::UserChoice { group, choice })
                    .await
                    .map_err(anyhow::Error::from)?;
            }
            Ok(())
        })
    }
}

#[derive(Debug, Clone)]
pub enum ReportEvent {
    Started { key: TaskKey, attempt: u64 },
    Output { key: TaskKey, line: String },
    Finished(TaskReport),
    Question(Question),
    GroupFinished(GroupOutcome),
    BatchFinished(BatchSummary),
}

/// Reporter keeping every notification for later assertions.
#[derive(Clone, Default)]
pub struct RecordingReporter {
    events: Arc<Mutex<Vec<ReportEvent>>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ReportEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn task_reports(&self) -> Vec<TaskReport> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ReportEvent::Finished(r) => Some(r),
                _ => None,
            })
            .collect()
    }

    pub fn group_outcomes(&self) -> Vec<GroupOutcome> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ReportEvent::GroupFinished(o) => Some(o),
                _ => None,
            })
            .collect()
    }

    pub fn output_lines(&self, key: TaskKey) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ReportEvent::Output { key: k, line } if k == key => Some(line),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: ReportEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl Reporter for RecordingReporter {
    fn task_started(&mut self, task: &ScheduledTask) {
        self.push(ReportEvent::Started {
            key: task.key,
            attempt: task.attempt,
        });
    }

    fn task_output(&mut self, key: TaskKey, _repo: &str, line: &str) {
        self.push(ReportEvent::Output {
            key,
            line: line.to_string(),
        });
    }

    fn task_finished(&mut self, report: &TaskReport) {
        self.push(ReportEvent::Finished(report.clone()));
    }

    fn question(&mut self, question: &Question) {
        self.push(ReportEvent::Question(question.clone()));
    }

    fn group_finished(&mut self, outcome: &GroupOutcome) {
        self.push(ReportEvent::GroupFinished(outcome.clone()));
    }

    fn batch_finished(&mut self, summary: &BatchSummary) {
        self.push(ReportEvent::BatchFinished(summary.clone()));
    }
}

/// In-memory writer for reporters that print, readable after the reporter
/// moved into the runtime.
#[derive(Clone, Default)]
pub struct SharedBuffer {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.bytes.lock().unwrap()).into_owned()
    }
}

impl std::io::Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.bytes.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
