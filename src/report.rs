// src/report.rs

//! Observers for what the engine does.
//!
//! The core never prints. The runtime forwards progressive output, task
//! results, group outcomes and the final summary to a [`Reporter`].

use std::collections::HashMap;
use std::fmt;
use std::io::{self, Write};

use tracing::{info, warn};

use crate::batch::BatchSummary;
use crate::decision::Question;
use crate::group::{GroupOutcome, TaskReport};
use crate::task::{ScheduledTask, TaskState};
use crate::types::TaskKey;

pub trait Reporter: Send {
    fn task_started(&mut self, _task: &ScheduledTask) {}

    fn task_output(&mut self, _key: TaskKey, _repo: &str, _line: &str) {}

    fn task_finished(&mut self, _report: &TaskReport) {}

    fn question(&mut self, _question: &Question) {}

    fn group_finished(&mut self, _outcome: &GroupOutcome) {}

    fn batch_finished(&mut self, _summary: &BatchSummary) {}
}

/// Reports through `tracing` only.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogReporter;

impl Reporter for LogReporter {
    fn task_started(&mut self, task: &ScheduledTask) {
        info!(task = %task.key, attempt = task.attempt, repo = %task.repo, cmd = %task.cmd_line, "task started");
    }

    fn task_finished(&mut self, report: &TaskReport) {
        if report.success {
            info!(task = %report.key, attempt = report.attempt, repo = %report.repo, state = %report.state, "task finished");
        } else {
            warn!(task = %report.key, attempt = report.attempt, repo = %report.repo, output = %report.output, "task failed");
        }
    }

    fn group_finished(&mut self, outcome: &GroupOutcome) {
        info!(
            group = %outcome.group,
            repo = %outcome.repo,
            success = outcome.success,
            aborted = outcome.aborted,
            blocked = outcome.blocked,
            "group finished"
        );
    }

    fn batch_finished(&mut self, summary: &BatchSummary) {
        info!(%summary, "batch finished");
    }
}

/// Prints a text version of the task tree, on stdout by default.
///
/// ```text
/// [core] > git fetch --prune
/// [core]   From github.com:acme/core
/// [core] fetch: ok
/// ```
///
/// Output lines are printed as they stream in. When a task fails, the part
/// of its final output that never streamed (the git failure notes,
/// `Aborted!`, a spawn error) is printed before the status line.
pub struct ConsoleReporter {
    out: Box<dyn Write + Send>,
    streamed: HashMap<TaskKey, Vec<String>>,
}

impl ConsoleReporter {
    pub fn new() -> Self {
        Self::with_writer(io::stdout())
    }

    pub fn with_writer(out: impl Write + Send + 'static) -> Self {
        Self {
            out: Box::new(out),
            streamed: HashMap::new(),
        }
    }

    fn print(&mut self, line: fmt::Arguments<'_>) {
        if let Err(e) = writeln!(self.out, "{line}") {
            warn!(error = %e, "failed to write to console");
        }
    }
}

impl Default for ConsoleReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ConsoleReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsoleReporter")
            .field("tasks_streaming", &self.streamed.len())
            .finish_non_exhaustive()
    }
}

impl Reporter for ConsoleReporter {
    fn task_started(&mut self, task: &ScheduledTask) {
        self.streamed.insert(task.key, Vec::new());
        self.print(format_args!("[{}] > {}", task.repo, task.cmd_line));
    }

    fn task_output(&mut self, key: TaskKey, repo: &str, line: &str) {
        self.streamed.entry(key).or_default().push(line.to_string());
        self.print(format_args!("[{repo}]   {line}"));
    }

    fn task_finished(&mut self, report: &TaskReport) {
        let streamed = self.streamed.remove(&report.key).unwrap_or_default().join("\n");

        if !report.success || report.state == TaskState::Errored {
            let unseen = report
                .output
                .strip_prefix(streamed.as_str())
                .unwrap_or(&report.output)
                .trim_start_matches('\n');
            for line in unseen.lines() {
                self.print(format_args!("[{}]   {}", report.repo, line));
            }
        }

        let status = match (report.success, report.state) {
            (true, TaskState::Errored) => "failed (ignored)",
            (true, _) => "ok",
            (false, _) if report.aborted => "aborted",
            (false, _) => "FAILED",
        };
        self.print(format_args!("[{}] {}: {}", report.repo, report.desc, status));
    }

    fn group_finished(&mut self, outcome: &GroupOutcome) {
        let status = if outcome.blocked {
            "blocked by its precondition"
        } else if outcome.aborted {
            "aborted"
        } else if outcome.success {
            "done"
        } else {
            "done with errors"
        };
        self.print(format_args!(
            "[{}] {}: {} ({} error(s))",
            outcome.repo, outcome.desc, status, outcome.error_count
        ));
    }

    fn batch_finished(&mut self, summary: &BatchSummary) {
        self.print(format_args!("\n{summary}"));
    }
}
