// src/decision/console.rs

//! Interactive decisions on the terminal.
//!
//! Questions are answered one at a time by a background prompt loop, so two
//! groups failing at the same moment never interleave their prompts.

use std::future::Future;
use std::pin::Pin;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::decision::{DecisionBackend, Question, UserChoice};
use crate::engine::RuntimeEvent;
use crate::errors::{Error, Result};

/// Spawn the background prompt loop reading answers from stdin.
///
/// Each question received on the returned sender is printed to stderr; the
/// answer is sent to the runtime as `RuntimeEvent::UserChoice`. If stdin is
/// closed, every pending and future question is answered with `Abort`.
pub fn spawn_prompter(runtime_tx: mpsc::Sender<RuntimeEvent>) -> mpsc::UnboundedSender<Question> {
    spawn_prompter_on(runtime_tx, BufReader::new(tokio::io::stdin()))
}

/// [`spawn_prompter`] reading answers from `input`.
///
/// The question queue is unbounded: queuing never waits on the user, so the
/// runtime keeps draining its events while a prompt is open.
pub fn spawn_prompter_on<R>(runtime_tx: mpsc::Sender<RuntimeEvent>, input: R) -> mpsc::UnboundedSender<Question>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    let (tx, mut rx) = mpsc::unbounded_channel::<Question>();

    tokio::spawn(async move {
        info!("prompt loop started");

        let mut lines = input.lines();

        while let Some(question) = rx.recv().await {
            let choice = prompt_choice(&question, &mut lines).await;
            debug!(group = %question.group, %choice, "user decision");

            let event = RuntimeEvent::UserChoice {
                group: question.group,
                choice,
            };
            if runtime_tx.send(event).await.is_err() {
                debug!("runtime event channel closed; stopping prompt loop");
                break;
            }
        }

        info!("prompt loop finished (channel closed)");
    });

    tx
}

/// Print one question and read lines until one of the offered choices is
/// entered.
pub async fn prompt_choice<R>(question: &Question, lines: &mut Lines<R>) -> UserChoice
where
    R: AsyncBufRead + Unpin,
{
    eprintln!();
    eprintln!(
        "[{}] {} failed: {}",
        question.repo, question.task_desc, question.cmd_line
    );
    for line in question.output.lines() {
        eprintln!("    {line}");
    }

    loop {
        eprint!(
            "An error occurred, what do you want to do next? [{}] ",
            question.options
        );

        match lines.next_line().await {
            Ok(Some(line)) => match line.parse::<UserChoice>() {
                Ok(choice) if question.options.contains(choice) => return choice,
                Ok(choice) => eprintln!("'{choice}' is not available here"),
                Err(msg) => eprintln!("{msg}"),
            },
            Ok(None) => {
                warn!(group = %question.group, "stdin closed; aborting group");
                return UserChoice::Abort;
            }
            Err(e) => {
                warn!(group = %question.group, error = %e, "failed to read answer; aborting group");
                return UserChoice::Abort;
            }
        }
    }
}

/// Decision backend forwarding questions to the console prompt loop.
pub struct ConsoleDecisionBackend {
    tx: mpsc::UnboundedSender<Question>,
}

impl ConsoleDecisionBackend {
    /// Create the backend; spawns the prompt loop on stdin immediately.
    pub fn new(runtime_tx: mpsc::Sender<RuntimeEvent>) -> Self {
        Self {
            tx: spawn_prompter(runtime_tx),
        }
    }

    pub fn with_input<R>(runtime_tx: mpsc::Sender<RuntimeEvent>, input: R) -> Self
    where
        R: AsyncBufRead + Unpin + Send + 'static,
    {
        Self {
            tx: spawn_prompter_on(runtime_tx, input),
        }
    }
}

impl DecisionBackend for ConsoleDecisionBackend {
    fn ask(&mut self, question: Question) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let queued = self.tx.send(question).map_err(|e| Error::msg(format!("prompt loop is gone: {e}")));

        Box::pin(async move {
            queued?;
            Ok(())
        })
    }
}
