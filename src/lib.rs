// src/lib.rs

pub mod batch;
pub mod cli;
pub mod config;
pub mod decision;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod group;
pub mod logging;
pub mod repo;
pub mod report;
pub mod task;
pub mod types;

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::batch::{BatchOptions, BatchSummary, Coordinator};
use crate::cli::CliArgs;
use crate::config::load_and_validate;
use crate::decision::ConsoleDecisionBackend;
use crate::engine::{CoreRuntime, Runtime, RuntimeEvent};
use crate::exec::RealExecutorBackend;
use crate::fs::{FileSystem, RealFileSystem};
use crate::group::PreconditionKind;
use crate::repo::GitRefresher;
use crate::report::ConsoleReporter;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading and group selection
/// - coordinator / core / runtime
/// - executor, console prompt and reporter
/// - Ctrl-C handling (first press aborts every group, second one quits)
pub async fn run(args: CliArgs) -> Result<BatchSummary> {
    let cfg = load_and_validate(&args.config)?;

    let options = BatchOptions {
        only_groups: args.groups.clone(),
        force_stop: args.no_prompt,
    };
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let coordinator = Coordinator::from_config(&cfg, &options, fs)?;

    if args.dry_run {
        print_dry_run(&coordinator);
        return Ok(BatchSummary::default());
    }

    info!(config = %args.config.display(), groups = coordinator.len(), "batch loaded");

    // Runtime event channel.
    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);

    let executor = RealExecutorBackend::new(rt_tx.clone());
    let decisions = ConsoleDecisionBackend::new(rt_tx.clone());
    spawn_interrupt_handler(rt_tx);

    let core = CoreRuntime::new(coordinator);
    let runtime = Runtime::new(core, rt_rx, executor, decisions)
        .with_refresher(GitRefresher::new(cfg.config.git.clone()))
        .with_reporter(ConsoleReporter::new())
        .with_poll_interval(cfg.poll_interval());

    let summary = runtime.run().await?;
    Ok(summary)
}

fn spawn_interrupt_handler(tx: mpsc::Sender<RuntimeEvent>) {
    tokio::spawn(async move {
        let mut presses = 0u32;
        loop {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for Ctrl+C");
                return;
            }
            presses += 1;

            let event = if presses == 1 {
                warn!("interrupted; aborting all groups (press Ctrl+C again to quit now)");
                RuntimeEvent::AbortAll
            } else {
                RuntimeEvent::ShutdownRequested
            };

            if tx.send(event).await.is_err() {
                return;
            }
        }
    });
}

/// Print groups, preconditions and git commands without running anything.
fn print_dry_run(coordinator: &Coordinator) {
    println!("repobatch dry-run");
    println!("  git = {}", coordinator.git().display());
    println!();

    println!("groups ({}):", coordinator.len());
    for runner in coordinator.runners() {
        let group = runner.group();
        let name = coordinator.group_name(runner.id()).unwrap_or_default();

        println!("  - {name}: {}", group.desc());
        println!("      repo: {} ({})", group.repo().name(), group.repo().fullpath().display());
        println!("      on_failure: {:?}", runner.policy());

        if let Some(pre) = group.precondition() {
            let dep = pre
                .dependency()
                .and_then(|id| coordinator.group_name(id))
                .unwrap_or("<not selected>");
            match pre.kind() {
                PreconditionKind::AfterFinished => println!("      after: {dep}"),
                PreconditionKind::AfterStartedAndDirExists => println!("      after_started: {dep}"),
            }
        }

        for task in group.tasks() {
            let mut line = format!("      > {}", task.cmd_line());
            if !task.command().runs_inside_repo() {
                line.push_str("  (outside repo)");
            }
            if task.ignore_failure() {
                line.push_str("  (failure ignored)");
            }
            println!("{line}");
        }
    }

    debug!("dry-run complete (no execution)");
}
