// src/exec/backend.rs

//! Seam between the runtime and whatever runs git.
//!
//! [`RealExecutorBackend`] forwards run and cancel requests to the process
//! loop in [`executor_loop`](super::executor_loop). Tests plug in a scripted
//! backend that answers with `TaskCompleted` events directly.

use std::future::Future;
use std::pin::Pin;

use tokio::sync::mpsc;

use crate::engine::RuntimeEvent;
use crate::errors::{Error, Result};
use crate::task::ScheduledTask;
use crate::types::TaskKey;

use super::executor_loop::{spawn_executor, ExecutorRequest};

/// Trait abstracting how scheduled git invocations are executed.
///
/// Every dispatched attempt must eventually produce exactly one
/// `RuntimeEvent::TaskCompleted`, including cancelled ones.
pub trait ExecutorBackend: Send {
    /// Dispatch the given task attempts for execution.
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<ScheduledTask>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;

    /// Request cancellation of a running attempt. Advisory: an attempt that
    /// already exited is left alone.
    fn cancel_task(
        &mut self,
        key: TaskKey,
        attempt: u64,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Backend that runs git as child processes.
pub struct RealExecutorBackend {
    tx: mpsc::Sender<ExecutorRequest>,
}

impl RealExecutorBackend {
    /// Spawns the process loop; its events go to `runtime_tx`.
    pub fn new(runtime_tx: mpsc::Sender<RuntimeEvent>) -> Self {
        Self {
            tx: spawn_executor(runtime_tx),
        }
    }

    /// The future owns a sender clone so it does not borrow `self`.
    fn send(&self, request: ExecutorRequest) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'static>> {
        let tx = self.tx.clone();
        Box::pin(async move {
            tx.send(request).await.map_err(Error::from)?;
            Ok(())
        })
    }
}

impl ExecutorBackend for RealExecutorBackend {
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<ScheduledTask>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let sends: Vec<_> = tasks.into_iter().map(|t| self.send(ExecutorRequest::Run(t))).collect();

        Box::pin(async move {
            for send in sends {
                send.await?;
            }
            Ok(())
        })
    }

    fn cancel_task(
        &mut self,
        key: TaskKey,
        attempt: u64,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        self.send(ExecutorRequest::Cancel { key, attempt })
    }
}
