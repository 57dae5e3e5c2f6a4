//! Fire-and-forget job dispatch.
//!
//! [`QueueDispatcher`] only waits for the job to be *accepted* into a bounded
//! queue. Execution happens on the [`WorkerPool`] task, one spawned task per
//! job, with failures logged there and never reported back to the caller.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::SendTimeoutError;
use tokio::task::{JoinHandle, JoinSet};
use tracing::Instrument;

use super::{Job, Worker};
use crate::errors::DispatchError;
use crate::observability::run_span;

/// Hands a job to the worker registered under `target`.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    /// Returns once the job is accepted, not once it has run.
    async fn dispatch(&self, target: &str, job: Job) -> Result<(), DispatchError>;
}

#[derive(Debug)]
struct Envelope {
    target: String,
    job: Job,
}

/// Dispatcher backed by the in-process worker pool queue.
#[derive(Clone)]
pub struct QueueDispatcher {
    tx: mpsc::Sender<Envelope>,
    targets: Arc<HashSet<String>>,
    accept_timeout: Duration,
}

#[async_trait]
impl Dispatcher for QueueDispatcher {
    async fn dispatch(&self, target: &str, job: Job) -> Result<(), DispatchError> {
        if !self.targets.contains(target) {
            return Err(DispatchError::UnknownTarget {
                target: target.to_string(),
            });
        }
        let envelope = Envelope {
            target: target.to_string(),
            job,
        };
        match self.tx.send_timeout(envelope, self.accept_timeout).await {
            Ok(()) => Ok(()),
            Err(SendTimeoutError::Closed(_)) => Err(DispatchError::Unreachable {
                target: target.to_string(),
            }),
            Err(SendTimeoutError::Timeout(_)) => Err(DispatchError::NotAccepted {
                target: target.to_string(),
                timeout_ms: self.accept_timeout.as_millis() as u64,
            }),
        }
    }
}

/// Registry of workers by dispatch target.
#[derive(Default)]
pub struct WorkerPool {
    workers: HashMap<String, Arc<dyn Worker>>,
}

impl WorkerPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, target: impl Into<String>, worker: Arc<dyn Worker>) -> Self {
        self.workers.insert(target.into(), worker);
        self
    }

    /// Spawn the pool loop and return a dispatcher feeding it.
    ///
    /// The loop runs until every `QueueDispatcher` clone is dropped, then
    /// drains in-flight jobs before finishing.
    pub fn start(
        self,
        capacity: usize,
        accept_timeout: Duration,
    ) -> (QueueDispatcher, WorkerPoolHandle) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let targets = self.workers.keys().cloned().collect();
        let task = tokio::spawn(run_pool(self.workers, rx));
        (
            QueueDispatcher {
                tx,
                targets: Arc::new(targets),
                accept_timeout,
            },
            WorkerPoolHandle { task },
        )
    }
}

/// Handle to the running pool loop.
pub struct WorkerPoolHandle {
    task: JoinHandle<usize>,
}

impl WorkerPoolHandle {
    /// Wait for the pool to drain. Returns the number of jobs it ran.
    ///
    /// Only completes after all dispatchers have been dropped.
    pub async fn join(self) -> usize {
        match self.task.await {
            Ok(count) => count,
            Err(e) => {
                tracing::error!(error = %e, "worker pool task failed");
                0
            }
        }
    }
}

async fn run_pool(
    workers: HashMap<String, Arc<dyn Worker>>,
    mut rx: mpsc::Receiver<Envelope>,
) -> usize {
    let mut running = JoinSet::new();
    let mut finished = 0usize;

    loop {
        tokio::select! {
            received = rx.recv() => match received {
                Some(envelope) => {
                    let Some(worker) = workers.get(&envelope.target) else {
                        tracing::error!(
                            target_name = %envelope.target,
                            "no worker for accepted job"
                        );
                        continue;
                    };
                    running.spawn(run_job(worker.clone(), envelope.job));
                }
                None => break,
            },
            Some(joined) = running.join_next(), if !running.is_empty() => {
                finished += 1;
                log_join(joined);
            }
        }
    }

    while let Some(joined) = running.join_next().await {
        finished += 1;
        log_join(joined);
    }
    finished
}

async fn run_job(worker: Arc<dyn Worker>, job: Job) {
    let span = run_span(worker.name(), &job.run_id);
    async move {
        tracing::info!(repo = %job.repo_path, "job started");
        match worker.run(&job).await {
            Ok(()) => tracing::info!("job completed"),
            Err(e) => tracing::error!(error = %e, "job failed"),
        }
    }
    .instrument(span)
    .await
}

fn log_join(joined: Result<(), tokio::task::JoinError>) {
    if let Err(e) = joined {
        tracing::error!(error = %e, "worker task panicked");
    }
}
