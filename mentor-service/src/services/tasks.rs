//! Deferred background tasks.
//!
//! Memory summarization and title generation run off the user-facing
//! path: the pipeline enqueues a task over a bounded channel and a
//! spawned runner executes it. Outcomes are typed and logged; failures
//! are contained here and never propagate to the request that triggered
//! them.

use crate::services::memory::{MemorySummarizer, SummarizeOutcome};
use crate::services::metrics;
use crate::services::title::{TitleGenerator, TitleOutcome};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub enum BackgroundTask {
    SummarizeMemory {
        chat_id: String,
        user_id: String,
        mentor_id: String,
    },
    GenerateTitle {
        chat_id: String,
        first_message: String,
    },
}

impl BackgroundTask {
    pub fn name(&self) -> &'static str {
        match self {
            BackgroundTask::SummarizeMemory { .. } => "summarize_memory",
            BackgroundTask::GenerateTitle { .. } => "generate_title",
        }
    }
}

#[derive(Debug)]
pub enum TaskOutcome {
    Completed,
    Skipped(&'static str),
    Failed(String),
}

impl TaskOutcome {
    fn label(&self) -> &'static str {
        match self {
            TaskOutcome::Completed => "completed",
            TaskOutcome::Skipped(_) => "skipped",
            TaskOutcome::Failed(_) => "failed",
        }
    }
}

/// Cloneable enqueue handle. Delivery is at-least-once from the caller's
/// point of view and best-effort overall: a full queue logs and drops.
#[derive(Clone)]
pub struct TaskQueue {
    tx: mpsc::Sender<BackgroundTask>,
}

impl TaskQueue {
    /// Create a queue and its receiving end.
    pub fn bounded(capacity: usize) -> (Self, mpsc::Receiver<BackgroundTask>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    pub fn enqueue(&self, task: BackgroundTask) {
        let name = task.name();
        if self.tx.try_send(task).is_err() {
            tracing::warn!(task = name, "Background task queue full, dropping task");
            metrics::record_task_outcome(name, "dropped");
        }
    }
}

/// Executes queued tasks until the channel closes or shutdown is
/// signalled. Each task runs in its own spawned task so a slow
/// summarization never blocks a title generation.
pub struct TaskRunner {
    rx: mpsc::Receiver<BackgroundTask>,
    summarizer: Arc<MemorySummarizer>,
    titler: Arc<TitleGenerator>,
    shutdown: CancellationToken,
}

impl TaskRunner {
    pub fn new(
        rx: mpsc::Receiver<BackgroundTask>,
        summarizer: Arc<MemorySummarizer>,
        titler: Arc<TitleGenerator>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            rx,
            summarizer,
            titler,
            shutdown,
        }
    }

    pub async fn run(mut self) {
        tracing::info!("Background task runner started");

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    tracing::info!("Background task runner shutting down");
                    break;
                }
                task = self.rx.recv() => {
                    match task {
                        Some(task) => {
                            let summarizer = self.summarizer.clone();
                            let titler = self.titler.clone();
                            tokio::spawn(async move {
                                run_task(summarizer, titler, task).await;
                            });
                        }
                        None => {
                            tracing::info!("Task channel closed, runner exiting");
                            break;
                        }
                    }
                }
            }
        }
    }
}

async fn run_task(
    summarizer: Arc<MemorySummarizer>,
    titler: Arc<TitleGenerator>,
    task: BackgroundTask,
) {
    let name = task.name();

    let outcome = match task {
        BackgroundTask::SummarizeMemory {
            chat_id,
            user_id,
            mentor_id,
        } => match summarizer.summarize(&chat_id, &user_id, &mentor_id).await {
            Ok(SummarizeOutcome::Updated { .. }) => TaskOutcome::Completed,
            Ok(SummarizeOutcome::Skipped(reason)) => TaskOutcome::Skipped(reason),
            Err(error) => TaskOutcome::Failed(error.to_string()),
        },
        BackgroundTask::GenerateTitle {
            chat_id,
            first_message,
        } => match titler.generate(&chat_id, &first_message).await {
            Ok(TitleOutcome::Updated(_)) => TaskOutcome::Completed,
            Ok(TitleOutcome::Skipped(reason)) => TaskOutcome::Skipped(reason),
            Err(error) => TaskOutcome::Failed(error.to_string()),
        },
    };

    match &outcome {
        TaskOutcome::Completed => tracing::info!(task = name, "Background task completed"),
        TaskOutcome::Skipped(reason) => {
            tracing::debug!(task = name, reason, "Background task skipped")
        }
        TaskOutcome::Failed(error) => {
            tracing::warn!(task = name, error = %error, "Background task failed")
        }
    }

    metrics::record_task_outcome(name, outcome.label());
}
