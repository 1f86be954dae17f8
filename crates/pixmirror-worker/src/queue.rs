//! Batch queue: concurrency cap, inter-task delay, and result collection.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use pixmirror_core::models::{BatchConfig, UploadResult, UploadTask};
use pixmirror_core::AppError;
use pixmirror_services::DualUploader;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;
use tokio::time::sleep;

/// Bounded-concurrency task queue with a fixed delay between dispatches.
///
/// At most `max_concurrent` tasks run at once; permits are granted in
/// submission order. After each completion the occupied slot is held for
/// `inter_task_delay` before the next queued task can start, so the delay
/// throttles throughput while the semaphore caps concurrency. A failed
/// task is logged and omitted from the results; results are collected in
/// completion order, not submission order.
pub struct UploadQueue<T> {
    semaphore: Arc<Semaphore>,
    inter_task_delay: Duration,
    results: Arc<Mutex<Vec<T>>>,
    tasks: JoinSet<()>,
}

impl<T: Send + 'static> UploadQueue<T> {
    pub fn new(max_concurrent: usize, inter_task_delay: Duration) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent.max(1))),
            inter_task_delay,
            results: Arc::new(Mutex::new(Vec::new())),
            tasks: JoinSet::new(),
        }
    }

    pub fn from_config(config: &BatchConfig) -> Self {
        Self::new(config.max_concurrent, config.inter_task_delay)
    }

    /// Enqueue a task. The queue self-drives: the task starts as soon as a
    /// slot is free, without the caller pumping anything.
    pub fn add<F>(&mut self, task: F)
    where
        F: Future<Output = Result<T, AppError>> + Send + 'static,
    {
        let semaphore = self.semaphore.clone();
        let results = self.results.clone();
        let delay = self.inter_task_delay;
        self.tasks.spawn(async move {
            // The semaphore is never closed, so acquire cannot fail.
            let Ok(_permit) = semaphore.acquire_owned().await else {
                return;
            };
            match task.await {
                Ok(result) => results.lock().await.push(result),
                Err(error) => {
                    tracing::warn!(error = %error, "Batch task failed, omitting its result");
                }
            }
            // Hold the slot through the delay so the next dispatch is
            // spaced out even when a free worker is waiting.
            if !delay.is_zero() {
                sleep(delay).await;
            }
        });
    }

    /// Wait until the pending list is empty and nothing is in flight, then
    /// return every collected result in completion order.
    pub async fn wait_for_all(mut self) -> Vec<T> {
        while self.tasks.join_next().await.is_some() {}
        let mut results = self.results.lock().await;
        std::mem::take(&mut *results)
    }
}

/// Feeds a list of upload tasks through the dual-service orchestrator.
pub struct BatchUploader {
    uploader: Arc<DualUploader>,
    config: BatchConfig,
}

impl BatchUploader {
    pub fn new(uploader: Arc<DualUploader>, config: BatchConfig) -> Self {
        Self { uploader, config }
    }

    /// Upload every image, at most `max_concurrent` at a time. Failed
    /// tasks are dropped from the output (bulkhead isolation), so the
    /// result list can be shorter than the input.
    pub async fn upload_all(&self, tasks: Vec<UploadTask>) -> Vec<UploadResult> {
        let submitted = tasks.len();
        let mut queue = UploadQueue::from_config(&self.config);
        for task in tasks {
            let uploader = self.uploader.clone();
            queue.add(async move { uploader.upload(task.data, &task.name).await });
        }
        let results = queue.wait_for_all().await;
        tracing::info!(
            submitted,
            completed = results.len(),
            "Batch upload finished"
        );
        results
    }
}
