//! Bounded-concurrency batch execution.
//!
//! A fixed pool of workers pulls items from one shared queue. Each item runs
//! exactly once, a failing or panicking item only records its own outcome,
//! and `run` returns after every item has one. Items already started are
//! never cancelled.

use anyhow::anyhow;
use futures::FutureExt;
use futures::future::join_all;
use log::{debug, error};
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::progress::ProgressSink;
use super::report::{BatchReport, ItemOutcome};

#[derive(Debug, Clone, Copy)]
pub struct TaskExecutor {
    max_workers: usize,
}

impl Default for TaskExecutor {
    fn default() -> Self {
        Self::new(default_parallelism())
    }
}

impl TaskExecutor {
    /// `max_workers` of 0 is treated as 1
    pub fn new(max_workers: usize) -> Self {
        Self {
            max_workers: max_workers.max(1),
        }
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    pub async fn run<T, R, F, Fut>(&self, items: Vec<T>, task: F) -> BatchReport<R>
    where
        T: Send + 'static,
        R: Send + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<R>> + Send + 'static,
    {
        self.execute(items, task, None).await
    }

    pub async fn run_with_progress<T, R, F, Fut>(
        &self,
        items: Vec<T>,
        task: F,
        progress: Arc<dyn ProgressSink>,
    ) -> BatchReport<R>
    where
        T: Send + 'static,
        R: Send + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<R>> + Send + 'static,
    {
        self.execute(items, task, Some(progress)).await
    }

    async fn execute<T, R, F, Fut>(
        &self,
        items: Vec<T>,
        task: F,
        progress: Option<Arc<dyn ProgressSink>>,
    ) -> BatchReport<R>
    where
        T: Send + 'static,
        R: Send + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<R>> + Send + 'static,
    {
        let total = items.len();
        if total == 0 {
            return BatchReport::new(Vec::new());
        }

        let workers = self.max_workers.min(total);
        debug!("Running {} items on {} workers", total, workers);

        let queue = Arc::new(Mutex::new(items.into_iter().enumerate()));
        let task = Arc::new(task);
        let completed = Arc::new(AtomicUsize::new(0));

        let handles = (0..workers).map(|worker| {
            let queue = queue.clone();
            let task = task.clone();
            let completed = completed.clone();
            let progress = progress.clone();

            tokio::spawn(async move {
                let mut outcomes = Vec::new();
                loop {
                    let next = queue.lock().unwrap_or_else(|e| e.into_inner()).next();
                    let Some((index, item)) = next else {
                        break;
                    };

                    let task_ref = &*task;
                    let result = match AssertUnwindSafe(async move { task_ref(item).await })
                        .catch_unwind()
                        .await
                    {
                        Ok(result) => result,
                        Err(panic) => Err(anyhow!("task panicked: {}", panic_message(panic.as_ref()))),
                    };
                    if let Err(err) = &result {
                        debug!("worker {} item #{} failed: {:#}", worker, index, err);
                    }

                    let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                    if let Some(sink) = &progress {
                        sink.on_progress(done, total);
                    }
                    outcomes.push(ItemOutcome { index, result });
                }
                outcomes
            })
        });

        let mut slots: Vec<Option<anyhow::Result<R>>> = (0..total).map(|_| None).collect();
        for joined in join_all(handles).await {
            match joined {
                Ok(outcomes) => {
                    for outcome in outcomes {
                        slots[outcome.index] = Some(outcome.result);
                    }
                }
                Err(e) => error!("Batch worker terminated abnormally: {}", e),
            }
        }

        if let Some(sink) = &progress {
            sink.on_finish(total);
        }

        let outcomes = slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| ItemOutcome {
                index,
                result: slot.unwrap_or_else(|| Err(anyhow!("item did not run to completion"))),
            })
            .collect();
        BatchReport::new(outcomes)
    }
}

/// Run `task` over `items` with at most `max_workers` in flight
pub async fn run_batch<T, R, F, Fut>(items: Vec<T>, max_workers: usize, task: F) -> BatchReport<R>
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<R>> + Send + 'static,
{
    TaskExecutor::new(max_workers).run(items, task).await
}

pub fn default_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
