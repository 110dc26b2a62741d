use std::{
    collections::HashMap,
    path::PathBuf,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

use crate::{
    config::SchedulerConfig,
    error::Result,
    queues::{CancelToken, TaskQueue},
    types::{ClipDownloadResult, ClipDownloadTask, ClipSource, ClipStatus},
};

/// What a worker produced for one task attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct ClipOutput {
    pub path: PathBuf,
    pub source: ClipSource,
}

/// Executes one attempt of a task. Errors are retried by the scheduler.
#[async_trait]
pub trait ClipWorker: Send + Sync {
    async fn run(&self, task: &ClipDownloadTask) -> Result<ClipOutput>;
}

pub type FinishedHook = Arc<dyn Fn(&ClipDownloadResult) + Send + Sync>;

/// Bounded worker pool with a per-resource concurrency cap and retry with
/// exponential backoff.
///
/// `max_parallelism` workers drain one shared queue. Each attempt holds a
/// permit from a semaphore created lazily per `resource_id`. A failed
/// attempt is retried while `attempts <= max_retry`, after sleeping
/// `backoff_base * 2^(attempts-1)`. Exactly one result is produced per task,
/// in completion order.
pub struct ClipScheduler {
    config: SchedulerConfig,
    on_finished: Option<FinishedHook>,
}

struct Shared {
    queue: TaskQueue<ClipDownloadTask>,
    results: Mutex<Vec<ClipDownloadResult>>,
    semaphores: Mutex<HashMap<String, Arc<Semaphore>>>,
    config: SchedulerConfig,
    cancel: CancelToken,
    on_finished: Option<FinishedHook>,
}

impl Shared {
    fn semaphore_for(&self, resource_id: &str) -> Arc<Semaphore> {
        let mut map = self.semaphores.lock().expect("semaphore map poisoned");
        Arc::clone(
            map.entry(resource_id.to_string())
                .or_insert_with(|| Arc::new(Semaphore::new(self.config.per_video_limit))),
        )
    }

    fn finish(&self, result: ClipDownloadResult) {
        if let Some(hook) = &self.on_finished {
            hook(&result);
        }
        self.results
            .lock()
            .expect("results poisoned")
            .push(result);
        self.queue.complete_one();
    }
}

/// Holds a dequeued task until it is finished or requeued. If the worker
/// unwinds while holding it, the task is reported failed so the queue still
/// drains.
struct TaskSlot<'a> {
    shared: &'a Shared,
    task: Option<ClipDownloadTask>,
}

impl<'a> TaskSlot<'a> {
    fn new(shared: &'a Shared, task: ClipDownloadTask) -> Self {
        Self {
            shared,
            task: Some(task),
        }
    }

    fn task(&self) -> &ClipDownloadTask {
        self.task.as_ref().expect("task slot is empty")
    }

    fn task_mut(&mut self) -> &mut ClipDownloadTask {
        self.task.as_mut().expect("task slot is empty")
    }

    fn take(&mut self) -> ClipDownloadTask {
        self.task.take().expect("task slot is empty")
    }

    fn succeed(mut self, output: ClipOutput) {
        let task = self.take();
        self.shared.finish(ClipDownloadResult {
            task,
            status: ClipStatus::Success,
            path: Some(output.path),
            error: None,
            duration_ms: Some(output.source.duration_ms()),
            source: Some(output.source),
        });
    }

    fn fail(mut self, error: String) {
        let task = self.take();
        self.shared.finish(failed(task, error));
    }

    fn requeue(mut self) {
        let task = self.take();
        self.shared.queue.requeue(task);
    }
}

impl Drop for TaskSlot<'_> {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            error!(index = task.index, "clip worker unwound while holding task");
            self.shared
                .finish(failed(task, "worker panicked".to_string()));
        }
    }
}

fn failed(task: ClipDownloadTask, error: String) -> ClipDownloadResult {
    ClipDownloadResult {
        task,
        status: ClipStatus::Failed,
        path: None,
        error: Some(error),
        duration_ms: None,
        source: None,
    }
}

impl ClipScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            on_finished: None,
        }
    }

    /// Called once per task with its final result, from the worker that
    /// finished it.
    pub fn on_finished(mut self, hook: FinishedHook) -> Self {
        self.on_finished = Some(hook);
        self
    }

    pub async fn run<W: ClipWorker + 'static>(
        &self,
        tasks: Vec<ClipDownloadTask>,
        worker: Arc<W>,
        cancel: &CancelToken,
    ) -> Vec<ClipDownloadResult> {
        let task_count = tasks.len();
        if task_count == 0 {
            return Vec::new();
        }

        let shared = Arc::new(Shared {
            queue: TaskQueue::new(tasks),
            results: Mutex::new(Vec::with_capacity(task_count)),
            semaphores: Mutex::new(HashMap::new()),
            config: self.config.clone(),
            cancel: cancel.clone(),
            on_finished: self.on_finished.clone(),
        });

        let worker_count = self.config.max_parallelism.clamp(1, task_count);
        info!(
            tasks = task_count,
            workers = worker_count,
            per_video_limit = self.config.per_video_limit,
            max_retry = self.config.max_retry,
            "clip scheduler started"
        );

        let handles: Vec<_> = (0..worker_count)
            .map(|worker_id| {
                tokio::spawn(worker_loop(
                    worker_id,
                    Arc::clone(&shared),
                    Arc::clone(&worker),
                ))
            })
            .collect();

        for handle in handles {
            if let Err(e) = handle.await {
                error!(error = %e, "clip scheduler worker aborted");
            }
        }

        let results = std::mem::take(&mut *shared.results.lock().expect("results poisoned"));
        info!(results = results.len(), "clip scheduler drained");
        results
    }
}

async fn worker_loop<W: ClipWorker>(worker_id: usize, shared: Arc<Shared>, worker: Arc<W>) {
    while let Some(task) = shared.queue.next().await {
        let mut slot = TaskSlot::new(&shared, task);

        if shared.cancel.is_cancelled() {
            slot.fail("cancelled".to_string());
            continue;
        }

        let semaphore = shared.semaphore_for(&slot.task().resource_id);
        let permit = tokio::select! {
            permit = semaphore.acquire_owned() => permit.ok(),
            _ = shared.cancel.cancelled() => None,
        };
        let Some(permit) = permit else {
            slot.fail("cancelled".to_string());
            continue;
        };
        if shared.cancel.is_cancelled() {
            drop(permit);
            slot.fail("cancelled".to_string());
            continue;
        }

        slot.task_mut().attempts += 1;
        let attempts = slot.task().attempts;
        debug!(
            worker_id,
            index = slot.task().index,
            resource_id = %slot.task().resource_id,
            attempts,
            "clip attempt started"
        );

        let outcome = worker.run(slot.task()).await;
        drop(permit);

        match outcome {
            Ok(output) => slot.succeed(output),
            Err(e) if attempts <= shared.config.max_retry => {
                let delay = shared.config.backoff(attempts);
                warn!(
                    index = slot.task().index,
                    attempts,
                    backoff_ms = delay.as_millis() as u64,
                    error = %e,
                    "clip attempt failed, retrying"
                );
                slot.task_mut()
                    .backoff_history_ms
                    .push(delay.as_millis() as u64);

                let cancelled = tokio::select! {
                    _ = tokio::time::sleep(delay) => false,
                    _ = shared.cancel.cancelled() => true,
                };
                if cancelled {
                    slot.fail(format!("cancelled during backoff after: {e}"));
                } else {
                    slot.requeue();
                }
            }
            Err(e) => {
                error!(
                    index = slot.task().index,
                    attempts,
                    error = %e,
                    "clip failed after all retries"
                );
                slot.fail(e.to_string());
            }
        }
    }
    debug!(worker_id, "clip worker exited");
}
