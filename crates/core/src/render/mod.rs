pub mod stats;
pub mod worker;

use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Instant,
};

use tokio::fs;
use tracing::{error, info, warn};
use uuid::Uuid;

pub use stats::RenderStats;
pub use worker::{CandidateFallbackWorker, InflightGauge};

use crate::{
    config::SchedulerConfig,
    error::{LyrireelError, Result},
    media::{ClipFetcher, ClipSubstitutes, Encoder, EncoderInput},
    queues::CancelToken,
    scheduler::{ClipScheduler, FinishedHook},
    types::{ClipDownloadResult, ClipDownloadTask, ClipStatus, Timeline},
};

#[derive(Debug)]
pub struct RenderOutcome {
    pub job_id: Uuid,
    /// One result per timeline line, in timeline order.
    pub results: Vec<ClipDownloadResult>,
    pub stats: RenderStats,
    pub output: PathBuf,
}

/// Turns a timeline into an encoded video.
///
/// Every line with candidates becomes one scheduler task. A task that
/// exhausts its candidates and retries, and a line that never had any
/// candidates, is substituted with local stock footage or else a placeholder
/// so the output stays continuous. The render only fails when a substitute
/// cannot be produced either.
pub struct RenderPipeline<F, X, E> {
    fetcher: Arc<F>,
    substitutes: X,
    encoder: E,
    scheduler: SchedulerConfig,
    clip_dir: PathBuf,
    on_finished: Option<FinishedHook>,
}

impl<F, X, E> RenderPipeline<F, X, E>
where
    F: ClipFetcher + 'static,
    X: ClipSubstitutes,
    E: Encoder,
{
    pub fn new(
        fetcher: F,
        substitutes: X,
        encoder: E,
        scheduler: SchedulerConfig,
        clip_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            fetcher: Arc::new(fetcher),
            substitutes,
            encoder,
            scheduler,
            clip_dir: clip_dir.into(),
            on_finished: None,
        }
    }

    /// Hook invoked once per finished scheduler task, e.g. for a progress bar.
    pub fn on_finished(mut self, hook: FinishedHook) -> Self {
        self.on_finished = Some(hook);
        self
    }

    pub fn clip_path(&self, index: usize) -> PathBuf {
        self.clip_dir.join(format!("clip_{index:04}.mp4"))
    }

    /// One task per resolved line; indices of lines without candidates are
    /// returned separately.
    pub fn build_tasks(&self, timeline: &Timeline) -> (Vec<ClipDownloadTask>, Vec<usize>) {
        let mut tasks = Vec::with_capacity(timeline.lines.len());
        let mut unresolved = Vec::new();
        for (index, line) in timeline.lines.iter().enumerate() {
            match ClipDownloadTask::from_line(index, line, self.clip_path(index)) {
                Some(task) => tasks.push(task),
                None => unresolved.push(index),
            }
        }
        (tasks, unresolved)
    }

    pub async fn render(
        &self,
        timeline: &Timeline,
        output: &Path,
        cancel: &CancelToken,
    ) -> Result<RenderOutcome> {
        let started = Instant::now();
        let job_id = Uuid::new_v4();
        fs::create_dir_all(&self.clip_dir).await?;

        let (tasks, unresolved) = self.build_tasks(timeline);
        info!(
            %job_id,
            tasks = tasks.len(),
            unresolved = unresolved.len(),
            "render started"
        );

        let gauge = Arc::new(InflightGauge::new());
        let worker = Arc::new(CandidateFallbackWorker::new(
            Arc::clone(&self.fetcher),
            Arc::clone(&gauge),
        ));
        let mut scheduler = ClipScheduler::new(self.scheduler.clone());
        if let Some(hook) = &self.on_finished {
            scheduler = scheduler.on_finished(Arc::clone(hook));
        }

        let mut results = scheduler.run(tasks, worker, cancel).await;
        if cancel.is_cancelled() {
            warn!(%job_id, "render cancelled");
            return Err(LyrireelError::Cancelled);
        }

        for index in unresolved {
            let line = &timeline.lines[index];
            let task = ClipDownloadTask {
                index,
                resource_id: String::new(),
                start_ms: line.start_ms,
                end_ms: line.end_ms,
                target_path: self.clip_path(index),
                attempts: 0,
                text: line.text.clone(),
                candidates: Vec::new(),
                backoff_history_ms: Vec::new(),
            };
            results.push(ClipDownloadResult {
                task,
                status: ClipStatus::Failed,
                path: None,
                error: Some("no candidates".to_string()),
                duration_ms: None,
                source: None,
            });
        }

        for result in results.iter_mut() {
            if result.status == ClipStatus::Failed {
                let duration_ms = timeline.lines[result.task.index].duration_ms();
                self.substitute(result, duration_ms).await?;
            }
        }

        results.sort_by_key(|r| r.task.index);

        let inputs: Vec<EncoderInput> = results
            .iter()
            .filter_map(|r| {
                let path = r.path.clone()?;
                let (resource_id, start_ms, end_ms) = match &r.source {
                    Some(src) => (src.resource_id.clone(), src.start_ms, src.end_ms),
                    None => (String::new(), 0, r.duration_ms.unwrap_or_default()),
                };
                Some(EncoderInput {
                    path,
                    resource_id,
                    start_ms,
                    end_ms,
                    text: timeline.lines[r.task.index].text.clone(),
                })
            })
            .collect();

        let output = self.encoder.encode(&inputs, output).await?;
        let stats = RenderStats::from_results(job_id, &results, gauge.peak(), started.elapsed());
        info!(
            %job_id,
            succeeded = stats.succeeded,
            fallback_local = stats.fallback_local,
            fallback_placeholder = stats.fallback_placeholder,
            retries = stats.retries,
            peak_parallelism = stats.peak_parallelism,
            wall_time_ms = stats.wall_time_ms,
            "render finished"
        );

        Ok(RenderOutcome {
            job_id,
            results,
            stats,
            output,
        })
    }

    async fn substitute(&self, result: &mut ClipDownloadResult, duration_ms: u64) -> Result<()> {
        let index = result.task.index;
        let target = result.task.target_path.clone();
        let last_error = result.error.clone().unwrap_or_default();

        match self.substitutes.local(index, duration_ms, &target).await {
            Ok(Some(path)) => {
                warn!(index, error = %last_error, "clip replaced with local stock footage");
                result.status = ClipStatus::FallbackLocal;
                result.path = Some(path);
                result.duration_ms = Some(duration_ms);
                return Ok(());
            }
            Ok(None) => {}
            Err(e) => warn!(index, error = %e, "local stock footage unavailable"),
        }

        match self.substitutes.placeholder(duration_ms, &target).await {
            Ok(path) => {
                warn!(index, error = %last_error, "clip replaced with placeholder");
                result.status = ClipStatus::FallbackPlaceholder;
                result.path = Some(path);
                result.duration_ms = Some(duration_ms);
                Ok(())
            }
            Err(e) => {
                error!(index, error = %e, "placeholder generation failed");
                Err(LyrireelError::AllCandidatesExhausted {
                    index,
                    attempts: result.task.attempts,
                    reason: format!("{last_error}; placeholder: {e}"),
                })
            }
        }
    }
}
