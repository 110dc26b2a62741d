use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use tracing::{debug, info};

use crate::{
    error::{LyrireelError, Result},
    media::ClipFetcher,
    scheduler::{ClipOutput, ClipWorker},
    types::{Candidate, ClipDownloadTask, ClipSource},
};

/// Tracks how many attempts are running right now and the highest count seen.
#[derive(Debug, Default)]
pub struct InflightGauge {
    current: AtomicUsize,
    peak: AtomicUsize,
}

pub struct InflightGuard<'a> {
    gauge: &'a InflightGauge,
}

impl InflightGauge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enter(&self) -> InflightGuard<'_> {
        let now = self.current.fetch_add(1, Ordering::AcqRel) + 1;
        self.peak.fetch_max(now, Ordering::AcqRel);
        InflightGuard { gauge: self }
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::Acquire)
    }
}

impl Drop for InflightGuard<'_> {
    fn drop(&mut self) {
        self.gauge.current.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Tries the task's candidates in score order within a single attempt.
/// Only when every candidate fails does the attempt count as failed.
pub struct CandidateFallbackWorker<F> {
    fetcher: Arc<F>,
    gauge: Arc<InflightGauge>,
}

impl<F: ClipFetcher> CandidateFallbackWorker<F> {
    pub fn new(fetcher: Arc<F>, gauge: Arc<InflightGauge>) -> Self {
        Self { fetcher, gauge }
    }
}

#[async_trait]
impl<F: ClipFetcher> ClipWorker for CandidateFallbackWorker<F> {
    async fn run(&self, task: &ClipDownloadTask) -> Result<ClipOutput> {
        let _inflight = self.gauge.enter();

        let primary = Candidate::new(&task.resource_id, task.start_ms, task.end_ms, 0.0);
        let candidates: &[Candidate] = if task.candidates.is_empty() {
            std::slice::from_ref(&primary)
        } else {
            &task.candidates
        };

        let mut failures = Vec::with_capacity(candidates.len());
        for (rank, candidate) in candidates.iter().enumerate() {
            match self
                .fetcher
                .fetch(
                    &candidate.resource_id,
                    candidate.start_ms,
                    candidate.end_ms,
                    &task.target_path,
                )
                .await
            {
                Ok(path) => {
                    if rank > 0 {
                        info!(
                            index = task.index,
                            rank,
                            resource_id = %candidate.resource_id,
                            "clip served by alternate candidate"
                        );
                    }
                    return Ok(ClipOutput {
                        path,
                        source: ClipSource::from(candidate),
                    });
                }
                Err(e) => {
                    debug!(
                        index = task.index,
                        rank,
                        resource_id = %candidate.resource_id,
                        error = %e,
                        "candidate fetch failed"
                    );
                    failures.push(format!("{}: {e}", candidate.resource_id));
                }
            }
        }

        Err(LyrireelError::ClipFetchFailed {
            resource_id: task.resource_id.clone(),
            reason: failures.join("; "),
        })
    }
}
