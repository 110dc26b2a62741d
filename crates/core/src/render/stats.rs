use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{ClipDownloadResult, ClipStatus};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RenderStats {
    pub job_id: Uuid,
    pub total_tasks: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub fallback_local: usize,
    pub fallback_placeholder: usize,
    /// Attempts beyond the first, summed over all tasks.
    pub retries: u32,
    pub peak_parallelism: usize,
    pub total_clip_duration_ms: u64,
    pub wall_time_ms: u64,
    /// `(index, duration_ms)` per clip, in timeline order.
    pub clip_durations_ms: Vec<(usize, u64)>,
}

impl RenderStats {
    pub fn from_results(
        job_id: Uuid,
        results: &[ClipDownloadResult],
        peak_parallelism: usize,
        wall_time: Duration,
    ) -> Self {
        let mut stats = RenderStats {
            job_id,
            total_tasks: results.len(),
            peak_parallelism,
            wall_time_ms: wall_time.as_millis() as u64,
            ..Default::default()
        };

        for result in results {
            match result.status {
                ClipStatus::Success => stats.succeeded += 1,
                ClipStatus::Failed => stats.failed += 1,
                ClipStatus::FallbackLocal => stats.fallback_local += 1,
                ClipStatus::FallbackPlaceholder => stats.fallback_placeholder += 1,
            }
            stats.retries += result.task.attempts.saturating_sub(1);
            if let Some(duration) = result.duration_ms {
                stats.total_clip_duration_ms += duration;
                stats.clip_durations_ms.push((result.task.index, duration));
            }
        }
        stats.clip_durations_ms.sort_by_key(|(index, _)| *index);
        stats
    }

    pub fn substituted(&self) -> usize {
        self.fallback_local + self.fallback_placeholder
    }
}
