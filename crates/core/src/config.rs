use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::{
    error::{LyrireelError, Result},
    search::SearchBackendConfig,
};

/// Top-level configuration, loadable from a JSON file. Every field has a default.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub assembly: AssemblyConfig,
    pub scheduler: SchedulerConfig,
    pub render: RenderConfig,
    pub search: SearchBackendConfig,
}

impl Config {
    pub async fn load(path: &Path) -> Result<Config> {
        let json_content = fs::read_to_string(path).await?;
        let config: Config = serde_json::from_str(&json_content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.assembly.validate()?;
        self.scheduler.validate()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssemblyConfig {
    /// Segments longer than this are chopped into equal chunks.
    pub max_segment_ms: u64,
    /// Gaps up to this size are absorbed into the following line.
    pub small_gap_threshold_ms: u64,
    pub candidates_per_line: usize,
    pub search_limit: usize,
    pub continuity_bonus: f64,
    /// Credit lines shorter than this become fillers.
    pub credit_filler_max_ms: u64,
    /// How many filler queries random-fill may issue before giving up.
    pub random_fill_attempts: usize,
    pub random_seed: Option<u64>,
    pub filler_queries: Vec<String>,
    pub instrumental_query: String,
    pub outro_query: String,
    pub atmospheric_query: String,
    pub vary_split_prompts: bool,
}

impl Default for AssemblyConfig {
    fn default() -> Self {
        Self {
            max_segment_ms: 8_000,
            small_gap_threshold_ms: 500,
            candidates_per_line: 5,
            search_limit: 20,
            continuity_bonus: 0.15,
            credit_filler_max_ms: 4_000,
            random_fill_attempts: 3,
            random_seed: None,
            filler_queries: [
                "cinematic landscape",
                "city lights at night",
                "ocean waves",
                "clouds timelapse",
                "forest sunlight",
                "abstract light trails",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            instrumental_query: "instrumental music atmosphere".to_string(),
            outro_query: "sunset fade out ending".to_string(),
            atmospheric_query: "atmospheric cinematic scenery".to_string(),
            vary_split_prompts: true,
        }
    }
}

impl AssemblyConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_segment_ms == 0 {
            return Err(LyrireelError::InvalidConfig {
                reason: "assembly.max_segment_ms must be > 0".to_string(),
            });
        }
        if self.candidates_per_line == 0 || self.search_limit == 0 {
            return Err(LyrireelError::InvalidConfig {
                reason: "assembly.candidates_per_line and assembly.search_limit must be > 0"
                    .to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub max_parallelism: usize,
    pub per_video_limit: usize,
    pub max_retry: u32,
    pub backoff_base_ms: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_parallelism: 4,
            per_video_limit: 1,
            max_retry: 2,
            backoff_base_ms: 1_000,
        }
    }
}

impl SchedulerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_parallelism == 0 || self.per_video_limit == 0 {
            return Err(LyrireelError::InvalidConfig {
                reason: "scheduler.max_parallelism and scheduler.per_video_limit must be > 0"
                    .to_string(),
            });
        }
        Ok(())
    }

    /// Delay before retry number `attempt` (1-based): `base * 2^(attempt-1)`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        Duration::from_millis(self.backoff_base_ms.saturating_mul(1u64 << exponent))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Where cut clips are written. Empty means the job cache directory.
    pub clip_dir: Option<PathBuf>,
    /// Directory of local stock footage used before falling back to a placeholder.
    pub stock_dir: Option<PathBuf>,
    pub output_path: Option<PathBuf>,
}
