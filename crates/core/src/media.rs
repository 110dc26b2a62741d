//! Boundaries to the media tooling. The core never spawns processes itself;
//! the CLI provides yt-dlp/ffmpeg backed implementations.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Fetches `[start_ms, end_ms)` of a resource into `target_path`.
///
/// May be called several times for the same target; each call must
/// overwrite whatever a previous attempt left behind.
#[async_trait]
pub trait ClipFetcher: Send + Sync {
    async fn fetch(
        &self,
        resource_id: &str,
        start_ms: u64,
        end_ms: u64,
        target_path: &Path,
    ) -> Result<PathBuf>;
}

/// Stand-ins for clips that could not be materialized.
#[async_trait]
pub trait ClipSubstitutes: Send + Sync {
    /// A clip cut from local stock footage, if any is configured.
    async fn local(
        &self,
        index: usize,
        duration_ms: u64,
        target_path: &Path,
    ) -> Result<Option<PathBuf>>;

    /// A generated placeholder of exactly `duration_ms`.
    async fn placeholder(&self, duration_ms: u64, target_path: &Path) -> Result<PathBuf>;
}

/// One entry of the ordered concat list handed to the encoder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncoderInput {
    pub path: PathBuf,
    pub resource_id: String,
    pub start_ms: u64,
    pub end_ms: u64,
    pub text: String,
}

#[async_trait]
pub trait Encoder: Send + Sync {
    async fn encode(&self, clips: &[EncoderInput], output: &Path) -> Result<PathBuf>;
}
