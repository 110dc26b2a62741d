use std::{
    ffi::OsString,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use lyrireel_core::{ClipSubstitutes, LyrireelError};
use tokio::fs;
use tracing::debug;

use super::{run_ffmpeg, seconds_arg};

const STOCK_EXTENSIONS: [&str; 4] = ["mp4", "mov", "mkv", "webm"];

/// Local stock footage and generated placeholders via ffmpeg.
pub struct FfmpegSubstitutes {
    stock_dir: Option<PathBuf>,
    size: String,
    fps: u32,
}

impl FfmpegSubstitutes {
    pub fn new(stock_dir: Option<PathBuf>) -> Self {
        Self {
            stock_dir,
            size: "1280x720".to_string(),
            fps: 30,
        }
    }

    /// Video files in the stock directory, sorted so the pick per index is stable.
    async fn stock_files(&self) -> anyhow::Result<Vec<PathBuf>> {
        let Some(dir) = &self.stock_dir else {
            return Ok(Vec::new());
        };
        let mut entries = fs::read_dir(dir).await?;
        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let is_video = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| STOCK_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()));
            if is_video {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    pub fn stock_args(&self, source: &Path, duration_ms: u64, target_path: &Path) -> Vec<OsString> {
        vec![
            "-y".into(),
            "-stream_loop".into(),
            "-1".into(),
            "-i".into(),
            source.as_os_str().to_os_string(),
            "-t".into(),
            seconds_arg(duration_ms).into(),
            "-an".into(),
            "-vf".into(),
            format!("scale={},fps={}", self.size.replace('x', ":"), self.fps).into(),
            "-c:v".into(),
            "libx264".into(),
            "-pix_fmt".into(),
            "yuv420p".into(),
            target_path.as_os_str().to_os_string(),
        ]
    }

    pub fn placeholder_args(&self, duration_ms: u64, target_path: &Path) -> Vec<OsString> {
        vec![
            "-y".into(),
            "-f".into(),
            "lavfi".into(),
            "-i".into(),
            format!(
                "color=c=black:s={}:r={}:d={}",
                self.size,
                self.fps,
                seconds_arg(duration_ms)
            )
            .into(),
            "-c:v".into(),
            "libx264".into(),
            "-pix_fmt".into(),
            "yuv420p".into(),
            target_path.as_os_str().to_os_string(),
        ]
    }
}

#[async_trait]
impl ClipSubstitutes for FfmpegSubstitutes {
    async fn local(
        &self,
        index: usize,
        duration_ms: u64,
        target_path: &Path,
    ) -> lyrireel_core::Result<Option<PathBuf>> {
        let files = self.stock_files().await.map_err(|e| LyrireelError::ClipFetchFailed {
            resource_id: "stock".to_string(),
            reason: format!("{e:#}"),
        })?;
        if files.is_empty() {
            return Ok(None);
        }

        let source = &files[index % files.len()];
        debug!(index, source = %source.display(), "cutting stock footage");
        run_ffmpeg(&self.stock_args(source, duration_ms, target_path))
            .await
            .map_err(|e| LyrireelError::ClipFetchFailed {
                resource_id: source.display().to_string(),
                reason: format!("{e:#}"),
            })?;
        Ok(Some(target_path.to_path_buf()))
    }

    async fn placeholder(
        &self,
        duration_ms: u64,
        target_path: &Path,
    ) -> lyrireel_core::Result<PathBuf> {
        run_ffmpeg(&self.placeholder_args(duration_ms, target_path))
            .await
            .map_err(|e| LyrireelError::PlaceholderFailed {
                target: target_path.to_path_buf(),
                reason: format!("{e:#}"),
            })?;
        Ok(target_path.to_path_buf())
    }
}
