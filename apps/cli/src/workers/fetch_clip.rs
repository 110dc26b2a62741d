use std::{
    ffi::OsString,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use lyrireel_core::{ClipFetcher, LyrireelError};
use tokio::process::Command;
use tracing::debug;

use super::seconds_arg;

const DEFAULT_URL_TEMPLATE: &str = "https://www.youtube.com/watch?v={id}";

/// Cuts one time range out of a remote video with yt-dlp.
pub struct YtDlpFetcher {
    url_template: String,
}

impl YtDlpFetcher {
    pub fn new() -> Self {
        Self {
            url_template: DEFAULT_URL_TEMPLATE.to_string(),
        }
    }

    pub fn resource_url(&self, resource_id: &str) -> String {
        self.url_template.replace("{id}", resource_id)
    }

    pub fn build_args(
        &self,
        resource_id: &str,
        start_ms: u64,
        end_ms: u64,
        target_path: &Path,
    ) -> Vec<OsString> {
        let section = format!("*{}-{}", seconds_arg(start_ms), seconds_arg(end_ms));
        vec![
            self.resource_url(resource_id).into(),
            "--print".into(),
            "after_move:filepath".into(),
            "--extractor-args".into(),
            "youtube:player_client=android,web".into(),
            "-f".into(),
            "bv*[ext=mp4]/b[ext=mp4]/bv*/b".into(),
            "--download-sections".into(),
            section.into(),
            "--force-keyframes-at-cuts".into(),
            "--force-overwrites".into(),
            "--no-playlist".into(),
            "-o".into(),
            target_path.as_os_str().to_os_string(),
        ]
    }

    pub async fn download_section(
        &self,
        resource_id: &str,
        start_ms: u64,
        end_ms: u64,
        target_path: &Path,
    ) -> anyhow::Result<PathBuf> {
        let output = Command::new("yt-dlp")
            .args(self.build_args(resource_id, start_ms, end_ms, target_path))
            .output()
            .await?;

        if !output.status.success() {
            return Err(anyhow::anyhow!(
                "yt-dlp exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }

        let stdout_str = String::from_utf8_lossy(output.stdout.as_slice());
        let filepath = stdout_str.trim();
        if filepath.is_empty() {
            return Ok(target_path.to_path_buf());
        }
        Ok(filepath.into())
    }
}

impl Default for YtDlpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ClipFetcher for YtDlpFetcher {
    async fn fetch(
        &self,
        resource_id: &str,
        start_ms: u64,
        end_ms: u64,
        target_path: &Path,
    ) -> lyrireel_core::Result<PathBuf> {
        debug!(resource_id, start_ms, end_ms, target = %target_path.display(), "yt-dlp section");
        self.download_section(resource_id, start_ms, end_ms, target_path)
            .await
            .map_err(|e| LyrireelError::ClipFetchFailed {
                resource_id: resource_id.to_string(),
                reason: format!("{e:#}"),
            })
    }
}
