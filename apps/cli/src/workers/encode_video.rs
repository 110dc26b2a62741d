use std::{
    ffi::OsString,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use lyrireel_core::{Encoder, EncoderInput, LyrireelError};
use tokio::{fs, process::Command};
use tracing::info;

use super::run_ffmpeg;

/// Concatenates clips in order with ffmpeg's concat demuxer, optionally
/// laying the song's audio underneath.
pub struct FfmpegConcatEncoder {
    audio: Option<PathBuf>,
}

impl FfmpegConcatEncoder {
    pub fn new(audio: Option<PathBuf>) -> Self {
        Self { audio }
    }

    pub fn concat_list(clips: &[EncoderInput]) -> String {
        clips
            .iter()
            .map(|clip| {
                let path = clip.path.to_string_lossy().replace('\'', r"'\''");
                format!("file '{path}'\n")
            })
            .collect()
    }

    pub fn build_args(&self, list_path: &Path, output: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "-y".into(),
            "-f".into(),
            "concat".into(),
            "-safe".into(),
            "0".into(),
            "-i".into(),
            list_path.as_os_str().to_os_string(),
        ];
        if let Some(audio) = &self.audio {
            args.extend([
                "-i".into(),
                audio.as_os_str().to_os_string(),
                "-map".into(),
                "0:v:0".into(),
                "-map".into(),
                "1:a:0".into(),
                "-c:a".into(),
                "aac".into(),
                "-shortest".into(),
            ]);
        }
        args.extend([
            "-c:v".into(),
            "libx264".into(),
            "-pix_fmt".into(),
            "yuv420p".into(),
            output.as_os_str().to_os_string(),
        ]);
        args
    }

    async fn concat(&self, clips: &[EncoderInput], output: &Path) -> anyhow::Result<PathBuf> {
        if clips.is_empty() {
            return Err(anyhow::anyhow!("no clips to encode"));
        }
        if let Some(parent) = output.parent() {
            fs::create_dir_all(parent).await?;
        }
        let list_path = output.with_extension("concat.txt");
        fs::write(&list_path, Self::concat_list(clips)).await?;

        run_ffmpeg(&self.build_args(&list_path, output)).await?;
        info!(clips = clips.len(), output = %output.display(), "video encoded");
        Ok(output.to_path_buf())
    }
}

#[async_trait]
impl Encoder for FfmpegConcatEncoder {
    async fn encode(
        &self,
        clips: &[EncoderInput],
        output: &Path,
    ) -> lyrireel_core::Result<PathBuf> {
        self.concat(clips, output)
            .await
            .map_err(|e| LyrireelError::EncodeFailed {
                output: output.to_path_buf(),
                reason: format!("{e:#}"),
            })
    }
}

/// Media duration in milliseconds, read with ffprobe.
pub async fn probe_duration_ms(path: &Path) -> anyhow::Result<u64> {
    let output = Command::new("ffprobe")
        .arg("-v")
        .arg("error")
        .arg("-show_entries")
        .arg("format=duration")
        .arg("-of")
        .arg("csv=p=0")
        .arg(path)
        .output()
        .await?;

    if !output.status.success() {
        return Err(anyhow::anyhow!(
            "ffprobe failed for {}: {}",
            path.display(),
            String::from_utf8_lossy(&output.stderr).trim()
        ));
    }

    let seconds: f64 = String::from_utf8_lossy(&output.stdout).trim().parse()?;
    Ok((seconds * 1000.0).round() as u64)
}
