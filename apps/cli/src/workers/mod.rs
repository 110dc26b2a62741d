pub mod encode_video;
pub mod fetch_clip;
pub mod substitute_clip;

use std::ffi::OsString;

use tokio::process::Command;

pub use encode_video::{FfmpegConcatEncoder, probe_duration_ms};
pub use fetch_clip::YtDlpFetcher;
pub use substitute_clip::FfmpegSubstitutes;

/// Seconds with millisecond precision, as ffmpeg and yt-dlp expect them.
pub fn seconds_arg(ms: u64) -> String {
    format!("{}.{:03}", ms / 1000, ms % 1000)
}

/// Run ffmpeg with the given arguments, surfacing stderr on failure.
pub async fn run_ffmpeg(args: &[OsString]) -> anyhow::Result<()> {
    let output = Command::new("ffmpeg")
        .arg("-hide_banner")
        .arg("-loglevel")
        .arg("error")
        .args(args)
        .output()
        .await?;

    if !output.status.success() {
        return Err(anyhow::anyhow!(
            "ffmpeg exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        ));
    }
    Ok(())
}
