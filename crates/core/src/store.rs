use std::path::Path;

use serde::{Serialize, de::DeserializeOwned};
use tokio::fs;

use crate::{error::Result, render::RenderStats, types::Timeline};

async fn save_json<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    let pretty_json = serde_json::to_string_pretty(value)?;
    fs::write(path, &pretty_json).await?;
    Ok(())
}

async fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let json_content = fs::read_to_string(path).await?;
    Ok(serde_json::from_str(&json_content)?)
}

/// Save an assembled timeline to a file
pub async fn save_timeline(timeline: &Timeline, path: &Path) -> Result<()> {
    save_json(timeline, path).await
}

/// Load a timeline from a cached file
pub async fn load_timeline(path: &Path) -> Result<Timeline> {
    load_json(path).await
}

pub async fn save_stats(stats: &RenderStats, path: &Path) -> Result<()> {
    save_json(stats, path).await
}

pub async fn load_stats(path: &Path) -> Result<RenderStats> {
    load_json(path).await
}
