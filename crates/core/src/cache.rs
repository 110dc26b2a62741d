use std::{
    hash::{DefaultHasher, Hash, Hasher},
    path::{Path, PathBuf},
};

/// Get the cache directory for a given job key (usually the lines file path)
pub fn get_cache_dir(job_key: &str) -> PathBuf {
    let mut hasher = DefaultHasher::new();
    job_key.hash(&mut hasher);
    let key_hash = hasher.finish();

    get_root_cache_dir().join(key_hash.to_string())
}

pub fn get_root_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("lyrireel")
}

pub fn get_clip_dir(cache_dir: &Path) -> PathBuf {
    cache_dir.join("clips")
}

pub fn get_timeline_path(cache_dir: &Path) -> PathBuf {
    cache_dir.join("timeline.json")
}

pub fn get_stats_path(cache_dir: &Path) -> PathBuf {
    cache_dir.join("render_stats.json")
}

pub fn get_output_path(cache_dir: &Path) -> PathBuf {
    cache_dir.join("output.mp4")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_key_same_dir() {
        assert_eq!(get_cache_dir("song.lrc"), get_cache_dir("song.lrc"));
        assert_ne!(get_cache_dir("a.lrc"), get_cache_dir("b.lrc"));
    }
}
