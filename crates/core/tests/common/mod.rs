#![allow(dead_code)]

use std::{
    collections::{HashMap, HashSet},
    path::{Path, PathBuf},
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use lyrireel_core::{
    Candidate, ClipDownloadTask, ClipFetcher, ClipOutput, ClipSource, ClipSubstitutes,
    ClipWorker, Encoder, EncoderInput, LyrireelError, Result, SearchCollaborator,
};

pub fn candidate(resource: &str, start_ms: u64, end_ms: u64, score: f64) -> Candidate {
    Candidate::new(resource, start_ms, end_ms, score)
}

pub fn task(index: usize, resource: &str) -> ClipDownloadTask {
    ClipDownloadTask {
        index,
        resource_id: resource.to_string(),
        start_ms: 0,
        end_ms: 1000,
        target_path: PathBuf::from(format!("/tmp/clip_{index}.mp4")),
        attempts: 0,
        text: format!("line {index}"),
        candidates: vec![candidate(resource, 0, 1000, 1.0)],
        backoff_history_ms: Vec::new(),
    }
}

/// Search backend that always fails.
pub struct DownSearch;

#[async_trait]
impl SearchCollaborator for DownSearch {
    fn name(&self) -> &str {
        "down"
    }

    async fn search(&self, _query: &str, _limit: usize) -> Result<Vec<Candidate>> {
        Err(LyrireelError::SearchUnavailable {
            backend: "down".to_string(),
            reason: "connection refused".to_string(),
        })
    }
}

/// Counts concurrent executions overall and per resource.
#[derive(Default)]
pub struct ConcurrencyProbe {
    current: AtomicUsize,
    peak: AtomicUsize,
    per_resource: Mutex<HashMap<String, (usize, usize)>>,
}

impl ConcurrencyProbe {
    pub fn enter(&self, resource: &str) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        let mut map = self.per_resource.lock().unwrap();
        let entry = map.entry(resource.to_string()).or_insert((0, 0));
        entry.0 += 1;
        entry.1 = entry.1.max(entry.0);
    }

    pub fn exit(&self, resource: &str) {
        self.current.fetch_sub(1, Ordering::SeqCst);
        let mut map = self.per_resource.lock().unwrap();
        if let Some(entry) = map.get_mut(resource) {
            entry.0 -= 1;
        }
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn peak_for(&self, resource: &str) -> usize {
        self.per_resource
            .lock()
            .unwrap()
            .get(resource)
            .map(|e| e.1)
            .unwrap_or(0)
    }
}

/// Worker that sleeps for a fixed time and fails a scripted number of times
/// per task index before succeeding.
pub struct ScriptedWorker {
    pub delay: Duration,
    pub failures_before_success: HashMap<usize, u32>,
    pub calls: Mutex<HashMap<usize, u32>>,
    pub probe: ConcurrencyProbe,
}

impl ScriptedWorker {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            failures_before_success: HashMap::new(),
            calls: Mutex::new(HashMap::new()),
            probe: ConcurrencyProbe::default(),
        }
    }

    pub fn failing(mut self, index: usize, times: u32) -> Self {
        self.failures_before_success.insert(index, times);
        self
    }

    pub fn calls_for(&self, index: usize) -> u32 {
        self.calls.lock().unwrap().get(&index).copied().unwrap_or(0)
    }
}

#[async_trait]
impl ClipWorker for ScriptedWorker {
    async fn run(&self, task: &ClipDownloadTask) -> Result<ClipOutput> {
        self.probe.enter(&task.resource_id);
        tokio::time::sleep(self.delay).await;
        self.probe.exit(&task.resource_id);

        let call = {
            let mut calls = self.calls.lock().unwrap();
            let n = calls.entry(task.index).or_insert(0);
            *n += 1;
            *n
        };
        let allowed_failures = self
            .failures_before_success
            .get(&task.index)
            .copied()
            .unwrap_or(0);
        if call <= allowed_failures {
            return Err(LyrireelError::ClipFetchFailed {
                resource_id: task.resource_id.clone(),
                reason: format!("scripted failure {call}"),
            });
        }

        Ok(ClipOutput {
            path: task.target_path.clone(),
            source: ClipSource {
                resource_id: task.resource_id.clone(),
                start_ms: task.start_ms,
                end_ms: task.end_ms,
            },
        })
    }
}

/// Fetcher that fails for a fixed set of resources and records every call.
#[derive(Default)]
pub struct FakeFetcher {
    pub broken: HashSet<String>,
    pub calls: Mutex<Vec<(String, u64, u64)>>,
    /// Per-resource artificial latency.
    pub delays: HashMap<String, Duration>,
}

impl FakeFetcher {
    pub fn broken(resources: &[&str]) -> Self {
        Self {
            broken: resources.iter().map(|r| r.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl ClipFetcher for FakeFetcher {
    async fn fetch(
        &self,
        resource_id: &str,
        start_ms: u64,
        end_ms: u64,
        target_path: &Path,
    ) -> Result<PathBuf> {
        self.calls
            .lock()
            .unwrap()
            .push((resource_id.to_string(), start_ms, end_ms));
        if let Some(delay) = self.delays.get(resource_id) {
            tokio::time::sleep(*delay).await;
        }
        if self.broken.contains(resource_id) {
            return Err(LyrireelError::ClipFetchFailed {
                resource_id: resource_id.to_string(),
                reason: "video unavailable".to_string(),
            });
        }
        Ok(target_path.to_path_buf())
    }
}

#[derive(Default)]
pub struct FakeSubstitutes {
    pub has_stock: bool,
    pub placeholder_broken: bool,
    pub placeholders: Mutex<Vec<(u64, PathBuf)>>,
}

#[async_trait]
impl ClipSubstitutes for FakeSubstitutes {
    async fn local(
        &self,
        _index: usize,
        _duration_ms: u64,
        target_path: &Path,
    ) -> Result<Option<PathBuf>> {
        Ok(self.has_stock.then(|| target_path.to_path_buf()))
    }

    async fn placeholder(&self, duration_ms: u64, target_path: &Path) -> Result<PathBuf> {
        if self.placeholder_broken {
            return Err(LyrireelError::PlaceholderFailed {
                target: target_path.to_path_buf(),
                reason: "ffmpeg missing".to_string(),
            });
        }
        self.placeholders
            .lock()
            .unwrap()
            .push((duration_ms, target_path.to_path_buf()));
        Ok(target_path.to_path_buf())
    }
}

/// Encoder that records the list it was given.
#[derive(Default, Clone)]
pub struct CapturingEncoder {
    pub received: Arc<Mutex<Vec<EncoderInput>>>,
}

#[async_trait]
impl Encoder for CapturingEncoder {
    async fn encode(&self, clips: &[EncoderInput], output: &Path) -> Result<PathBuf> {
        *self.received.lock().unwrap() = clips.to_vec();
        Ok(output.to_path_buf())
    }
}
