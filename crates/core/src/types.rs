use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A timed line of source text, e.g. one lyric line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextLine {
    pub text: String,
    pub start_ms: u64,
    pub end_ms: u64,
}

impl TextLine {
    pub fn new(text: impl Into<String>, start_ms: u64, end_ms: u64) -> Self {
        Self {
            text: text.into(),
            start_ms,
            end_ms,
        }
    }
}

/// Planner output: a time-bounded unit awaiting a matched candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub text: String,
    pub start_ms: u64,
    pub end_ms: u64,
    pub is_filler: bool,
    #[serde(default)]
    pub search_query: Option<String>,
}

impl Segment {
    pub fn from_line(line: &TextLine) -> Self {
        Self {
            text: line.text.trim().to_string(),
            start_ms: line.start_ms,
            end_ms: line.end_ms,
            is_filler: false,
            search_query: None,
        }
    }

    pub fn filler(text: impl Into<String>, start_ms: u64, end_ms: u64, query: &str) -> Self {
        Self {
            text: text.into(),
            start_ms,
            end_ms,
            is_filler: true,
            search_query: Some(query.to_string()),
        }
    }

    pub fn duration_ms(&self) -> u64 {
        self.end_ms.saturating_sub(self.start_ms)
    }

    /// Query sent to the search backend; falls back to the text itself.
    pub fn query(&self) -> &str {
        self.search_query.as_deref().unwrap_or(&self.text)
    }
}

/// A scored video time range returned by a search backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub resource_id: String,
    pub start_ms: u64,
    pub end_ms: u64,
    pub score: f64,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl Candidate {
    pub fn new(resource_id: impl Into<String>, start_ms: u64, end_ms: u64, score: f64) -> Self {
        Self {
            resource_id: resource_id.into(),
            start_ms,
            end_ms,
            score,
            metadata: serde_json::Value::Null,
        }
    }

    pub fn duration_ms(&self) -> u64 {
        self.end_ms.saturating_sub(self.start_ms)
    }

    pub fn with_range(&self, start_ms: u64, end_ms: u64) -> Self {
        Self {
            start_ms,
            end_ms,
            ..self.clone()
        }
    }

    pub fn key(&self) -> UsedSegmentKey {
        UsedSegmentKey::new(&self.resource_id, self.start_ms, self.end_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UsedSegmentKey {
    pub resource_id: String,
    pub start_ms: u64,
    pub end_ms: u64,
}

impl UsedSegmentKey {
    pub fn new(resource_id: &str, start_ms: u64, end_ms: u64) -> Self {
        Self {
            resource_id: resource_id.to_string(),
            start_ms,
            end_ms,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineLine {
    pub text: String,
    pub start_ms: u64,
    pub end_ms: u64,
    #[serde(default)]
    pub is_filler: bool,
    /// Accepted candidates, best first.
    pub candidates: Vec<Candidate>,
}

impl TimelineLine {
    pub fn duration_ms(&self) -> u64 {
        self.end_ms.saturating_sub(self.start_ms)
    }

    pub fn primary(&self) -> Option<&Candidate> {
        self.candidates.first()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    pub lines: Vec<TimelineLine>,
    #[serde(default)]
    pub total_duration_ms: Option<u64>,
}

impl Timeline {
    /// Sum of all line spans.
    pub fn span_ms(&self) -> u64 {
        self.lines.iter().map(TimelineLine::duration_ms).sum()
    }

    /// True when every line starts exactly where the previous one ended.
    pub fn is_gapless(&self) -> bool {
        self.lines
            .windows(2)
            .all(|pair| pair[1].start_ms == pair[0].end_ms)
    }

    pub fn unresolved_count(&self) -> usize {
        self.lines.iter().filter(|l| l.candidates.is_empty()).count()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipDownloadTask {
    pub index: usize,
    pub resource_id: String,
    pub start_ms: u64,
    pub end_ms: u64,
    pub target_path: PathBuf,
    /// Number of times the worker has been invoked for this task.
    pub attempts: u32,
    pub text: String,
    /// Full candidate list, primary first, for in-task fallback.
    pub candidates: Vec<Candidate>,
    #[serde(default)]
    pub backoff_history_ms: Vec<u64>,
}

impl ClipDownloadTask {
    /// Builds a task from the line's primary candidate. Returns `None` for
    /// lines without candidates.
    pub fn from_line(index: usize, line: &TimelineLine, target_path: PathBuf) -> Option<Self> {
        let primary = line.primary()?;
        Some(Self {
            index,
            resource_id: primary.resource_id.clone(),
            start_ms: primary.start_ms,
            end_ms: primary.end_ms,
            target_path,
            attempts: 0,
            text: line.text.clone(),
            candidates: line.candidates.clone(),
            backoff_history_ms: Vec::new(),
        })
    }

    pub fn duration_ms(&self) -> u64 {
        self.end_ms.saturating_sub(self.start_ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClipStatus {
    Success,
    Failed,
    FallbackLocal,
    FallbackPlaceholder,
}

/// The range that actually ended up in a clip file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipSource {
    pub resource_id: String,
    pub start_ms: u64,
    pub end_ms: u64,
}

impl ClipSource {
    pub fn duration_ms(&self) -> u64 {
        self.end_ms.saturating_sub(self.start_ms)
    }
}

impl From<&Candidate> for ClipSource {
    fn from(c: &Candidate) -> Self {
        Self {
            resource_id: c.resource_id.clone(),
            start_ms: c.start_ms,
            end_ms: c.end_ms,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipDownloadResult {
    pub task: ClipDownloadTask,
    pub status: ClipStatus,
    pub path: Option<PathBuf>,
    pub error: Option<String>,
    pub duration_ms: Option<u64>,
    #[serde(default)]
    pub source: Option<ClipSource>,
}
