use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::{
    config::AssemblyConfig,
    error::{LyrireelError, Result},
    types::{Segment, TextLine},
};

static CLAUSE_BOUNDARY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[,;:!?，。！？；、]+\s*|\.\s+|\s+[-–—]+\s+")
        .expect("clause boundary regex")
});

static CREDIT_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)^\s*(lyrics?|music|composer|composed|arranged|arrangement|produced|producer|written|vocals?|mixed|mastered|performed)(\s+by)?\s*[:：\-]",
        r"(?i)\b(lyrics|subtitles?|translation|translated|captions?)\s+by\b",
        r"^\s*(作词|作曲|编曲|制作人|词|曲)\s*[:：]",
        r"(?i)^\s*(thanks for watching|please subscribe)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("credit pattern regex"))
    .collect()
});

const SHOT_VARIATIONS: [&str; 4] = [
    "wide shot",
    "close-up detail",
    "different angle",
    "slow motion",
];

/// Turns raw timed lines into the segments the builder searches for.
#[derive(Debug, Clone)]
pub struct SegmentPlanner {
    max_segment_ms: u64,
    credit_filler_max_ms: u64,
    atmospheric_query: String,
    vary_split_prompts: bool,
}

impl SegmentPlanner {
    pub fn new(config: &AssemblyConfig) -> Self {
        Self {
            max_segment_ms: config.max_segment_ms,
            credit_filler_max_ms: config.credit_filler_max_ms,
            atmospheric_query: config.atmospheric_query.clone(),
            vary_split_prompts: config.vary_split_prompts,
        }
    }

    /// Validates and sorts lines, then flags credits, explodes clauses and
    /// splits overlong segments, in that order.
    pub fn plan(&self, lines: &[TextLine]) -> Result<Vec<Segment>> {
        for (i, line) in lines.iter().enumerate() {
            if line.end_ms <= line.start_ms {
                return Err(LyrireelError::InvalidLine {
                    line: i + 1,
                    reason: format!(
                        "end {}ms is not after start {}ms",
                        line.end_ms, line.start_ms
                    ),
                });
            }
        }

        let mut segments: Vec<Segment> = lines.iter().map(Segment::from_line).collect();
        segments.sort_by_key(|s| s.start_ms);

        let segments = self.mark_non_lyric(segments);
        let segments = self.explode(segments);
        let segments = self.split_by_duration(segments, self.max_segment_ms);
        debug!(lines = lines.len(), segments = segments.len(), "planned segments");
        Ok(segments)
    }

    /// Splits multi-clause segments into sub-segments whose durations are
    /// proportional to each clause's character count. Fillers and segments
    /// with a rewritten query are left alone.
    pub fn explode(&self, segments: Vec<Segment>) -> Vec<Segment> {
        segments
            .into_iter()
            .flat_map(|seg| {
                if seg.is_filler || seg.search_query.is_some() {
                    return vec![seg];
                }
                let clauses = split_clauses(&seg.text);
                if clauses.len() < 2 {
                    return vec![seg];
                }
                match allocate(seg.duration_ms(), &clauses) {
                    Some(durations) => {
                        let mut cursor = seg.start_ms;
                        clauses
                            .into_iter()
                            .zip(durations)
                            .map(|(text, duration)| {
                                let start = cursor;
                                cursor += duration;
                                Segment {
                                    text,
                                    start_ms: start,
                                    end_ms: cursor,
                                    is_filler: false,
                                    search_query: None,
                                }
                            })
                            .collect()
                    }
                    None => vec![seg],
                }
            })
            .collect()
    }

    /// Chops segments longer than `max_duration_ms` into
    /// `ceil(duration / max)` equal chunks.
    pub fn split_by_duration(&self, segments: Vec<Segment>, max_duration_ms: u64) -> Vec<Segment> {
        if max_duration_ms == 0 {
            return segments;
        }
        segments
            .into_iter()
            .flat_map(|seg| {
                let duration = seg.duration_ms();
                if duration <= max_duration_ms {
                    return vec![seg];
                }
                let chunks = duration.div_ceil(max_duration_ms);
                let chunk_ms = duration / chunks;
                let base_query = seg.query().to_string();
                // Query-less fillers go to random fill, so their text never
                // becomes a search prompt.
                let queryless_filler = seg.is_filler && seg.search_query.is_none();
                let vary = self.vary_split_prompts && !queryless_filler;

                (0..chunks)
                    .map(|i| {
                        let start = seg.start_ms + i * chunk_ms;
                        let end = if i + 1 == chunks {
                            seg.end_ms
                        } else {
                            start + chunk_ms
                        };
                        let search_query = if vary && i > 0 {
                            let variation =
                                SHOT_VARIATIONS[(i as usize - 1) % SHOT_VARIATIONS.len()];
                            Some(format!("{base_query}, {variation}"))
                        } else {
                            seg.search_query.clone()
                        };
                        Segment {
                            text: seg.text.clone(),
                            start_ms: start,
                            end_ms: end,
                            is_filler: seg.is_filler,
                            search_query,
                        }
                    })
                    .collect()
            })
            .collect()
    }

    /// Flags credit and attribution lines. Short ones become fillers, long
    /// ones keep real footage under a generic atmospheric query. Lines with
    /// no words at all (e.g. "♪") become fillers too.
    pub fn mark_non_lyric(&self, segments: Vec<Segment>) -> Vec<Segment> {
        segments
            .into_iter()
            .map(|mut seg| {
                let wordless = !seg.text.chars().any(char::is_alphanumeric);
                if wordless {
                    seg.is_filler = true;
                    return seg;
                }
                if is_credit_line(&seg.text) {
                    if seg.duration_ms() < self.credit_filler_max_ms {
                        debug!(text = %seg.text, "credit line marked as filler");
                        seg.is_filler = true;
                    } else {
                        debug!(text = %seg.text, "credit line rewritten to atmospheric query");
                        seg.search_query = Some(self.atmospheric_query.clone());
                    }
                }
                seg
            })
            .collect()
    }
}

pub fn is_credit_line(text: &str) -> bool {
    CREDIT_PATTERNS.iter().any(|re| re.is_match(text))
}

/// Splits text at clause punctuation. Punctuation stays with the clause it
/// ends; fragments with no word characters merge into the previous clause.
fn split_clauses(text: &str) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut last = 0;
    for m in CLAUSE_BOUNDARY.find_iter(text) {
        pieces.push(&text[last..m.end()]);
        last = m.end();
    }
    pieces.push(&text[last..]);

    let mut clauses: Vec<String> = Vec::new();
    for piece in pieces {
        let piece = piece.trim();
        if piece.is_empty() {
            continue;
        }
        let has_words = piece.chars().any(char::is_alphanumeric);
        match clauses.last_mut() {
            Some(prev) if !has_words => prev.push_str(piece),
            _ => clauses.push(piece.to_string()),
        }
    }
    clauses
}

/// Per-clause durations proportional to character counts. The last clause
/// absorbs rounding. `None` if any clause would get zero time.
fn allocate(duration_ms: u64, clauses: &[String]) -> Option<Vec<u64>> {
    let counts: Vec<u64> = clauses.iter().map(|c| c.chars().count() as u64).collect();
    let total: u64 = counts.iter().sum();
    if total == 0 {
        return None;
    }

    let mut durations: Vec<u64> = counts.iter().map(|c| duration_ms * c / total).collect();
    let assigned: u64 = durations[..durations.len() - 1].iter().sum();
    if let Some(last) = durations.last_mut() {
        *last = duration_ms - assigned;
    }

    if durations.contains(&0) {
        return None;
    }
    Some(durations)
}
