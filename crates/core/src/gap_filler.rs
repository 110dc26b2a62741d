use crate::{config::AssemblyConfig, types::Segment};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillerKind {
    Instrumental,
    Outro,
}

impl FillerKind {
    pub fn label(&self) -> &'static str {
        match self {
            FillerKind::Instrumental => "[instrumental]",
            FillerKind::Outro => "[outro]",
        }
    }
}

/// What to do with the time between the cursor and the next placement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GapAction {
    /// Nothing to cover.
    None,
    /// Stretch the neighbouring line over the gap.
    Absorb { from_ms: u64, to_ms: u64 },
    /// Insert a filler line spanning the gap.
    Fill {
        kind: FillerKind,
        start_ms: u64,
        end_ms: u64,
    },
}

#[derive(Debug, Clone)]
pub struct GapFiller {
    small_gap_threshold_ms: u64,
    instrumental_query: String,
    outro_query: String,
}

impl GapFiller {
    pub fn new(config: &AssemblyConfig) -> Self {
        Self {
            small_gap_threshold_ms: config.small_gap_threshold_ms,
            instrumental_query: config.instrumental_query.clone(),
            outro_query: config.outro_query.clone(),
        }
    }

    /// Gap between the cursor and the start of the next segment.
    pub fn plan_gap(&self, cursor_ms: u64, next_start_ms: u64) -> GapAction {
        self.classify(FillerKind::Instrumental, cursor_ms, next_start_ms)
    }

    /// Gap between the last placement and the end of the audio.
    pub fn plan_tail(&self, cursor_ms: u64, total_duration_ms: u64) -> GapAction {
        self.classify(FillerKind::Outro, cursor_ms, total_duration_ms)
    }

    fn classify(&self, kind: FillerKind, from_ms: u64, to_ms: u64) -> GapAction {
        let gap = to_ms.saturating_sub(from_ms);
        if gap == 0 {
            GapAction::None
        } else if gap <= self.small_gap_threshold_ms {
            GapAction::Absorb { from_ms, to_ms }
        } else {
            GapAction::Fill {
                kind,
                start_ms: from_ms,
                end_ms: to_ms,
            }
        }
    }

    /// The synthetic segment for a fill action, searched with the generic
    /// query of its kind.
    pub fn filler_segment(&self, kind: FillerKind, start_ms: u64, end_ms: u64) -> Segment {
        let query = match kind {
            FillerKind::Instrumental => &self.instrumental_query,
            FillerKind::Outro => &self.outro_query,
        };
        Segment::filler(kind.label(), start_ms, end_ms, query)
    }
}
