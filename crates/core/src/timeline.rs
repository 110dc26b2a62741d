use tracing::{debug, info, warn};

use crate::{
    config::AssemblyConfig,
    error::Result,
    gap_filler::{FillerKind, GapAction, GapFiller},
    ledger::UsedSegmentLedger,
    planner::SegmentPlanner,
    random_fill::{CandidatePool, RandomFillResolver},
    search::SearchCollaborator,
    selector::CandidateSelector,
    types::{Candidate, Segment, TextLine, Timeline, TimelineLine},
};

/// Assembles a gapless timeline from timed text lines.
///
/// Owns the ledger, the candidate pool and the selector state for one run;
/// placements happen strictly in ascending time order.
pub struct TimelineBuilder<S> {
    search: S,
    config: AssemblyConfig,
    planner: SegmentPlanner,
    gap_filler: GapFiller,
    ledger: UsedSegmentLedger,
    selector: CandidateSelector,
    pool: CandidatePool,
    random_fill: RandomFillResolver,
}

impl<S: SearchCollaborator> TimelineBuilder<S> {
    pub fn new(search: S, config: AssemblyConfig) -> Self {
        Self {
            planner: SegmentPlanner::new(&config),
            gap_filler: GapFiller::new(&config),
            ledger: UsedSegmentLedger::new(),
            selector: CandidateSelector::new(config.continuity_bonus),
            pool: CandidatePool::new(),
            random_fill: RandomFillResolver::new(
                config.filler_queries.clone(),
                config.random_fill_attempts,
                config.search_limit,
                config.random_seed,
            ),
            search,
            config,
        }
    }

    pub fn ledger(&self) -> &UsedSegmentLedger {
        &self.ledger
    }

    pub fn pool(&self) -> &CandidatePool {
        &self.pool
    }

    pub async fn build(
        &mut self,
        lines: &[TextLine],
        total_duration_ms: Option<u64>,
    ) -> Result<Timeline> {
        let mut segments = self.planner.plan(lines)?;
        if let Some(total) = total_duration_ms {
            segments = clamp_to_total(segments, total);
        }

        let mut timeline = Timeline {
            lines: Vec::with_capacity(segments.len()),
            total_duration_ms,
        };
        let mut cursor = 0u64;
        let last_placed = last_placed_index(&segments);

        for (i, mut segment) in segments.into_iter().enumerate() {
            if segment.start_ms < cursor {
                if segment.end_ms <= cursor {
                    debug!(text = %segment.text, "segment fully covered by earlier line, skipped");
                    continue;
                }
                segment.start_ms = cursor;
            }

            match self.gap_filler.plan_gap(cursor, segment.start_ms) {
                GapAction::None => {}
                GapAction::Absorb { from_ms, to_ms } => {
                    debug!(from_ms, to_ms, "absorbed gap into next line");
                    segment.start_ms = from_ms;
                }
                GapAction::Fill {
                    kind,
                    start_ms,
                    end_ms,
                } => {
                    info!(start_ms, end_ms, filler = kind.label(), "inserting filler");
                    let filler = self.gap_filler.filler_segment(kind, start_ms, end_ms);
                    let line = self.place(&filler).await?;
                    cursor = cursor.max(line.end_ms);
                    timeline.lines.push(line);
                }
            }

            // A short tail is absorbed before the last line is searched so its
            // candidates already cover the stretched duration.
            if Some(i) == last_placed {
                if let Some(total) = total_duration_ms {
                    if let GapAction::Absorb { to_ms, .. } =
                        self.gap_filler.plan_tail(segment.end_ms, total)
                    {
                        debug!(to_ms, "absorbed tail gap into last line");
                        segment.end_ms = to_ms;
                    }
                }
            }

            let line = self.place(&segment).await?;
            cursor = cursor.max(line.end_ms);
            timeline.lines.push(line);
        }

        if let Some(total) = total_duration_ms {
            let tail = if timeline.lines.is_empty() && total > 0 {
                GapAction::Fill {
                    kind: FillerKind::Outro,
                    start_ms: 0,
                    end_ms: total,
                }
            } else {
                self.gap_filler.plan_tail(cursor, total)
            };
            match tail {
                // Short tails were absorbed into the last placed line already.
                GapAction::None | GapAction::Absorb { .. } => {}
                GapAction::Fill {
                    kind,
                    start_ms,
                    end_ms,
                } => {
                    info!(start_ms, end_ms, filler = kind.label(), "inserting tail filler");
                    let filler = self.gap_filler.filler_segment(kind, start_ms, end_ms);
                    let line = self.place(&filler).await?;
                    timeline.lines.push(line);
                }
            }
        }

        info!(
            lines = timeline.lines.len(),
            unresolved = timeline.unresolved_count(),
            used_ranges = self.ledger.len(),
            "timeline assembled"
        );
        Ok(timeline)
    }

    async fn place(&mut self, segment: &Segment) -> Result<TimelineLine> {
        let candidates = self.resolve(segment).await?;
        Ok(TimelineLine {
            text: segment.text.clone(),
            start_ms: segment.start_ms,
            end_ms: segment.end_ms,
            is_filler: segment.is_filler,
            candidates,
        })
    }

    async fn resolve(&mut self, segment: &Segment) -> Result<Vec<Candidate>> {
        let required_ms = segment.duration_ms();

        // Fillers without a query go straight to random fill.
        if !segment.is_filler || segment.search_query.is_some() {
            let results = self
                .search
                .search(segment.query(), self.config.search_limit)
                .await?;
            self.pool.record(&results);

            let picked = self.selector.select(
                &mut self.ledger,
                &results,
                required_ms,
                self.config.candidates_per_line,
            );
            if !picked.is_empty() {
                return Ok(picked);
            }
            debug!(
                query = segment.query(),
                raw = results.len(),
                "candidates exhausted, trying random fill"
            );
        }

        let filled = self
            .random_fill
            .resolve(
                required_ms,
                segment.start_ms,
                segment.end_ms,
                &mut self.pool,
                &mut self.ledger,
                &self.search,
            )
            .await?;

        match filled {
            Some(candidate) => {
                self.selector.note_used(&candidate.resource_id);
                Ok(vec![candidate])
            }
            None => {
                warn!(
                    text = %segment.text,
                    start_ms = segment.start_ms,
                    end_ms = segment.end_ms,
                    "no footage available, line left without candidates"
                );
                Ok(Vec::new())
            }
        }
    }
}

/// Drops segments starting at or past the end of the audio and trims the rest.
fn clamp_to_total(segments: Vec<Segment>, total_ms: u64) -> Vec<Segment> {
    segments
        .into_iter()
        .filter_map(|mut seg| {
            if seg.start_ms >= total_ms {
                warn!(
                    text = %seg.text,
                    start_ms = seg.start_ms,
                    total_ms,
                    "segment past audio end dropped"
                );
                return None;
            }
            seg.end_ms = seg.end_ms.min(total_ms);
            Some(seg)
        })
        .collect()
}

/// Index of the last segment the cursor loop will place. A segment is skipped
/// when an earlier segment already reaches its end.
fn last_placed_index(segments: &[Segment]) -> Option<usize> {
    let mut reach = 0u64;
    let mut last = None;
    for (i, seg) in segments.iter().enumerate() {
        if seg.end_ms > reach {
            last = Some(i);
        }
        reach = reach.max(seg.end_ms);
    }
    last
}
