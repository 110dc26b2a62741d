use tracing::debug;

use crate::{ledger::UsedSegmentLedger, normalize::extract_window, types::Candidate};

/// Picks a ranked, deduplicated, non-overlapping subset of raw candidates.
///
/// An empty result means every candidate was rejected; callers treat that as
/// the signal to fall back to random fill.
#[derive(Debug, Clone)]
pub struct CandidateSelector {
    continuity_bonus: f64,
    last_resource: Option<String>,
}

impl CandidateSelector {
    pub fn new(continuity_bonus: f64) -> Self {
        Self {
            continuity_bonus,
            last_resource: None,
        }
    }

    pub fn last_resource(&self) -> Option<&str> {
        self.last_resource.as_deref()
    }

    /// Records a resource chosen outside of `select`, e.g. by random fill.
    pub fn note_used(&mut self, resource_id: &str) {
        self.last_resource = Some(resource_id.to_string());
    }

    fn adjusted_score(&self, candidate: &Candidate) -> f64 {
        match &self.last_resource {
            Some(last) if *last == candidate.resource_id => {
                candidate.score + self.continuity_bonus
            }
            _ => candidate.score,
        }
    }

    /// Selects up to `limit` candidates, each trimmed to `required_ms`, and
    /// marks all of them used in the ledger.
    pub fn select(
        &mut self,
        ledger: &mut UsedSegmentLedger,
        raw: &[Candidate],
        required_ms: u64,
        limit: usize,
    ) -> Vec<Candidate> {
        let mut survivors: Vec<(f64, Candidate)> = raw
            .iter()
            .filter_map(|c| {
                let Some(extracted) = extract_window(c, required_ms) else {
                    debug!(
                        resource_id = %c.resource_id,
                        window_ms = c.duration_ms(),
                        required_ms,
                        "candidate rejected: window too short"
                    );
                    return None;
                };
                if !ledger.is_available(
                    &extracted.resource_id,
                    extracted.start_ms,
                    extracted.end_ms,
                ) {
                    debug!(
                        resource_id = %extracted.resource_id,
                        start_ms = extracted.start_ms,
                        end_ms = extracted.end_ms,
                        "candidate rejected: range already used"
                    );
                    return None;
                }
                Some((self.adjusted_score(&extracted), extracted))
            })
            .collect();

        survivors.sort_by(|a, b| b.0.total_cmp(&a.0));

        // Two raw windows can collapse onto overlapping sub-ranges, so
        // availability is re-checked as each pick is committed.
        let mut picked = Vec::with_capacity(limit.min(survivors.len()));
        for (_, candidate) in survivors {
            if picked.len() >= limit {
                break;
            }
            if !ledger.is_available(&candidate.resource_id, candidate.start_ms, candidate.end_ms) {
                continue;
            }
            ledger.mark_used(&candidate.resource_id, candidate.start_ms, candidate.end_ms);
            picked.push(candidate);
        }

        if let Some(best) = picked.first() {
            self.last_resource = Some(best.resource_id.clone());
        }

        picked
    }
}
