use std::collections::HashSet;

use rand::{SeedableRng, rngs::StdRng, seq::SliceRandom};
use tracing::{debug, info, warn};

use crate::{
    error::Result,
    ledger::UsedSegmentLedger,
    normalize::extract_window,
    search::SearchCollaborator,
    types::{Candidate, UsedSegmentKey},
};

/// Every candidate seen during one assembly run, deduplicated by exact range.
#[derive(Debug, Clone, Default)]
pub struct CandidatePool {
    seen: Vec<Candidate>,
    keys: HashSet<UsedSegmentKey>,
}

impl CandidatePool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, candidates: &[Candidate]) {
        for c in candidates {
            if self.keys.insert(c.key()) {
                self.seen.push(c.clone());
            }
        }
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    /// Sub-ranges of at least `required_ms` that the ledger still allows.
    fn eligible(&self, ledger: &UsedSegmentLedger, required_ms: u64) -> Vec<Candidate> {
        self.seen
            .iter()
            .filter_map(|c| extract_window(c, required_ms))
            .filter(|c| ledger.is_available(&c.resource_id, c.start_ms, c.end_ms))
            .collect()
    }
}

/// Last-resort candidate source for segments the selector could not serve.
pub struct RandomFillResolver {
    queries: Vec<String>,
    next_query: usize,
    max_rotations: usize,
    search_limit: usize,
    rng: StdRng,
}

impl RandomFillResolver {
    pub fn new(
        queries: Vec<String>,
        max_rotations: usize,
        search_limit: usize,
        seed: Option<u64>,
    ) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            queries,
            next_query: 0,
            max_rotations,
            search_limit,
            rng,
        }
    }

    fn next_query(&mut self) -> Option<String> {
        if self.queries.is_empty() {
            return None;
        }
        let query = self.queries[self.next_query % self.queries.len()].clone();
        self.next_query += 1;
        Some(query)
    }

    fn pick(
        &mut self,
        pool: &CandidatePool,
        ledger: &mut UsedSegmentLedger,
        required_ms: u64,
    ) -> Option<Candidate> {
        let eligible = pool.eligible(ledger, required_ms);
        let chosen = eligible.choose(&mut self.rng)?.clone();
        ledger.mark_used(&chosen.resource_id, chosen.start_ms, chosen.end_ms);
        Some(chosen)
    }

    /// Finds any still-available range of `required_ms` for the window
    /// `[window_start_ms, window_end_ms)`. Scans the pool first, then rotates
    /// through filler queries, growing the pool each time.
    pub async fn resolve<S: SearchCollaborator + ?Sized>(
        &mut self,
        required_ms: u64,
        window_start_ms: u64,
        window_end_ms: u64,
        pool: &mut CandidatePool,
        ledger: &mut UsedSegmentLedger,
        search: &S,
    ) -> Result<Option<Candidate>> {
        if let Some(found) = self.pick(pool, ledger, required_ms) {
            debug!(
                window_start_ms,
                window_end_ms,
                resource_id = %found.resource_id,
                "random fill served from pool"
            );
            return Ok(Some(found));
        }

        for _ in 0..self.max_rotations {
            let Some(query) = self.next_query() else {
                break;
            };
            let results = search.search(&query, self.search_limit).await?;
            info!(
                query = %query,
                hits = results.len(),
                window_start_ms,
                window_end_ms,
                "random fill issued filler search"
            );
            pool.record(&results);

            if let Some(found) = self.pick(pool, ledger, required_ms) {
                return Ok(Some(found));
            }
        }

        warn!(
            required_ms,
            window_start_ms,
            window_end_ms,
            pool_size = pool.len(),
            "random fill exhausted"
        );
        Ok(None)
    }
}
