use std::collections::HashMap;

use serde::Serialize;

/// Overlap duration divided by the shorter of the two durations.
pub fn overlap_ratio(a_start: u64, a_end: u64, b_start: u64, b_end: u64) -> f64 {
    let overlap = a_end.min(b_end).saturating_sub(a_start.max(b_start));
    let shorter = a_end
        .saturating_sub(a_start)
        .min(b_end.saturating_sub(b_start));
    if overlap == 0 || shorter == 0 {
        return 0.0;
    }
    overlap as f64 / shorter as f64
}

/// Every `(resource_id, start, end)` range committed to the timeline so far.
///
/// A range is unavailable if it was used exactly, or if it overlaps any used
/// range on the same resource by any amount. Only the timeline assembly loop
/// writes to it.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UsedSegmentLedger {
    by_resource: HashMap<String, HashMap<(u64, u64), u32>>,
}

impl UsedSegmentLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_available(&self, resource_id: &str, start_ms: u64, end_ms: u64) -> bool {
        let Some(ranges) = self.by_resource.get(resource_id) else {
            return true;
        };

        if ranges.get(&(start_ms, end_ms)).is_some_and(|count| *count > 0) {
            return false;
        }

        !ranges
            .keys()
            .any(|&(s, e)| overlap_ratio(start_ms, end_ms, s, e) > 0.0)
    }

    pub fn mark_used(&mut self, resource_id: &str, start_ms: u64, end_ms: u64) {
        *self
            .by_resource
            .entry(resource_id.to_string())
            .or_default()
            .entry((start_ms, end_ms))
            .or_insert(0) += 1;
    }

    pub fn usage_count(&self, resource_id: &str, start_ms: u64, end_ms: u64) -> u32 {
        self.by_resource
            .get(resource_id)
            .and_then(|ranges| ranges.get(&(start_ms, end_ms)))
            .copied()
            .unwrap_or(0)
    }

    /// Number of distinct used ranges.
    pub fn len(&self) -> usize {
        self.by_resource.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
