use crate::types::Candidate;

/// Center-extracts a `required_ms` sub-range from the candidate's window.
///
/// Returns `None` when the window is shorter than required. The extracted
/// range sits symmetrically around the window's midpoint and is clamped to
/// the window bounds.
pub fn extract_window(candidate: &Candidate, required_ms: u64) -> Option<Candidate> {
    let api_start = candidate.start_ms;
    let api_end = candidate.end_ms;
    if api_end.saturating_sub(api_start) < required_ms {
        return None;
    }

    let midpoint = api_start + (api_end - api_start) / 2;
    let mut start = midpoint.saturating_sub(required_ms / 2);
    let mut end = start + required_ms;

    if start < api_start {
        start = api_start;
        end = start + required_ms;
    }
    if end > api_end {
        end = api_end;
        start = end - required_ms;
    }

    Some(candidate.with_range(start, end))
}
