use std::{path::Path, sync::LazyLock};

use regex::Regex;
use tokio::fs;

use crate::{
    error::{LyrireelError, Result},
    types::TextLine,
};

static LRC_TIMESTAMP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[(\d{1,3}):(\d{2})(?:[.:](\d{1,3}))?\]").expect("lrc timestamp regex")
});

static LRC_OFFSET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[offset:\s*([+-]?\d+)\s*\]").expect("lrc offset regex"));

/// Loads lines from `.lrc` or a JSON array of `{ text, start_ms, end_ms }`.
pub async fn load_lines(
    path: &Path,
    total_duration_ms: Option<u64>,
    last_line_ms: u64,
) -> Result<Vec<TextLine>> {
    let content = fs::read_to_string(path).await?;
    let is_lrc = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("lrc"));

    let lines = if is_lrc {
        parse_lrc(&content, total_duration_ms, last_line_ms)?
    } else {
        serde_json::from_str(&content)?
    };
    Ok(lines)
}

/// Parses LRC lyrics. Each line ends where the next timestamp begins; blank
/// timestamped lines only mark an end. The last line runs to the total
/// duration when known, otherwise for `last_line_ms`.
pub fn parse_lrc(
    content: &str,
    total_duration_ms: Option<u64>,
    last_line_ms: u64,
) -> Result<Vec<TextLine>> {
    let mut offset_ms: i64 = 0;
    let mut stamped: Vec<(u64, String)> = Vec::new();

    for (line_no, raw) in content.lines().enumerate() {
        let raw = raw.trim();
        if let Some(caps) = LRC_OFFSET.captures(raw) {
            offset_ms = caps[1].parse().map_err(|_| LyrireelError::InvalidLine {
                line: line_no + 1,
                reason: format!("bad offset tag {raw}"),
            })?;
            continue;
        }

        let mut rest = raw;
        let mut times = Vec::new();
        while let Some(caps) = LRC_TIMESTAMP.captures(rest) {
            times.push(timestamp_ms(&caps));
            rest = &rest[caps[0].len()..];
        }
        let text = rest.trim();
        stamped.extend(times.into_iter().map(|t| (t, text.to_string())));
    }

    // A positive offset means the lyrics appear earlier.
    for (t, _) in stamped.iter_mut() {
        *t = (*t as i64 - offset_ms).max(0) as u64;
    }
    stamped.sort_by_key(|(t, _)| *t);

    let mut lines = Vec::new();
    for (i, (start_ms, text)) in stamped.iter().enumerate() {
        if text.is_empty() {
            continue;
        }
        let end_ms = match stamped.get(i + 1) {
            Some((next, _)) => *next,
            None => total_duration_ms.unwrap_or(start_ms + last_line_ms),
        };
        if end_ms > *start_ms {
            lines.push(TextLine::new(text.clone(), *start_ms, end_ms));
        }
    }
    Ok(lines)
}

fn timestamp_ms(caps: &regex::Captures<'_>) -> u64 {
    let minutes: u64 = caps[1].parse().unwrap_or(0);
    let seconds: u64 = caps[2].parse().unwrap_or(0);
    let fraction = caps.get(3).map_or(0, |m| {
        let digits = m.as_str();
        let value: u64 = digits.parse().unwrap_or(0);
        value * 10u64.pow(3 - digits.len() as u32)
    });
    minutes * 60_000 + seconds * 1000 + fraction
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_end_at_next_timestamp() {
        let lrc = "[ar:Someone]\n[00:01.00]First line\n[00:03.50]Second line\n[00:06.00]\n";
        let lines = parse_lrc(lrc, None, 4000).unwrap();
        assert_eq!(
            lines,
            vec![
                TextLine::new("First line", 1000, 3500),
                TextLine::new("Second line", 3500, 6000),
            ]
        );
    }

    #[test]
    fn last_line_runs_to_total() {
        let lines = parse_lrc("[00:10.5]Outro", Some(20_000), 4000).unwrap();
        assert_eq!(lines, vec![TextLine::new("Outro", 10_500, 20_000)]);
    }

    #[test]
    fn repeated_timestamps_and_offset() {
        let lrc = "[offset:+500]\n[00:02.00][00:08.00]Chorus\n[00:05.00]Verse";
        let lines = parse_lrc(lrc, Some(10_000), 4000).unwrap();
        let starts: Vec<u64> = lines.iter().map(|l| l.start_ms).collect();
        assert_eq!(starts, vec![1500, 4500, 7500]);
        assert_eq!(lines[2].text, "Chorus");
    }
}
