use crate::{render::RenderStats, types::Timeline};

/// Format milliseconds as MM:SS.mmm timestamp
pub fn format_timestamp(ms: u64) -> String {
    let mins = ms / 60_000;
    let secs = (ms % 60_000) / 1000;
    let millis = ms % 1000;
    format!("{:02}:{:02}.{:03}", mins, secs, millis)
}

/// Format timeline lines with their time range and chosen footage
pub fn format_timeline_readable(timeline: &Timeline) -> String {
    let mut output = String::new();

    for line in &timeline.lines {
        let marker = if line.is_filler { "~" } else { " " };
        let source = match line.primary() {
            Some(c) => format!(
                "{} @ {}–{}",
                c.resource_id,
                format_timestamp(c.start_ms),
                format_timestamp(c.end_ms)
            ),
            None => "(no footage)".to_string(),
        };
        output.push_str(&format!(
            "[{}–{}]{} {}  ← {}\n",
            format_timestamp(line.start_ms),
            format_timestamp(line.end_ms),
            marker,
            line.text,
            source
        ));
    }

    output
}

pub fn format_render_stats(stats: &RenderStats) -> String {
    let mut output = String::new();
    output.push_str(&format!("Job:          {}\n", stats.job_id));
    output.push_str(&format!(
        "Clips:        {} total, {} ok, {} local, {} placeholder, {} failed\n",
        stats.total_tasks,
        stats.succeeded,
        stats.fallback_local,
        stats.fallback_placeholder,
        stats.failed
    ));
    output.push_str(&format!("Retries:      {}\n", stats.retries));
    output.push_str(&format!("Peak workers: {}\n", stats.peak_parallelism));
    output.push_str(&format!(
        "Footage:      {}\n",
        format_timestamp(stats.total_clip_duration_ms)
    ));
    output.push_str(&format!(
        "Wall time:    {}\n",
        format_timestamp(stats.wall_time_ms)
    ));
    output
}
