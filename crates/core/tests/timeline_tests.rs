mod common;

use common::{DownSearch, candidate};
use lyrireel_core::{
    AssemblyConfig, FixtureSearch, LyrireelError, TextLine, Timeline, TimelineBuilder,
    ledger::overlap_ratio,
};
use rand::{Rng, SeedableRng, rngs::StdRng};

fn seeded_config() -> AssemblyConfig {
    AssemblyConfig {
        random_seed: Some(42),
        ..Default::default()
    }
}

fn assert_no_reuse(timeline: &Timeline) {
    let all: Vec<_> = timeline.lines.iter().flat_map(|l| &l.candidates).collect();
    for (i, a) in all.iter().enumerate() {
        for b in &all[i + 1..] {
            if a.resource_id == b.resource_id {
                assert_eq!(
                    overlap_ratio(a.start_ms, a.end_ms, b.start_ms, b.end_ms),
                    0.0,
                    "{} reused: {}-{} vs {}-{}",
                    a.resource_id,
                    a.start_ms,
                    a.end_ms,
                    b.start_ms,
                    b.end_ms
                );
            }
        }
    }
}

fn assert_clips_fit_lines(timeline: &Timeline) {
    for line in &timeline.lines {
        if let Some(primary) = line.primary() {
            assert_eq!(
                primary.duration_ms(),
                line.duration_ms(),
                "clip for {:?} at {}-{} has the wrong length",
                line.text,
                line.start_ms,
                line.end_ms
            );
        }
    }
}

#[tokio::test]
async fn gaps_and_tail_become_fillers() {
    let config = seeded_config();
    let search = FixtureSearch::new()
        .with("hello world", vec![candidate("a", 0, 10_000, 0.9)])
        .with("goodbye moon", vec![candidate("b", 0, 10_000, 0.9)])
        .with(
            config.instrumental_query.clone(),
            vec![candidate("inst", 0, 30_000, 0.5)],
        )
        .with(
            config.outro_query.clone(),
            vec![candidate("out", 0, 30_000, 0.5)],
        );
    let lines = vec![
        TextLine::new("hello world", 0, 1000),
        TextLine::new("goodbye moon", 2000, 3000),
    ];

    let mut builder = TimelineBuilder::new(search, config);
    let timeline = builder.build(&lines, Some(5000)).await.unwrap();

    let ranges: Vec<(u64, u64, bool)> = timeline
        .lines
        .iter()
        .map(|l| (l.start_ms, l.end_ms, l.is_filler))
        .collect();
    assert_eq!(
        ranges,
        vec![
            (0, 1000, false),
            (1000, 2000, true),
            (2000, 3000, false),
            (3000, 5000, true),
        ]
    );
    assert_eq!(timeline.lines[1].text, "[instrumental]");
    assert_eq!(timeline.lines[3].text, "[outro]");
    assert!(timeline.is_gapless());
    assert_eq!(timeline.span_ms(), 5000);
    assert_eq!(timeline.unresolved_count(), 0);
    assert_eq!(timeline.lines[3].primary().unwrap().resource_id, "out");
    assert_no_reuse(&timeline);
}

#[tokio::test]
async fn small_gaps_are_absorbed() {
    let search = FixtureSearch::new().with("*", vec![candidate("v", 0, 60_000, 0.5)]);
    let lines = vec![
        TextLine::new("first", 200, 1000),
        TextLine::new("second", 1300, 2000),
    ];

    let mut builder = TimelineBuilder::new(search, seeded_config());
    let timeline = builder.build(&lines, Some(2400)).await.unwrap();

    let ranges: Vec<(u64, u64)> = timeline
        .lines
        .iter()
        .map(|l| (l.start_ms, l.end_ms))
        .collect();
    assert_eq!(ranges, vec![(0, 1000), (1000, 2400)]);
    assert!(timeline.lines.iter().all(|l| !l.is_filler));
}

#[tokio::test]
async fn exact_reuse_is_rejected() {
    let search = FixtureSearch::new()
        .with("one", vec![candidate("vid1", 0, 1000, 0.9)])
        .with(
            "two",
            vec![candidate("vid1", 0, 1000, 0.9), candidate("vid2", 0, 1000, 0.5)],
        );
    let lines = vec![TextLine::new("one", 0, 1000), TextLine::new("two", 1000, 2000)];

    let mut builder = TimelineBuilder::new(search, seeded_config());
    let timeline = builder.build(&lines, Some(2000)).await.unwrap();

    assert_eq!(timeline.lines[0].primary().unwrap().resource_id, "vid1");
    assert_eq!(timeline.lines[1].primary().unwrap().resource_id, "vid2");
    assert_eq!(builder.ledger().usage_count("vid1", 0, 1000), 1);
}

#[tokio::test]
async fn exhausted_line_falls_back_to_filler_search() {
    let config = AssemblyConfig {
        filler_queries: vec!["stock".to_string()],
        ..seeded_config()
    };
    let search = FixtureSearch::new()
        .with("one", vec![candidate("vid1", 0, 1000, 0.9)])
        .with("two", vec![candidate("vid1", 0, 1000, 0.9)])
        .with("stock", vec![candidate("vid3", 0, 5000, 0.1)]);
    let lines = vec![TextLine::new("one", 0, 1000), TextLine::new("two", 1000, 2000)];

    let mut builder = TimelineBuilder::new(search, config);
    let timeline = builder.build(&lines, Some(2000)).await.unwrap();

    let fill = timeline.lines[1].primary().unwrap();
    assert_eq!(fill.resource_id, "vid3");
    assert_eq!((fill.start_ms, fill.end_ms), (2000, 3000));
    assert!(builder.pool().len() >= 2);
    assert_no_reuse(&timeline);
}

#[tokio::test]
async fn unresolvable_line_keeps_its_slot() {
    let config = AssemblyConfig {
        filler_queries: vec!["nothing".to_string()],
        ..seeded_config()
    };
    let search = FixtureSearch::new().with("one", vec![candidate("vid1", 0, 500, 0.9)]);
    let lines = vec![TextLine::new("one", 0, 1000)];

    let mut builder = TimelineBuilder::new(search, config);
    let timeline = builder.build(&lines, Some(1000)).await.unwrap();

    assert_eq!(timeline.lines.len(), 1);
    assert!(timeline.lines[0].candidates.is_empty());
    assert_eq!(timeline.unresolved_count(), 1);
    assert_eq!(timeline.span_ms(), 1000);
}

#[tokio::test]
async fn no_lines_yields_one_outro() {
    let config = seeded_config();
    let search = FixtureSearch::new().with(
        config.outro_query.clone(),
        vec![candidate("out", 0, 60_000, 0.5)],
    );

    let mut builder = TimelineBuilder::new(search, config);
    let timeline = builder.build(&[], Some(7000)).await.unwrap();

    assert_eq!(timeline.lines.len(), 1);
    let line = &timeline.lines[0];
    assert!(line.is_filler);
    assert_eq!((line.start_ms, line.end_ms), (0, 7000));
    assert_eq!(line.primary().unwrap().duration_ms(), 7000);
}

#[tokio::test]
async fn lines_past_the_audio_are_dropped() {
    let search = FixtureSearch::new().with("*", vec![candidate("v", 0, 60_000, 0.5)]);
    let lines = vec![
        TextLine::new("inside", 0, 3000),
        TextLine::new("straddles", 3000, 6000),
        TextLine::new("beyond", 6000, 9000),
    ];

    let mut builder = TimelineBuilder::new(search, seeded_config());
    let timeline = builder.build(&lines, Some(5000)).await.unwrap();

    let texts: Vec<&str> = timeline.lines.iter().map(|l| l.text.as_str()).collect();
    assert_eq!(texts, vec!["inside", "straddles"]);
    assert_eq!(timeline.lines.last().unwrap().end_ms, 5000);
}

#[tokio::test]
async fn overlapping_input_lines_are_clamped() {
    let search = FixtureSearch::new().with("*", vec![candidate("v", 0, 60_000, 0.5)]);
    let lines = vec![
        TextLine::new("long", 0, 3000),
        TextLine::new("overlaps", 2000, 4000),
        TextLine::new("covered", 2500, 2900),
    ];

    let mut builder = TimelineBuilder::new(search, seeded_config());
    let timeline = builder.build(&lines, Some(4000)).await.unwrap();

    let ranges: Vec<(&str, u64, u64)> = timeline
        .lines
        .iter()
        .map(|l| (l.text.as_str(), l.start_ms, l.end_ms))
        .collect();
    assert_eq!(ranges, vec![("long", 0, 3000), ("overlaps", 3000, 4000)]);
}

#[tokio::test]
async fn long_lines_are_split() {
    let search = FixtureSearch::new().with(
        "*",
        vec![
            candidate("a", 0, 60_000, 0.5),
            candidate("b", 0, 60_000, 0.4),
            candidate("c", 0, 60_000, 0.3),
        ],
    );
    let config = AssemblyConfig {
        max_segment_ms: 4000,
        ..seeded_config()
    };
    let lines = vec![TextLine::new("a very long held note", 0, 10_000)];

    let mut builder = TimelineBuilder::new(search, config);
    let timeline = builder.build(&lines, Some(10_000)).await.unwrap();

    assert_eq!(timeline.lines.len(), 3);
    assert!(timeline.lines.iter().all(|l| l.duration_ms() <= 4000));
    assert!(timeline.is_gapless());
    assert_no_reuse(&timeline);
}

#[tokio::test]
async fn search_failure_aborts_assembly() {
    let lines = vec![TextLine::new("hello", 0, 1000)];
    let mut builder = TimelineBuilder::new(DownSearch, seeded_config());

    let err = builder.build(&lines, Some(1000)).await.unwrap_err();
    assert!(matches!(err, LyrireelError::SearchUnavailable { .. }));
}

#[tokio::test]
async fn inverted_line_is_rejected() {
    let search = FixtureSearch::new();
    let lines = vec![
        TextLine::new("fine", 0, 1000),
        TextLine::new("broken", 3000, 2000),
    ];
    let mut builder = TimelineBuilder::new(search, seeded_config());

    let err = builder.build(&lines, None).await.unwrap_err();
    assert!(matches!(err, LyrireelError::InvalidLine { line: 2, .. }));
}

#[tokio::test]
async fn same_seed_same_timeline() {
    let search = FixtureSearch::new()
        .with("one", vec![candidate("x", 0, 1000, 0.9)])
        .with("two", vec![candidate("x", 0, 1000, 0.9)])
        .with(
            "*",
            (0..8)
                .map(|k| candidate("pool", k * 3000, k * 3000 + 2500, 0.1))
                .collect(),
        );
    let lines = vec![TextLine::new("one", 0, 1000), TextLine::new("two", 1000, 2000)];

    let mut first = TimelineBuilder::new(search.clone(), seeded_config());
    let mut second = TimelineBuilder::new(search, seeded_config());
    let a = first.build(&lines, Some(2000)).await.unwrap();
    let b = second.build(&lines, Some(2000)).await.unwrap();
    assert_eq!(a, b);
}

#[tokio::test]
async fn random_inputs_stay_gapless_and_unique() {
    let mut rng = StdRng::seed_from_u64(9);
    let windows = (0..4)
        .flat_map(|r| {
            (0..30u64).map(move |k| candidate(&format!("vid{r}"), k * 9000, k * 9000 + 9000, 0.5))
        })
        .collect();
    let search = FixtureSearch::new().with("*", windows);

    for round in 0..5 {
        let mut lines = Vec::new();
        let mut t = rng.gen_range(0..3000u64);
        for i in 0..25 {
            let duration = rng.gen_range(500..12_000u64);
            lines.push(TextLine::new(format!("line {round} {i}"), t, t + duration));
            t += duration + rng.gen_range(0..3000u64);
        }
        let total = t + rng.gen_range(0..4000u64);

        let mut builder = TimelineBuilder::new(search.clone(), seeded_config());
        let timeline = builder.build(&lines, Some(total)).await.unwrap();

        assert!(timeline.is_gapless(), "round {round} has a gap");
        assert_eq!(timeline.lines.first().unwrap().start_ms, 0);
        assert_eq!(timeline.lines.last().unwrap().end_ms, total);
        assert_eq!(timeline.span_ms(), total);
        assert_no_reuse(&timeline);
        assert_clips_fit_lines(&timeline);
    }
}

#[tokio::test]
async fn tail_is_absorbed_when_last_line_is_covered() {
    let search = FixtureSearch::new().with("*", vec![candidate("v", 0, 60_000, 0.5)]);
    let lines = vec![
        TextLine::new("long", 0, 5000),
        TextLine::new("covered", 1000, 2000),
    ];

    let mut builder = TimelineBuilder::new(search, seeded_config());
    let timeline = builder.build(&lines, Some(5300)).await.unwrap();

    assert_eq!(timeline.lines.len(), 1);
    let line = &timeline.lines[0];
    assert_eq!((line.start_ms, line.end_ms), (0, 5300));
    assert_eq!(line.primary().unwrap().duration_ms(), 5300);
    assert_clips_fit_lines(&timeline);
}

#[tokio::test]
async fn clauses_split_by_character_count() {
    let search = FixtureSearch::new()
        .with("Hold me close,", vec![candidate("a", 0, 60_000, 0.5)])
        .with("never let go!", vec![candidate("b", 0, 60_000, 0.5)]);
    let lines = vec![TextLine::new("Hold me close, never let go!", 0, 2700)];

    let mut builder = TimelineBuilder::new(search, seeded_config());
    let timeline = builder.build(&lines, Some(2700)).await.unwrap();

    let ranges: Vec<(&str, u64, u64)> = timeline
        .lines
        .iter()
        .map(|l| (l.text.as_str(), l.start_ms, l.end_ms))
        .collect();
    assert_eq!(
        ranges,
        vec![("Hold me close,", 0, 1400), ("never let go!", 1400, 2700)]
    );
    assert!(timeline.lines.iter().all(|l| !l.is_filler));
    assert_eq!(timeline.unresolved_count(), 0);
    assert_clips_fit_lines(&timeline);
}

#[tokio::test]
async fn short_credit_line_becomes_filler() {
    let search = FixtureSearch::new()
        .with("hello world", vec![candidate("a", 0, 10_000, 0.9)])
        .with("*", vec![candidate("stock", 0, 30_000, 0.2)]);
    let lines = vec![
        TextLine::new("Lyrics by: Someone", 0, 2000),
        TextLine::new("hello world", 2000, 4000),
    ];

    let mut builder = TimelineBuilder::new(search, seeded_config());
    let timeline = builder.build(&lines, Some(4000)).await.unwrap();

    assert_eq!(timeline.lines.len(), 2);
    assert!(timeline.lines[0].is_filler);
    assert_eq!(timeline.lines[0].text, "Lyrics by: Someone");
    assert_eq!(timeline.lines[0].primary().unwrap().resource_id, "stock");
    assert!(!timeline.lines[1].is_filler);
    assert_eq!(timeline.lines[1].primary().unwrap().resource_id, "a");
}

#[tokio::test]
async fn long_credit_line_keeps_atmospheric_footage() {
    let config = seeded_config();
    let search = FixtureSearch::new()
        .with(
            config.atmospheric_query.clone(),
            vec![candidate("atmo", 0, 60_000, 0.6)],
        )
        .with("*", vec![candidate("other", 0, 60_000, 0.9)]);
    let lines = vec![TextLine::new("Music by: Someone, lyrics by: Another", 0, 6000)];

    let mut builder = TimelineBuilder::new(search, config);
    let timeline = builder.build(&lines, Some(6000)).await.unwrap();

    assert_eq!(timeline.lines.len(), 1);
    let line = &timeline.lines[0];
    assert!(!line.is_filler);
    assert_eq!(line.text, "Music by: Someone, lyrics by: Another");
    assert_eq!((line.start_ms, line.end_ms), (0, 6000));
    assert_eq!(line.primary().unwrap().resource_id, "atmo");
}

#[tokio::test]
async fn split_wordless_filler_never_searches_its_text() {
    let config = AssemblyConfig {
        filler_queries: vec!["stock".to_string()],
        ..seeded_config()
    };
    let search = FixtureSearch::new()
        .with("♪, wide shot", vec![candidate("junk", 0, 60_000, 0.9)])
        .with("♪, close-up detail", vec![candidate("junk", 0, 60_000, 0.9)])
        .with(
            "stock",
            (0..3)
                .map(|k| candidate(&format!("stock{k}"), 0, 60_000, 0.1))
                .collect(),
        );
    let lines = vec![TextLine::new("♪", 0, 20_000)];

    let mut builder = TimelineBuilder::new(search, config);
    let timeline = builder.build(&lines, Some(20_000)).await.unwrap();

    assert_eq!(timeline.lines.len(), 3);
    assert!(timeline.lines.iter().all(|l| l.is_filler));
    assert_eq!(timeline.unresolved_count(), 0);
    assert!(
        timeline
            .lines
            .iter()
            .all(|l| l.primary().unwrap().resource_id.starts_with("stock"))
    );
    assert_no_reuse(&timeline);
}
