use std::{
    path::PathBuf,
    sync::Arc,
    time::{Duration, Instant},
};

use anyhow::Result;
use clap::{Parser, ValueEnum};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use lyrireel_core::{
    CancelToken, ClipDownloadResult, ClipStatus, Config, LyrireelError, RenderPipeline,
    SearchBackend, Timeline, TimelineBuilder, format_render_stats, format_timeline_readable,
    get_cache_dir, get_clip_dir, get_output_path, get_stats_path, get_timeline_path, load_lines,
    load_timeline, save_stats, save_timeline, search::SearchBackendKind,
};
use tokio::fs;
use tracing_subscriber::EnvFilter;

use crate::workers::{FfmpegConcatEncoder, FfmpegSubstitutes, YtDlpFetcher, probe_duration_ms};

mod workers;

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 60.0 {
        format!("{:.1}s", secs)
    } else {
        format!("{:.0}m {:.0}s", (secs / 60.0).floor(), secs % 60.0)
    }
}

/// CLI wrapper for SearchBackendKind (needed for clap ValueEnum)
#[derive(Clone, ValueEnum)]
enum CliBackend {
    Http,
    Fixture,
}

impl From<CliBackend> for SearchBackendKind {
    fn from(cli: CliBackend) -> Self {
        match cli {
            CliBackend::Http => SearchBackendKind::Http,
            CliBackend::Fixture => SearchBackendKind::Fixture,
        }
    }
}

#[derive(Parser)]
#[command(name = "lyrireel")]
#[command(about = "Assemble a gapless footage timeline for timed lyrics and render it to video")]
struct Cli {
    /// Timed lines: an .lrc file or a JSON array of { text, start_ms, end_ms }
    lines: PathBuf,

    /// Song audio, muxed into the output and used for its duration
    #[arg(short, long)]
    audio: Option<PathBuf>,

    /// Total duration in milliseconds (overrides probing the audio)
    #[arg(short, long)]
    duration_ms: Option<u64>,

    /// JSON config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Search backend
    #[arg(short, long)]
    backend: Option<CliBackend>,

    /// Fixture file for the fixture backend
    #[arg(long)]
    fixture: Option<PathBuf>,

    /// Output video path
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Maximum concurrent clip downloads
    #[arg(short = 'j', long)]
    parallelism: Option<usize>,

    /// Maximum concurrent downloads from one video
    #[arg(long)]
    per_video_limit: Option<usize>,

    /// Retries per clip after the first attempt
    #[arg(long)]
    max_retry: Option<u32>,

    /// Directory of local stock footage used for failed clips
    #[arg(long)]
    stock_dir: Option<PathBuf>,

    /// Seed for random fill, for reproducible timelines
    #[arg(long)]
    seed: Option<u64>,

    /// Force re-assembly even if a cached timeline exists
    #[arg(short, long)]
    force: bool,

    /// Assemble and print the timeline without rendering
    #[arg(long)]
    dry_run: bool,
}

impl Cli {
    fn apply(&self, config: &mut Config) {
        if let Some(backend) = &self.backend {
            config.search.kind = backend.clone().into();
        }
        if let Some(fixture) = &self.fixture {
            config.search.fixture_path = Some(fixture.clone());
            if self.backend.is_none() {
                config.search.kind = SearchBackendKind::Fixture;
            }
        }
        if let Some(n) = self.parallelism {
            config.scheduler.max_parallelism = n;
        }
        if let Some(n) = self.per_video_limit {
            config.scheduler.per_video_limit = n;
        }
        if let Some(n) = self.max_retry {
            config.scheduler.max_retry = n;
        }
        if let Some(dir) = &self.stock_dir {
            config.render.stock_dir = Some(dir.clone());
        }
        if let Some(out) = &self.out {
            config.render.output_path = Some(out.clone());
        }
        if self.seed.is_some() {
            config.assembly.random_seed = self.seed;
        }
    }
}

fn create_spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
            .template("{spinner:.cyan} {msg}")
            .expect("valid spinner template"),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

fn create_progress_bar(len: usize) -> ProgressBar {
    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.cyan} Rendering clips [{bar:30.cyan/dim}] {pos}/{len} {msg}")
            .expect("valid progress template")
            .progress_chars("━╸ "),
    );
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

fn fail(e: impl std::fmt::Display) -> ! {
    eprintln!("{} {}", style("Error:").red().bold(), e);
    std::process::exit(1);
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("lyrireel=info,lyrireel_core=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load(path).await.unwrap_or_else(|e| fail(e)),
        None => Config::default(),
    };
    cli.apply(&mut config);
    if let Err(e) = config.validate() {
        fail(e);
    }

    // Validate API key early
    if let Err(e) = config.search.validate_api_key() {
        fail(e);
    }

    // Setup cache directory
    let cache_dir = get_cache_dir(&cli.lines.to_string_lossy());
    fs::create_dir_all(&cache_dir).await?;

    println!(
        "\n{}  {}\n",
        style("lyrireel").cyan().bold(),
        style("Lyric Video Builder").dim()
    );

    let total_start = Instant::now();

    let total_duration_ms = match (cli.duration_ms, &cli.audio) {
        (Some(ms), _) => Some(ms),
        (None, Some(audio)) => Some(probe_duration_ms(audio).await?),
        (None, None) => None,
    };

    // Step 1: Load lines
    let lines = load_lines(
        &cli.lines,
        total_duration_ms,
        config.assembly.max_segment_ms,
    )
    .await?;
    println!(
        "{} Loaded {} lines {}",
        style("✓").green().bold(),
        lines.len(),
        style(match total_duration_ms {
            Some(ms) => format!("({})", format_duration(Duration::from_millis(ms))),
            None => "(duration unknown)".to_string(),
        })
        .dim()
    );

    // Step 2: Assemble timeline (check cache)
    let step_start = Instant::now();
    let timeline_path = get_timeline_path(&cache_dir);
    let timeline: Timeline = if !cli.force && timeline_path.exists() {
        let timeline = load_timeline(&timeline_path).await?;
        println!(
            "{} Timeline assembled: {} lines {}",
            style("✓").green().bold(),
            timeline.lines.len(),
            style("(cached)").dim()
        );
        timeline
    } else {
        let spinner = create_spinner(&format!(
            "Assembling timeline with {} search...",
            config.search.kind.name()
        ));
        let search = SearchBackend::from_config(&config.search).await?;
        let mut builder = TimelineBuilder::new(search, config.assembly.clone());
        let timeline = builder.build(&lines, total_duration_ms).await?;
        save_timeline(&timeline, &timeline_path).await?;

        let fillers = timeline.lines.iter().filter(|l| l.is_filler).count();
        spinner.finish_with_message(format!(
            "{} Timeline assembled: {} lines, {} fillers, {} unresolved {}",
            style("✓").green().bold(),
            timeline.lines.len(),
            fillers,
            style(timeline.unresolved_count()).yellow(),
            style(format!("[{}]", format_duration(step_start.elapsed()))).dim()
        ));
        timeline
    };

    println!("{}", style("─".repeat(60)).dim());
    print!("{}", format_timeline_readable(&timeline));
    println!("{}", style("─".repeat(60)).dim());

    if cli.dry_run {
        println!(
            "\n{} {}\n",
            style("Saved:").dim(),
            style(timeline_path.display()).cyan()
        );
        return Ok(());
    }

    // Step 3: Render
    let clip_dir = config
        .render
        .clip_dir
        .clone()
        .unwrap_or_else(|| get_clip_dir(&cache_dir));
    let output_path = config
        .render
        .output_path
        .clone()
        .unwrap_or_else(|| get_output_path(&cache_dir));

    let pipeline = RenderPipeline::new(
        YtDlpFetcher::new(),
        FfmpegSubstitutes::new(config.render.stock_dir.clone()),
        FfmpegConcatEncoder::new(cli.audio.clone()),
        config.scheduler.clone(),
        clip_dir,
    );
    let (tasks, _) = pipeline.build_tasks(&timeline);
    let progress = create_progress_bar(tasks.len());
    let hook_progress = progress.clone();
    let pipeline = pipeline.on_finished(Arc::new(move |result: &ClipDownloadResult| {
        hook_progress.inc(1);
        if result.status == ClipStatus::Failed {
            hook_progress.set_message(format!("clip {} failed", result.task.index));
        }
    }));

    let cancel = CancelToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    let step_start = Instant::now();
    let outcome = match pipeline.render(&timeline, &output_path, &cancel).await {
        Ok(outcome) => outcome,
        Err(LyrireelError::Cancelled) => {
            progress.abandon_with_message("cancelled");
            eprintln!("{} Render cancelled", style("✗").yellow().bold());
            std::process::exit(130);
        }
        Err(e) => {
            progress.abandon();
            fail(e);
        }
    };
    progress.finish_and_clear();
    println!(
        "{} Rendered {} clips, {} substituted {}",
        style("✓").green().bold(),
        outcome.stats.total_tasks,
        style(outcome.stats.substituted()).yellow(),
        style(format!("[{}]", format_duration(step_start.elapsed()))).dim()
    );

    let stats_path = get_stats_path(&cache_dir);
    save_stats(&outcome.stats, &stats_path).await?;

    println!(
        "\n{} {}\n",
        style("Total time:").dim(),
        style(format_duration(total_start.elapsed())).cyan().bold()
    );
    print!("{}", format_render_stats(&outcome.stats));
    println!(
        "\n{} {}\n",
        style("Saved:").dim(),
        style(outcome.output.display()).cyan()
    );

    Ok(())
}
