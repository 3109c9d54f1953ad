//! Render Replay - replay recorded frame lifecycle traces through the render
//! quality tracker and report the resulting metrics.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use console::style;
use tracing::{debug, info, warn};
use transcode_render_quality::{
    parse_event, ManualClock, RenderEvent, RenderQualityConfig, RenderQualityTracker,
    VideoRenderQualityMetrics,
};

/// Command-line arguments for the replay tool.
#[derive(Parser, Debug)]
#[command(name = "render-replay")]
#[command(version)]
#[command(about = "Replay a frame lifecycle trace and report video render quality")]
#[command(long_about = "Replays a JSON-lines trace of frame events (tunnel_queued, released, \n\
    skipped, rendered, discontinuity, clear) through the render quality tracker.\n\n\
    EXAMPLES:\n    \
    render-replay session.jsonl\n    \
    render-replay session.jsonl --config render_metrics.json\n    \
    render-replay session.jsonl --json")]
struct Args {
    /// Trace file (one JSON event per line)
    trace: PathBuf,

    /// Tracker configuration file (JSON, missing fields take defaults)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose output (log every freeze and discontinuity)
    #[arg(short, long, conflicts_with = "json")]
    verbose: bool,

    /// JSON output mode for programmatic parsing
    #[arg(long, conflicts_with = "verbose")]
    json: bool,

    /// Skip trace lines that cannot be parsed instead of failing
    #[arg(long)]
    lenient: bool,
}

/// Outcome of replaying a trace.
struct Replay {
    metrics: VideoRenderQualityMetrics,
    events: usize,
    skipped_lines: usize,
}

fn load_config(path: Option<&Path>) -> anyhow::Result<RenderQualityConfig> {
    match path {
        Some(path) => RenderQualityConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(RenderQualityConfig::default()),
    }
}

fn replay<R: BufRead>(
    reader: R,
    config: RenderQualityConfig,
    lenient: bool,
) -> anyhow::Result<Replay> {
    // Releases without a desired render time are stamped with the latest
    // render time seen, which is the best wall clock a trace offers.
    let clock = ManualClock::new(0);
    let mut tracker = RenderQualityTracker::with_clock(config, clock.clone());
    let mut events = 0;
    let mut skipped_lines = 0;

    for (idx, line) in reader.lines().enumerate() {
        let line = line.context("Failed to read trace")?;
        let event = match parse_event(idx + 1, &line) {
            Ok(Some(event)) => event,
            Ok(None) => continue,
            Err(e) if lenient && e.is_recoverable() => {
                warn!("Skipping trace line: {}", e);
                skipped_lines += 1;
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        if let RenderEvent::Rendered {
            actual_render_time_ns,
            ..
        } = event
        {
            clock.set_us(actual_render_time_ns / 1000);
        }
        debug!(line = idx + 1, ?event, "Applying event");
        tracker.apply(&event);
        events += 1;
    }

    Ok(Replay {
        metrics: tracker.metrics(),
        events,
        skipped_lines,
    })
}

fn print_summary(trace: &Path, replay: &Replay) {
    let m = &replay.metrics;
    println!();
    println!("{}", style("Render Quality Report").cyan().bold());
    println!("  Trace:        {}", style(trace.display()).white());
    println!("  Events:       {}", style(replay.events).white());
    if replay.skipped_lines > 0 {
        println!(
            "  Bad lines:    {}",
            style(replay.skipped_lines).yellow()
        );
    }
    println!();
    println!("{}", style("Frames").bold());
    println!("  Released:     {}", m.frame_released_count);
    println!("  Rendered:     {}", m.frame_rendered_count);
    println!("  Dropped:      {}", m.frame_dropped_count);
    println!("  Skipped:      {}", m.frame_skipped_count);
    if let Some(first_us) = m.first_render_time_us {
        println!("  First render: {} us", first_us);
    }
    println!();
    println!("{}", style("Frame Rate").bold());
    println!("  Content:      {}", m.content_frame_rate);
    println!("  Desired:      {}", m.desired_frame_rate);
    println!("  Actual:       {}", m.actual_frame_rate);
    println!();
    println!("{}", style("Freezes").bold());
    println!("  Score:        {}", score_style(m.freeze_score));
    println!("  Rate:         {:.2}%", m.freeze_rate * 100.0);
    print_histogram("Durations ms", &m.freeze_duration_ms_histogram);
    print_histogram("Distances ms", &m.freeze_distance_ms_histogram);
    println!();
    println!("{}", style("Judder").bold());
    println!("  Score:        {}", score_style(m.judder_score));
    println!("  Rate:         {:.2}%", m.judder_rate * 100.0);
    print_histogram("Scores", &m.judder_score_histogram);
    println!();
}

fn print_histogram(label: &str, histogram: &transcode_render_quality::Histogram) {
    match (histogram.min(), histogram.max(), histogram.average()) {
        (Some(min), Some(max), Some(avg)) => println!(
            "  {:<13} [{}] min={} max={} avg={}",
            format!("{label}:"),
            histogram.emit(),
            min,
            max,
            avg
        ),
        _ => println!("  {:<13} none", format!("{label}:")),
    }
}

fn score_style(score: i64) -> console::StyledObject<i64> {
    if score == 0 {
        style(score).green()
    } else {
        style(score).yellow()
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Keep stdout clean for JSON consumers
    if !args.json {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(if args.verbose {
                tracing::Level::DEBUG
            } else {
                tracing::Level::INFO
            })
            .with_target(false)
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }

    let config = load_config(args.config.as_deref())?;
    let file = File::open(&args.trace)
        .with_context(|| format!("Failed to open trace {}", args.trace.display()))?;
    info!(trace = %args.trace.display(), "Replaying trace");

    let outcome = replay(BufReader::new(file), config, args.lenient)?;

    if args.json {
        let output = serde_json::json!({
            "trace": args.trace.display().to_string(),
            "events": outcome.events,
            "skipped_lines": outcome.skipped_lines,
            "metrics": outcome.metrics,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_summary(&args.trace, &outcome);
    }

    Ok(())
}
