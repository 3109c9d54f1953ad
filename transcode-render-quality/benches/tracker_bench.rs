//! Render quality tracker benchmarks.
//!
//! Per-frame cost of the event path and the cost of a metrics snapshot.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use transcode_render_quality::{
    Histogram, ManualClock, RenderQualityConfig, RenderQualityTracker,
};

/// Frame pattern for one benchmark case: `true` renders, `false` drops.
fn pattern(name: &str, frames: usize) -> Vec<bool> {
    match name {
        "gapless" => vec![true; frames],
        // one drop every 10 frames
        "drops" => (0..frames).map(|i| i % 10 != 9).collect(),
        _ => unreachable!(),
    }
}

fn play(frames: &[bool], render_steps_us: &[i64]) -> RenderQualityTracker<ManualClock> {
    let mut tracker =
        RenderQualityTracker::with_clock(RenderQualityConfig::default(), ManualClock::new(0));
    let mut render_us = 0;
    for (i, &rendered) in frames.iter().enumerate() {
        let content_us = i as i64 * 41_666;
        tracker.on_frame_released_at(content_us, render_us * 1000);
        if rendered {
            tracker.on_frame_rendered(content_us, render_us * 1000);
        }
        render_us += render_steps_us[i % render_steps_us.len()];
    }
    tracker
}

// ============================================================================
// Event Path Benchmarks
// ============================================================================

fn bench_event_path(c: &mut Criterion) {
    let mut group = c.benchmark_group("event_path");
    let frames = 10_000;

    // 24fps shown with 3:2 pulldown, and 30fps with a late frame
    let cadences: [(&str, &[i64]); 2] = [
        ("pulldown", &[50_000, 33_333]),
        ("late_frame", &[33_333, 33_333, 50_000, 16_667]),
    ];

    for pattern_name in ["gapless", "drops"] {
        let frames_pattern = pattern(pattern_name, frames);
        for (cadence_name, steps) in cadences {
            group.throughput(Throughput::Elements(frames as u64));
            group.bench_with_input(
                BenchmarkId::new(pattern_name, cadence_name),
                &frames_pattern,
                |b, frames_pattern| {
                    b.iter(|| play(black_box(frames_pattern), black_box(steps)));
                },
            );
        }
    }

    group.finish();
}

// ============================================================================
// Snapshot Benchmarks
// ============================================================================

fn bench_metrics_snapshot(c: &mut Criterion) {
    let tracker = play(&pattern("drops", 10_000), &[33_333, 33_333, 50_000, 16_667]);

    c.bench_function("metrics_snapshot", |b| {
        b.iter(|| black_box(&tracker).metrics());
    });
}

fn bench_histogram_insert(c: &mut Criterion) {
    let boundaries = [1, 20, 40, 60, 80, 100, 120, 150, 175, 225, 300, 400, 500];

    c.bench_function("histogram_insert", |b| {
        let mut histogram = Histogram::new(&boundaries);
        let mut value = 0i64;
        b.iter(|| {
            value = (value + 37) % 600;
            histogram.insert(black_box(value));
        });
    });
}

criterion_group!(
    benches,
    bench_event_path,
    bench_metrics_snapshot,
    bench_histogram_insert
);
criterion_main!(benches);
