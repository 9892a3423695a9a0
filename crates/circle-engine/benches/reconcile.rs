//! Checkpoint and session benchmarks.
//!
//! # Running Benchmarks
//! ```bash
//! cargo bench --package circle-engine --bench reconcile
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::time::Duration;

use circle_engine::{
    AngularOrder, HistoryBook, NullVisualizer, OverlayResolver, ReconciliationEngine,
    ReplayScript, RoiLog, TrackingConfig, TrackingSession,
};
use circle_models::{BoundingBox, FrameSize, IdentityId, SeedSet, TempTrack};

const FRAME: u32 = 1280;

/// `n` evenly seated identities, 400px from the frame center.
fn seated(n: usize) -> Vec<(String, [f64; 4])> {
    let center = FRAME as f64 / 2.0;
    (0..n)
        .map(|i| {
            let rad = (i as f64 * 360.0 / n as f64).to_radians();
            let cx = center + 400.0 * rad.cos();
            let cy = center - 400.0 * rad.sin();
            (format!("p{i:02}"), [cx - 20.0, cy - 20.0, 40.0, 40.0])
        })
        .collect()
}

fn to_track(seats: &[(String, [f64; 4])]) -> TempTrack {
    seats
        .iter()
        .map(|(label, b)| (IdentityId::from(label.as_str()), BoundingBox::from(*b)))
        .collect()
}

fn bench_reconcile(c: &mut Criterion) {
    let mut group = c.benchmark_group("reconcile");
    group.warm_up_time(Duration::from_secs(1));
    group.measurement_time(Duration::from_secs(3));

    let frame = FrameSize {
        width: FRAME,
        height: FRAME,
    };
    let config = TrackingConfig::default();

    for n in [4, 8, 16, 32] {
        let seats = seated(n);
        let seeds = to_track(&seats);
        let order = AngularOrder::from_seeds(&seeds, frame);
        let engine = ReconciliationEngine::new(&config, &order, frame);

        // Every tracker drifted a little; one lost entirely.
        let mut drifted = TempTrack::new();
        for (i, (id, bbox)) in seeds.iter().enumerate() {
            let moved = if i == 0 {
                BoundingBox::new(10.0, 10.0, bbox.width, bbox.height)
            } else {
                BoundingBox::new(bbox.x + 6.0, bbox.y - 4.0, bbox.width, bbox.height)
            };
            drifted.set(id.clone(), moved);
        }
        let detections: Vec<BoundingBox> = seeds.iter().map(|(_, b)| *b).collect();

        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::new("checkpoint", n), &detections, |b, dets| {
            b.iter(|| {
                let mut track = drifted.clone();
                let report = engine.reconcile(black_box(dets), &mut track);
                black_box(report)
            })
        });
    }

    group.finish();
}

fn bench_overlay(c: &mut Criterion) {
    let mut group = c.benchmark_group("overlay");
    let config = TrackingConfig::default();
    let resolver = OverlayResolver::new(&config);

    for n in [8, 16, 32] {
        let seeds = to_track(&seated(n));
        let history = HistoryBook::from_seeds(
            &SeedSet::from_pairs(seeds.iter().map(|(id, b)| (id.clone(), *b))).expect("valid seeds"),
        );

        // Every other tracker jumped onto its clockwise neighbour.
        let boxes: Vec<BoundingBox> = seeds.iter().map(|(_, b)| *b).collect();
        let mut proposal = TempTrack::new();
        for (i, (id, _)) in seeds.iter().enumerate() {
            let target = if i % 2 == 0 { boxes[(i + 1) % n] } else { boxes[i] };
            proposal.set(id.clone(), target);
        }

        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::new("resolve", n), &proposal, |b, proposal| {
            b.iter(|| {
                let mut track = proposal.clone();
                black_box(resolver.resolve(&mut track, &history))
            })
        });
    }

    group.finish();
}

fn bench_session(c: &mut Criterion) {
    let mut group = c.benchmark_group("session");
    group.sample_size(20);

    for parallel in [false, true] {
        let seats = seated(16);
        let script = ReplayScript::still(
            FRAME,
            FRAME,
            200,
            seats.iter().map(|(l, b)| (l.as_str(), *b)),
        )
        .expect("valid script");
        let config = TrackingConfig {
            parallel_trackers: parallel,
            ..Default::default()
        };

        group.throughput(Throughput::Elements(199));
        group.bench_function(
            BenchmarkId::new("still_200_frames", if parallel { "parallel" } else { "sequential" }),
            |b| {
                b.iter(|| {
                    let mut session = TrackingSession::new(
                        config.clone(),
                        script.seeds.clone(),
                        script.frame_source(),
                        script.tracker_factory(RoiLog::default()),
                        script.detector(),
                        NullVisualizer,
                    )
                    .expect("session setup");
                    black_box(session.run().expect("session run"))
                })
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_overlay, bench_reconcile, bench_session);
criterion_main!(benches);
