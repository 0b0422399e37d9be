//! Benchmarks for the per-tick tracking path

use blobtrack::{
    AdaptationConfig, AssociatorConfig, ChannelStats, DetectionCandidate, DetectionRequest,
    DetectionSource, FeatureAssociator, Norm, PixelRect, Rect, RegionPredictor, RegionStatistics,
    RoiConfig, ThresholdAdapter, ThresholdUpdate, Thresholds, Tracker, TrackerConfig,
};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::Rng;
use std::hint::black_box;

fn create_test_candidates(n_candidates: usize, frame: usize) -> Vec<DetectionCandidate> {
    (0..n_candidates)
        .map(|i| {
            let x = (frame * 2 + i * 25) as f32;
            let y = (frame + i * 15) as f32;
            DetectionCandidate::new(Rect::new(x, y, 20.0, 18.0), 0.0, 1).with_shape(0.7, 0.8)
        })
        .collect()
}

/// Replays a fixed list of frames forever
struct LoopingSource {
    frames: Vec<Vec<DetectionCandidate>>,
    next: usize,
    stats: RegionStatistics,
}

impl LoopingSource {
    fn new(frames: Vec<Vec<DetectionCandidate>>) -> Self {
        Self {
            frames,
            next: 0,
            stats: RegionStatistics::new(vec![
                ChannelStats {
                    mean: 120.0,
                    stdev: 4.0,
                };
                3
            ]),
        }
    }
}

impl DetectionSource for LoopingSource {
    fn detect(&mut self, _request: &DetectionRequest<'_>) -> anyhow::Result<Vec<DetectionCandidate>> {
        let frame = self.frames[self.next % self.frames.len()].clone();
        self.next += 1;
        Ok(frame)
    }

    fn region_statistics(&self, _rect: PixelRect) -> anyhow::Result<RegionStatistics> {
        Ok(self.stats.clone())
    }

    fn frame_size(&self) -> (u32, u32) {
        (320, 240)
    }

    fn name(&self) -> &str {
        "looping"
    }
}

fn bench_associator_update(c: &mut Criterion) {
    let mut group = c.benchmark_group("associator_update");

    for &n_candidates in &[1, 5, 20, 100] {
        let frames: Vec<_> = (0..10).map(|f| create_test_candidates(n_candidates, f)).collect();

        for norm in [Norm::L1, Norm::L2] {
            group.bench_with_input(
                BenchmarkId::new(format!("{:?}", norm), n_candidates),
                &frames,
                |b, frames| {
                    b.iter_batched(
                        || {
                            let mut assoc = FeatureAssociator::new(
                                0,
                                AssociatorConfig {
                                    norm,
                                    feature_dist_threshold: 300.0,
                                    window_size: 3,
                                },
                            );
                            assoc.reinit(frames[0][0].clone());
                            assoc
                        },
                        |mut assoc| {
                            for frame in frames {
                                black_box(assoc.update(black_box(frame)));
                            }
                        },
                        criterion::BatchSize::SmallInput,
                    )
                },
            );
        }
    }
    group.finish();
}

fn bench_region_update(c: &mut Criterion) {
    let mut rng = rand::rng();
    let detections: Vec<Option<Rect>> = (0..1000)
        .map(|_| {
            rng.random_bool(0.7).then(|| {
                Rect::new(
                    rng.random_range(0.0..300.0),
                    rng.random_range(0.0..220.0),
                    rng.random_range(5.0..60.0),
                    rng.random_range(5.0..60.0),
                )
            })
        })
        .collect();

    c.bench_function("region_update_1000", |b| {
        b.iter_batched(
            || RegionPredictor::new(Rect::new(0.0, 0.0, 320.0, 240.0), RoiConfig::default()),
            |mut roi| {
                for det in &detections {
                    roi.update(black_box(det.as_ref()));
                    black_box(roi.get_roi());
                }
            },
            criterion::BatchSize::SmallInput,
        )
    });
}

fn bench_threshold_update(c: &mut Criterion) {
    let baseline = vec![
        Thresholds::from_pairs(&[(100.0, 140.0), (20.0, 60.0), (0.0, 40.0)]),
        Thresholds::from_pairs(&[(30.0, 70.0), (90.0, 130.0), (0.0, 40.0)]),
    ];
    let stats = RegionStatistics::new(vec![
        ChannelStats {
            mean: 120.0,
            stdev: 5.0,
        };
        3
    ]);
    let config = AdaptationConfig {
        enabled: true,
        rate: 0.1,
        stdev_multiplier: 3.0,
    };

    c.bench_function("threshold_fresh_recall", |b| {
        b.iter_batched(
            || ThresholdAdapter::new(baseline.clone(), config.clone()).unwrap(),
            |mut adapter| {
                for _ in 0..100 {
                    adapter
                        .update(ThresholdUpdate::Fresh {
                            stats: black_box(&stats),
                            code: 0b01,
                        })
                        .unwrap();
                    adapter.update(ThresholdUpdate::Recall).unwrap();
                }
            },
            criterion::BatchSize::SmallInput,
        )
    });
}

fn bench_tracker_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("tracker_tick");

    for &n_candidates in &[1, 10, 50] {
        let mut frames: Vec<_> = (0..20).map(|f| create_test_candidates(n_candidates, f)).collect();
        // A few empty frames exercise the coasting path
        frames[5].clear();
        frames[12].clear();

        group.bench_with_input(
            BenchmarkId::new("candidates", n_candidates),
            &frames,
            |b, frames| {
                b.iter_batched(
                    || {
                        let thresholds =
                            vec![Thresholds::from_pairs(&[(100.0, 140.0), (20.0, 60.0), (0.0, 40.0)])];
                        Tracker::new(
                            LoopingSource::new(frames.clone()),
                            thresholds,
                            TrackerConfig::balloon(),
                        )
                        .unwrap()
                    },
                    |mut tracker| {
                        for _ in 0..frames.len() {
                            black_box(tracker.tick().unwrap());
                        }
                    },
                    criterion::BatchSize::SmallInput,
                )
            },
        );
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_associator_update,
    bench_region_update,
    bench_threshold_update,
    bench_tracker_tick
);
criterion_main!(benches);
