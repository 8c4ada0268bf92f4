//! Benchmarks for the per-frame pipeline

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use head_gesture_control::{
    broadcast::OutboundEvent,
    config::Config,
    constants::{
        L_BROW, L_EYE_DN, L_EYE_IN, L_EYE_OUT, L_EYE_UP, MOUTH_DN, MOUTH_L, MOUTH_R, MOUTH_UP, NOSE_TIP,
        NUM_FACE_MESH_LANDMARKS, R_EYE_DN, R_EYE_IN, R_EYE_OUT, R_EYE_UP,
    },
    filters::median,
    gestures::GestureRatios,
    landmarks::LandmarkFrame,
    pose_estimation::PoseEstimator,
    tracker::Tracker,
};

/// Rough face in normalized coordinates with a little detector jitter
fn noisy_face(nose_x: f64) -> LandmarkFrame {
    let jitter = || (rand::random::<f64>() - 0.5) * 0.002;
    let mut points = vec![(0.5, 0.45); NUM_FACE_MESH_LANDMARKS];
    let layout = [
        (L_EYE_OUT, 0.40, 0.40),
        (R_EYE_OUT, 0.60, 0.40),
        (L_EYE_IN, 0.47, 0.40),
        (R_EYE_IN, 0.53, 0.40),
        (L_EYE_UP, 0.435, 0.39),
        (L_EYE_DN, 0.435, 0.41),
        (R_EYE_UP, 0.565, 0.39),
        (R_EYE_DN, 0.565, 0.41),
        (L_BROW, 0.435, 0.35),
        (NOSE_TIP, nose_x, 0.47),
        (MOUTH_L, 0.45, 0.60),
        (MOUTH_R, 0.55, 0.60),
        (MOUTH_UP, 0.50, 0.595),
        (MOUTH_DN, 0.50, 0.605),
    ];
    for (index, x, y) in layout {
        points[index] = (x + jitter(), y + jitter());
    }
    LandmarkFrame::from_normalized(&points, 640, 480).unwrap()
}

fn benchmark_estimation(c: &mut Criterion) {
    let mut group = c.benchmark_group("estimation");
    let frame = noisy_face(0.52);
    let estimator = PoseEstimator::default();

    group.bench_function("pose", |b| b.iter(|| black_box(estimator.estimate(black_box(&frame)))));
    group.bench_function("gesture_ratios", |b| {
        b.iter(|| black_box(GestureRatios::measure(black_box(&frame))));
    });

    group.finish();
}

fn benchmark_tracker(c: &mut Criterion) {
    let mut group = c.benchmark_group("tracker");

    for frames in [30, 300] {
        let sequence: Vec<LandmarkFrame> = (0..frames)
            .map(|i| noisy_face(0.5 + 0.03 * (f64::from(i) * 0.1).sin()))
            .collect();

        group.bench_with_input(BenchmarkId::new("tick_sequence", frames), &sequence, |b, sequence| {
            b.iter(|| {
                let mut tracker = Tracker::new(&Config::default());
                for (i, frame) in sequence.iter().enumerate() {
                    black_box(tracker.tick(Some(frame), i as f64 / 30.0));
                }
                tracker.snapshot()
            });
        });
    }

    group.finish();
}

fn benchmark_support(c: &mut Criterion) {
    let mut group = c.benchmark_group("support");

    let samples: Vec<f64> = (0..45).map(|_| rand::random::<f64>() * 60.0 - 30.0).collect();
    group.bench_function("median_45", |b| b.iter(|| black_box(median(black_box(&samples)))));

    let event = OutboundEvent::Select { x_pct: 33.3333, y_pct: 66.6666 };
    group.bench_function("event_json", |b| b.iter(|| black_box(event.to_json())));

    group.finish();
}

criterion_group!(benches, benchmark_estimation, benchmark_tracker, benchmark_support);
criterion_main!(benches);
