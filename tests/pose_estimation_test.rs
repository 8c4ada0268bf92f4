//! Pose estimation tests on synthetic face meshes


use head_gesture_control::{config::PoseConfig, pose_estimation::PoseEstimator};
use test_helpers::{assert_close, FaceBuilder};

/// Yaw and roll requested from the builder are recovered
#[test]
fn test_pose_recovered_from_mesh() {
    let estimator = PoseEstimator::default();
    for (yaw, roll) in [(0.0, 0.0), (20.0, 0.0), (-35.0, 10.0), (12.0, -25.0)] {
        let reading = estimator.estimate(&FaceBuilder::new().yaw(yaw).roll(roll).frame());
        assert_close(reading.yaw.unwrap(), yaw, 1e-6);
        assert_close(reading.roll.unwrap(), roll, 1e-6);
    }
}

/// Estimates do not depend on the frame resolution
#[test]
fn test_resolution_independent() {
    let estimator = PoseEstimator::default();
    let mut face = FaceBuilder::new().yaw(15.0).roll(5.0);
    face.width = 1280;
    face.height = 960;
    let sample = estimator.estimate(&face.frame()).sample().unwrap();
    assert_close(sample.yaw, 15.0, 1e-6);
    assert_close(sample.roll, 5.0, 1e-6);
}

/// A tiny face yields no yaw but still a roll
#[test]
fn test_tiny_face_yaw_fails_per_axis() {
    let estimator = PoseEstimator::default();
    let reading = estimator.estimate(&FaceBuilder::new().eye_half_span(4.0).yaw(10.0).frame());
    assert!(reading.yaw.is_none());
    assert!(reading.roll.is_some());
    assert!(reading.sample().is_none());
}

/// Scale and limit come from the configuration
#[test]
fn test_configured_scale_and_limit() {
    let estimator = PoseEstimator::new(&PoseConfig {
        min_eye_width_px: 10.0,
        yaw_scale: 100.0,
        yaw_limit: 30.0,
    });
    // 10 units at the default scale is 20 at scale 100
    let yaw = estimator.estimate_yaw(&FaceBuilder::new().yaw(10.0).frame()).unwrap();
    assert_close(yaw, 20.0, 1e-6);
    let yaw = estimator.estimate_yaw(&FaceBuilder::new().yaw(25.0).frame()).unwrap();
    assert_close(yaw, 30.0, 1e-9);
}
