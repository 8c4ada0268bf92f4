//! Gesture state machine tests: edges, cooldowns, baselines and windows


use head_gesture_control::{
    config::GestureConfig,
    gestures::{brow::BrowState, GestureEvent, GestureRatios, GestureStateMachine, Mode},
};
use test_helpers::{assert_close, FaceBuilder};

fn neutral() -> GestureRatios {
    GestureRatios {
        mouth: 0.05,
        brow: 0.5,
        left_eye: 0.3,
        right_eye: 0.3,
    }
}

fn machine() -> GestureStateMachine {
    GestureStateMachine::new(&GestureConfig::default())
}

/// Close both eyes at each time, reopening 50 ms later; collects every event
fn blink_at(gestures: &mut GestureStateMachine, times: &[f64]) -> Vec<GestureEvent> {
    let closed = GestureRatios {
        left_eye: 0.1,
        right_eye: 0.1,
        ..neutral()
    };
    let mut events = Vec::new();
    for &t in times {
        events.extend(gestures.update(&closed, 50.0, t));
        events.extend(gestures.update(&neutral(), 50.0, t + 0.05));
    }
    events
}

/// Learn the brow baseline from neutral frames, ending at `t`
fn learn_baseline(gestures: &mut GestureStateMachine, t: f64) {
    for i in 0..GestureConfig::default().brow_baseline_frames {
        gestures.update(&neutral(), 50.0, t + 0.001 * i as f64);
    }
    assert!(gestures.brow_baseline().is_some());
}

/// Ratios measured from a mesh match what the builder laid out
#[test]
fn test_measure_ratios() {
    let face = FaceBuilder::new().mouth(0.6).left_eye(0.1).brow(0.7);
    let ratios = GestureRatios::measure(&face.frame()).unwrap();
    assert_close(ratios.mouth, 0.6, 1e-6);
    assert_close(ratios.left_eye, 0.1, 1e-6);
    assert_close(ratios.right_eye, 0.3, 1e-6);
    assert_close(ratios.brow, 0.7, 1e-6);
}

/// Three blinks inside the window advance the mode exactly once
#[test]
fn test_triple_blink_cycles_mode() {
    let mut gestures = machine();
    let events = blink_at(&mut gestures, &[10.0, 10.3, 10.6]);
    assert_eq!(events, vec![GestureEvent::ModeChange(Mode::Move)]);
    assert_eq!(gestures.mode(), Mode::Move);
    assert!(gestures.triple_blink_active(10.7));
    assert!(!gestures.triple_blink_active(11.0));
}

/// Three blinks spread wider than the window do nothing
#[test]
fn test_spread_blinks_no_mode_change() {
    let mut gestures = machine();
    assert!(blink_at(&mut gestures, &[10.0, 10.7, 11.5]).is_empty());
    assert_eq!(gestures.mode(), Mode::Cursor);
}

/// Repeated triples walk the full cycle
#[test]
fn test_mode_cycle_wraps() {
    let mut gestures = machine();
    let mut modes = Vec::new();
    for start in [0.0, 5.0, 10.0] {
        for event in blink_at(&mut gestures, &[start, start + 0.2, start + 0.4]) {
            if let GestureEvent::ModeChange(mode) = event {
                modes.push(mode);
            }
        }
    }
    assert_eq!(modes, vec![Mode::Move, Mode::StageRotate, Mode::Cursor]);
}

/// A fourth quick blink does not re-trigger with blinks already counted
#[test]
fn test_fourth_blink_does_not_retrigger() {
    let mut gestures = machine();
    let events = blink_at(&mut gestures, &[0.0, 0.2, 0.4, 0.6]);
    assert_eq!(events.len(), 1);
}

/// Face absence between closed frames breaks the run
#[test]
fn test_face_absence_resets_blink_runs() {
    let config = GestureConfig {
        blink_min_frames: 2,
        ..GestureConfig::default()
    };
    let mut gestures = GestureStateMachine::new(&config);
    let closed = GestureRatios {
        left_eye: 0.1,
        right_eye: 0.1,
        ..neutral()
    };
    for (i, t) in [0.0, 0.3, 0.6].into_iter().enumerate() {
        gestures.update(&closed, 50.0, t);
        gestures.clear();
        let events = gestures.update(&closed, 50.0, t + 0.03);
        assert!(events.is_empty(), "blink {i} fired {events:?}");
        gestures.update(&neutral(), 50.0, t + 0.1);
    }
    assert_eq!(gestures.blink().timestamps().count(), 0);
}

/// Eyes held shut through detector dropouts are one blink, not three
#[test]
fn test_held_blink_through_dropouts() {
    let mut gestures = GestureStateMachine::new(&GestureConfig::default());
    let closed = GestureRatios {
        left_eye: 0.1,
        right_eye: 0.1,
        ..neutral()
    };
    let mut events = Vec::new();
    for t in [0.0, 0.1, 0.2] {
        events.extend(gestures.update(&closed, 50.0, t));
        gestures.clear();
    }
    events.extend(gestures.update(&closed, 50.0, 0.3));
    assert!(events.is_empty(), "{events:?}");
    assert_eq!(gestures.mode(), Mode::Cursor);
    assert_eq!(gestures.blink().timestamps().count(), 1);
}

/// Two mouth edges inside the cooldown fire once; outside it, twice
#[test]
fn test_select_cooldown() {
    let open = GestureRatios { mouth: 0.6, ..neutral() };

    let mut gestures = machine();
    let mut fired = gestures.update(&open, 50.0, 0.0);
    gestures.update(&neutral(), 50.0, 0.1);
    fired.extend(gestures.update(&open, 50.0, 0.3));
    assert_eq!(fired, vec![GestureEvent::Select]);

    let mut gestures = machine();
    let mut fired = gestures.update(&open, 50.0, 0.0);
    gestures.update(&neutral(), 50.0, 0.1);
    fired.extend(gestures.update(&open, 50.0, 0.7));
    assert_eq!(fired, vec![GestureEvent::Select, GestureEvent::Select]);
}

/// The cursor position picks click or select
#[test]
fn test_click_near_bottom() {
    let open = GestureRatios { mouth: 0.6, ..neutral() };
    let mut gestures = machine();
    assert_eq!(gestures.update(&open, 90.0, 0.0), vec![GestureEvent::Click]);
    let mut gestures = machine();
    assert_eq!(gestures.update(&open, 50.0, 0.0), vec![GestureEvent::Select]);
}

/// Once learned the brow baseline never moves
#[test]
fn test_brow_baseline_immutable() {
    let mut gestures = machine();
    learn_baseline(&mut gestures, 0.0);
    let baseline = gestures.brow_baseline();

    let raised = GestureRatios { brow: 0.9, ..neutral() };
    for i in 0..500 {
        gestures.update(&raised, 50.0, 1.0 + f64::from(i) / 30.0);
    }
    let lowered = GestureRatios { brow: 0.2, ..neutral() };
    for i in 0..500 {
        gestures.update(&lowered, 50.0, 20.0 + f64::from(i) / 30.0);
    }
    assert_eq!(gestures.brow_baseline(), baseline);
}

/// A sustained raise deletes once; it must drop before deleting again
#[test]
fn test_brow_hold_deletes_once() {
    let mut gestures = machine();
    learn_baseline(&mut gestures, 0.0);
    let raised = GestureRatios { brow: 0.6, ..neutral() };

    let mut deletes = 0;
    for i in 0..60 {
        deletes += gestures
            .update(&raised, 50.0, 1.0 + f64::from(i) / 30.0)
            .iter()
            .filter(|e| **e == GestureEvent::Delete)
            .count();
    }
    assert_eq!(deletes, 1);
    assert_eq!(gestures.brow().state(), BrowState::Fired);

    gestures.update(&neutral(), 50.0, 3.1);
    assert_eq!(gestures.brow().state(), BrowState::Idle);
}

/// An open mouth masks a raised brow
#[test]
fn test_open_mouth_suppresses_brow() {
    let mut gestures = machine();
    learn_baseline(&mut gestures, 0.0);
    let both = GestureRatios {
        mouth: 0.6,
        brow: 0.8,
        ..neutral()
    };
    for i in 0..60 {
        let events = gestures.update(&both, 50.0, 1.0 + f64::from(i) / 30.0);
        assert!(!events.contains(&GestureEvent::Delete));
    }
}

/// No face returns the mouth to closed, so the next open frame is an edge
#[test]
fn test_clear_rearms_mouth() {
    let open = GestureRatios { mouth: 0.6, ..neutral() };
    let mut gestures = machine();
    assert_eq!(gestures.update(&open, 50.0, 0.0).len(), 1);
    gestures.clear();
    assert_eq!(gestures.update(&open, 50.0, 1.0), vec![GestureEvent::Select]);
}
