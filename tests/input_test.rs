//! Parsing detector output


use head_gesture_control::{
    cursor_control::ParamAdjustment,
    input::{landmark_frame, Command, InputEvent, JsonLinesSource, LandmarkSource},
    pose_estimation::PoseEstimator,
    Error,
};
use std::io::Cursor;
use test_helpers::{assert_close, FaceBuilder};

fn frame_line(face: &FaceBuilder, timestamp: f64) -> String {
    serde_json::json!({
        "type": "frame",
        "width": face.width,
        "height": face.height,
        "timestamp": timestamp,
        "landmarks": face.rows(),
    })
    .to_string()
}

#[test]
fn test_frame_line_yields_pose() {
    let face = FaceBuilder::new().yaw(12.0).roll(-7.0);
    let event = InputEvent::parse(&frame_line(&face, 3.25)).unwrap();
    assert_eq!(event.timestamp(), Some(3.25));

    let InputEvent::Frame {
        width,
        height,
        landmarks,
        ..
    } = event
    else {
        panic!("expected a frame, got {event:?}");
    };
    let frame = landmark_frame(width, height, &landmarks).unwrap();
    let pose = PoseEstimator::default().estimate(&frame).sample().unwrap();
    assert_close(pose.yaw, 12.0, 1e-6);
    assert_close(pose.roll, -7.0, 1e-6);
}

#[test]
fn test_two_dimensional_rows() {
    let face = FaceBuilder::new();
    let rows: Vec<Vec<f64>> = face.normalized().into_iter().map(|(x, y)| vec![x, y]).collect();
    assert!(landmark_frame(face.width, face.height, &rows).is_ok());
}

#[test]
fn test_short_or_bad_rows_rejected() {
    let face = FaceBuilder::new();
    let mut rows = face.rows();
    rows.truncate(100);
    assert!(matches!(landmark_frame(640, 480, &rows), Err(Error::InvalidInput(_))));

    let mut rows = face.rows();
    rows[5] = vec![0.5];
    assert!(matches!(landmark_frame(640, 480, &rows), Err(Error::InvalidInput(_))));

    let mut rows = face.rows();
    rows[7] = vec![f64::NAN, 0.5];
    assert!(landmark_frame(640, 480, &rows).is_err());
}

#[test]
fn test_commands() {
    let cases = [
        (r#"{"type":"command","command":"calibrate"}"#, Command::Calibrate),
        (r#"{"type":"command","command":"ready"}"#, Command::Ready),
        (r#"{"type":"command","command":"toggle_invert_x"}"#, Command::ToggleInvertX),
        (
            r#"{"type":"command","command":{"adjust":"deadzone_roll_up"}}"#,
            Command::Adjust(ParamAdjustment::DeadzoneRollUp),
        ),
    ];
    for (line, expected) in cases {
        assert_eq!(InputEvent::parse(line).unwrap(), InputEvent::Command { command: expected });
    }
    assert!(InputEvent::parse(r#"{"type":"command","command":"dance"}"#).is_err());
}

#[test]
fn test_json_lines_stream() {
    let face = FaceBuilder::new();
    let input = format!(
        "{}\n\n{}\n{}\n",
        frame_line(&face, 0.0),
        r#"{"type":"no_face","timestamp":0.033}"#,
        r#"{"type":"command","command":"quit"}"#
    );
    let mut source = JsonLinesSource::new(Cursor::new(input));

    assert!(matches!(source.next_event().unwrap(), Some(InputEvent::Frame { .. })));
    assert_eq!(
        source.next_event().unwrap(),
        Some(InputEvent::NoFace { timestamp: Some(0.033) })
    );
    assert_eq!(
        source.next_event().unwrap(),
        Some(InputEvent::Command { command: Command::Quit })
    );
    assert_eq!(source.next_event().unwrap(), None);
}

#[test]
fn test_bad_line_reports_line_number_and_continues() {
    let input = "{\"type\":\"no_face\"}\nnot json\n{\"type\":\"no_face\"}\n";
    let mut source = JsonLinesSource::new(Cursor::new(input));

    assert!(source.next_event().unwrap().is_some());
    match source.next_event() {
        Err(Error::Source(message)) => assert!(message.contains("line 2"), "{message}"),
        other => panic!("expected a source error, got {other:?}"),
    }
    assert_eq!(source.next_event().unwrap(), Some(InputEvent::NoFace { timestamp: None }));
}
