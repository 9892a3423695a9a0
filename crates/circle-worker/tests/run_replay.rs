//! Worker runs over replay scripts written to a temp directory.

use std::path::PathBuf;

use circle_engine::TrackingConfig;
use circle_worker::{run_replay, WorkerConfig, WorkerError};

const SCRIPT: &str = r#"{
    "frame_size": { "width": 640, "height": 640 },
    "frame_count": 7,
    "seeds": {
        "a": { "x": 300, "y": 183, "width": 57, "height": 49 },
        "b": { "x": 139, "y": 201, "width": 53, "height": 45 },
        "c": { "x": 94, "y": 296, "width": 77, "height": 98 }
    },
    "tracks": {
        "a": [
            { "x": 303, "y": 184, "width": 57, "height": 49 },
            { "x": 305, "y": 185, "width": 57, "height": 49 }
        ]
    },
    "detections": {
        "3": [ { "x": 300, "y": 183, "width": 57, "height": 49 } ]
    }
}"#;

fn write_script(dir: &std::path::Path) -> PathBuf {
    let path = dir.join("replay.json");
    std::fs::write(&path, SCRIPT).unwrap();
    path
}

#[test]
fn test_run_writes_history_and_summary() {
    let dir = tempfile::tempdir().unwrap();
    let results = dir.path().join("results");
    let config = WorkerConfig {
        replay_path: Some(write_script(dir.path())),
        results_dir: results.clone(),
        metrics_dump: false,
        tracking: TrackingConfig {
            checkpoint_interval: 3,
            ..Default::default()
        },
    };

    let outcome = tokio_test::block_on(run_replay(config)).unwrap();

    assert_eq!(outcome.summary.frames_processed, 6);
    assert_eq!(outcome.summary.checkpoints, 2);
    assert_eq!(outcome.summary.assigned_direct_overlap, 1);
    assert_eq!(outcome.history_path, results.join("history.json"));

    let history: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&outcome.history_path).unwrap()).unwrap();
    let a = history["a"].as_array().unwrap();
    assert_eq!(a.len(), 7);
    // Frame 3 was corrected back onto the detection
    assert_eq!(a[3]["x"], 300.0);

    let summary: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&outcome.summary_path).unwrap()).unwrap();
    assert!(summary["started_at"].is_string());
    assert_eq!(summary["config"]["checkpoint_interval"], 3);
    assert_eq!(summary["summary"]["frames_processed"], 6);
}

#[test]
fn test_output_dir_receives_frame_files() {
    let dir = tempfile::tempdir().unwrap();
    let frames = dir.path().join("frames");
    let config = WorkerConfig {
        replay_path: Some(write_script(dir.path())),
        results_dir: dir.path().join("results"),
        metrics_dump: false,
        tracking: TrackingConfig {
            output_dir: Some(frames.clone()),
            ..Default::default()
        },
    };

    tokio_test::block_on(run_replay(config)).unwrap();

    assert_eq!(std::fs::read_dir(&frames).unwrap().count(), 6);
}

#[test]
fn test_missing_script_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let config = WorkerConfig {
        replay_path: Some(dir.path().join("absent.json")),
        results_dir: dir.path().join("results"),
        ..Default::default()
    };

    let err = tokio_test::block_on(run_replay(config)).unwrap_err();
    assert!(matches!(err, WorkerError::Engine(_)));
    assert!(!dir.path().join("results").exists());
}
