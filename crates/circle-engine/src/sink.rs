//! Visualizer that writes each frame's result as JSON.

use serde::Serialize;
use std::path::{Path, PathBuf};

use tracing::trace;

use circle_models::TempTrack;

use crate::collaborators::{FrameOverlay, Visualizer};
use crate::error::{EngineError, EngineResult};

#[derive(Serialize)]
struct FrameRecord<'a> {
    frame_index: usize,
    track: &'a TempTrack,
    #[serde(skip_serializing_if = "no_overlay")]
    overlay: &'a FrameOverlay,
}

fn no_overlay(overlay: &&FrameOverlay) -> bool {
    overlay.is_empty()
}

/// Writes `frame_<index>.json` per frame.
///
/// Files go to the session's `output_dir` when one is configured, otherwise
/// to the sink's own directory.
#[derive(Debug, Clone)]
pub struct JsonFrameSink {
    dir: PathBuf,
    written: usize,
}

impl JsonFrameSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            written: 0,
        }
    }

    /// Number of frame files written so far.
    pub fn written(&self) -> usize {
        self.written
    }

    pub fn file_name(frame_index: usize) -> String {
        format!("frame_{frame_index:05}.json")
    }
}

impl<F> Visualizer<F> for JsonFrameSink {
    fn render(
        &mut self,
        frame_index: usize,
        _frame: &F,
        track: &TempTrack,
        overlay: &FrameOverlay,
        out_dir: Option<&Path>,
    ) -> EngineResult<()> {
        let dir = out_dir.unwrap_or(&self.dir);
        std::fs::create_dir_all(dir).map_err(|e| {
            EngineError::visualization_failed(format!("cannot create {}: {e}", dir.display()))
        })?;

        let record = FrameRecord {
            frame_index,
            track,
            overlay,
        };
        let path = dir.join(Self::file_name(frame_index));
        std::fs::write(&path, serde_json::to_vec_pretty(&record)?)?;

        self.written += 1;
        trace!(path = %path.display(), "Wrote frame record");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use circle_models::{BoundingBox, IdentityId};

    #[test]
    fn test_writes_frame_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = JsonFrameSink::new(dir.path());
        let track: TempTrack = [(IdentityId::from("a"), BoundingBox::new(1.0, 2.0, 3.0, 4.0))]
            .into_iter()
            .collect();

        Visualizer::<()>::render(&mut sink, 7, &(), &track, &FrameOverlay::default(), None)
            .unwrap();

        let written = std::fs::read_to_string(dir.path().join("frame_00007.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&written).unwrap();
        assert_eq!(value["frame_index"], 7);
        assert_eq!(value["track"]["a"]["width"], 3.0);
        assert!(value.get("overlay").is_none());
        assert_eq!(sink.written(), 1);
    }

    #[test]
    fn test_configured_dir_takes_precedence() {
        let fallback = tempfile::tempdir().unwrap();
        let configured = tempfile::tempdir().unwrap();
        let mut sink = JsonFrameSink::new(fallback.path());
        let overlay = FrameOverlay {
            detections: vec![BoundingBox::new(0.0, 0.0, 30.0, 30.0)],
            ..Default::default()
        };

        Visualizer::<()>::render(
            &mut sink,
            3,
            &(),
            &TempTrack::new(),
            &overlay,
            Some(configured.path()),
        )
        .unwrap();

        assert!(configured.path().join("frame_00003.json").exists());
        assert!(!fallback.path().join("frame_00003.json").exists());
    }
}
