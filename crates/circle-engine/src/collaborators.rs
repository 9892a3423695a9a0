//! Boundary contracts for the external components a session drives.
//!
//! Implementations (visual trackers, face detectors, frame decoders,
//! renderers) live outside this crate. All calls are synchronous and may
//! block on inference.

use serde::Serialize;
use std::path::Path;

use circle_models::{BoundingBox, FrameSize, IdentityId, TempTrack};

use crate::error::EngineResult;

/// Single-object visual tracker owned by one identity.
///
/// Must be `Send` so a session can step trackers on a worker pool. A
/// tracker that shares an inference backend with others is responsible for
/// serializing access to it behind one lock.
pub trait Tracker<F>: Send {
    /// Start tracking `bbox` in `frame`.
    fn initialize(&mut self, frame: &F, bbox: &BoundingBox) -> EngineResult<()>;

    /// Locate the target in the next frame.
    fn track(&mut self, frame: &F) -> EngineResult<BoundingBox>;

    /// Hard-reset the region the tracker searches.
    fn redefine_roi(&mut self, bbox: &BoundingBox);
}

/// Builds a tracker for a given identity at session start.
pub trait TrackerFactory<F> {
    fn create(&mut self, identity: &IdentityId) -> EngineResult<Box<dyn Tracker<F>>>;
}

impl<F, T> TrackerFactory<F> for T
where
    T: FnMut(&IdentityId) -> EngineResult<Box<dyn Tracker<F>>>,
{
    fn create(&mut self, identity: &IdentityId) -> EngineResult<Box<dyn Tracker<F>>> {
        self(identity)
    }
}

/// Unlabeled face detector.
pub trait Detector<F> {
    /// Detect faces in pixel coordinates of `frame`. May return nothing.
    fn detect(
        &mut self,
        frame: &F,
        select_threshold: f64,
        nms_threshold: f64,
    ) -> EngineResult<Vec<BoundingBox>>;
}

/// Ordered, finite, indexable sequence of frames.
pub trait FrameSource {
    type Frame;

    /// Number of frames.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Pixel dimensions shared by every frame.
    fn frame_size(&self) -> FrameSize;

    /// Fetch frame `index` (0-based).
    fn frame(&self, index: usize) -> EngineResult<Self::Frame>;
}

/// Extra annotations drawn alongside the identity boxes.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FrameOverlay {
    /// Raw detections at a checkpoint
    pub detections: Vec<BoundingBox>,
    /// Search regions used by the ROI pass
    pub rois: Vec<BoundingBox>,
    /// Facial landmarks, as (x, y) points. The engine never fills these;
    /// hosts running a landmark extractor add them before rendering.
    pub landmarks: Vec<(f64, f64)>,
}

impl FrameOverlay {
    pub fn is_empty(&self) -> bool {
        self.detections.is_empty() && self.rois.is_empty() && self.landmarks.is_empty()
    }
}

/// Sink for per-frame results. Nothing it returns feeds back into tracking.
pub trait Visualizer<F> {
    fn render(
        &mut self,
        frame_index: usize,
        frame: &F,
        track: &TempTrack,
        overlay: &FrameOverlay,
        out_dir: Option<&Path>,
    ) -> EngineResult<()>;
}

/// Visualizer that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullVisualizer;

impl<F> Visualizer<F> for NullVisualizer {
    fn render(
        &mut self,
        _frame_index: usize,
        _frame: &F,
        _track: &TempTrack,
        _overlay: &FrameOverlay,
        _out_dir: Option<&Path>,
    ) -> EngineResult<()> {
        Ok(())
    }
}
