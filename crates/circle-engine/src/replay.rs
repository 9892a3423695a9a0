//! Recorded-run collaborators.
//!
//! A [`ReplayScript`] holds the per-frame output of a previous tracker and
//! detector run, so a session can be driven deterministically without any
//! inference backend.
//!
//! ```json
//! {
//!   "frame_size": { "width": 640, "height": 640 },
//!   "frame_count": 3,
//!   "seeds": { "a": { "x": 300, "y": 183, "width": 57, "height": 49 } },
//!   "tracks": { "a": [ { "x": 301, "y": 183, "width": 57, "height": 49 }, null ] },
//!   "detections": { "2": [ { "x": 300, "y": 184, "width": 56, "height": 50 } ] }
//! }
//! ```
//!
//! `tracks[id][i]` is the tracker output for frame `i + 1`; `null` replays a
//! tracker failure. Past the end of a recording the tracker holds its last box.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::{Arc, Mutex};

use tracing::debug;

use circle_models::{BoundingBox, FrameSize, IdentityId, SeedSet};

use crate::collaborators::{Detector, FrameSource, Tracker};
use crate::error::{EngineError, EngineResult};

/// A recorded session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayScript {
    pub frame_size: FrameSize,
    pub frame_count: usize,
    pub seeds: SeedSet,
    #[serde(default)]
    pub tracks: BTreeMap<IdentityId, Vec<Option<BoundingBox>>>,
    /// Detector output keyed by frame index
    #[serde(default)]
    pub detections: BTreeMap<usize, Vec<BoundingBox>>,
    /// Frames on which the detector reports an error
    #[serde(default)]
    pub detector_failures: BTreeSet<usize>,
}

/// One ROI reset issued to a replay tracker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoiReset {
    pub identity: IdentityId,
    pub bbox: BoundingBox,
}

/// Shared log of ROI resets across all replay trackers of a session.
pub type RoiLog = Arc<Mutex<Vec<RoiReset>>>;

impl ReplayScript {
    /// Parse and validate a script.
    pub fn from_json(json: &str) -> EngineResult<Self> {
        let script: Self = serde_json::from_str(json)?;
        script.validate()?;
        Ok(script)
    }

    /// Load a script from disk.
    pub fn load(path: &Path) -> EngineResult<Self> {
        if !path.exists() {
            return Err(EngineError::FileNotFound(path.to_path_buf()));
        }
        let json = std::fs::read_to_string(path)?;
        let script = Self::from_json(&json)?;
        debug!(
            path = %path.display(),
            frames = script.frame_count,
            identities = script.seeds.len(),
            "Loaded replay script"
        );
        Ok(script)
    }

    /// A script in which every tracker holds its seed box and nothing is
    /// ever detected.
    pub fn still<'a>(
        width: u32,
        height: u32,
        frame_count: usize,
        seeds: impl IntoIterator<Item = (&'a str, [f64; 4])>,
    ) -> EngineResult<Self> {
        let pairs = seeds
            .into_iter()
            .map(|(label, b)| Ok((IdentityId::new(label)?, BoundingBox::from(b))))
            .collect::<EngineResult<Vec<_>>>()?;
        let script = Self {
            frame_size: FrameSize::new(width, height)?,
            frame_count,
            seeds: SeedSet::from_pairs(pairs)?,
            tracks: BTreeMap::new(),
            detections: BTreeMap::new(),
            detector_failures: BTreeSet::new(),
        };
        script.validate()?;
        Ok(script)
    }

    pub fn validate(&self) -> EngineResult<()> {
        if self.frame_count == 0 {
            return Err(EngineError::invalid_replay("frame_count must be at least 1"));
        }
        if let Some(id) = self.tracks.keys().find(|id| !self.seeds.iter().any(|(s, _)| s == *id)) {
            return Err(EngineError::UnknownIdentity(id.clone()));
        }
        if let Some(idx) = self.detections.keys().find(|idx| **idx >= self.frame_count) {
            return Err(EngineError::invalid_replay(format!(
                "detections recorded for frame {idx} beyond frame_count {}",
                self.frame_count
            )));
        }
        Ok(())
    }

    pub fn frame_source(&self) -> ReplayFrameSource {
        ReplayFrameSource {
            size: self.frame_size,
            count: self.frame_count,
        }
    }

    /// Tracker factory replaying the recorded boxes. Resets are appended to `log`.
    pub fn tracker_factory(
        &self,
        log: RoiLog,
    ) -> impl FnMut(&IdentityId) -> EngineResult<Box<dyn Tracker<ReplayFrame>>> + '_ {
        move |identity: &IdentityId| {
            let outputs = self.tracks.get(identity).cloned().unwrap_or_default();
            let tracker: Box<dyn Tracker<ReplayFrame>> = Box::new(ReplayTracker {
                identity: identity.clone(),
                outputs,
                last: None,
                log: Arc::clone(&log),
            });
            Ok(tracker)
        }
    }

    pub fn detector(&self) -> ReplayDetector {
        ReplayDetector {
            detections: self.detections.clone(),
            failures: self.detector_failures.clone(),
        }
    }
}

/// Placeholder frame: replay collaborators only need its position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplayFrame {
    pub index: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct ReplayFrameSource {
    size: FrameSize,
    count: usize,
}

impl FrameSource for ReplayFrameSource {
    type Frame = ReplayFrame;

    fn len(&self) -> usize {
        self.count
    }

    fn frame_size(&self) -> FrameSize {
        self.size
    }

    fn frame(&self, index: usize) -> EngineResult<ReplayFrame> {
        if index >= self.count {
            return Err(EngineError::frame_source(
                index,
                format!("only {} frames recorded", self.count),
            ));
        }
        Ok(ReplayFrame { index })
    }
}

pub struct ReplayTracker {
    identity: IdentityId,
    outputs: Vec<Option<BoundingBox>>,
    last: Option<BoundingBox>,
    log: RoiLog,
}

impl Tracker<ReplayFrame> for ReplayTracker {
    fn initialize(&mut self, _frame: &ReplayFrame, bbox: &BoundingBox) -> EngineResult<()> {
        self.last = Some(*bbox);
        Ok(())
    }

    fn track(&mut self, frame: &ReplayFrame) -> EngineResult<BoundingBox> {
        let recorded = frame
            .index
            .checked_sub(1)
            .and_then(|i| self.outputs.get(i).copied());
        match recorded {
            Some(Some(bbox)) => {
                self.last = Some(bbox);
                Ok(bbox)
            }
            Some(None) => Err(EngineError::tracker_failed(
                &self.identity,
                format!("recorded failure at frame {}", frame.index),
            )),
            None => self
                .last
                .ok_or_else(|| EngineError::tracker_failed(&self.identity, "not initialized")),
        }
    }

    fn redefine_roi(&mut self, bbox: &BoundingBox) {
        self.last = Some(*bbox);
        if let Ok(mut log) = self.log.lock() {
            log.push(RoiReset {
                identity: self.identity.clone(),
                bbox: *bbox,
            });
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReplayDetector {
    detections: BTreeMap<usize, Vec<BoundingBox>>,
    failures: BTreeSet<usize>,
}

impl Detector<ReplayFrame> for ReplayDetector {
    fn detect(
        &mut self,
        frame: &ReplayFrame,
        _select_threshold: f64,
        _nms_threshold: f64,
    ) -> EngineResult<Vec<BoundingBox>> {
        if self.failures.contains(&frame.index) {
            return Err(EngineError::detection_failed(format!(
                "recorded failure at frame {}",
                frame.index
            )));
        }
        Ok(self.detections.get(&frame.index).cloned().unwrap_or_default())
    }
}
