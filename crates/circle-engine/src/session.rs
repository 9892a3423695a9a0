//! Tracking session controller.
//!
//! Owns one tracker and one history per identity and drives the frame loop:
//!
//! ```text
//! INIT ──► TRACKING ──► RECONCILE ──► TRACKING ──► … ──► DONE
//! ```
//!
//! Frame 0 is the seed frame: trackers are initialized on it and the seed
//! boxes form the first history entry. Every later frame is tracked, checked
//! for overlapping identities and merged into history exactly once. The last
//! frame of each batch of `checkpoint_interval` frames is also reconciled
//! against the detector before it is merged.

use serde::Serialize;
use std::time::Instant;

use rayon::prelude::*;
use tracing::{debug, info, info_span, warn};

use circle_models::{BoundingBox, FrameSize, IdentityId, SeedSet, SessionId, TempTrack};

use crate::angular_order::AngularOrder;
use crate::collaborators::{Detector, FrameOverlay, FrameSource, Tracker, TrackerFactory, Visualizer};
use crate::config::TrackingConfig;
use crate::error::{EngineError, EngineResult};
use crate::history::HistoryBook;
use crate::metrics;
use crate::overlay::OverlayResolver;
use crate::reconcile::{Pass, ReconciliationEngine};

/// Lifecycle phase of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Init,
    Tracking,
    Reconcile,
    Done,
}

/// Counters describing a finished (or running) session.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionSummary {
    pub session_id: String,
    /// Frames tracked after the seed frame
    pub frames_processed: usize,
    pub checkpoints: usize,
    pub tracker_failures: usize,
    pub overlay_conflicts: usize,
    pub identities_reverted: usize,
    pub detections_seen: usize,
    pub detections_too_small: usize,
    pub assigned_direct_overlap: usize,
    pub assigned_enclosing_roi: usize,
    pub assigned_gap_fill: usize,
    pub detections_unassigned: usize,
    pub detector_failures: usize,
    pub order_violations: usize,
    pub angular_order: Vec<IdentityId>,
}

/// A multi-identity tracking run over one frame sequence.
pub struct TrackingSession<S, D, V>
where
    S: FrameSource,
{
    id: SessionId,
    config: TrackingConfig,
    frames: S,
    frame_size: FrameSize,
    detector: D,
    visualizer: V,
    /// One tracker per identity, in label order
    trackers: Vec<(IdentityId, Box<dyn Tracker<S::Frame>>)>,
    order: AngularOrder,
    history: HistoryBook,
    phase: SessionPhase,
    summary: SessionSummary,
}

impl<S, D, V> TrackingSession<S, D, V>
where
    S: FrameSource,
    S::Frame: Sync,
    D: Detector<S::Frame>,
    V: Visualizer<S::Frame>,
{
    /// Seed every identity, create and initialize its tracker on frame 0,
    /// and fix the seating order.
    pub fn new(
        config: TrackingConfig,
        seeds: SeedSet,
        frames: S,
        mut factory: impl TrackerFactory<S::Frame>,
        detector: D,
        visualizer: V,
    ) -> EngineResult<Self> {
        config.validate()?;
        if frames.is_empty() {
            return Err(EngineError::NotEnoughFrames {
                available: 0,
                required: 1,
            });
        }

        let id = SessionId::new();
        let frame_size = frames.frame_size();
        let seed_track = seeds.to_temp_track();
        let order = AngularOrder::from_seeds(&seed_track, frame_size);
        let history = HistoryBook::from_seeds(&seeds);

        let first = frames.frame(0)?;
        let mut trackers = Vec::with_capacity(seeds.len());
        for (identity, bbox) in seeds.iter() {
            let mut tracker = factory.create(identity)?;
            tracker.initialize(&first, bbox)?;
            trackers.push((identity.clone(), tracker));
        }

        info!(
            session_id = %id,
            identities = seeds.len(),
            frames = frames.len(),
            order = ?order.as_slice(),
            "Tracking session initialized"
        );

        let summary = SessionSummary {
            session_id: id.to_string(),
            angular_order: order.as_slice().to_vec(),
            ..Default::default()
        };

        Ok(Self {
            id,
            config,
            frames,
            frame_size,
            detector,
            visualizer,
            trackers,
            order,
            history,
            phase: SessionPhase::Init,
            summary,
        })
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn order(&self) -> &AngularOrder {
        &self.order
    }

    pub fn history(&self) -> &HistoryBook {
        &self.history
    }

    pub fn into_history(self) -> HistoryBook {
        self.history
    }

    pub fn summary(&self) -> &SessionSummary {
        &self.summary
    }

    /// Process every remaining frame and return the session counters.
    ///
    /// Only a frame that cannot be fetched stops the run early; tracker,
    /// detector and visualizer failures are logged and absorbed.
    pub fn run(&mut self) -> EngineResult<SessionSummary> {
        let span = info_span!("tracking_session", session_id = %self.id);
        let _enter = span.enter();

        let total = self.frames.len();
        let interval = self.config.checkpoint_interval;
        let mut frame_idx = self.summary.frames_processed + 1;

        while frame_idx < total {
            self.phase = SessionPhase::Tracking;
            let last_frame = frame_idx.saturating_add(interval).min(total);
            let mut track = TempTrack::new();
            let mut checkpoint_frame = None;

            for idx in frame_idx..last_frame {
                debug!(frame = idx, "Processing frame");
                let frame = self.frames.frame(idx)?;
                track = self.step_trackers(&frame);
                self.resolve_overlay(&mut track);
                self.summary.frames_processed += 1;
                metrics::record_frame();

                if idx != last_frame - 1 {
                    self.emit(idx, &frame, &track, &FrameOverlay::default());
                    self.history.merge(&track);
                } else {
                    checkpoint_frame = Some((idx, frame));
                }
            }
            frame_idx = last_frame;

            if let Some((idx, frame)) = checkpoint_frame {
                self.phase = SessionPhase::Reconcile;
                let overlay = self.reconcile(idx, &frame, &mut track);
                self.history.merge(&track);
                self.emit(idx, &frame, &track, &overlay);
            }
        }

        self.phase = SessionPhase::Done;
        info!(
            frames = self.summary.frames_processed,
            checkpoints = self.summary.checkpoints,
            conflicts = self.summary.overlay_conflicts,
            order_violations = self.summary.order_violations,
            "Tracking session finished"
        );

        Ok(self.summary.clone())
    }

    /// Ask every tracker for its next box.
    fn step_trackers(&mut self, frame: &S::Frame) -> TempTrack {
        let results: Vec<(IdentityId, EngineResult<BoundingBox>)> = if self.config.parallel_trackers
        {
            self.trackers
                .par_iter_mut()
                .map(|(id, tracker)| (id.clone(), tracker.track(frame)))
                .collect()
        } else {
            self.trackers
                .iter_mut()
                .map(|(id, tracker)| (id.clone(), tracker.track(frame)))
                .collect()
        };

        let mut track = TempTrack::new();
        for (id, result) in results {
            let bbox = match result {
                Ok(bbox) => bbox,
                Err(e) => {
                    warn!(identity = %id, error = %e, "Tracker failed, substituting degenerate box");
                    self.summary.tracker_failures += 1;
                    metrics::record_tracker_failure();
                    self.history
                        .last_box(&id)
                        .map(|prev| BoundingBox::degenerate_at(prev.cx(), prev.cy()))
                        .unwrap_or_else(|| BoundingBox::degenerate_at(0.0, 0.0))
                }
            };
            track.set(id, bbox);
        }
        track
    }

    fn resolve_overlay(&mut self, track: &mut TempTrack) {
        let report = OverlayResolver::new(&self.config).resolve(track, &self.history);
        if !report.had_conflicts() {
            return;
        }

        for id in &report.reverted {
            if let Some(bbox) = track.get(id).copied() {
                self.reset_tracker(id, &bbox);
            }
        }

        self.summary.overlay_conflicts += report.resolved.len();
        self.summary.identities_reverted += report.reverted.len();
        metrics::record_overlay(report.resolved.len(), report.reverted.len());
    }

    /// Correct the batch's last frame against fresh detections.
    fn reconcile(&mut self, idx: usize, frame: &S::Frame, track: &mut TempTrack) -> FrameOverlay {
        let started = Instant::now();
        let detections = match self.detector.detect(
            frame,
            self.config.detector_select_threshold,
            self.config.detector_nms_threshold,
        ) {
            Ok(detections) => detections,
            Err(e) => {
                warn!(frame = idx, error = %e, "Detector failed, skipping reconciliation");
                self.summary.detector_failures += 1;
                Vec::new()
            }
        };

        let report = ReconciliationEngine::new(&self.config, &self.order, self.frame_size)
            .reconcile(&detections, track);

        for correction in &report.corrections {
            self.reset_tracker(&correction.identity, &correction.bbox);
        }

        self.summary.checkpoints += 1;
        self.summary.detections_seen += detections.len();
        self.summary.detections_too_small += report.too_small;
        self.summary.assigned_direct_overlap += report.corrections_in(Pass::DirectOverlap);
        self.summary.assigned_enclosing_roi += report.corrections_in(Pass::EnclosingRoi);
        self.summary.assigned_gap_fill += report.corrections_in(Pass::GapFill);
        self.summary.detections_unassigned += report.unassigned();

        if self.config.verify_order_each_checkpoint && !self.order.verify_order(track, self.frame_size)
        {
            warn!(frame = idx, "Live seating order no longer matches the seed order");
            self.summary.order_violations += 1;
            metrics::record_order_violation();
        }

        metrics::record_checkpoint(&report, started.elapsed().as_secs_f64());
        debug!(
            frame = idx,
            detections = detections.len(),
            corrected = report.corrections.len(),
            "Checkpoint complete"
        );

        FrameOverlay {
            detections,
            rois: report.rois,
            landmarks: Vec::new(),
        }
    }

    fn reset_tracker(&mut self, id: &IdentityId, bbox: &BoundingBox) {
        match self.trackers.iter_mut().find(|(tid, _)| tid == id) {
            Some((_, tracker)) => tracker.redefine_roi(bbox),
            None => warn!(identity = %id, "No tracker to reset"),
        }
    }

    fn emit(&mut self, idx: usize, frame: &S::Frame, track: &TempTrack, overlay: &FrameOverlay) {
        if let Err(e) =
            self.visualizer
                .render(idx, frame, track, overlay, self.config.output_dir.as_deref())
        {
            warn!(frame = idx, error = %e, "Visualizer failed");
        }
    }
}
