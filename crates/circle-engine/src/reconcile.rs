//! Detector-driven correction of tracker drift at checkpoints.
//!
//! Unlabeled detections are matched to identities by a pipeline of passes
//! over a shrinking candidate pool:
//!
//! 1. **Direct overlap**: the detection overlaps an identity's proposal.
//! 2. **Enclosing ROI**: the detection's center falls in the enlarged
//!    search region around an identity's proposal.
//! 3. **Gap filling**: remaining detections are placed between identities
//!    already corrected (anchors) using the fixed seating order.
//!
//! Every assignment must also keep the identity inside the arc between its
//! seating neighbours. A detection is consumed at most once and an identity
//! is corrected at most once per checkpoint. Identities left uncorrected
//! keep their tracker box.

use serde::Serialize;
use std::cmp::Ordering;
use tracing::{debug, info, warn};

use circle_models::{BoundingBox, FrameSize, IdentityId, TempTrack};

use crate::angular_order::AngularOrder;
use crate::config::TrackingConfig;
use crate::geometry::{angle_of, center_in_roi, iou, roi_around};

/// Pass that produced a correction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Pass {
    DirectOverlap,
    EnclosingRoi,
    GapFill,
}

impl Pass {
    pub fn as_str(&self) -> &'static str {
        match self {
            Pass::DirectOverlap => "direct_overlap",
            Pass::EnclosingRoi => "enclosing_roi",
            Pass::GapFill => "gap_fill",
        }
    }
}

/// Where a detection stands in the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CandidateState {
    /// Not yet placed; later passes may still use it
    Pending,
    Matched { identity: IdentityId, pass: Pass },
    /// Dropped by the gap-filling stop rule
    Discarded,
}

/// A size-filtered detection moving through the passes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    /// Position in the filtered detection list
    pub index: usize,
    pub bbox: BoundingBox,
    pub angle: f64,
    pub state: CandidateState,
}

impl Candidate {
    pub fn is_pending(&self) -> bool {
        matches!(self.state, CandidateState::Pending)
    }
}

/// An identity whose proposal was replaced by a detection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Correction {
    pub identity: IdentityId,
    pub bbox: BoundingBox,
    pub pass: Pass,
}

/// Outcome of one checkpoint reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReconcileReport {
    /// Detections rejected by the size filter
    pub too_small: usize,
    pub candidates: Vec<Candidate>,
    /// Corrections in the order they were made
    pub corrections: Vec<Correction>,
    /// Search regions considered by the ROI pass
    pub rois: Vec<BoundingBox>,
}

impl ReconcileReport {
    pub fn is_noop(&self) -> bool {
        self.corrections.is_empty()
    }

    pub fn is_corrected(&self, id: &IdentityId) -> bool {
        self.corrections.iter().any(|c| &c.identity == id)
    }

    pub fn corrections_in(&self, pass: Pass) -> usize {
        self.corrections.iter().filter(|c| c.pass == pass).count()
    }

    /// Filtered detections that ended up assigned to nobody.
    pub fn unassigned(&self) -> usize {
        self.candidates
            .iter()
            .filter(|c| !matches!(c.state, CandidateState::Matched { .. }))
            .count()
    }
}

/// Stateless engine borrowing the session's configuration and seating order.
pub struct ReconciliationEngine<'a> {
    config: &'a TrackingConfig,
    order: &'a AngularOrder,
    frame: FrameSize,
}

impl<'a> ReconciliationEngine<'a> {
    pub fn new(config: &'a TrackingConfig, order: &'a AngularOrder, frame: FrameSize) -> Self {
        Self {
            config,
            order,
            frame,
        }
    }

    /// Keep detections at least `min_bbox_size` in both dimensions.
    pub fn filter_detections(&self, detections: &[BoundingBox]) -> Vec<BoundingBox> {
        detections
            .iter()
            .filter(|d| d.width >= self.config.min_bbox_size && d.height >= self.config.min_bbox_size)
            .copied()
            .collect()
    }

    /// Correct `track` in place from raw detector output.
    pub fn reconcile(&self, detections: &[BoundingBox], track: &mut TempTrack) -> ReconcileReport {
        let kept = self.filter_detections(detections);
        let mut report = ReconcileReport {
            too_small: detections.len() - kept.len(),
            ..Default::default()
        };

        if kept.is_empty() {
            debug!(raw = detections.len(), "No usable detections at checkpoint");
            return report;
        }

        report.candidates = kept
            .into_iter()
            .enumerate()
            .map(|(index, bbox)| Candidate {
                index,
                bbox,
                angle: angle_of(&bbox, self.frame),
                state: CandidateState::Pending,
            })
            .collect();

        self.direct_overlap_pass(track, &mut report);
        self.enclosing_roi_pass(track, &mut report);
        self.gap_fill_pass(track, &mut report);

        info!(
            detections = report.candidates.len(),
            too_small = report.too_small,
            corrected = report.corrections.len(),
            unassigned = report.unassigned(),
            "Checkpoint reconciled"
        );

        report
    }

    fn direct_overlap_pass(&self, track: &mut TempTrack, report: &mut ReconcileReport) {
        for ci in 0..report.candidates.len() {
            if !report.candidates[ci].is_pending() {
                continue;
            }
            let det = report.candidates[ci].bbox;
            let view: &TempTrack = track;
            let hit = self.uncorrected_ids(view, report).into_iter().find(|id| {
                view.get(id)
                    .is_some_and(|current| iou(current, &det) > self.config.overlap_threshold)
                    && self.order.is_angularly_valid(id, &det, view, self.frame)
            });
            if let Some(id) = hit {
                apply(track, report, ci, id, Pass::DirectOverlap);
            }
        }
    }

    fn enclosing_roi_pass(&self, track: &mut TempTrack, report: &mut ReconcileReport) {
        report.rois = track
            .iter()
            .map(|(_, bbox)| roi_around(bbox, self.frame, self.config.roi_scale))
            .collect();

        for ci in 0..report.candidates.len() {
            if !report.candidates[ci].is_pending() {
                continue;
            }
            let det = report.candidates[ci].bbox;
            let view: &TempTrack = track;
            let hit = self.uncorrected_ids(view, report).into_iter().find(|id| {
                view.get(id).is_some_and(|current| {
                    center_in_roi(current, &det, self.frame, self.config.roi_scale)
                }) && self.order.is_angularly_valid(id, &det, view, self.frame)
            });
            if let Some(id) = hit {
                apply(track, report, ci, id, Pass::EnclosingRoi);
            }
        }
    }

    /// Assign leftover detections to identities missed by the first two passes.
    ///
    /// The choice is always confined to the detection's window between
    /// anchors, closest angle first when the window holds several identities.
    /// A window whose only identity fails the seating check leaves the
    /// detection unassigned rather than widening the search to every
    /// uncorrected identity.
    fn gap_fill_pass(&self, track: &mut TempTrack, report: &mut ReconcileReport) {
        if !report.candidates.iter().any(Candidate::is_pending) {
            return;
        }

        // Anchors: corrected identities with their corrected angles, in seating order.
        let anchors: Vec<(IdentityId, f64)> = self
            .order
            .as_slice()
            .iter()
            .filter(|id| report.is_corrected(id))
            .filter_map(|id| track.get(id).map(|b| (id.clone(), angle_of(b, self.frame))))
            .collect();

        // Pending identities with the angle of their uncorrected proposal, in seating order.
        let mut pending: Vec<(IdentityId, f64)> = self
            .order
            .as_slice()
            .iter()
            .filter(|id| !report.is_corrected(id))
            .filter_map(|id| track.get(id).map(|b| (id.clone(), angle_of(b, self.frame))))
            .collect();

        if pending.is_empty() {
            debug!("Every identity already corrected, skipping gap filling");
            return;
        }

        for ci in 0..report.candidates.len() {
            if !report.candidates[ci].is_pending() {
                continue;
            }
            let det = report.candidates[ci].bbox;
            let det_angle = report.candidates[ci].angle;

            let window = self.candidate_window(&anchors, &pending, det_angle);

            let choice = match window.as_slice() {
                [] => {
                    // Stop rule: an unplaceable detection ends the pass and
                    // drops every detection still waiting behind it.
                    warn!(
                        detection = ?det,
                        angle = det_angle,
                        "Unassignable detection: empty candidate window, dropping remaining detections"
                    );
                    for candidate in report.candidates[ci..].iter_mut() {
                        if candidate.is_pending() {
                            candidate.state = CandidateState::Discarded;
                        }
                    }
                    break;
                }
                [(only, _)] => only.clone(),
                _ => {
                    let (closest, closest_angle) = window
                        .iter()
                        .min_by(|(_, a), (_, b)| {
                            (a - det_angle)
                                .abs()
                                .partial_cmp(&(b - det_angle).abs())
                                .unwrap_or(Ordering::Equal)
                        })
                        .cloned()
                        .unwrap_or_else(|| window[0].clone());
                    warn!(
                        detection = ?det,
                        candidates = window.len(),
                        chosen = %closest,
                        chosen_angle = closest_angle,
                        "Ambiguous gap assignment, picking closest angular position"
                    );
                    closest
                }
            };

            if self.order.is_angularly_valid(&choice, &det, track, self.frame) {
                pending.retain(|(id, _)| id != &choice);
                apply(track, report, ci, choice, Pass::GapFill);
            } else {
                debug!(
                    identity = %choice,
                    angle = det_angle,
                    "Gap candidate rejected by seating order"
                );
            }
        }
    }

    /// Pending identities eligible for a detection at `angle`.
    ///
    /// Without anchors every pending identity is eligible. Otherwise the
    /// window is the stretch of seating order strictly between the nearest
    /// anchor behind the detection and the nearest anchor ahead of it.
    fn candidate_window(
        &self,
        anchors: &[(IdentityId, f64)],
        pending: &[(IdentityId, f64)],
        angle: f64,
    ) -> Vec<(IdentityId, f64)> {
        if anchors.is_empty() {
            return pending.to_vec();
        }

        let by_angle = |a: &&(IdentityId, f64), b: &&(IdentityId, f64)| {
            a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal)
        };
        let prev = anchors
            .iter()
            .filter(|(_, a)| *a < angle)
            .max_by(by_angle)
            .or_else(|| anchors.iter().max_by(by_angle));
        let next = anchors
            .iter()
            .filter(|(_, a)| *a > angle)
            .min_by(by_angle)
            .or_else(|| anchors.iter().min_by(by_angle));

        let (Some((prev_id, _)), Some((next_id, _))) = (prev, next) else {
            return Vec::new();
        };

        self.order
            .between(prev_id, next_id)
            .into_iter()
            .filter_map(|id| pending.iter().find(|(p, _)| *p == id).cloned())
            .collect()
    }

    fn uncorrected_ids(&self, track: &TempTrack, report: &ReconcileReport) -> Vec<IdentityId> {
        track
            .ids()
            .filter(|id| !report.is_corrected(id))
            .cloned()
            .collect()
    }
}

fn apply(
    track: &mut TempTrack,
    report: &mut ReconcileReport,
    candidate: usize,
    identity: IdentityId,
    pass: Pass,
) {
    let bbox = report.candidates[candidate].bbox;
    info!(
        identity = %identity,
        pass = pass.as_str(),
        detection = ?bbox,
        "Assigned detection to identity"
    );
    track.set(identity.clone(), bbox);
    report.candidates[candidate].state = CandidateState::Matched {
        identity: identity.clone(),
        pass,
    };
    report.corrections.push(Correction {
        identity,
        bbox,
        pass,
    });
}
