//! Per-frame detection and correction of overlapping identity boxes.
//!
//! Two identities whose proposed boxes overlap too much (or nest) cannot
//! both be right. The one whose tracker moved less smoothly, measured as
//! IoU against its own last accepted box, is pulled back to that box.
//!
//! Pairs are enumerated in identity-label order and resolved greedily: a
//! later pair sees boxes already reverted by an earlier one. With three or
//! more mutually overlapping identities the outcome depends on that order.

use serde::Serialize;
use tracing::{debug, info, warn};

use circle_models::{BoundingBox, IdentityId, TempTrack};

use crate::config::TrackingConfig;
use crate::geometry::{contains, iou};
use crate::history::HistoryBook;

/// Two identities whose proposals conflict.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConflictPair {
    pub first: IdentityId,
    pub second: IdentityId,
    /// IoU between the two proposals when the conflict was found
    pub iou: f64,
    /// Whether one proposal nests inside the other
    pub contained: bool,
}

/// What the resolver did with a conflicting pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// Both trackers lost their own history; both reverted
    RevertedBoth,
    RevertedFirst,
    RevertedSecond,
    /// No history to revert to; left as proposed
    Unresolved,
}

/// A conflict together with the scores that decided it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedConflict {
    pub pair: ConflictPair,
    pub first_continuity: f64,
    pub second_continuity: f64,
    pub resolution: Resolution,
}

/// Outcome of one resolver run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OverlayReport {
    pub resolved: Vec<ResolvedConflict>,
    /// Identities whose proposal was replaced by their last history box,
    /// in first-revert order without repeats. Their trackers need their
    /// search region reset to the current proposal.
    pub reverted: Vec<IdentityId>,
}

impl OverlayReport {
    pub fn had_conflicts(&self) -> bool {
        !self.resolved.is_empty()
    }
}

/// Stateless resolver over a session's current proposals.
pub struct OverlayResolver<'a> {
    config: &'a TrackingConfig,
}

impl<'a> OverlayResolver<'a> {
    pub fn new(config: &'a TrackingConfig) -> Self {
        Self { config }
    }

    /// Every unordered conflicting pair, each reported once, in label order.
    pub fn find_conflicts(&self, track: &TempTrack) -> Vec<ConflictPair> {
        let entries: Vec<(&IdentityId, &BoundingBox)> = track.iter().collect();
        let mut conflicts = Vec::new();

        for (i, (first, a)) in entries.iter().enumerate() {
            for (second, b) in entries.iter().skip(i + 1) {
                let overlap = iou(a, b);
                let contained = contains(a, b, self.config.containment_ratio);
                if overlap > self.config.overlap_threshold || contained {
                    info!(
                        first = %first,
                        second = %second,
                        iou = overlap,
                        contained,
                        "Overlay conflict detected"
                    );
                    conflicts.push(ConflictPair {
                        first: (*first).clone(),
                        second: (*second).clone(),
                        iou: overlap,
                        contained,
                    });
                }
            }
        }

        conflicts
    }

    /// Find and resolve all conflicts in `track`, reverting losers to their
    /// last accepted box.
    pub fn resolve(&self, track: &mut TempTrack, history: &HistoryBook) -> OverlayReport {
        let mut report = OverlayReport::default();

        for pair in self.find_conflicts(track) {
            let resolved = self.resolve_pair(pair, track, history, &mut report.reverted);
            report.resolved.push(resolved);
        }

        report
    }

    fn resolve_pair(
        &self,
        pair: ConflictPair,
        track: &mut TempTrack,
        history: &HistoryBook,
        reverted: &mut Vec<IdentityId>,
    ) -> ResolvedConflict {
        let prev = (history.last_box(&pair.first), history.last_box(&pair.second));
        let current = (track.get(&pair.first), track.get(&pair.second));

        let (Some(&prev_first), Some(&prev_second), Some(&cur_first), Some(&cur_second)) =
            (prev.0, prev.1, current.0, current.1)
        else {
            warn!(
                first = %pair.first,
                second = %pair.second,
                "Conflict left unresolved: missing history or proposal"
            );
            return ResolvedConflict {
                pair,
                first_continuity: 0.0,
                second_continuity: 0.0,
                resolution: Resolution::Unresolved,
            };
        };

        let first_continuity = iou(&cur_first, &prev_first);
        let second_continuity = iou(&cur_second, &prev_second);

        let resolution = if first_continuity == 0.0 && second_continuity == 0.0 {
            revert(track, reverted, &pair.first, prev_first);
            revert(track, reverted, &pair.second, prev_second);
            Resolution::RevertedBoth
        } else if first_continuity > second_continuity {
            revert(track, reverted, &pair.second, prev_second);
            Resolution::RevertedSecond
        } else {
            if first_continuity == second_continuity {
                warn!(
                    first = %pair.first,
                    second = %pair.second,
                    continuity = first_continuity,
                    "Ambiguous overlay correction, reverting first of pair"
                );
            }
            revert(track, reverted, &pair.first, prev_first);
            Resolution::RevertedFirst
        };

        debug!(
            first = %pair.first,
            second = %pair.second,
            first_continuity,
            second_continuity,
            ?resolution,
            "Overlay conflict resolved"
        );

        ResolvedConflict {
            pair,
            first_continuity,
            second_continuity,
            resolution,
        }
    }
}

fn revert(
    track: &mut TempTrack,
    reverted: &mut Vec<IdentityId>,
    id: &IdentityId,
    previous: BoundingBox,
) {
    track.set(id.clone(), previous);
    if !reverted.contains(id) {
        reverted.push(id.clone());
    }
}
