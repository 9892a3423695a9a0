//! Metrics emitted by tracking sessions.
//!
//! Calls go through the `metrics` facade and are no-ops until the host
//! installs a recorder.

use metrics::{counter, histogram};

use crate::reconcile::{Pass, ReconcileReport};

/// Metric names as constants for consistency.
pub mod names {
    pub const FRAMES_PROCESSED_TOTAL: &str = "circle_frames_processed_total";
    pub const CHECKPOINTS_TOTAL: &str = "circle_checkpoints_total";
    pub const CHECKPOINT_DURATION_SECONDS: &str = "circle_checkpoint_duration_seconds";

    pub const TRACKER_FAILURES_TOTAL: &str = "circle_tracker_failures_total";
    pub const OVERLAY_CONFLICTS_TOTAL: &str = "circle_overlay_conflicts_total";
    pub const IDENTITIES_REVERTED_TOTAL: &str = "circle_identities_reverted_total";

    pub const DETECTIONS_TOTAL: &str = "circle_detections_total";
    pub const DETECTIONS_ASSIGNED_TOTAL: &str = "circle_detections_assigned_total";
    pub const DETECTIONS_DROPPED_TOTAL: &str = "circle_detections_dropped_total";
    pub const ORDER_VIOLATIONS_TOTAL: &str = "circle_order_violations_total";
}

pub fn record_frame() {
    counter!(names::FRAMES_PROCESSED_TOTAL).increment(1);
}

pub fn record_tracker_failure() {
    counter!(names::TRACKER_FAILURES_TOTAL).increment(1);
}

pub fn record_overlay(conflicts: usize, reverted: usize) {
    if conflicts == 0 {
        return;
    }
    counter!(names::OVERLAY_CONFLICTS_TOTAL).increment(conflicts as u64);
    counter!(names::IDENTITIES_REVERTED_TOTAL).increment(reverted as u64);
}

/// Record a finished checkpoint and how its detections were used.
pub fn record_checkpoint(report: &ReconcileReport, duration_secs: f64) {
    counter!(names::CHECKPOINTS_TOTAL).increment(1);
    histogram!(names::CHECKPOINT_DURATION_SECONDS).record(duration_secs);

    let raw = report.candidates.len() + report.too_small;
    counter!(names::DETECTIONS_TOTAL).increment(raw as u64);

    for pass in [Pass::DirectOverlap, Pass::EnclosingRoi, Pass::GapFill] {
        let assigned = report.corrections_in(pass);
        if assigned > 0 {
            counter!(names::DETECTIONS_ASSIGNED_TOTAL, "pass" => pass.as_str())
                .increment(assigned as u64);
        }
    }

    let dropped = report.unassigned() + report.too_small;
    if dropped > 0 {
        counter!(names::DETECTIONS_DROPPED_TOTAL).increment(dropped as u64);
    }
}

pub fn record_order_violation() {
    counter!(names::ORDER_VIOLATIONS_TOTAL).increment(1);
}
