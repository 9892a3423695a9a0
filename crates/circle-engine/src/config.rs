//! Configuration for the tracking-consistency engine.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{EngineError, EngineResult};

/// Configuration for a tracking session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    // === Overlap ===
    /// IoU above which two boxes conflict, or a detection matches a track (default: 0.5)
    pub overlap_threshold: f64,

    /// Fraction of the smaller box that must lie inside the larger one
    /// for the pair to count as contained (default: 0.9)
    pub containment_ratio: f64,

    // === Checkpoints ===
    /// Frames per batch between detector reconciliations (default: 10)
    pub checkpoint_interval: usize,

    /// Detections narrower or shorter than this are discarded, in pixels (default: 20)
    pub min_bbox_size: f64,

    /// Enlargement factor for the search region around a track (default: 2.0)
    pub roi_scale: f64,

    // === Detector ===
    /// Score threshold forwarded to the detector (default: 0.9)
    pub detector_select_threshold: f64,

    /// NMS threshold forwarded to the detector (default: 0.1)
    pub detector_nms_threshold: f64,

    // === Execution ===
    /// Step per-identity trackers in parallel within a frame (default: false)
    pub parallel_trackers: bool,

    /// Check the live angular order against the seed order after each checkpoint (default: true)
    pub verify_order_each_checkpoint: bool,

    /// Directory handed to the visualizer
    pub output_dir: Option<PathBuf>,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            overlap_threshold: 0.5,
            containment_ratio: 0.9,
            checkpoint_interval: 10,
            min_bbox_size: 20.0,
            roi_scale: 2.0,
            detector_select_threshold: 0.9,
            detector_nms_threshold: 0.1,
            parallel_trackers: false,
            verify_order_each_checkpoint: true,
            output_dir: None,
        }
    }
}

impl TrackingConfig {
    /// Create config from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            overlap_threshold: env_parse("CIRCLE_OVERLAP_THRESHOLD")
                .unwrap_or(defaults.overlap_threshold),
            containment_ratio: env_parse("CIRCLE_CONTAINMENT_RATIO")
                .unwrap_or(defaults.containment_ratio),
            checkpoint_interval: env_parse("CIRCLE_CHECKPOINT_INTERVAL")
                .unwrap_or(defaults.checkpoint_interval),
            min_bbox_size: env_parse("CIRCLE_MIN_BBOX_SIZE").unwrap_or(defaults.min_bbox_size),
            roi_scale: env_parse("CIRCLE_ROI_SCALE").unwrap_or(defaults.roi_scale),
            detector_select_threshold: env_parse("CIRCLE_DETECTOR_SELECT_THRESHOLD")
                .unwrap_or(defaults.detector_select_threshold),
            detector_nms_threshold: env_parse("CIRCLE_DETECTOR_NMS_THRESHOLD")
                .unwrap_or(defaults.detector_nms_threshold),
            parallel_trackers: env_parse("CIRCLE_PARALLEL_TRACKERS")
                .unwrap_or(defaults.parallel_trackers),
            verify_order_each_checkpoint: env_parse("CIRCLE_VERIFY_ORDER")
                .unwrap_or(defaults.verify_order_each_checkpoint),
            output_dir: std::env::var("CIRCLE_OUTPUT_DIR").ok().map(PathBuf::from),
        }
    }

    /// Stricter matching with more frequent reconciliation.
    pub fn strict() -> Self {
        Self {
            overlap_threshold: 0.6,
            checkpoint_interval: 5,
            roi_scale: 1.5,
            ..Default::default()
        }
    }

    /// Looser matching for low-resolution or shaky footage.
    pub fn lenient() -> Self {
        Self {
            overlap_threshold: 0.3,
            containment_ratio: 0.8,
            checkpoint_interval: 15,
            min_bbox_size: 12.0,
            roi_scale: 2.5,
            ..Default::default()
        }
    }

    /// Reject values the engine cannot work with.
    pub fn validate(&self) -> EngineResult<()> {
        if !(self.overlap_threshold > 0.0 && self.overlap_threshold < 1.0) {
            return Err(EngineError::config(format!(
                "overlap_threshold must be in (0, 1), got {}",
                self.overlap_threshold
            )));
        }
        if !(self.containment_ratio > 0.0 && self.containment_ratio <= 1.0) {
            return Err(EngineError::config(format!(
                "containment_ratio must be in (0, 1], got {}",
                self.containment_ratio
            )));
        }
        if self.checkpoint_interval == 0 {
            return Err(EngineError::config("checkpoint_interval must be at least 1"));
        }
        if !(self.min_bbox_size >= 0.0) {
            return Err(EngineError::config(format!(
                "min_bbox_size must be non-negative, got {}",
                self.min_bbox_size
            )));
        }
        if !(self.roi_scale >= 1.0) {
            return Err(EngineError::config(format!(
                "roi_scale must be at least 1.0, got {}",
                self.roi_scale
            )));
        }
        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
}
