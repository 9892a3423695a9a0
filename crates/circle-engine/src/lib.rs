//! Tracking-consistency engine for subjects seated in a fixed circle.
//!
//! This crate provides:
//! - Angular seating order captured once from the seed frame
//! - Per-frame overlap resolution against per-identity history
//! - Periodic three-pass reconciliation against an unlabeled face detector
//! - A session controller driving trackers, detector and visualizer
//! - Replay collaborators and a JSON frame sink

pub mod angular_order;
pub mod collaborators;
pub mod config;
pub mod error;
pub mod geometry;
pub mod history;
pub mod metrics;
pub mod overlay;
pub mod reconcile;
pub mod replay;
pub mod session;
pub mod sink;

pub use angular_order::AngularOrder;
pub use collaborators::{
    Detector, FrameOverlay, FrameSource, NullVisualizer, Tracker, TrackerFactory, Visualizer,
};
pub use config::TrackingConfig;
pub use error::{EngineError, EngineResult};
pub use history::{History, HistoryBook};
pub use overlay::{OverlayReport, OverlayResolver};
pub use reconcile::{Pass, ReconcileReport, ReconciliationEngine};
pub use replay::{ReplayScript, RoiLog};
pub use session::{SessionPhase, SessionSummary, TrackingSession};
pub use sink::JsonFrameSink;
