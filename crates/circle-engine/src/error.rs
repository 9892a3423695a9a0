//! Error types for the tracking engine.

use std::path::PathBuf;
use thiserror::Error;

use circle_models::{IdentityId, ModelError};

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that can occur while setting up or driving a tracking session.
///
/// Only setup problems and frame-source failures surface as errors once a
/// session is running; collaborator hiccups are logged and absorbed.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid model input: {0}")]
    Model(#[from] ModelError),

    #[error("Unknown identity: {0}")]
    UnknownIdentity(IdentityId),

    #[error("Frame source has {available} frames, need at least {required}")]
    NotEnoughFrames { available: usize, required: usize },

    #[error("Frame {index} unavailable: {message}")]
    FrameSource { index: usize, message: String },

    #[error("Tracker for {identity} failed: {message}")]
    TrackerFailed { identity: IdentityId, message: String },

    #[error("Detection failed: {0}")]
    DetectionFailed(String),

    #[error("Visualization failed: {0}")]
    VisualizationFailed(String),

    #[error("Replay script invalid: {0}")]
    InvalidReplay(String),

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),
}

impl EngineError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    /// Create a frame source error.
    pub fn frame_source(index: usize, message: impl Into<String>) -> Self {
        Self::FrameSource {
            index,
            message: message.into(),
        }
    }

    /// Create a tracker failure error.
    pub fn tracker_failed(identity: &IdentityId, message: impl Into<String>) -> Self {
        Self::TrackerFailed {
            identity: identity.clone(),
            message: message.into(),
        }
    }

    /// Create a detection failure error.
    pub fn detection_failed(message: impl Into<String>) -> Self {
        Self::DetectionFailed(message.into())
    }

    /// Create a visualization failure error.
    pub fn visualization_failed(message: impl Into<String>) -> Self {
        Self::VisualizationFailed(message.into())
    }

    /// Create a replay validation error.
    pub fn invalid_replay(message: impl Into<String>) -> Self {
        Self::InvalidReplay(message.into())
    }
}
