//! Model validation errors.

use thiserror::Error;

/// Result type for model construction.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors raised while building model values from untrusted input.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("Identity label must not be empty")]
    EmptyIdentity,

    #[error("Identity {0} appears more than once in the seed set")]
    DuplicateIdentity(String),

    #[error("Seed set is empty")]
    EmptySeedSet,

    #[error("Seed box for {identity} is degenerate: {width}x{height}")]
    DegenerateSeed {
        identity: String,
        width: f64,
        height: f64,
    },

    #[error("Frame size must be non-zero, got {width}x{height}")]
    InvalidFrameSize { width: u32, height: u32 },
}
