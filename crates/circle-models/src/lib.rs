//! Shared data models for circular multi-identity tracking.
//!
//! This crate provides Serde-serializable types for:
//! - Pixel-space bounding boxes and frame dimensions
//! - Identity and session identifiers
//! - Seed sets and in-flight per-frame track proposals

pub mod bbox;
pub mod error;
pub mod identity;
pub mod track;

pub use bbox::{BoundingBox, FrameSize};
pub use error::{ModelError, ModelResult};
pub use identity::{IdentityId, SessionId};
pub use track::{SeedSet, TempTrack};
