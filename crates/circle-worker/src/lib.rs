//! Offline session runner.
//!
//! This crate provides:
//! - Worker configuration from the environment
//! - Replay-driven tracking sessions on a blocking thread
//! - History and summary output as JSON

pub mod config;
pub mod error;
pub mod runner;

pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use runner::{run_replay, RunOutcome};
