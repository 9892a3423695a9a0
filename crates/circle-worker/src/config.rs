//! Worker configuration.

use std::path::PathBuf;

use circle_engine::TrackingConfig;

use crate::error::{WorkerError, WorkerResult};

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Replay script to run
    pub replay_path: Option<PathBuf>,
    /// Where `history.json` and `summary.json` are written
    pub results_dir: PathBuf,
    /// Install a Prometheus recorder and log its output after the run
    pub metrics_dump: bool,
    /// Engine settings
    pub tracking: TrackingConfig,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            replay_path: None,
            results_dir: PathBuf::from("circle-output"),
            metrics_dump: false,
            tracking: TrackingConfig::default(),
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    ///
    /// Results land in `CIRCLE_RESULTS_DIR`, else next to the frame output
    /// in `CIRCLE_OUTPUT_DIR`, else in `circle-output`.
    pub fn from_env() -> Self {
        let tracking = TrackingConfig::from_env();
        let results_dir = std::env::var("CIRCLE_RESULTS_DIR")
            .ok()
            .map(PathBuf::from)
            .or_else(|| tracking.output_dir.clone())
            .unwrap_or_else(|| PathBuf::from("circle-output"));

        Self {
            replay_path: std::env::var("CIRCLE_REPLAY_PATH").ok().map(PathBuf::from),
            results_dir,
            metrics_dump: std::env::var("CIRCLE_METRICS_DUMP")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            tracking,
        }
    }

    /// A command-line path takes precedence over the environment.
    pub fn with_replay_arg(mut self, arg: Option<String>) -> Self {
        if let Some(path) = arg {
            self.replay_path = Some(PathBuf::from(path));
        }
        self
    }

    pub fn replay_path(&self) -> WorkerResult<&PathBuf> {
        self.replay_path.as_ref().ok_or_else(|| {
            WorkerError::config("no replay script given (pass a path or set CIRCLE_REPLAY_PATH)")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arg_overrides_env_path() {
        let config = WorkerConfig {
            replay_path: Some(PathBuf::from("from-env.json")),
            ..Default::default()
        }
        .with_replay_arg(Some("from-arg.json".to_string()));

        assert_eq!(config.replay_path().unwrap(), &PathBuf::from("from-arg.json"));
    }

    #[test]
    fn test_missing_replay_path() {
        let config = WorkerConfig::default().with_replay_arg(None);
        assert!(matches!(config.replay_path(), Err(WorkerError::ConfigError(_))));
    }
}
