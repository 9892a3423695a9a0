//! Replay session execution.

use chrono::Utc;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

use circle_engine::{
    Detector, FrameSource, HistoryBook, JsonFrameSink, NullVisualizer, ReplayScript, RoiLog,
    SessionSummary, TrackingConfig, TrackingSession, Visualizer,
};

use crate::config::WorkerConfig;
use crate::error::WorkerResult;

pub const HISTORY_FILE: &str = "history.json";
pub const SUMMARY_FILE: &str = "summary.json";

/// Result of one worker run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub summary: SessionSummary,
    pub history_path: PathBuf,
    pub summary_path: PathBuf,
}

#[derive(Serialize)]
struct SummaryFile<'a> {
    started_at: String,
    finished_at: String,
    replay: String,
    config: &'a TrackingConfig,
    summary: &'a SessionSummary,
}

/// Run the configured replay script and write its results.
pub async fn run_replay(config: WorkerConfig) -> WorkerResult<RunOutcome> {
    let replay_path = config.replay_path()?.clone();
    let started_at = Utc::now();
    info!(replay = %replay_path.display(), "Starting replay session");

    let path = replay_path.clone();
    let tracking = config.tracking.clone();
    let (summary, history) =
        tokio::task::spawn_blocking(move || run_session(&path, tracking)).await??;

    tokio::fs::create_dir_all(&config.results_dir).await?;

    let history_path = config.results_dir.join(HISTORY_FILE);
    tokio::fs::write(&history_path, serde_json::to_vec_pretty(&history)?).await?;

    let summary_path = config.results_dir.join(SUMMARY_FILE);
    let file = SummaryFile {
        started_at: started_at.to_rfc3339(),
        finished_at: Utc::now().to_rfc3339(),
        replay: replay_path.display().to_string(),
        config: &config.tracking,
        summary: &summary,
    };
    tokio::fs::write(&summary_path, serde_json::to_vec_pretty(&file)?).await?;

    info!(
        session_id = %summary.session_id,
        frames = summary.frames_processed,
        results = %config.results_dir.display(),
        "Replay session results written"
    );

    Ok(RunOutcome {
        summary,
        history_path,
        summary_path,
    })
}

fn run_session(path: &Path, tracking: TrackingConfig) -> WorkerResult<(SessionSummary, HistoryBook)> {
    let script = ReplayScript::load(path)?;
    let factory = script.tracker_factory(RoiLog::default());

    match tracking.output_dir.clone() {
        Some(dir) => drive(TrackingSession::new(
            tracking,
            script.seeds.clone(),
            script.frame_source(),
            factory,
            script.detector(),
            JsonFrameSink::new(dir),
        )?),
        None => drive(TrackingSession::new(
            tracking,
            script.seeds.clone(),
            script.frame_source(),
            factory,
            script.detector(),
            NullVisualizer,
        )?),
    }
}

fn drive<S, D, V>(mut session: TrackingSession<S, D, V>) -> WorkerResult<(SessionSummary, HistoryBook)>
where
    S: FrameSource,
    S::Frame: Sync,
    D: Detector<S::Frame>,
    V: Visualizer<S::Frame>,
{
    let summary = session.run()?;
    Ok((summary, session.into_history()))
}
