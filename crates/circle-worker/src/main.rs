//! Replay session worker binary.

use anyhow::Context;
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use circle_worker::{run_replay, WorkerConfig};

fn init_tracing() -> anyhow::Result<()> {
    // Colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env()
        .add_directive("circle_engine=info".parse()?)
        .add_directive("circle_worker=info".parse()?);

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing()?;

    info!("Starting circle-worker");

    let config = WorkerConfig::from_env().with_replay_arg(std::env::args().nth(1));
    info!("Worker config: {:?}", config);

    let metrics = if config.metrics_dump {
        Some(
            PrometheusBuilder::new()
                .install_recorder()
                .context("failed to install Prometheus recorder")?,
        )
    } else {
        None
    };

    let outcome = run_replay(config).await.context("replay session failed")?;

    info!(
        frames = outcome.summary.frames_processed,
        checkpoints = outcome.summary.checkpoints,
        history = %outcome.history_path.display(),
        summary = %outcome.summary_path.display(),
        "Worker finished"
    );

    if let Some(handle) = metrics {
        info!("Session metrics:\n{}", handle.render());
    }

    Ok(())
}
