//! Face signal extraction binary.
//!
//! Usage: `mpface [config.json]`. Without a config file, options are read
//! from `MPFACE_*` environment variables (and `.env`).

use anyhow::Context;
use tokio::sync::watch;
use tracing::{error, info, Instrument};

use mpface_media::{FfmpegFrameSource, FrameSource};
use mpface_pipeline::logging::{init_tracing, RunLogger};
use mpface_pipeline::{
    PipelineConfig, PipelineDriver, PipelineError, RunSummary, SidecarLandmarker, SinkManager,
};

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenvy::dotenv().ok();

    init_tracing();

    let code = match run().await {
        Ok(summary) => {
            print_summary(&summary);
            0
        }
        Err(e) => {
            let code = e
                .downcast_ref::<PipelineError>()
                .map(PipelineError::exit_code)
                .unwrap_or(1);
            error!("{:#}", e);
            eprintln!("mpface: {:#}", e);
            code
        }
    };

    std::process::exit(code);
}

async fn run() -> anyhow::Result<RunSummary> {
    let config = match std::env::args().nth(1) {
        Some(path) => PipelineConfig::from_file(&path),
        None => PipelineConfig::from_env(),
    }
    .map_err(PipelineError::from)
    .context("Invalid configuration")?;

    info!(
        input = %config.input.display(),
        sinks = ?config.sinks,
        overlay = ?config.overlay,
        "Starting mpface"
    );
    if config.sinks.is_empty() {
        info!("No sinks enabled; frames are only counted");
    }

    let mut source = FfmpegFrameSource::open(&config.input)
        .await
        .map_err(PipelineError::input)
        .with_context(|| format!("Cannot open {}", config.input.display()))?;

    let mut detector = SidecarLandmarker::spawn(&config.detector_invocation())
        .map_err(PipelineError::DetectorStartup)?;

    let mut sinks = SinkManager::from_config(
        &config.sinks,
        *source.properties(),
        &config.video_codec,
    );

    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received interrupt, finishing current frame");
            let _ = cancel_tx.send(true);
        }
    });

    let driver = PipelineDriver::new(config.overlay).with_progress_interval(config.progress_interval);
    let summary = driver
        .run(&mut source, &mut detector, &mut sinks, cancel_rx)
        .instrument(RunLogger::create_span(&config.input))
        .await?;

    Ok(summary)
}

fn print_summary(summary: &RunSummary) {
    println!("Frames processed:      {}", summary.frames);
    println!("Frames with a face:    {}", summary.frames_with_faces);
    for artifact in &summary.artifacts {
        println!(
            "{:<10} {:>8}  {}",
            artifact.kind,
            artifact.count,
            artifact.location.display()
        );
    }
}
