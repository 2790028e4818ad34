use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use amvbatch_core::{
    is_supported_input, load_config, validate_config, BlackBarRemovalJob, Config, ConversionJob,
    ConversionSettings, FfmpegTool, FileStatus, JobEvent, JobHandle, JobOutcome, MediaTool,
    Resolution, ScaleMode,
};

#[derive(Parser)]
#[command(
    name = "amvbatch",
    version,
    about = "Batch AMV transcoding and black bar removal"
)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit job events as JSON lines on stdout
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Transcode video files into the AMV container
    Convert {
        /// Input video files
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Output frame height
        #[arg(long, default_value_t = 240)]
        height: u32,

        /// How output dimensions are derived
        #[arg(long, value_enum, default_value_t = ScaleArg::Preserved)]
        scale: ScaleArg,

        /// Output frame rate (10-30)
        #[arg(long, default_value_t = 15)]
        fps: u32,
    },
    /// Detect and remove letterbox/pillarbox black bars
    RemoveBars {
        /// Input video files
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ScaleArg {
    Preserved,
    Forced,
    Crop,
}

impl From<ScaleArg> for ScaleMode {
    fn from(arg: ScaleArg) -> Self {
        match arg {
            ScaleArg::Preserved => ScaleMode::Preserved,
            ScaleArg::Forced => ScaleMode::Forced,
            ScaleArg::Crop => ScaleMode::Crop,
        }
    }
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = load_configuration(cli.config.as_deref())?;
    validate_config(&config).context("Configuration validation failed")?;

    let tool = Arc::new(FfmpegTool::new(config.tool.clone()));
    tool.validate()
        .await
        .context("External tool validation failed")?;

    let handle = match cli.command {
        Command::Convert {
            files,
            height,
            scale,
            fps,
        } => {
            let resolution = Resolution::from_height(height).with_context(|| {
                format!(
                    "unsupported height {}; expected one of 240, 180, 176, 160, 144, 128, 120, 96",
                    height
                )
            })?;
            let settings = ConversionSettings::new(resolution, scale.into(), fps)?;

            let files = collect_inputs(files);
            if files.is_empty() {
                bail!("no supported input files");
            }

            info!(
                files = files.len(),
                %resolution,
                fps,
                "starting conversion"
            );
            ConversionJob::new(files, settings, tool).start()
        }
        Command::RemoveBars { files } => {
            let files = collect_inputs(files);
            if files.is_empty() {
                bail!("no supported input files");
            }

            info!(files = files.len(), "starting black bar removal");
            BlackBarRemovalJob::new(files, tool).start()
        }
    };

    // First Ctrl-C requests cooperative cancellation; the job stops
    // before the next file and terminates any in-flight subprocess.
    let canceller = handle.canceller();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("cancellation requested");
            canceller.cancel();
        }
    });

    let outcome = drive(handle, cli.json).await;
    info!("{}", outcome.message);

    if !outcome.succeeded {
        std::process::exit(1);
    }
    Ok(())
}

/// The collection boundary: order-preserving dedup by path, unsupported
/// extensions filtered out with a warning.
fn collect_inputs(files: Vec<PathBuf>) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    let mut inputs = Vec::new();

    for file in files {
        if !is_supported_input(&file) {
            warn!("skipping unsupported file: {}", file.display());
            continue;
        }
        if seen.insert(file.clone()) {
            inputs.push(file);
        }
    }

    inputs
}

fn load_configuration(path: Option<&Path>) -> Result<Config> {
    let path = path
        .map(Path::to_path_buf)
        .or_else(|| std::env::var("AMVBATCH_CONFIG").ok().map(PathBuf::from));

    match path {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            load_config(&path).with_context(|| format!("Failed to load config from {:?}", path))
        }
        None => Ok(Config::default()),
    }
}

/// Drains the job's event stream to completion and returns the terminal
/// outcome.
async fn drive(mut handle: JobHandle, json: bool) -> JobOutcome {
    let mut outcome = None;

    while let Some(event) = handle.next_event().await {
        if json {
            match serde_json::to_string(&event) {
                Ok(line) => println!("{}", line),
                Err(e) => warn!("failed to serialize event: {}", e),
            }
        } else {
            render(&event);
        }

        if let JobEvent::Finished { outcome: o } = event {
            outcome = Some(o);
        }
    }

    outcome.unwrap_or(JobOutcome {
        succeeded: false,
        message: "job ended without an outcome".to_string(),
    })
}

fn render(event: &JobEvent) {
    match event {
        JobEvent::FileStarted {
            file_index,
            total_files,
            file_name,
        } => info!("[{}/{}] {}", file_index + 1, total_files, file_name),
        JobEvent::FileProgress { percent, .. } => debug!("file progress: {}%", percent),
        JobEvent::CropDetected { region, .. } => info!("detected crop: {}", region),
        JobEvent::FileFinished {
            file_name, status, ..
        } => match status {
            FileStatus::Converted | FileStatus::Cropped { .. } => {
                info!("completed: {}", file_name)
            }
            FileStatus::NoCropNeeded => info!("no black bars detected: {}", file_name),
            FileStatus::Failed { reason } => warn!("failed: {} ({})", file_name, reason),
        },
        JobEvent::OverallProgress { percent } => debug!("overall progress: {}%", percent),
        JobEvent::Finished { .. } => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_inputs_dedups_and_filters() {
        let inputs = collect_inputs(vec![
            PathBuf::from("/v/a.mp4"),
            PathBuf::from("/v/b.mkv"),
            PathBuf::from("/v/a.mp4"),
            PathBuf::from("/v/notes.txt"),
        ]);
        assert_eq!(
            inputs,
            vec![PathBuf::from("/v/a.mp4"), PathBuf::from("/v/b.mkv")]
        );
    }

    #[test]
    fn test_scale_arg_maps_onto_scale_mode() {
        assert_eq!(ScaleMode::from(ScaleArg::Preserved), ScaleMode::Preserved);
        assert_eq!(ScaleMode::from(ScaleArg::Forced), ScaleMode::Forced);
        assert_eq!(ScaleMode::from(ScaleArg::Crop), ScaleMode::Crop);
    }
}
