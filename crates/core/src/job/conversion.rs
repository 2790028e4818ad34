//! Batch AMV conversion job.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::tool::{
    to_percent, CancelFlag, ConversionSettings, FilterSpec, MediaTool, ToolError, TranscodeRequest,
};

use super::types::{FileStatus, JobEvent, JobHandle, JobOutcome};

/// Sibling folder transcoded files are written into.
const OUTPUT_DIR_NAME: &str = "AMV Converted";
const OUTPUT_EXTENSION: &str = "amv";

/// Transcodes a fixed list of input files into the target format,
/// strictly one at a time, on a dedicated background task.
pub struct ConversionJob {
    id: String,
    files: Vec<PathBuf>,
    settings: ConversionSettings,
    tool: Arc<dyn MediaTool>,
}

impl ConversionJob {
    /// Creates a job over an immutable file list and settings.
    pub fn new(
        files: Vec<PathBuf>,
        settings: ConversionSettings,
        tool: Arc<dyn MediaTool>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            files,
            settings,
            tool,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Starts the job. A job instance is single-use: it runs to
    /// completion or cancellation and cannot be restarted.
    pub fn start(self) -> JobHandle {
        let (events, rx) = mpsc::unbounded_channel();
        let cancel = CancelFlag::new();
        let id = self.id.clone();

        let task = tokio::spawn(run(self, events, cancel.clone()));

        JobHandle {
            id,
            cancel,
            events: rx,
            task,
        }
    }
}

async fn run(
    job: ConversionJob,
    events: mpsc::UnboundedSender<JobEvent>,
    cancel: CancelFlag,
) -> JobOutcome {
    let ConversionJob {
        id,
        files,
        settings,
        tool,
    } = job;

    // Derived once; every file in the batch shares the same parameters.
    let filter = FilterSpec::from_settings(&settings);
    let total_files = files.len();
    info!(job_id = %id, total_files, "conversion job started");

    let mut cancelled = false;

    for (file_index, input) in files.iter().enumerate() {
        if cancel.is_cancelled() {
            cancelled = true;
            break;
        }

        let file_name = display_name(input);
        let _ = events.send(JobEvent::FileStarted {
            file_index,
            total_files,
            file_name: file_name.clone(),
        });
        let _ = events.send(JobEvent::FileProgress {
            file_index,
            percent: 0,
        });

        match convert_one(
            tool.as_ref(),
            input,
            &filter,
            settings.frame_rate,
            file_index,
            &events,
            &cancel,
        )
        .await
        {
            Ok(()) => {
                let _ = events.send(JobEvent::FileProgress {
                    file_index,
                    percent: 100,
                });
                let _ = events.send(JobEvent::FileFinished {
                    file_index,
                    file_name,
                    status: FileStatus::Converted,
                });
            }
            Err(ToolError::Cancelled) => {
                cancelled = true;
                break;
            }
            Err(e) => {
                warn!(job_id = %id, file = %input.display(), error = %e, "file conversion failed");
                let _ = events.send(JobEvent::FileFinished {
                    file_index,
                    file_name,
                    status: FileStatus::Failed {
                        reason: e.to_string(),
                    },
                });
            }
        }

        let _ = events.send(JobEvent::OverallProgress {
            percent: (((file_index + 1) * 100) / total_files) as u8,
        });
    }

    let outcome = if cancelled || cancel.is_cancelled() {
        JobOutcome {
            succeeded: false,
            message: "Conversion cancelled".to_string(),
        }
    } else {
        JobOutcome {
            succeeded: true,
            message: "All conversions completed!".to_string(),
        }
    };

    info!(job_id = %id, succeeded = outcome.succeeded, "conversion job finished");
    let _ = events.send(JobEvent::Finished {
        outcome: outcome.clone(),
    });
    outcome
}

async fn convert_one(
    tool: &dyn MediaTool,
    input: &Path,
    filter: &FilterSpec,
    frame_rate: u32,
    file_index: usize,
    events: &mpsc::UnboundedSender<JobEvent>,
    cancel: &CancelFlag,
) -> Result<(), ToolError> {
    // A failed probe degrades to an unknown duration: the transcode
    // still runs, only per-sample percent reporting is suppressed.
    let duration_secs = match tool.probe_duration(input).await {
        Ok(d) => d,
        Err(e) => {
            debug!(file = %input.display(), error = %e, "duration probe failed");
            0.0
        }
    };

    let request = TranscodeRequest {
        input_path: input.to_path_buf(),
        output_path: output_path_for(input),
        filter: filter.clone(),
        frame_rate,
    };

    let (sample_tx, mut sample_rx) = mpsc::unbounded_channel();

    let forwarder = {
        let events = events.clone();
        tokio::spawn(async move {
            while let Some(elapsed) = sample_rx.recv().await {
                if duration_secs > 0.0 {
                    let _ = events.send(JobEvent::FileProgress {
                        file_index,
                        percent: to_percent(elapsed, duration_secs),
                    });
                }
            }
        })
    };

    let result = tool.transcode(&request, Some(sample_tx), cancel).await;
    let _ = forwarder.await;
    result
}

/// Output path: job-specific sibling folder, target extension
/// substituted. The source is never overwritten.
fn output_path_for(input: &Path) -> PathBuf {
    let dir = input
        .parent()
        .map(|p| p.join(OUTPUT_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from(OUTPUT_DIR_NAME));

    let mut name = PathBuf::from(input.file_name().unwrap_or_else(|| OsStr::new("output")));
    name.set_extension(OUTPUT_EXTENSION);
    dir.join(name)
}

pub(crate) fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}
