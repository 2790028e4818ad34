//! Batch letterbox/pillarbox removal job.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::tool::{CancelFlag, MediaTool, ToolError};

use super::conversion::display_name;
use super::types::{FileStatus, JobEvent, JobHandle, JobOutcome};

/// Sibling folder cropped files are written into.
const OUTPUT_DIR_NAME: &str = "Cropped";

/// Detects black bars per file and, where a region is found, re-encodes
/// the video through it. Files without bars are skipped, which is a
/// normal outcome rather than a failure.
pub struct BlackBarRemovalJob {
    id: String,
    files: Vec<PathBuf>,
    tool: Arc<dyn MediaTool>,
}

impl BlackBarRemovalJob {
    /// Creates a job over an immutable file list.
    pub fn new(files: Vec<PathBuf>, tool: Arc<dyn MediaTool>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            files,
            tool,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Starts the job. Single-use, like [`super::ConversionJob`].
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
    job: BlackBarRemovalJob,
    events: mpsc::UnboundedSender<JobEvent>,
    cancel: CancelFlag,
) -> JobOutcome {
    let BlackBarRemovalJob { id, files, tool } = job;
    let total_files = files.len();
    info!(job_id = %id, total_files, "black bar removal job started");

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

        match process_one(tool.as_ref(), input, file_index, &events, &cancel).await {
            Ok(status) => {
                let _ = events.send(JobEvent::FileFinished {
                    file_index,
                    file_name,
                    status,
                });
            }
            Err(ToolError::Cancelled) => {
                cancelled = true;
                break;
            }
            Err(e) => {
                warn!(job_id = %id, file = %input.display(), error = %e, "black bar removal failed");
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
            message: "Black bar removal cancelled".to_string(),
        }
    } else {
        JobOutcome {
            succeeded: true,
            message: "Black bar removal completed!".to_string(),
        }
    };

    info!(job_id = %id, succeeded = outcome.succeeded, "black bar removal job finished");
    let _ = events.send(JobEvent::Finished {
        outcome: outcome.clone(),
    });
    outcome
}

async fn process_one(
    tool: &dyn MediaTool,
    input: &Path,
    file_index: usize,
    events: &mpsc::UnboundedSender<JobEvent>,
    cancel: &CancelFlag,
) -> Result<FileStatus, ToolError> {
    let region = match tool.detect_crop(input).await {
        Ok(Some(region)) => region,
        // No suggestion in the probe window: the file has no bars.
        Ok(None) => return Ok(FileStatus::NoCropNeeded),
        Err(e) => {
            return Ok(FileStatus::Failed {
                reason: e.to_string(),
            })
        }
    };

    let _ = events.send(JobEvent::CropDetected {
        file_index,
        region: region.to_string(),
    });

    match tool
        .apply_crop(input, &output_path_for(input), &region, cancel)
        .await
    {
        Ok(()) => Ok(FileStatus::Cropped {
            region: region.to_string(),
        }),
        Err(ToolError::Cancelled) => Err(ToolError::Cancelled),
        Err(e) => Ok(FileStatus::Failed {
            reason: e.to_string(),
        }),
    }
}

/// Output path: sibling folder, file name unchanged.
fn output_path_for(input: &Path) -> PathBuf {
    let dir = input
        .parent()
        .map(|p| p.join(OUTPUT_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from(OUTPUT_DIR_NAME));

    dir.join(input.file_name().unwrap_or_else(|| OsStr::new("output")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockTool;
    use crate::tool::CropRegion;

    async fn drain(handle: &mut JobHandle) -> (Vec<JobEvent>, JobOutcome) {
        let mut events = Vec::new();
        let mut outcome = None;
        while let Some(event) = handle.next_event().await {
            if let JobEvent::Finished { outcome: o } = &event {
                outcome = Some(o.clone());
            }
            events.push(event);
        }
        (events, outcome.expect("job must emit a terminal outcome"))
    }

    #[test]
    fn test_output_path_keeps_file_name() {
        assert_eq!(
            output_path_for(Path::new("/videos/clip.mkv")),
            PathBuf::from("/videos/Cropped/clip.mkv")
        );
    }

    #[tokio::test]
    async fn test_no_crop_found_skips_without_output() {
        let tool = Arc::new(MockTool::new());
        // No crop configured for the file: detection reports none.

        let job = BlackBarRemovalJob::new(vec!["/v/a.mkv".into()], tool.clone());
        let mut handle = job.start();
        let (events, outcome) = drain(&mut handle).await;

        assert!(outcome.succeeded);
        assert!(events.iter().any(|e| matches!(
            e,
            JobEvent::FileFinished {
                status: FileStatus::NoCropNeeded,
                ..
            }
        )));
        assert!(tool.recorded_crop_applies().await.is_empty());
    }

    #[tokio::test]
    async fn test_detected_crop_is_applied_verbatim() {
        let tool = Arc::new(MockTool::new());
        tool.set_crop("/v/a.mkv", CropRegion::new("720:416:0:80")).await;

        let job = BlackBarRemovalJob::new(vec!["/v/a.mkv".into()], tool.clone());
        let mut handle = job.start();
        let (events, outcome) = drain(&mut handle).await;

        assert!(outcome.succeeded);
        assert_eq!(outcome.message, "Black bar removal completed!");
        assert!(events.iter().any(|e| matches!(
            e,
            JobEvent::CropDetected { region, .. } if region == "720:416:0:80"
        )));

        let applies = tool.recorded_crop_applies().await;
        assert_eq!(applies.len(), 1);
        assert_eq!(applies[0].input, PathBuf::from("/v/a.mkv"));
        assert_eq!(applies[0].output, PathBuf::from("/v/Cropped/a.mkv"));
        assert_eq!(applies[0].region.as_str(), "720:416:0:80");
    }

    #[tokio::test]
    async fn test_detection_error_fails_file_but_not_job() {
        let tool = Arc::new(MockTool::new());
        tool.fail_detect_for("/v/a.mkv").await;
        tool.set_crop("/v/b.mkv", CropRegion::new("640:272:0:104")).await;

        let job = BlackBarRemovalJob::new(
            vec!["/v/a.mkv".into(), "/v/b.mkv".into()],
            tool.clone(),
        );
        let mut handle = job.start();
        let (events, outcome) = drain(&mut handle).await;

        assert!(outcome.succeeded);

        let statuses: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                JobEvent::FileFinished { status, .. } => Some(status.clone()),
                _ => None,
            })
            .collect();
        assert!(matches!(statuses[0], FileStatus::Failed { .. }));
        assert!(matches!(statuses[1], FileStatus::Cropped { .. }));
    }

    #[tokio::test]
    async fn test_cancel_during_apply_stops_the_batch() {
        let tool = Arc::new(MockTool::new());
        tool.set_crop("/v/a.mkv", CropRegion::new("720:416:0:80")).await;
        tool.set_crop("/v/b.mkv", CropRegion::new("720:416:0:80")).await;
        tool.cancel_during_apply().await;

        let job = BlackBarRemovalJob::new(
            vec!["/v/a.mkv".into(), "/v/b.mkv".into()],
            tool.clone(),
        );
        let mut handle = job.start();
        let (events, outcome) = drain(&mut handle).await;

        assert!(!outcome.succeeded);
        assert_eq!(outcome.message, "Black bar removal cancelled");
        // The interrupted file gets no terminal status and the second
        // file is never started.
        assert!(!events
            .iter()
            .any(|e| matches!(e, JobEvent::FileFinished { .. })));
        assert!(!events
            .iter()
            .any(|e| matches!(e, JobEvent::FileStarted { file_index: 1, .. })));
    }
}
