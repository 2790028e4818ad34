//! Types for the job module.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::tool::CancelFlag;

/// Terminal result of a batch job, emitted exactly once.
///
/// `succeeded` reflects only whether the job ran to completion without
/// cancellation. Individual file failures are visible in the event
/// stream, not here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobOutcome {
    pub succeeded: bool,
    pub message: String,
}

/// Per-file terminal status within a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FileStatus {
    /// Transcode finished with a zero exit status.
    Converted,
    /// Black bars removed through the detected region.
    Cropped { region: String },
    /// No bars detected; nothing to do for this file. Not a failure.
    NoCropNeeded,
    /// The tool failed on this file; the job moves on to the next one.
    Failed { reason: String },
}

/// Events emitted by a running job. Transient: recomputed per sample,
/// never retained by the job itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobEvent {
    /// Work on a file has begun.
    FileStarted {
        file_index: usize,
        total_files: usize,
        file_name: String,
    },
    /// Position within the current file (transcode jobs only).
    FileProgress { file_index: usize, percent: u8 },
    /// A crop suggestion was found for the current file.
    CropDetected { file_index: usize, region: String },
    /// Work on a file has ended, one way or another.
    FileFinished {
        file_index: usize,
        file_name: String,
        status: FileStatus,
    },
    /// Aggregate batch progress, updated once per completed file.
    OverallProgress { percent: u8 },
    /// The job is done. Always the last event.
    Finished { outcome: JobOutcome },
}

/// Control surface returned by both job types: cancel, subscribe to the
/// event stream, await the terminal outcome.
pub struct JobHandle {
    pub(crate) id: String,
    pub(crate) cancel: CancelFlag,
    pub(crate) events: mpsc::UnboundedReceiver<JobEvent>,
    pub(crate) task: JoinHandle<JobOutcome>,
}

impl JobHandle {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Requests cooperative cancellation. The job stops before the next
    /// file and terminates any in-flight subprocess.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Hands out a cancellation flag clone, e.g. for a signal handler.
    pub fn canceller(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Receives the next event, or `None` once the job has finished and
    /// the stream is drained.
    pub async fn next_event(&mut self) -> Option<JobEvent> {
        self.events.recv().await
    }

    /// Waits for the background task and returns the terminal outcome.
    pub async fn join(self) -> JobOutcome {
        self.task.await.unwrap_or_else(|_| JobOutcome {
            succeeded: false,
            message: "job task aborted".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization_tags() {
        let event = JobEvent::FileFinished {
            file_index: 1,
            file_name: "clip.mp4".to_string(),
            status: FileStatus::Failed {
                reason: "tool exited with status Some(1)".to_string(),
            },
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"file_finished\""));
        assert!(json.contains("\"kind\":\"failed\""));

        let parsed: JobEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, event);
    }

    #[test]
    fn test_outcome_roundtrip() {
        let outcome = JobOutcome {
            succeeded: true,
            message: "All conversions completed!".to_string(),
        };
        let json = serde_json::to_string(&outcome).unwrap();
        let parsed: JobOutcome = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, outcome);
    }
}
