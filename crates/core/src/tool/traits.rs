//! Trait definitions for the tool module.

use async_trait::async_trait;
use std::path::Path;
use tokio::sync::mpsc;

use super::error::ToolError;
use super::types::{CancelFlag, CropRegion, TranscodeRequest};

/// The external transcoding/probing tool boundary consumed by batch
/// jobs. The real implementation drives ffmpeg; tests substitute a
/// mock.
#[async_trait]
pub trait MediaTool: Send + Sync {
    /// Queries the container duration in seconds.
    async fn probe_duration(&self, input: &Path) -> Result<f64, ToolError>;

    /// Runs a short crop-detection pass over a bounded sample window
    /// and returns the suggested region. `None` is a normal outcome:
    /// the file has no letterbox bars.
    async fn detect_crop(&self, input: &Path) -> Result<Option<CropRegion>, ToolError>;

    /// Transcodes one file into the target format.
    ///
    /// Elapsed-seconds samples parsed from the tool's diagnostic stream
    /// are forwarded on `progress_tx` as they appear. If the sender is
    /// dropped, transcoding continues without progress reporting. The
    /// cancel flag is observed while draining; a cancelled transcode
    /// terminates the subprocess and returns [`ToolError::Cancelled`].
    async fn transcode(
        &self,
        request: &TranscodeRequest,
        progress_tx: Option<mpsc::UnboundedSender<f64>>,
        cancel: &CancelFlag,
    ) -> Result<(), ToolError>;

    /// Re-encodes video through a detected crop region, copying the
    /// audio stream unchanged.
    async fn apply_crop(
        &self,
        input: &Path,
        output: &Path,
        region: &CropRegion,
        cancel: &CancelFlag,
    ) -> Result<(), ToolError>;

    /// Validates that the tool binaries are present and runnable.
    async fn validate(&self) -> Result<(), ToolError>;
}
