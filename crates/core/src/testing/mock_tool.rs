//! Mock tool for testing.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};

use crate::tool::{CancelFlag, CropRegion, MediaTool, ToolError, TranscodeRequest};

/// A recorded crop application for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedCropApply {
    pub input: PathBuf,
    pub output: PathBuf,
    pub region: CropRegion,
}

/// Mock implementation of the [`MediaTool`] trait.
///
/// Provides controllable behavior for testing the job orchestrators:
/// per-path probe and crop results, injected transcode failures,
/// scripted progress samples, deterministic mid-batch cancellation, and
/// recorded calls for assertions.
#[derive(Debug, Default)]
pub struct MockTool {
    /// Pre-configured durations by path; unknown paths fail the probe.
    durations: Arc<RwLock<HashMap<PathBuf, f64>>>,
    /// Pre-configured crop suggestions by path; unknown paths report none.
    crops: Arc<RwLock<HashMap<PathBuf, CropRegion>>>,
    /// Paths whose crop detection fails outright.
    detect_failures: Arc<RwLock<HashSet<PathBuf>>>,
    /// Paths whose transcode exits nonzero.
    transcode_failures: Arc<RwLock<HashSet<PathBuf>>>,
    /// Elapsed-seconds samples emitted during each transcode.
    progress_samples: Arc<RwLock<Vec<f64>>>,
    /// Flip the job's cancel flag after this many successful transcodes.
    cancel_after_transcodes: Arc<RwLock<Option<usize>>>,
    /// Flip the cancel flag during the next crop apply.
    cancel_during_apply: Arc<RwLock<bool>>,
    /// Count of successful transcodes, for cancel_after_transcodes.
    successful_transcodes: Arc<RwLock<usize>>,
    /// Recorded transcode requests.
    transcodes: Arc<RwLock<Vec<TranscodeRequest>>>,
    /// Recorded crop applications.
    crop_applies: Arc<RwLock<Vec<RecordedCropApply>>>,
}

impl MockTool {
    /// Create a new mock tool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the probed duration for a path.
    pub async fn set_duration(&self, path: impl AsRef<Path>, secs: f64) {
        self.durations
            .write()
            .await
            .insert(path.as_ref().to_path_buf(), secs);
    }

    /// Set the crop suggestion detection reports for a path.
    pub async fn set_crop(&self, path: impl AsRef<Path>, region: CropRegion) {
        self.crops
            .write()
            .await
            .insert(path.as_ref().to_path_buf(), region);
    }

    /// Make crop detection fail for a path.
    pub async fn fail_detect_for(&self, path: impl AsRef<Path>) {
        self.detect_failures
            .write()
            .await
            .insert(path.as_ref().to_path_buf());
    }

    /// Make the transcode of a path exit nonzero.
    pub async fn fail_transcode_for(&self, path: impl AsRef<Path>) {
        self.transcode_failures
            .write()
            .await
            .insert(path.as_ref().to_path_buf());
    }

    /// Script the elapsed-seconds samples every transcode emits.
    pub async fn set_progress_samples(&self, samples: Vec<f64>) {
        *self.progress_samples.write().await = samples;
    }

    /// Flip the caller's cancel flag after the nth successful
    /// transcode, simulating a cancellation that lands between files.
    pub async fn set_cancel_after_transcodes(&self, n: usize) {
        *self.cancel_after_transcodes.write().await = Some(n);
    }

    /// Flip the caller's cancel flag during the next crop apply,
    /// simulating a cancellation that lands mid-subprocess.
    pub async fn cancel_during_apply(&self) {
        *self.cancel_during_apply.write().await = true;
    }

    /// Get all recorded transcode requests.
    pub async fn recorded_transcodes(&self) -> Vec<TranscodeRequest> {
        self.transcodes.read().await.clone()
    }

    /// Get the number of transcodes attempted.
    pub async fn transcode_count(&self) -> usize {
        self.transcodes.read().await.len()
    }

    /// Get all recorded crop applications.
    pub async fn recorded_crop_applies(&self) -> Vec<RecordedCropApply> {
        self.crop_applies.read().await.clone()
    }
}

#[async_trait]
impl MediaTool for MockTool {
    async fn probe_duration(&self, input: &Path) -> Result<f64, ToolError> {
        match self.durations.read().await.get(input) {
            Some(secs) => Ok(*secs),
            None => Err(ToolError::probe_failed("no duration configured")),
        }
    }

    async fn detect_crop(&self, input: &Path) -> Result<Option<CropRegion>, ToolError> {
        if self.detect_failures.read().await.contains(input) {
            return Err(ToolError::FfmpegNotFound {
                path: PathBuf::from("ffmpeg"),
            });
        }

        Ok(self.crops.read().await.get(input).cloned())
    }

    async fn transcode(
        &self,
        request: &TranscodeRequest,
        progress_tx: Option<mpsc::UnboundedSender<f64>>,
        cancel: &CancelFlag,
    ) -> Result<(), ToolError> {
        self.transcodes.write().await.push(request.clone());

        if self
            .transcode_failures
            .read()
            .await
            .contains(&request.input_path)
        {
            return Err(ToolError::tool_failed(Some(1), None));
        }

        if let Some(tx) = progress_tx {
            for sample in self.progress_samples.read().await.iter() {
                let _ = tx.send(*sample);
            }
        }

        let mut successes = self.successful_transcodes.write().await;
        *successes += 1;
        if *self.cancel_after_transcodes.read().await == Some(*successes) {
            cancel.cancel();
        }

        Ok(())
    }

    async fn apply_crop(
        &self,
        input: &Path,
        output: &Path,
        region: &CropRegion,
        cancel: &CancelFlag,
    ) -> Result<(), ToolError> {
        if *self.cancel_during_apply.read().await {
            cancel.cancel();
            return Err(ToolError::Cancelled);
        }

        self.crop_applies.write().await.push(RecordedCropApply {
            input: input.to_path_buf(),
            output: output.to_path_buf(),
            region: region.clone(),
        });

        Ok(())
    }

    async fn validate(&self) -> Result<(), ToolError> {
        Ok(())
    }
}
