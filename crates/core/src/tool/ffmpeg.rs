//! FFmpeg-backed implementation of the tool boundary.

use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio::time::{timeout, Duration};
use tracing::{debug, warn};

use super::config::ToolConfig;
use super::crop::parse_crop_output;
use super::error::ToolError;
use super::progress::extract_elapsed_seconds;
use super::traits::MediaTool;
use super::types::{CancelFlag, CropRegion, TranscodeRequest};

/// Fixed video bitrate the target container expects.
const VIDEO_BITRATE: &str = "300k";
/// Fixed planar YUV pixel format.
const PIXEL_FORMAT: &str = "yuvj420p";
/// Target video codec identifier.
const VIDEO_CODEC: &str = "amv";
/// Target audio codec identifier.
const AUDIO_CODEC: &str = "adpcm_ima_amv";
/// Fixed mono audio.
const AUDIO_CHANNELS: &str = "1";
/// Fixed audio sample rate.
const AUDIO_SAMPLE_RATE: &str = "22050";
/// Crop detection samples a bounded window: 5 seconds starting 1 second
/// into the file. Long enough for a stable estimate, short enough to
/// keep detection fast.
const CROP_PROBE_START: &str = "00:00:01";
const CROP_PROBE_DURATION: &str = "5";
/// How often an in-flight wait rechecks the cancel flag.
const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(200);

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// Drives the ffmpeg/ffprobe binaries as opaque subprocesses.
pub struct FfmpegTool {
    config: ToolConfig,
}

impl FfmpegTool {
    /// Creates a new tool with the given configuration.
    pub fn new(config: ToolConfig) -> Self {
        Self { config }
    }

    /// Creates a tool with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(ToolConfig::default())
    }

    /// Base command: non-interactive, and on Windows no console window
    /// for the spawned process.
    fn command(program: &Path) -> Command {
        let mut cmd = Command::new(program);
        cmd.stdin(Stdio::null());
        #[cfg(windows)]
        cmd.creation_flags(CREATE_NO_WINDOW);
        cmd
    }

    /// Builds the full transcode argument vector.
    fn build_transcode_args(request: &TranscodeRequest) -> Vec<String> {
        vec![
            "-i".to_string(),
            request.input_path.to_string_lossy().to_string(),
            "-vf".to_string(),
            request.filter.video_filter.clone(),
            "-r".to_string(),
            request.frame_rate.to_string(),
            "-b:v".to_string(),
            VIDEO_BITRATE.to_string(),
            "-pix_fmt".to_string(),
            PIXEL_FORMAT.to_string(),
            "-c:v".to_string(),
            VIDEO_CODEC.to_string(),
            "-ac".to_string(),
            AUDIO_CHANNELS.to_string(),
            "-ar".to_string(),
            AUDIO_SAMPLE_RATE.to_string(),
            "-c:a".to_string(),
            AUDIO_CODEC.to_string(),
            "-block_size".to_string(),
            request.filter.block_size.to_string(),
            "-progress".to_string(),
            "pipe:2".to_string(),
            "-y".to_string(),
            request.output_path.to_string_lossy().to_string(),
        ]
    }

    /// Builds the crop-detection probe argument vector.
    fn build_crop_probe_args(input: &Path) -> Vec<String> {
        vec![
            "-ss".to_string(),
            CROP_PROBE_START.to_string(),
            "-t".to_string(),
            CROP_PROBE_DURATION.to_string(),
            "-i".to_string(),
            input.to_string_lossy().to_string(),
            "-vf".to_string(),
            "cropdetect".to_string(),
            "-an".to_string(),
            "-f".to_string(),
            "null".to_string(),
            "-".to_string(),
        ]
    }

    /// Builds the crop-apply argument vector: video re-encoded through
    /// the detected region, audio copied unchanged.
    fn build_crop_apply_args(input: &Path, output: &Path, region: &CropRegion) -> Vec<String> {
        vec![
            "-i".to_string(),
            input.to_string_lossy().to_string(),
            "-vf".to_string(),
            format!("crop={}", region.as_str()),
            "-c:a".to_string(),
            "copy".to_string(),
            "-y".to_string(),
            output.to_string_lossy().to_string(),
        ]
    }

    fn map_ffmpeg_spawn_error(&self, e: std::io::Error) -> ToolError {
        if e.kind() == std::io::ErrorKind::NotFound {
            ToolError::FfmpegNotFound {
                path: self.config.ffmpeg_path.clone(),
            }
        } else {
            ToolError::Io(e)
        }
    }

    fn map_ffprobe_spawn_error(&self, e: std::io::Error) -> ToolError {
        if e.kind() == std::io::ErrorKind::NotFound {
            ToolError::FfprobeNotFound {
                path: self.config.ffprobe_path.clone(),
            }
        } else {
            ToolError::Io(e)
        }
    }

    async fn ensure_parent_dir(output: &Path) -> Result<(), ToolError> {
        if let Some(parent) = output.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|_| {
                ToolError::OutputDirectoryFailed {
                    path: parent.to_path_buf(),
                }
            })?;
        }
        Ok(())
    }

    /// Requests termination and waits a bounded time for the process to
    /// exit. A process that ignores the request is abandoned rather
    /// than blocking the job.
    async fn terminate(&self, child: &mut Child) {
        let _ = child.start_kill();
        let wait = Duration::from_millis(self.config.kill_wait_ms);
        if timeout(wait, child.wait()).await.is_err() {
            warn!(wait_ms = self.config.kill_wait_ms, "subprocess did not exit after kill");
        }
    }
}

#[async_trait]
impl MediaTool for FfmpegTool {
    async fn probe_duration(&self, input: &Path) -> Result<f64, ToolError> {
        let output = Self::command(&self.config.ffprobe_path)
            .args(["-v", "quiet", "-show_entries", "format=duration", "-of", "csv=p=0"])
            .arg(input)
            .output()
            .await
            .map_err(|e| self.map_ffprobe_spawn_error(e))?;

        if !output.status.success() {
            return Err(ToolError::probe_failed(format!(
                "ffprobe exited with status {:?}",
                output.status.code()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        stdout
            .trim()
            .parse::<f64>()
            .map_err(|_| ToolError::probe_failed("no duration in probe output"))
    }

    async fn detect_crop(&self, input: &Path) -> Result<Option<CropRegion>, ToolError> {
        let output = Self::command(&self.config.ffmpeg_path)
            .args(Self::build_crop_probe_args(input))
            .output()
            .await
            .map_err(|e| self.map_ffmpeg_spawn_error(e))?;

        // Exit status is deliberately ignored: a decode error over the
        // sample window just means no usable suggestion appeared.
        Ok(parse_crop_output(&String::from_utf8_lossy(&output.stderr)))
    }

    async fn transcode(
        &self,
        request: &TranscodeRequest,
        progress_tx: Option<mpsc::UnboundedSender<f64>>,
        cancel: &CancelFlag,
    ) -> Result<(), ToolError> {
        Self::ensure_parent_dir(&request.output_path).await?;

        let args = Self::build_transcode_args(request);
        debug!(input = %request.input_path.display(), "spawning transcode");

        let mut child = Self::command(&self.config.ffmpeg_path)
            .args(&args)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.map_ffmpeg_spawn_error(e))?;

        let stderr = child.stderr.take().expect("stderr should be captured");
        let mut lines = BufReader::new(stderr).lines();
        let mut error_output = String::new();

        loop {
            if cancel.is_cancelled() {
                break;
            }

            match lines.next_line().await {
                Ok(Some(line)) => {
                    // Capture error output for failure diagnostics
                    if line.contains("Error") || line.contains("error") {
                        error_output.push_str(&line);
                        error_output.push('\n');
                    }

                    if let Some(elapsed) = extract_elapsed_seconds(&line) {
                        if let Some(ref tx) = progress_tx {
                            let _ = tx.send(elapsed);
                        }
                    }
                }
                Ok(None) => break,
                Err(_) => break,
            }
        }

        if cancel.is_cancelled() {
            self.terminate(&mut child).await;
            return Err(ToolError::Cancelled);
        }

        let status = child.wait().await?;
        if !status.success() {
            return Err(ToolError::tool_failed(
                status.code(),
                if error_output.is_empty() {
                    None
                } else {
                    Some(error_output)
                },
            ));
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
        Self::ensure_parent_dir(output).await?;

        let args = Self::build_crop_apply_args(input, output, region);
        debug!(input = %input.display(), region = %region, "spawning crop apply");

        let mut child = Self::command(&self.config.ffmpeg_path)
            .args(&args)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| self.map_ffmpeg_spawn_error(e))?;

        loop {
            if cancel.is_cancelled() {
                self.terminate(&mut child).await;
                return Err(ToolError::Cancelled);
            }

            match timeout(CANCEL_POLL_INTERVAL, child.wait()).await {
                Ok(status) => {
                    let status = status?;
                    if !status.success() {
                        return Err(ToolError::tool_failed(status.code(), None));
                    }
                    return Ok(());
                }
                Err(_) => continue,
            }
        }
    }

    async fn validate(&self) -> Result<(), ToolError> {
        Self::command(&self.config.ffmpeg_path)
            .arg("-version")
            .output()
            .await
            .map_err(|e| self.map_ffmpeg_spawn_error(e))?;

        Self::command(&self.config.ffprobe_path)
            .arg("-version")
            .output()
            .await
            .map_err(|e| self.map_ffprobe_spawn_error(e))?;

        Ok(())
    }
}
