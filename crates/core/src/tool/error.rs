//! Error types for the tool module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while driving the external tool.
#[derive(Debug, Error)]
pub enum ToolError {
    /// FFmpeg binary not found.
    #[error("ffmpeg not found at path: {path}")]
    FfmpegNotFound { path: PathBuf },

    /// FFprobe binary not found.
    #[error("ffprobe not found at path: {path}")]
    FfprobeNotFound { path: PathBuf },

    /// The tool ran but exited with a nonzero status.
    #[error("tool exited with status {code:?}")]
    ToolFailed {
        code: Option<i32>,
        stderr: Option<String>,
    },

    /// A probe pass could not produce a value.
    #[error("probe failed: {reason}")]
    ProbeFailed { reason: String },

    /// Settings outside the supported domain.
    #[error("invalid settings: {reason}")]
    InvalidSettings { reason: String },

    /// Output directory does not exist and could not be created.
    #[error("failed to create output directory: {path}")]
    OutputDirectoryFailed { path: PathBuf },

    /// The operation was cancelled and the subprocess terminated.
    #[error("operation cancelled")]
    Cancelled,

    /// I/O error while spawning or waiting on the subprocess.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ToolError {
    /// Creates a new tool failure from an exit status.
    pub fn tool_failed(code: Option<i32>, stderr: Option<String>) -> Self {
        Self::ToolFailed { code, stderr }
    }

    /// Creates a new probe failed error.
    pub fn probe_failed(reason: impl Into<String>) -> Self {
        Self::ProbeFailed {
            reason: reason.into(),
        }
    }

    /// Creates a new invalid settings error.
    pub fn invalid_settings(reason: impl Into<String>) -> Self {
        Self::InvalidSettings {
            reason: reason.into(),
        }
    }

    /// Whether the external binary itself was missing or unspawnable.
    pub fn is_tool_unavailable(&self) -> bool {
        matches!(
            self,
            Self::FfmpegNotFound { .. } | Self::FfprobeNotFound { .. }
        )
    }
}
