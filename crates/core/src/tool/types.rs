//! Types for the tool module.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::error::ToolError;
use super::filter;

/// Input formats accepted at the collection boundary.
pub const SUPPORTED_INPUT_EXTENSIONS: &[&str] =
    &["mp4", "avi", "mov", "mkv", "flv", "wmv", "webm"];

/// Whether a path carries one of the supported video extensions.
pub fn is_supported_input(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            let e = e.to_ascii_lowercase();
            SUPPORTED_INPUT_EXTENSIONS.contains(&e.as_str())
        })
        .unwrap_or(false)
}

/// Output frame height. The AMV rasterizer only accepts this fixed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum Resolution {
    P240,
    P180,
    P176,
    P160,
    P144,
    P128,
    P120,
    P96,
}

impl Resolution {
    /// All supported heights, largest first.
    pub fn all() -> [Resolution; 8] {
        [
            Self::P240,
            Self::P180,
            Self::P176,
            Self::P160,
            Self::P144,
            Self::P128,
            Self::P120,
            Self::P96,
        ]
    }

    /// Frame height in pixels.
    pub fn height(&self) -> u32 {
        match self {
            Self::P240 => 240,
            Self::P180 => 180,
            Self::P176 => 176,
            Self::P160 => 160,
            Self::P144 => 144,
            Self::P128 => 128,
            Self::P120 => 120,
            Self::P96 => 96,
        }
    }

    /// Target frame width paired with this height.
    pub fn width(&self) -> u32 {
        filter::target_width(self.height())
    }

    /// Looks up the resolution for a raw height value.
    pub fn from_height(height: u32) -> Option<Self> {
        Self::all().into_iter().find(|r| r.height() == height)
    }
}

impl TryFrom<u32> for Resolution {
    type Error = String;

    fn try_from(height: u32) -> Result<Self, Self::Error> {
        Self::from_height(height).ok_or_else(|| format!("unsupported height: {}", height))
    }
}

impl From<Resolution> for u32 {
    fn from(resolution: Resolution) -> u32 {
        resolution.height()
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}p", self.height())
    }
}

/// Policy for deriving output dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScaleMode {
    /// Width auto-derived to preserve aspect ratio.
    Preserved,
    /// Exact target dimensions, may distort.
    Forced,
    /// Aspect-correct scale, then hard crop to the exact box.
    Crop,
}

/// User-chosen settings for one conversion job. Immutable once the job
/// is constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionSettings {
    pub resolution: Resolution,
    pub scale_mode: ScaleMode,
    pub frame_rate: u32,
}

impl ConversionSettings {
    /// Minimum supported output frame rate.
    pub const MIN_FRAME_RATE: u32 = 10;
    /// Maximum supported output frame rate.
    pub const MAX_FRAME_RATE: u32 = 30;

    /// Creates settings, validating the frame rate range.
    pub fn new(
        resolution: Resolution,
        scale_mode: ScaleMode,
        frame_rate: u32,
    ) -> Result<Self, ToolError> {
        if !(Self::MIN_FRAME_RATE..=Self::MAX_FRAME_RATE).contains(&frame_rate) {
            return Err(ToolError::invalid_settings(format!(
                "frame rate {} outside supported range {}-{}",
                frame_rate,
                Self::MIN_FRAME_RATE,
                Self::MAX_FRAME_RATE
            )));
        }

        Ok(Self {
            resolution,
            scale_mode,
            frame_rate,
        })
    }
}

/// Parameters derived once per job from [`ConversionSettings`]. The
/// target container requires these exact values; they are handed to the
/// external tool verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSpec {
    /// Scaling/cropping filter expression.
    pub video_filter: String,
    /// Audio block size tied to the output frame rate.
    pub block_size: u32,
}

impl FilterSpec {
    /// Derives the filter expression and block size for the settings.
    pub fn from_settings(settings: &ConversionSettings) -> Self {
        Self {
            video_filter: filter::scale_filter(settings.resolution.height(), settings.scale_mode),
            block_size: filter::block_size_for(settings.frame_rate),
        }
    }
}

/// A crop suggestion taken verbatim from the external tool's own output
/// (e.g. `720:416:0:80`). Never decomposed or validated; it is passed
/// through unmodified into a subsequent filter expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropRegion(String);

impl CropRegion {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CropRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single-file transcode request.
#[derive(Debug, Clone)]
pub struct TranscodeRequest {
    /// Input file path.
    pub input_path: PathBuf,
    /// Output file path; the parent directory is created if absent.
    pub output_path: PathBuf,
    /// Derived filter expression and block size.
    pub filter: FilterSpec,
    /// Output frame rate.
    pub frame_rate: u32,
}

/// Cooperative cancellation flag shared between a job, its caller, and
/// any in-flight subprocess wait.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Idempotent.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
