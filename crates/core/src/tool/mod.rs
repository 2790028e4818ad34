//! External tool boundary: driving ffmpeg/ffprobe as opaque
//! subprocesses, plus the pure parameter-derivation and stream-parsing
//! functions that feed them.
//!
//! The [`MediaTool`] trait is the seam batch jobs consume; [`FfmpegTool`]
//! is the real implementation. The derivation functions in [`filter`]
//! reproduce the target container's exact invocation contract, and the
//! parsers in [`progress`] and `crop` read the tool's unstructured
//! diagnostic stream without ever interrupting a pipeline.

mod config;
mod crop;
mod error;
mod ffmpeg;
pub mod filter;
pub mod progress;
mod traits;
mod types;

pub use config::ToolConfig;
pub use crop::parse_crop_output;
pub use error::ToolError;
pub use ffmpeg::FfmpegTool;
pub use filter::{block_size_for, scale_filter, target_width};
pub use progress::{extract_elapsed_seconds, to_percent};
pub use traits::MediaTool;
pub use types::{
    is_supported_input, CancelFlag, ConversionSettings, CropRegion, FilterSpec, Resolution,
    ScaleMode, TranscodeRequest, SUPPORTED_INPUT_EXTENSIONS,
};
