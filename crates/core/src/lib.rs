//! Batch AMV transcoding core.
//!
//! Drives an external transcoding tool (ffmpeg) as an opaque
//! subprocess to batch-convert video files into the fixed-format AMV
//! container, and to detect and remove letterbox/pillarbox black bars.
//! Jobs run on a dedicated background task, process files strictly
//! sequentially, report progress and status through an asynchronous
//! event stream, and honor cooperative cancellation mid-pipeline.

pub mod config;
pub mod job;
pub mod testing;
pub mod tool;

pub use config::{load_config, load_config_from_str, validate_config, Config, ConfigError};
pub use job::{BlackBarRemovalJob, ConversionJob, FileStatus, JobEvent, JobHandle, JobOutcome};
pub use tool::{
    block_size_for, extract_elapsed_seconds, is_supported_input, scale_filter, target_width,
    to_percent, CancelFlag, ConversionSettings, CropRegion, FfmpegTool, FilterSpec, MediaTool,
    Resolution, ScaleMode, ToolConfig, ToolError, TranscodeRequest, SUPPORTED_INPUT_EXTENSIONS,
};
