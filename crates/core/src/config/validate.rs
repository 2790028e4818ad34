use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Tool binary paths are not empty
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.tool.ffmpeg_path.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "tool.ffmpeg_path cannot be empty".to_string(),
        ));
    }

    if config.tool.ffprobe_path.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "tool.ffprobe_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}
