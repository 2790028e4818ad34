//! Exercises the ffmpeg boundary and a full conversion job against
//! stub executables standing in for ffmpeg/ffprobe.

#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::mpsc;

use amvbatch_core::{
    CancelFlag, ConversionJob, ConversionSettings, FfmpegTool, FileStatus, FilterSpec, JobEvent,
    MediaTool, Resolution, ScaleMode, ToolConfig, ToolError, TranscodeRequest,
};

fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, body).unwrap();
    let mut perms = fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&path, perms).unwrap();
    path
}

const FFPROBE_STUB: &str = "#!/bin/sh\necho \"185.640000\"\n";

// Plays ffmpeg for both probe and transcode invocations: cropdetect
// runs emit suggestion lines, transcode runs emit timing lines and
// create the output file named by the last argument.
const FFMPEG_STUB: &str = r#"#!/bin/sh
case "$*" in
  *cropdetect*)
    echo "[Parsed_cropdetect_0 @ 0x1] w:720 h:416 x:0 y:82 crop=720:416:0:82" >&2
    echo "[Parsed_cropdetect_0 @ 0x1] w:720 h:416 x:0 y:80 crop=720:416:0:80" >&2
    ;;
  *)
    echo "frame=1 time=00:00:30.00 bitrate=300.0kbits/s" >&2
    echo "frame=2 time=00:01:00.00 bitrate=300.0kbits/s" >&2
    for last; do :; done
    : > "$last"
    ;;
esac
"#;

const FAILING_STUB: &str = "#!/bin/sh\necho \"Error: boom\" >&2\nexit 1\n";

fn tool(dir: &Path) -> FfmpegTool {
    FfmpegTool::new(ToolConfig::with_paths(
        write_script(dir, "ffmpeg", FFMPEG_STUB),
        write_script(dir, "ffprobe", FFPROBE_STUB),
    ))
}

fn settings() -> ConversionSettings {
    ConversionSettings::new(Resolution::P240, ScaleMode::Preserved, 15).unwrap()
}

#[tokio::test]
async fn probe_duration_parses_single_float() {
    let dir = tempfile::tempdir().unwrap();
    let tool = tool(dir.path());

    let duration = tool.probe_duration(Path::new("/v/clip.mp4")).await.unwrap();
    assert!((duration - 185.64).abs() < 0.001);
}

#[tokio::test]
async fn probe_failure_is_probe_failed() {
    let dir = tempfile::tempdir().unwrap();
    let tool = FfmpegTool::new(ToolConfig::with_paths(
        write_script(dir.path(), "ffmpeg", FFMPEG_STUB),
        write_script(dir.path(), "ffprobe", FAILING_STUB),
    ));

    let result = tool.probe_duration(Path::new("/v/clip.mp4")).await;
    assert!(matches!(result, Err(ToolError::ProbeFailed { .. })));
}

#[tokio::test]
async fn missing_binaries_are_tool_unavailable() {
    let tool = FfmpegTool::new(ToolConfig::with_paths(
        PathBuf::from("/nonexistent/ffmpeg"),
        PathBuf::from("/nonexistent/ffprobe"),
    ));

    let err = tool
        .probe_duration(Path::new("/v/clip.mp4"))
        .await
        .unwrap_err();
    assert!(err.is_tool_unavailable());

    let err = tool.detect_crop(Path::new("/v/clip.mp4")).await.unwrap_err();
    assert!(err.is_tool_unavailable());
}

#[tokio::test]
async fn detect_crop_takes_last_suggestion() {
    let dir = tempfile::tempdir().unwrap();
    let tool = tool(dir.path());

    let region = tool
        .detect_crop(Path::new("/v/clip.mp4"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(region.as_str(), "720:416:0:80");
}

#[tokio::test]
async fn transcode_forwards_elapsed_samples() {
    let dir = tempfile::tempdir().unwrap();
    let tool = tool(dir.path());

    let output_path = dir.path().join("out").join("clip.amv");
    let request = TranscodeRequest {
        input_path: dir.path().join("clip.mp4"),
        output_path: output_path.clone(),
        filter: FilterSpec::from_settings(&settings()),
        frame_rate: 15,
    };

    let (tx, mut rx) = mpsc::unbounded_channel();
    tool.transcode(&request, Some(tx), &CancelFlag::new())
        .await
        .unwrap();

    let mut samples = Vec::new();
    while let Ok(sample) = rx.try_recv() {
        samples.push(sample);
    }
    assert_eq!(samples, vec![30.0, 60.0]);
    assert!(output_path.exists());
}

#[tokio::test]
async fn transcode_nonzero_exit_is_tool_failed() {
    let dir = tempfile::tempdir().unwrap();
    let tool = FfmpegTool::new(ToolConfig::with_paths(
        write_script(dir.path(), "ffmpeg", FAILING_STUB),
        write_script(dir.path(), "ffprobe", FFPROBE_STUB),
    ));

    let request = TranscodeRequest {
        input_path: dir.path().join("clip.mp4"),
        output_path: dir.path().join("out").join("clip.amv"),
        filter: FilterSpec::from_settings(&settings()),
        frame_rate: 15,
    };

    let result = tool.transcode(&request, None, &CancelFlag::new()).await;
    match result {
        Err(ToolError::ToolFailed { code, stderr }) => {
            assert_eq!(code, Some(1));
            assert!(stderr.unwrap().contains("Error: boom"));
        }
        other => panic!("expected ToolFailed, got {:?}", other.map(|_| ())),
    }
}

#[tokio::test]
async fn conversion_job_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let tool = Arc::new(tool(dir.path()));

    let input = dir.path().join("clip.mp4");
    fs::write(&input, b"not really a video").unwrap();

    let job = ConversionJob::new(vec![input], settings(), tool);
    let mut handle = job.start();

    let mut events = Vec::new();
    while let Some(event) = handle.next_event().await {
        events.push(event);
    }

    let outcome = match events.last() {
        Some(JobEvent::Finished { outcome }) => outcome.clone(),
        other => panic!("expected Finished as last event, got {:?}", other),
    };
    assert!(outcome.succeeded);

    assert!(events.iter().any(|e| matches!(
        e,
        JobEvent::FileFinished {
            status: FileStatus::Converted,
            ..
        }
    )));

    // Percent samples derived from the stub's 30s/60s against 185.64s.
    let percents: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            JobEvent::FileProgress { percent, .. } => Some(*percent),
            _ => None,
        })
        .collect();
    assert_eq!(percents, vec![0, 16, 32, 100]);

    assert!(dir.path().join("AMV Converted").join("clip.amv").exists());
}
