//! Parsing of the external tool's line-oriented diagnostic stream.
//!
//! The stream is unstructured; most lines carry no timing information
//! and garbled timestamps do occur. The parser never errors, it just
//! declines to produce a sample.

use once_cell::sync::Lazy;
use regex_lite::Regex;

static TIME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"time=(\d+):(\d+):(\d+(?:\.\d+)?)").expect("valid regex"));

/// Scans a diagnostic line for a `time=HH:MM:SS(.fraction)` token and
/// returns the elapsed seconds, or `None` if the line carries no
/// well-formed timestamp.
pub fn extract_elapsed_seconds(line: &str) -> Option<f64> {
    let caps = TIME_RE.captures(line)?;

    let hours: f64 = caps.get(1)?.as_str().parse().ok()?;
    let minutes: f64 = caps.get(2)?.as_str().parse().ok()?;
    let seconds: f64 = caps.get(3)?.as_str().parse().ok()?;

    Some(hours * 3600.0 + minutes * 60.0 + seconds)
}

/// Maps elapsed seconds against a total duration to a clamped integer
/// percentage. A non-positive duration means the probe failed and the
/// position is unknown, which reads as 0.
pub fn to_percent(elapsed: f64, total_duration: f64) -> u8 {
    if total_duration <= 0.0 {
        return 0;
    }

    let percent = (elapsed / total_duration * 100.0).floor();
    percent.min(100.0).max(0.0) as u8
}
