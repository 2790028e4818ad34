//! Parsing of crop-detection diagnostic output.

use once_cell::sync::Lazy;
use regex_lite::Regex;

use super::types::CropRegion;

static CROP_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"crop=(\S+)").expect("valid regex"));

/// Scans a crop-detection pass's diagnostic output for suggestion
/// tokens and returns the last one verbatim. The detector refines its
/// estimate as frames accumulate, so the last suggestion is the stable
/// one. No token means the file has no bars to remove.
pub fn parse_crop_output(stderr: &str) -> Option<CropRegion> {
    let mut last = None;
    for line in stderr.lines() {
        if let Some(caps) = CROP_RE.captures(line) {
            if let Some(token) = caps.get(1) {
                last = Some(CropRegion::new(token.as_str()));
            }
        }
    }
    last
}
