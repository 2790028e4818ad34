//! Derivation of the scaling filter expression and audio block size.
//!
//! The target container expects these exact values; the reference
//! decoder rejects files built from anything else, or plays them out of
//! sync. Both functions are pure lookups.

use super::types::ScaleMode;

/// Target width paired with a frame height. Heights outside the
/// supported set fall back to 320.
pub fn target_width(height: u32) -> u32 {
    match height {
        240 => 320,
        180 => 240,
        176 => 208,
        160 => 208,
        144 => 176,
        128 => 176,
        120 => 160,
        96 => 128,
        _ => 320,
    }
}

/// Builds the scaling/cropping filter expression for a frame height and
/// scale mode.
///
/// The `-2` width selector keeps the aspect ratio while rounding to an
/// even pixel count, which the codec requires.
pub fn scale_filter(height: u32, mode: ScaleMode) -> String {
    match mode {
        ScaleMode::Preserved => format!("scale=-2:{}", height),
        ScaleMode::Forced => format!("scale={}:{}", target_width(height), height),
        ScaleMode::Crop => format!(
            "scale=-2:{},crop={}:{}",
            height,
            target_width(height),
            height
        ),
    }
}

/// Audio block size for an output frame rate. The container fixes the
/// audio-to-video sample ratio, so each frame rate maps to exactly one
/// block size. Rates outside 10-30 fall back to the 15 fps value.
pub fn block_size_for(frame_rate: u32) -> u32 {
    match frame_rate {
        10 => 2205,
        11 => 2005,
        12 => 1838,
        13 => 1696,
        14 => 1575,
        15 => 1470,
        16 => 1378,
        17 => 1297,
        18 => 1225,
        19 => 1161,
        20 => 1103,
        21 => 1050,
        22 => 1002,
        23 => 959,
        24 => 919,
        25 => 882,
        26 => 848,
        27 => 817,
        28 => 788,
        29 => 760,
        30 => 735,
        _ => 1470,
    }
}
