//! Fixed resource ceilings and the checks that enforce them.
//!
//! The input ceiling bounds worst-case memory commitment from a hostile or
//! corrupt input: it is checked against the stream's declared size before a
//! single header byte is parsed. The staging budget bounds the scratch
//! memory a thumbnail decode may require.

use super::types::{ExtractError, ImageDimensions};

/// Largest supported pixel grid edge.
pub const MAX_GRID_EDGE: u64 = 8192;

/// Maximum declared input size: an 8192 x 8192 grid, 3 channels,
/// 4 bytes per sample component (~768 MiB).
pub const MAX_INPUT_BYTES: u64 = MAX_GRID_EDGE * MAX_GRID_EDGE * 3 * 4;

/// Ceiling for thumbnail decode staging, same as the input ceiling.
pub const MAX_OUTPUT_BYTES: u64 = MAX_INPUT_BYTES;

/// Largest thumbnail edge the bundled decoder will produce.
pub const MAX_THUMB_WIDTH: i64 = 512;
pub const MAX_THUMB_HEIGHT: i64 = 512;

/// Worst-case decode staging cost per output pixel.
pub const THUMB_STAGING_BYTES_PER_PIXEL: u64 = 16;

/// Reject streams whose declared size exceeds the fixed ceiling.
///
/// Pure predicate over a size obtained from stream metadata, not by
/// reading the stream.
pub fn check_input_size(declared_bytes: u64) -> Result<(), ExtractError> {
    if declared_bytes > MAX_INPUT_BYTES {
        return Err(ExtractError::TooLarge);
    }
    Ok(())
}

/// Reject output dimensions whose decode staging would exceed the ceiling.
///
/// Must run before any raster buffer is allocated.
pub fn check_staging_budget(output: ImageDimensions) -> Result<(), ExtractError> {
    let staging = u64::try_from(output.width)
        .ok()
        .zip(u64::try_from(output.height).ok())
        .and_then(|(w, h)| w.checked_mul(h))
        .and_then(|px| px.checked_mul(THUMB_STAGING_BYTES_PER_PIXEL));

    match staging {
        Some(bytes) if bytes <= MAX_OUTPUT_BYTES => Ok(()),
        _ => Err(ExtractError::OutputTooLarge),
    }
}
