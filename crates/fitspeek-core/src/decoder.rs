//! The narrow contract the pipeline consumes a decoder through.
//!
//! Binary parsing of the container's header grammar and pixel encoding is
//! an external concern: the pipeline only drives a [`Decoder`], validates
//! what it reports, and packages what it reads. The bundled FITS decoder
//! in [`crate::fits`] implements this trait; tests substitute their own.

use crate::extract::{
    CaptureDate, ExtractError, ImageDimensions, StorageType, MAX_INPUT_BYTES, MAX_THUMB_HEIGHT,
    MAX_THUMB_WIDTH,
};

/// Rendering options for [`Decoder::read_image`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadOptions {
    /// Render single-channel sources as a monochrome RGB preview. Without
    /// this a mono source has no displayable color rendition and the read
    /// fails.
    pub mono_color_outline: bool,
}

/// Resource bounds handed to a decoder at construction.
#[derive(Debug, Clone, Copy)]
pub struct DecodeLimits {
    /// Largest data section the decoder may commit to reading.
    pub max_input_bytes: u64,
    /// Output raster is downsampled to fit within this grid.
    pub max_width: i64,
    pub max_height: i64,
}

impl Default for DecodeLimits {
    fn default() -> Self {
        Self {
            max_input_bytes: MAX_INPUT_BYTES,
            max_width: MAX_THUMB_WIDTH,
            max_height: MAX_THUMB_HEIGHT,
        }
    }
}

/// Header and pixel access over an exclusively owned input stream.
///
/// Getter results are meaningful only after a successful `parse_header`;
/// before that, implementations report zeroed values and a false validity
/// flag.
pub trait Decoder: Sized {
    /// Stream type the decoder consumes. Owned exclusively from
    /// construction until drop.
    type Stream;

    /// Take ownership of the stream. Infallible: no parsing happens here.
    fn open(stream: Self::Stream, limits: DecodeLimits) -> Self;

    /// Parse header-only information from the stream. Safe to call again
    /// after a failure; a full re-parse is performed each time.
    fn parse_header(&mut self) -> Result<(), ExtractError>;

    /// Whether the last parsed header describes a supported image.
    fn header_valid(&self) -> bool;

    /// Dimensions declared by the header.
    fn input_dimensions(&self) -> ImageDimensions;

    /// Dimensions the decoder will actually produce (may be downsampled).
    fn output_dimensions(&self) -> ImageDimensions;

    fn storage_type(&self) -> StorageType;

    fn capture_date(&self) -> CaptureDate;

    /// Exposure in seconds; non-positive means "absent".
    fn exposure_seconds(&self) -> f64;

    /// Focal length in millimeters; non-positive means "absent".
    fn focal_length_mm(&self) -> f64;

    /// Aperture f-number; non-positive means "absent".
    fn aperture_f_number(&self) -> f64;

    /// Decode pixel data into `dest`, a BGRA buffer sized for the output
    /// dimensions. Returns false on any decode failure; `dest` contents
    /// are then unspecified and must not be surfaced.
    fn read_image(&mut self, dest: &mut [u8], options: ReadOptions) -> bool;
}
