//! Core types for the extraction pipeline.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error types for metadata extraction and thumbnail synthesis.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The stream's declared size exceeds the fixed input ceiling.
    #[error("Declared input size exceeds the supported maximum")]
    TooLarge,

    /// The header failed to parse or failed post-parse validation.
    #[error("Invalid or unsupported header")]
    InvalidHeader,

    /// A required buffer could not be allocated.
    #[error("Out of memory")]
    AllocationFailure,

    /// No stream has been attached to this instance.
    #[error("No input stream attached")]
    StreamUnavailable,

    /// A stream was already attached; an instance accepts exactly one.
    #[error("Stream already attached")]
    AlreadyInitialized,

    /// The decodable output exceeds the thumbnail staging budget.
    #[error("Output dimensions exceed the thumbnail budget")]
    OutputTooLarge,

    /// The decoder failed to produce pixel data.
    #[error("Pixel decode failed")]
    DecodeFailure,

    /// No property exists under the requested key.
    #[error("Property not found")]
    NotFound,

    /// Property index is past the end of the store.
    #[error("Property index out of range")]
    OutOfRange,

    /// The property store is read-only.
    #[error("Property store is read-only")]
    NotSupported,
}

/// Image shape as declared by a header or produced by the decoder.
///
/// Two instances matter per input: the declared dimensions from the header
/// and the output dimensions actually decodable under the size cap.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageDimensions {
    /// Width in pixels.
    pub width: i64,
    /// Height in pixels.
    pub height: i64,
    /// Number of color channels (1 = mono, 3 = RGB planes).
    pub channels: i64,
}

impl ImageDimensions {
    pub fn new(width: i64, height: i64, channels: i64) -> Self {
        Self {
            width,
            height,
            channels,
        }
    }

    /// All three components must be strictly positive.
    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0 && self.channels > 0
    }
}

/// Sample storage description. The sign of `bit_depth` is reserved for
/// encoding distinctions (negative = floating point in FITS); only the
/// magnitude is user-visible.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageType {
    pub bit_depth: i32,
}

impl StorageType {
    pub fn new(bit_depth: i32) -> Self {
        Self { bit_depth }
    }

    /// Bit depth magnitude used for display.
    pub fn display_bits(&self) -> u32 {
        self.bit_depth.unsigned_abs()
    }
}

/// Civil capture timestamp. An all-zero `year` means "absent"; otherwise
/// the fields form a complete date and time, where `second` may carry a
/// fractional sub-second component.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CaptureDate {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: f64,
}

impl CaptureDate {
    pub fn is_present(&self) -> bool {
        self.year != 0
    }
}

/// Everything the loader captures from a successfully parsed header.
///
/// Created at most once per input on the success path and never mutated
/// after a successful load.
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderState {
    /// Decoder-reported validity flag.
    pub valid: bool,
    /// Dimensions declared by the header.
    pub input: ImageDimensions,
    /// Dimensions actually decodable under the size cap.
    pub output: ImageDimensions,
    pub storage: StorageType,
    pub date: CaptureDate,
    /// Exposure in seconds; non-positive means "absent".
    pub exposure_seconds: f64,
    /// Focal length in millimeters; non-positive means "absent".
    pub focal_length_mm: f64,
    /// Aperture f-number; non-positive means "absent".
    pub aperture_f_number: f64,
}

/// Canonical keys of the host-defined property schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PropertyKey {
    HorizontalSize,
    VerticalSize,
    BitDepth,
    Dimensions,
    DateTaken,
    ExposureTime,
    FocalLength,
    Aperture,
}

impl PropertyKey {
    /// Canonical schema name for the key.
    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyKey::HorizontalSize => "horizontal-size",
            PropertyKey::VerticalSize => "vertical-size",
            PropertyKey::BitDepth => "bit-depth",
            PropertyKey::Dimensions => "dimensions-string",
            PropertyKey::DateTaken => "date-taken",
            PropertyKey::ExposureTime => "exposure-time",
            PropertyKey::FocalLength => "focal-length",
            PropertyKey::Aperture => "aperture",
        }
    }
}

impl std::fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Property value types of the canonical schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PropertyKind {
    UnsignedInteger32,
    Text,
    Timestamp,
    Double,
}

/// A typed, immutable property value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PropertyValue {
    UInt32(u32),
    Text(String),
    Timestamp(NaiveDateTime),
    Double(f64),
}

impl PropertyValue {
    pub fn kind(&self) -> PropertyKind {
        match self {
            PropertyValue::UInt32(_) => PropertyKind::UnsignedInteger32,
            PropertyValue::Text(_) => PropertyKind::Text,
            PropertyValue::Timestamp(_) => PropertyKind::Timestamp,
            PropertyValue::Double(_) => PropertyKind::Double,
        }
    }
}

/// A (key, typed value) pair in the canonical schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalProperty {
    pub key: PropertyKey,
    pub value: PropertyValue,
}

impl CanonicalProperty {
    pub fn new(key: PropertyKey, value: PropertyValue) -> Self {
        Self { key, value }
    }
}

/// Alpha interpretation of a synthesized raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlphaMode {
    /// Straight, unpremultiplied, fully opaque. The decoder does not
    /// produce a real alpha channel.
    Opaque,
}

/// A top-down 32-bit BGRA raster ready for display.
#[derive(Debug, Clone)]
pub struct Thumbnail {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// BGRA pixel data, first row = top of image, no padding beyond the
    /// 4-byte pixels. Length is width * height * 4.
    pub pixels: Vec<u8>,
    pub alpha: AlphaMode,
}

impl Thumbnail {
    /// Get the size of the pixel buffer in bytes.
    pub fn byte_size(&self) -> usize {
        self.pixels.len()
    }

    /// Convert to an `image::RgbaImage` for further processing or encoding.
    pub fn to_rgba_image(&self) -> Option<image::RgbaImage> {
        let mut rgba = Vec::with_capacity(self.pixels.len());
        for px in self.pixels.chunks_exact(4) {
            rgba.extend_from_slice(&[px[2], px[1], px[0], px[3]]);
        }
        image::RgbaImage::from_raw(self.width, self.height, rgba)
    }
}
