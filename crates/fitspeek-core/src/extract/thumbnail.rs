//! Thumbnail synthesis from a loaded header and its decoder.
//!
//! Packages the decoder's bounded pixel output into a fixed raster format:
//! top-down 32-bit BGRA, straight alpha, fully opaque. The staging budget
//! is enforced before any buffer allocation, and a failed decode never
//! surfaces a partially filled raster.

use tracing::{debug, warn};

use super::guard::check_staging_budget;
use super::types::{AlphaMode, ExtractError, HeaderState, Thumbnail};
use crate::decoder::{Decoder, ReadOptions};

const BYTES_PER_PIXEL: usize = 4;

/// Synthesize a BGRA raster at the decoder's output dimensions.
///
/// The caller's requested size does not rescale the output: resolution is
/// always the decoder's native output dimensions, capped only by the
/// staging budget.
pub fn synthesize<D: Decoder>(
    decoder: &mut D,
    header: &HeaderState,
) -> Result<Thumbnail, ExtractError> {
    let out = header.output;
    if let Err(err) = check_staging_budget(out) {
        warn!(
            width = out.width,
            height = out.height,
            "thumbnail output over staging budget"
        );
        return Err(err);
    }

    // Dimensions passed the budget check, so both fit comfortably in u32.
    let width = out.width as u32;
    let height = out.height as u32;
    let len = width as usize * height as usize * BYTES_PER_PIXEL;

    let mut pixels: Vec<u8> = Vec::new();
    pixels
        .try_reserve_exact(len)
        .map_err(|_| ExtractError::AllocationFailure)?;
    pixels.resize(len, 0);

    // Mono outline keeps single-channel sources displayable as RGB.
    let options = ReadOptions {
        mono_color_outline: true,
    };
    if !decoder.read_image(&mut pixels, options) {
        return Err(ExtractError::DecodeFailure);
    }

    debug!(width, height, "thumbnail synthesized");
    Ok(Thumbnail {
        width,
        height,
        pixels,
        alpha: AlphaMode::Opaque,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::DecodeLimits;
    use crate::extract::types::{CaptureDate, ImageDimensions, StorageType};

    /// Decoder stub that fills the raster with a constant, or fails.
    struct StubDecoder {
        fill: u8,
        succeed: bool,
        reads: u32,
    }

    impl Decoder for StubDecoder {
        type Stream = std::io::Cursor<Vec<u8>>;

        fn open(_stream: Self::Stream, _limits: DecodeLimits) -> Self {
            Self {
                fill: 0,
                succeed: true,
                reads: 0,
            }
        }

        fn parse_header(&mut self) -> Result<(), ExtractError> {
            Ok(())
        }

        fn header_valid(&self) -> bool {
            true
        }

        fn input_dimensions(&self) -> ImageDimensions {
            ImageDimensions::new(8, 4, 1)
        }

        fn output_dimensions(&self) -> ImageDimensions {
            ImageDimensions::new(8, 4, 1)
        }

        fn storage_type(&self) -> StorageType {
            StorageType::new(16)
        }

        fn capture_date(&self) -> CaptureDate {
            CaptureDate::default()
        }

        fn exposure_seconds(&self) -> f64 {
            0.0
        }

        fn focal_length_mm(&self) -> f64 {
            0.0
        }

        fn aperture_f_number(&self) -> f64 {
            0.0
        }

        fn read_image(&mut self, dest: &mut [u8], options: ReadOptions) -> bool {
            assert!(options.mono_color_outline);
            self.reads += 1;
            if self.succeed {
                dest.fill(self.fill);
            }
            self.succeed
        }
    }

    fn header_with_output(width: i64, height: i64) -> HeaderState {
        HeaderState {
            valid: true,
            input: ImageDimensions::new(width, height, 1),
            output: ImageDimensions::new(width, height, 1),
            storage: StorageType::new(16),
            date: CaptureDate::default(),
            exposure_seconds: 0.0,
            focal_length_mm: 0.0,
            aperture_f_number: 0.0,
        }
    }

    fn stub(fill: u8, succeed: bool) -> StubDecoder {
        StubDecoder {
            fill,
            succeed,
            reads: 0,
        }
    }

    #[test]
    fn test_synthesize_fills_bgra_raster() {
        let mut decoder = stub(0x7F, true);
        let thumb = synthesize(&mut decoder, &header_with_output(8, 4)).unwrap();

        assert_eq!(thumb.width, 8);
        assert_eq!(thumb.height, 4);
        assert_eq!(thumb.byte_size(), 8 * 4 * 4);
        assert!(thumb.pixels.iter().all(|&b| b == 0x7F));
        assert_eq!(thumb.alpha, AlphaMode::Opaque);
        assert_eq!(decoder.reads, 1);
    }

    #[test]
    fn test_over_budget_fails_before_decode() {
        let mut decoder = stub(0, true);
        let result = synthesize(&mut decoder, &header_with_output(10_000, 10_000));

        assert!(matches!(result, Err(ExtractError::OutputTooLarge)));
        assert_eq!(decoder.reads, 0);
    }

    #[test]
    fn test_decode_failure_surfaces_no_raster() {
        let mut decoder = stub(0, false);
        let result = synthesize(&mut decoder, &header_with_output(8, 4));

        assert!(matches!(result, Err(ExtractError::DecodeFailure)));
        assert_eq!(decoder.reads, 1);
    }
}
