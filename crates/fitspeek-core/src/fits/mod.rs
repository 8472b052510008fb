//! Bundled FITS decoder.
//!
//! Implements the [`Decoder`] contract over any seekable stream holding a
//! FITS container: a block-structured keyword header followed by
//! big-endian sample data. Output dimensions are downsampled by an
//! integer stride so the preview fits the configured grid; the reader
//! never commits to more memory than one source row plus the sampled
//! output.

mod header;
mod pixels;

pub use header::FitsHeader;

use std::io::{Read, Seek, SeekFrom};

use tracing::{debug, warn};

use crate::decoder::{DecodeLimits, Decoder, ReadOptions};
use crate::extract::{CaptureDate, ExtractError, ImageDimensions, StorageType};

/// FITS header and pixel access over an exclusively owned stream.
pub struct FitsReader<R> {
    stream: R,
    limits: DecodeLimits,
    header: Option<FitsHeader>,
}

impl<R: Read + Seek> FitsReader<R> {
    /// Open with the default resource limits.
    pub fn new(stream: R) -> Self {
        Self::open(stream, DecodeLimits::default())
    }

    /// Parsed header, if a parse has succeeded.
    pub fn fits_header(&self) -> Option<&FitsHeader> {
        self.header.as_ref()
    }

    /// Whether a parsed header describes an image this reader supports.
    fn is_supported(&self, header: &FitsHeader) -> bool {
        let channels = header.channels();
        header.simple
            && header.bytes_per_sample() != 0
            && (header.naxis == 2 || header.naxis == 3)
            && header.naxis1 > 0
            && header.naxis2 > 0
            && (channels == 1 || channels == 3)
            && header
                .data_bytes()
                .is_some_and(|bytes| bytes <= self.limits.max_input_bytes)
    }

    /// Integer sampling stride that fits the output grid.
    fn downsample_step(&self, header: &FitsHeader) -> i64 {
        let max_w = self.limits.max_width.max(1);
        let max_h = self.limits.max_height.max(1);
        let step_x = (header.naxis1 + max_w - 1) / max_w;
        let step_y = (header.naxis2 + max_h - 1) / max_h;
        step_x.max(step_y).max(1)
    }
}

impl<R: Read + Seek> Decoder for FitsReader<R> {
    type Stream = R;

    fn open(stream: R, limits: DecodeLimits) -> Self {
        Self {
            stream,
            limits,
            header: None,
        }
    }

    fn parse_header(&mut self) -> Result<(), ExtractError> {
        // Full re-parse every time; stale state never survives a failure
        self.header = None;
        self.stream
            .seek(SeekFrom::Start(0))
            .map_err(|_| ExtractError::InvalidHeader)?;
        let header = header::parse(&mut self.stream)?;

        if self.is_supported(&header) {
            debug!(
                width = header.naxis1,
                height = header.naxis2,
                channels = header.channels(),
                bitpix = header.bitpix,
                "FITS header parsed"
            );
        } else {
            warn!(
                bitpix = header.bitpix,
                naxis = header.naxis,
                "FITS header parsed but unsupported"
            );
        }
        self.header = Some(header);
        Ok(())
    }

    fn header_valid(&self) -> bool {
        self.header
            .as_ref()
            .is_some_and(|header| self.is_supported(header))
    }

    fn input_dimensions(&self) -> ImageDimensions {
        match &self.header {
            Some(header) => {
                ImageDimensions::new(header.naxis1, header.naxis2, header.channels())
            }
            None => ImageDimensions::default(),
        }
    }

    fn output_dimensions(&self) -> ImageDimensions {
        match &self.header {
            Some(header) => {
                let step = self.downsample_step(header);
                ImageDimensions::new(
                    (header.naxis1 / step).max(1),
                    (header.naxis2 / step).max(1),
                    header.channels(),
                )
            }
            None => ImageDimensions::default(),
        }
    }

    fn storage_type(&self) -> StorageType {
        StorageType::new(self.header.as_ref().map_or(0, |header| header.bitpix))
    }

    fn capture_date(&self) -> CaptureDate {
        self.header
            .as_ref()
            .map_or_else(CaptureDate::default, |header| header.date_obs)
    }

    fn exposure_seconds(&self) -> f64 {
        self.header
            .as_ref()
            .map_or(0.0, |header| header.exposure_seconds)
    }

    fn focal_length_mm(&self) -> f64 {
        self.header
            .as_ref()
            .map_or(0.0, |header| header.focal_length_mm)
    }

    fn aperture_f_number(&self) -> f64 {
        self.header
            .as_ref()
            .map_or(0.0, |header| header.aperture_f_number)
    }

    fn read_image(&mut self, dest: &mut [u8], options: ReadOptions) -> bool {
        let Some(header) = self.header.clone() else {
            return false;
        };
        if !self.is_supported(&header) {
            return false;
        }
        let out = self.output_dimensions();
        let step = self.downsample_step(&header);
        pixels::render(&mut self.stream, &header, out, step, options, dest).is_ok()
    }
}
