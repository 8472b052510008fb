//! Strided pixel rendering into a BGRA preview raster.
//!
//! Samples are stored big-endian, plane-major (a cube's NAXIS3 planes map
//! to R, G, B). Rendering reads one source row at a time at the sampling
//! stride, applies BZERO/BSCALE, then linearly stretches the sampled range
//! to 8 bits.

use std::io::{Read, Seek, SeekFrom};

use super::header::FitsHeader;
use crate::decoder::ReadOptions;
use crate::extract::{ExtractError, ImageDimensions};

const BYTES_PER_PIXEL: usize = 4;

pub(crate) fn render<R: Read + Seek>(
    stream: &mut R,
    header: &FitsHeader,
    out: ImageDimensions,
    step: i64,
    options: ReadOptions,
    dest: &mut [u8],
) -> Result<(), ExtractError> {
    let channels = header.channels() as usize;
    if channels == 1 && !options.mono_color_outline {
        return Err(ExtractError::DecodeFailure);
    }

    let out_w = out.width as usize;
    let out_h = out.height as usize;
    let step = step.max(1) as usize;
    if dest.len() != out_w * out_h * BYTES_PER_PIXEL {
        return Err(ExtractError::DecodeFailure);
    }

    let bytes_per_sample = header.bytes_per_sample() as usize;
    if bytes_per_sample == 0 {
        return Err(ExtractError::DecodeFailure);
    }
    let in_w = header.naxis1 as usize;
    let in_h = header.naxis2 as usize;
    let row_bytes = in_w * bytes_per_sample;
    let plane_bytes = row_bytes * in_h;

    // Sampled physical values, plane-major like the source
    let mut samples = vec![0f64; out_w * out_h * channels];
    let mut row = vec![0u8; row_bytes];

    for channel in 0..channels {
        for y in 0..out_h {
            let src_y = (y * step).min(in_h - 1);
            let offset = header.data_offset + (channel * plane_bytes + src_y * row_bytes) as u64;
            stream
                .seek(SeekFrom::Start(offset))
                .map_err(|_| ExtractError::DecodeFailure)?;
            stream
                .read_exact(&mut row)
                .map_err(|_| ExtractError::DecodeFailure)?;

            for x in 0..out_w {
                let src_x = (x * step).min(in_w - 1);
                let start = src_x * bytes_per_sample;
                let raw = decode_sample(&row[start..start + bytes_per_sample], header.bitpix);
                samples[(channel * out_h + y) * out_w + x] = raw * header.bscale + header.bzero;
            }
        }
    }

    stretch_to_bgra(&samples, channels, out_w * out_h, dest);
    Ok(())
}

/// Linear min-max stretch of sampled values into the BGRA raster.
/// Non-finite samples (float NaN/Inf) render as black.
fn stretch_to_bgra(samples: &[f64], channels: usize, pixels: usize, dest: &mut [u8]) {
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for &value in samples {
        if value.is_finite() {
            lo = lo.min(value);
            hi = hi.max(value);
        }
    }
    let spread = hi - lo;
    let to_byte = |value: f64| -> u8 {
        if value.is_finite() && spread > 0.0 {
            (((value - lo) / spread) * 255.0).clamp(0.0, 255.0) as u8
        } else {
            0
        }
    };

    for i in 0..pixels {
        let (r, g, b) = if channels == 1 {
            let gray = to_byte(samples[i]);
            (gray, gray, gray)
        } else {
            (
                to_byte(samples[i]),
                to_byte(samples[pixels + i]),
                to_byte(samples[2 * pixels + i]),
            )
        };
        dest[BYTES_PER_PIXEL * i] = b;
        dest[BYTES_PER_PIXEL * i + 1] = g;
        dest[BYTES_PER_PIXEL * i + 2] = r;
        dest[BYTES_PER_PIXEL * i + 3] = 0xFF;
    }
}

fn decode_sample(bytes: &[u8], bitpix: i32) -> f64 {
    match bitpix {
        8 => bytes[0] as f64,
        16 => i16::from_be_bytes([bytes[0], bytes[1]]) as f64,
        32 => i32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f64,
        -32 => f32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f64,
        -64 => f64::from_be_bytes([
            bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
        ]),
        _ => 0.0,
    }
}
