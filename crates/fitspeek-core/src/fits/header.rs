//! FITS header parsing.
//!
//! A FITS header is a sequence of 2880-byte blocks, each holding 36
//! 80-character keyword cards, terminated by an END card. Values follow
//! `KEYWORD = value / comment` with strings in single quotes and floats
//! optionally using a Fortran `D` exponent. Only the keywords the
//! extraction pipeline consumes are retained.

use std::io::Read;

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

use crate::extract::{CaptureDate, ExtractError};

/// FITS blocks are 2880 bytes: 36 cards of 80 characters.
pub(crate) const BLOCK_SIZE: usize = 2880;
pub(crate) const CARD_SIZE: usize = 80;

/// Cap on header blocks scanned before giving up. Bounds the cost of
/// re-parsing a malformed input that never produces an END card.
const MAX_HEADER_BLOCKS: usize = 64;

/// The header keywords the pipeline consumes, with FITS defaults applied.
#[derive(Debug, Clone, PartialEq)]
pub struct FitsHeader {
    /// SIMPLE = T conformance flag.
    pub simple: bool,
    /// Bits per sample; negative values are IEEE floating point.
    pub bitpix: i32,
    pub naxis: i64,
    pub naxis1: i64,
    pub naxis2: i64,
    pub naxis3: i64,
    /// Linear sample scaling: physical = raw * bscale + bzero.
    pub bzero: f64,
    pub bscale: f64,
    pub date_obs: CaptureDate,
    pub exposure_seconds: f64,
    pub focal_length_mm: f64,
    pub aperture_f_number: f64,
    /// Byte offset of the data section (first block after the header).
    pub data_offset: u64,
}

impl Default for FitsHeader {
    fn default() -> Self {
        Self {
            simple: false,
            bitpix: 0,
            naxis: 0,
            naxis1: 0,
            naxis2: 0,
            naxis3: 0,
            bzero: 0.0,
            bscale: 1.0,
            date_obs: CaptureDate::default(),
            exposure_seconds: 0.0,
            focal_length_mm: 0.0,
            aperture_f_number: 0.0,
            data_offset: 0,
        }
    }
}

impl FitsHeader {
    /// Channel count: NAXIS3 for cubes, 1 for flat images.
    pub fn channels(&self) -> i64 {
        if self.naxis >= 3 {
            self.naxis3
        } else {
            1
        }
    }

    /// Bytes per sample for the declared BITPIX, 0 if unsupported.
    pub fn bytes_per_sample(&self) -> u64 {
        match self.bitpix {
            8 => 1,
            16 => 2,
            32 => 4,
            -32 => 4,
            -64 => 8,
            _ => 0,
        }
    }

    /// Total declared data section size, None on overflow or bad fields.
    pub fn data_bytes(&self) -> Option<u64> {
        let width = u64::try_from(self.naxis1).ok()?;
        let height = u64::try_from(self.naxis2).ok()?;
        let channels = u64::try_from(self.channels()).ok()?;
        width
            .checked_mul(height)?
            .checked_mul(channels)?
            .checked_mul(self.bytes_per_sample())
    }
}

/// Read header blocks until the END card.
///
/// Consumes exactly the header section including its block padding, so the
/// reader is left positioned at the data section.
pub(crate) fn parse<R: Read>(reader: &mut R) -> Result<FitsHeader, ExtractError> {
    let mut header = FitsHeader::default();
    let mut saw_exptime = false;
    let mut block = [0u8; BLOCK_SIZE];
    let mut blocks_read = 0usize;

    'blocks: loop {
        if blocks_read == MAX_HEADER_BLOCKS {
            return Err(ExtractError::InvalidHeader);
        }
        reader
            .read_exact(&mut block)
            .map_err(|_| ExtractError::InvalidHeader)?;
        blocks_read += 1;

        for card in block.chunks_exact(CARD_SIZE) {
            // Field boundaries are byte offsets into the card; split the
            // raw bytes before any lossy text conversion, since corrupt
            // non-UTF-8 cards would otherwise land mid-character.
            let keyword = String::from_utf8_lossy(&card[..8]);
            let keyword = keyword.trim();

            if keyword == "END" {
                break 'blocks;
            }
            if &card[8..10] != b"= " {
                continue;
            }
            let value = String::from_utf8_lossy(&card[10..]);
            let value = value.as_ref();

            match keyword {
                "SIMPLE" => header.simple = parse_logical(value).unwrap_or(false),
                "BITPIX" => header.bitpix = parse_int(value).unwrap_or(0) as i32,
                "NAXIS" => header.naxis = parse_int(value).unwrap_or(0),
                "NAXIS1" => header.naxis1 = parse_int(value).unwrap_or(0),
                "NAXIS2" => header.naxis2 = parse_int(value).unwrap_or(0),
                "NAXIS3" => header.naxis3 = parse_int(value).unwrap_or(0),
                "BZERO" => header.bzero = parse_float(value).unwrap_or(0.0),
                "BSCALE" => header.bscale = parse_float(value).unwrap_or(1.0),
                "DATE-OBS" => {
                    if let Some(text) = parse_quoted(value) {
                        header.date_obs = parse_date_obs(&text);
                    }
                }
                "EXPTIME" => {
                    if let Some(seconds) = parse_float(value) {
                        header.exposure_seconds = seconds;
                        saw_exptime = true;
                    }
                }
                // Older convention; EXPTIME wins when both are present
                "EXPOSURE" => {
                    if !saw_exptime {
                        if let Some(seconds) = parse_float(value) {
                            header.exposure_seconds = seconds;
                        }
                    }
                }
                "FOCALLEN" => header.focal_length_mm = parse_float(value).unwrap_or(0.0),
                "APERTURE" => header.aperture_f_number = parse_float(value).unwrap_or(0.0),
                _ => {}
            }
        }
    }

    header.data_offset = (blocks_read * BLOCK_SIZE) as u64;
    Ok(header)
}

/// Value text with any trailing `/ comment` removed.
fn strip_comment(value: &str) -> &str {
    match value.find('/') {
        Some(index) => &value[..index],
        None => value,
    }
}

fn parse_logical(value: &str) -> Option<bool> {
    match strip_comment(value).trim() {
        "T" => Some(true),
        "F" => Some(false),
        _ => None,
    }
}

fn parse_int(value: &str) -> Option<i64> {
    strip_comment(value).trim().parse().ok()
}

fn parse_float(value: &str) -> Option<f64> {
    strip_comment(value)
        .trim()
        .replace(['D', 'd'], "E")
        .parse()
        .ok()
}

fn parse_quoted(value: &str) -> Option<String> {
    let rest = value.trim_start().strip_prefix('\'')?;
    let end = rest.find('\'')?;
    Some(rest[..end].trim_end().to_string())
}

/// Parse a DATE-OBS value into civil capture fields.
///
/// Accepts the standard `YYYY-MM-DDThh:mm:ss[.s]` form and the date-only
/// `YYYY-MM-DD` form. Anything else yields the all-zero "absent" date.
fn parse_date_obs(text: &str) -> CaptureDate {
    let parsed = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f").or_else(|_| {
        NaiveDate::parse_from_str(text, "%Y-%m-%d").map(|date| date.and_time(NaiveTime::MIN))
    });

    match parsed {
        Ok(timestamp) => CaptureDate {
            year: timestamp.year(),
            month: timestamp.month(),
            day: timestamp.day(),
            hour: timestamp.hour(),
            minute: timestamp.minute(),
            second: timestamp.second() as f64 + timestamp.nanosecond() as f64 / 1e9,
        },
        Err(_) => CaptureDate::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// Format one 80-character card.
    fn card(keyword: &str, value: &str) -> Vec<u8> {
        let text = if value.is_empty() {
            format!("{keyword:<80}")
        } else {
            format!("{keyword:<8}= {value:<70}")
        };
        let mut bytes = text.into_bytes();
        bytes.truncate(CARD_SIZE);
        bytes
    }

    /// Build a header section from cards, END-terminated and block-padded.
    fn header_bytes(cards: &[(&str, &str)]) -> Vec<u8> {
        let mut bytes = Vec::new();
        for (keyword, value) in cards {
            bytes.extend_from_slice(&card(keyword, value));
        }
        bytes.extend_from_slice(&card("END", ""));
        while bytes.len() % BLOCK_SIZE != 0 {
            bytes.push(b' ');
        }
        bytes
    }

    fn basic_cards() -> Vec<(&'static str, &'static str)> {
        vec![
            ("SIMPLE", "T"),
            ("BITPIX", "16"),
            ("NAXIS", "2"),
            ("NAXIS1", "4"),
            ("NAXIS2", "4"),
        ]
    }

    #[test]
    fn test_parse_basic_header() {
        let bytes = header_bytes(&basic_cards());
        let header = parse(&mut Cursor::new(bytes)).unwrap();

        assert!(header.simple);
        assert_eq!(header.bitpix, 16);
        assert_eq!(header.naxis, 2);
        assert_eq!(header.naxis1, 4);
        assert_eq!(header.naxis2, 4);
        assert_eq!(header.channels(), 1);
        assert_eq!(header.data_offset, BLOCK_SIZE as u64);

        // FITS defaults
        assert_eq!(header.bzero, 0.0);
        assert_eq!(header.bscale, 1.0);
        assert!(!header.date_obs.is_present());
        assert_eq!(header.exposure_seconds, 0.0);
    }

    #[test]
    fn test_parse_observational_keywords() {
        let mut cards = basic_cards();
        cards.push(("DATE-OBS", "'2020-03-04T05:06:07'"));
        cards.push(("EXPTIME", "30.0 / integration time"));
        cards.push(("FOCALLEN", "530."));
        cards.push(("APERTURE", "5.6"));
        cards.push(("BZERO", "32768"));
        let header = parse(&mut Cursor::new(header_bytes(&cards))).unwrap();

        assert_eq!(header.date_obs.year, 2020);
        assert_eq!(header.date_obs.month, 3);
        assert_eq!(header.date_obs.day, 4);
        assert_eq!(header.date_obs.hour, 5);
        assert_eq!(header.date_obs.minute, 6);
        assert_eq!(header.date_obs.second, 7.0);
        assert_eq!(header.exposure_seconds, 30.0);
        assert_eq!(header.focal_length_mm, 530.0);
        assert_eq!(header.aperture_f_number, 5.6);
        assert_eq!(header.bzero, 32768.0);
    }

    #[test]
    fn test_exptime_wins_over_exposure() {
        let mut cards = basic_cards();
        cards.push(("EXPTIME", "30.0"));
        cards.push(("EXPOSURE", "45.0"));
        let header = parse(&mut Cursor::new(header_bytes(&cards))).unwrap();
        assert_eq!(header.exposure_seconds, 30.0);

        let mut cards = basic_cards();
        cards.push(("EXPOSURE", "45.0"));
        let header = parse(&mut Cursor::new(header_bytes(&cards))).unwrap();
        assert_eq!(header.exposure_seconds, 45.0);
    }

    #[test]
    fn test_multi_block_header() {
        // 40 keyword cards + END spill into a second block
        let mut cards = basic_cards();
        for _ in 0..40 {
            cards.push(("COMMENT", ""));
        }
        let bytes = header_bytes(&cards);
        assert_eq!(bytes.len(), 2 * BLOCK_SIZE);

        let header = parse(&mut Cursor::new(bytes)).unwrap();
        assert_eq!(header.data_offset, 2 * BLOCK_SIZE as u64);
        assert_eq!(header.naxis1, 4);
    }

    #[test]
    fn test_truncated_header_fails() {
        let mut bytes = header_bytes(&basic_cards());
        bytes.truncate(100);
        assert!(matches!(
            parse(&mut Cursor::new(bytes)),
            Err(ExtractError::InvalidHeader)
        ));
    }

    #[test]
    fn test_missing_end_card_bounded() {
        // Blocks of spaces with no END; the scan must stop, not spin
        let bytes = vec![b' '; BLOCK_SIZE * 70];
        assert!(matches!(
            parse(&mut Cursor::new(bytes)),
            Err(ExtractError::InvalidHeader)
        ));
    }

    #[test]
    fn test_non_ascii_cards_skipped_without_panic() {
        // A card of raw 0xFF bytes expands to multi-byte replacement
        // characters under lossy conversion; the scan must step over it
        // and keep consuming the surrounding cards.
        let mut bytes = vec![0xFF; CARD_SIZE];
        for (keyword, value) in &basic_cards() {
            bytes.extend_from_slice(&card(keyword, value));
        }
        bytes.extend_from_slice(&[0xFF; CARD_SIZE]);
        bytes.extend_from_slice(&card("EXPTIME", "30.0"));
        bytes.extend_from_slice(&card("END", ""));
        while bytes.len() % BLOCK_SIZE != 0 {
            bytes.push(b' ');
        }

        let header = parse(&mut Cursor::new(bytes)).unwrap();
        assert_eq!(header.naxis1, 4);
        assert_eq!(header.exposure_seconds, 30.0);
    }

    #[test]
    fn test_garbage_value_bytes_leave_field_at_default() {
        // Invalid UTF-8 confined to the value region of an otherwise
        // well-formed card fails the value parse, nothing more.
        let mut bytes = Vec::new();
        for (keyword, value) in &basic_cards() {
            bytes.extend_from_slice(&card(keyword, value));
        }
        let mut corrupt = card("EXPTIME", "");
        corrupt[8] = b'=';
        corrupt[9] = b' ';
        for byte in corrupt[10..].iter_mut() {
            *byte = 0xFF;
        }
        bytes.extend_from_slice(&corrupt);
        bytes.extend_from_slice(&card("END", ""));
        while bytes.len() % BLOCK_SIZE != 0 {
            bytes.push(b' ');
        }

        let header = parse(&mut Cursor::new(bytes)).unwrap();
        assert_eq!(header.naxis1, 4);
        assert_eq!(header.exposure_seconds, 0.0);
    }

    #[test]
    fn test_all_garbage_blocks_fail_without_panic() {
        // Pure binary garbage never yields an END card; the bounded scan
        // must report an invalid header rather than crash.
        let bytes = vec![0xFF; BLOCK_SIZE * 70];
        assert!(matches!(
            parse(&mut Cursor::new(bytes)),
            Err(ExtractError::InvalidHeader)
        ));
    }

    #[test]
    fn test_fortran_exponent_floats() {
        let mut cards = basic_cards();
        cards.push(("EXPTIME", "3.0D1"));
        let header = parse(&mut Cursor::new(header_bytes(&cards))).unwrap();
        assert_eq!(header.exposure_seconds, 30.0);
    }

    #[test]
    fn test_date_only_and_fractional_forms() {
        let date = parse_date_obs("2020-03-04");
        assert_eq!((date.year, date.month, date.day), (2020, 3, 4));
        assert_eq!((date.hour, date.minute, date.second), (0, 0, 0.0));

        let date = parse_date_obs("2020-03-04T05:06:07.25");
        assert!((date.second - 7.25).abs() < 1e-9);

        assert!(!parse_date_obs("not a date").is_present());
        assert!(!parse_date_obs("2020-13-40T99:99:99").is_present());
    }

    #[test]
    fn test_cube_channels_and_data_bytes() {
        let cards = vec![
            ("SIMPLE", "T"),
            ("BITPIX", "16"),
            ("NAXIS", "3"),
            ("NAXIS1", "100"),
            ("NAXIS2", "50"),
            ("NAXIS3", "3"),
        ];
        let header = parse(&mut Cursor::new(header_bytes(&cards))).unwrap();
        assert_eq!(header.channels(), 3);
        assert_eq!(header.data_bytes(), Some(100 * 50 * 3 * 2));
    }

    #[test]
    fn test_data_bytes_overflow_is_none() {
        let mut header = FitsHeader::default();
        header.bitpix = -64;
        header.naxis = 2;
        header.naxis1 = i64::MAX;
        header.naxis2 = i64::MAX;
        assert_eq!(header.data_bytes(), None);

        header.naxis1 = -5;
        assert_eq!(header.data_bytes(), None);
    }

    #[test]
    fn test_unsupported_bitpix_has_no_sample_size() {
        let mut header = FitsHeader::default();
        header.bitpix = 12;
        assert_eq!(header.bytes_per_sample(), 0);
    }
}
