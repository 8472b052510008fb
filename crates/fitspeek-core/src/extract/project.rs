//! Projection of header state into the canonical property set.
//!
//! `project` is a pure mapping: it reads a `HeaderState` and produces the
//! ordered list of (key, typed value) pairs the host schema defines. Each
//! field's inclusion rule is independent: a sentinel-absent or unconvertible
//! optional field omits only itself and never aborts projection of the
//! remaining fields.

use chrono::NaiveDate;

use super::types::{CanonicalProperty, CaptureDate, HeaderState, PropertyKey, PropertyValue};

/// Project a loaded header into canonical properties, in schema order.
pub fn project(header: &HeaderState) -> Vec<CanonicalProperty> {
    let mut props = Vec::with_capacity(8);

    props.push(CanonicalProperty::new(
        PropertyKey::HorizontalSize,
        PropertyValue::UInt32(clamp_u32(header.input.width)),
    ));
    props.push(CanonicalProperty::new(
        PropertyKey::VerticalSize,
        PropertyValue::UInt32(clamp_u32(header.input.height)),
    ));
    props.push(CanonicalProperty::new(
        PropertyKey::BitDepth,
        PropertyValue::UInt32(header.storage.display_bits()),
    ));
    props.push(CanonicalProperty::new(
        PropertyKey::Dimensions,
        PropertyValue::Text(format!(
            "{} x {}",
            header.input.width, header.input.height
        )),
    ));

    if header.date.is_present() {
        // A date that fails civil-to-absolute conversion is silently
        // omitted rather than failing the whole projection.
        if let Some(timestamp) = to_timestamp(&header.date) {
            props.push(CanonicalProperty::new(
                PropertyKey::DateTaken,
                PropertyValue::Timestamp(timestamp),
            ));
        }
    }

    if header.exposure_seconds > 0.0 {
        props.push(CanonicalProperty::new(
            PropertyKey::ExposureTime,
            PropertyValue::Double(header.exposure_seconds),
        ));
    }

    if header.focal_length_mm > 0.0 {
        props.push(CanonicalProperty::new(
            PropertyKey::FocalLength,
            PropertyValue::Double(header.focal_length_mm),
        ));
    }

    if header.aperture_f_number > 0.0 {
        props.push(CanonicalProperty::new(
            PropertyKey::Aperture,
            PropertyValue::Text(format_aperture(header.aperture_f_number)),
        ));
    }

    props
}

/// Convert civil capture fields to an absolute timestamp.
///
/// Sub-second precision is kept to the millisecond. Returns `None` for
/// out-of-range fields (month 13, day 0, hour 25, ...).
fn to_timestamp(date: &CaptureDate) -> Option<chrono::NaiveDateTime> {
    if !date.second.is_finite() || date.second < 0.0 {
        return None;
    }
    let whole_seconds = date.second.trunc();
    if whole_seconds > 59.0 {
        return None;
    }
    let millis = ((date.second - whole_seconds) * 1000.0).round() as u32;

    NaiveDate::from_ymd_opt(date.year, date.month, date.day)?.and_hms_milli_opt(
        date.hour,
        date.minute,
        whole_seconds as u32,
        millis.min(999),
    )
}

/// Aperture is displayed as the rounded integer f-number.
fn format_aperture(f_number: f64) -> String {
    format!("{}", f_number.round() as i64)
}

fn clamp_u32(value: i64) -> u32 {
    value.clamp(0, u32::MAX as i64) as u32
}
